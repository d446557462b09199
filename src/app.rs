use ratatui::widgets::ListState;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, INVALID_RESPONSE};
use crate::browser;
use crate::clipboard;
use crate::config::Config;
use crate::constants::constants;
use crate::download::{DownloadEvent, spawn_download};
use crate::input::FormInput;
use crate::models::{Format, SearchOutcome, Video, WakameEntry, best_format_index, summary_line};
use crate::theme::{THEMES, Theme, theme_index};

// --- Pages ---

/// One screen per backend workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Page {
  /// Extract, then immediately download the best format.
  #[value(name = "auto")]
  AutoDownload,
  /// Extract and list every format.
  Extract,
  /// Keyword search through a selectable instance.
  Search,
  /// Keyword search through the alternate backend.
  Wakame,
}

impl Page {
  pub const ALL: [Page; 4] = [Page::AutoDownload, Page::Extract, Page::Search, Page::Wakame];

  pub fn label(self) -> &'static str {
    match self {
      Page::AutoDownload => "Auto download",
      Page::Extract => "Extract",
      Page::Search => "Search",
      Page::Wakame => "Wakame",
    }
  }

  fn index(self) -> usize {
    Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
  }

  pub fn next(self) -> Self {
    Self::ALL[(self.index() + 1) % Self::ALL.len()]
  }

  pub fn prev(self) -> Self {
    Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  Input,
  Results,
}

/// Lifecycle of one form. The latest response replaces whatever was shown.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Phase<T> {
  #[default]
  Idle,
  Loading,
  Failed(String),
  Ready(T),
}

impl<T> Phase<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, Phase::Loading)
  }

  pub fn ready(&self) -> Option<&T> {
    match self {
      Phase::Ready(v) => Some(v),
      _ => None,
    }
  }

  /// Hide a shown error or result, e.g. after the input was edited.
  fn dismiss(&mut self) {
    if matches!(self, Phase::Failed(_) | Phase::Ready(_)) {
      *self = Phase::Idle;
    }
  }
}

/// What the auto-download page shows once a download was started.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoDownloadView {
  pub title: String,
  pub info: String,
  pub filename: String,
}

#[derive(Debug, Default)]
pub struct AutoDownloadPage {
  pub input: FormInput,
  pub phase: Phase<AutoDownloadView>,
}

#[derive(Debug, Default)]
pub struct ExtractPage {
  pub input: FormInput,
  pub phase: Phase<Video>,
  pub list_state: ListState,
}

#[derive(Debug, Default)]
pub struct SearchPage {
  pub input: FormInput,
  pub phase: Phase<SearchOutcome>,
  pub list_state: ListState,
  pub instances: Vec<String>,
  pub instance_index: usize,
  /// Instance the in-flight or last search was sent with.
  submitted_instance: String,
  /// Video id whose formats are being extracted.
  pub extracting: Option<String>,
}

impl SearchPage {
  pub fn instance(&self) -> &str {
    self.instances.get(self.instance_index).map(String::as_str).unwrap_or("auto")
  }
}

#[derive(Debug, Default)]
pub struct WakamePage {
  pub input: FormInput,
  pub phase: Phase<Vec<WakameEntry>>,
  pub list_state: ListState,
  /// Cards per grid row at the last render.
  pub columns: usize,
  /// URL of the entry being extracted.
  pub extracting: Option<String>,
}

// --- Overlays ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
  /// Every format, from the search page.
  Formats,
  /// Only the best format, from the wakame page.
  BestFormat,
}

/// Format chooser shown on top of a results list.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatModal {
  pub kind: ModalKind,
  pub video: Video,
  /// Indices into `video.formats` offered for selection.
  pub choices: Vec<usize>,
  pub selected: usize,
}

impl FormatModal {
  pub fn all_formats(video: Video) -> Self {
    let choices = (0..video.formats.len()).collect();
    Self { kind: ModalKind::Formats, video, choices, selected: 0 }
  }

  pub fn best_format(video: Video) -> Option<Self> {
    let best = best_format_index(&video.formats)?;
    Some(Self { kind: ModalKind::BestFormat, video, choices: vec![best], selected: 0 })
  }

  pub fn selected_format(&self) -> Option<&Format> {
    self.choices.get(self.selected).and_then(|&i| self.video.formats.get(i))
  }

  fn step(&mut self, forward: bool) {
    let count = self.choices.len();
    if count > 0 {
      self.selected = if forward { (self.selected + 1) % count } else { (self.selected + count - 1) % count };
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Info,
  Success,
}

/// Short-lived notice in the top-right corner.
#[derive(Debug, Clone)]
pub struct Toast {
  pub kind: ToastKind,
  pub message: String,
  expires_at: Instant,
}

// --- Async plumbing ---

type Pending<T> = Option<oneshot::Receiver<Result<T, ApiError>>>;

/// In-flight request receivers, at most one per slot.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) auto_rx: Pending<Video>,
  pub(crate) extract_rx: Pending<Video>,
  pub(crate) search_rx: Pending<SearchOutcome>,
  pub(crate) wakame_rx: Pending<Vec<WakameEntry>>,
  pub(crate) search_row_rx: Pending<Video>,
  pub(crate) wakame_row_rx: Pending<Video>,
  pub(crate) health_rx: Pending<bool>,
}

impl AsyncTasks {
  fn any_pending(&self) -> bool {
    self.auto_rx.is_some()
      || self.extract_rx.is_some()
      || self.search_rx.is_some()
      || self.wakame_rx.is_some()
      || self.search_row_rx.is_some()
      || self.wakame_row_rx.is_some()
      || self.health_rx.is_some()
  }
}

/// Run `fut` on the runtime and hand its result back through a oneshot.
fn spawn_request<T, F>(fut: F) -> oneshot::Receiver<Result<T, ApiError>>
where
  T: Send + 'static,
  F: Future<Output = Result<T, ApiError>> + Send + 'static,
{
  let (tx, rx) = oneshot::channel();
  tokio::spawn(async move {
    let _ = tx.send(fut.await);
  });
  rx
}

/// Take a finished result out of `slot`, leaving it in place while still running.
/// A task that died without answering becomes an error message.
fn take_ready<T>(slot: &mut Pending<T>) -> Option<Result<T, String>> {
  take_ready_with(slot, |e| e.to_string())
}

fn take_ready_with<T>(slot: &mut Pending<T>, describe: fn(ApiError) -> String) -> Option<Result<T, String>> {
  let mut rx = slot.take()?;
  match rx.try_recv() {
    Ok(result) => Some(result.map_err(describe)),
    Err(oneshot::error::TryRecvError::Empty) => {
      *slot = Some(rx);
      None
    }
    Err(oneshot::error::TryRecvError::Closed) => Some(Err("Request task failed.".to_string())),
  }
}

const MP4_LINK_FAILED: &str = "Failed to get MP4 link";

/// Search-row extraction shows the backend's own message when it sent one.
fn mp4_link_error(e: ApiError) -> String {
  match e {
    ApiError::Semantic(msg) if msg == INVALID_RESPONSE => MP4_LINK_FAILED.to_string(),
    ApiError::Semantic(msg) => msg,
    other => format!("Error: {}", other),
  }
}

/// Update one field of the saved prefs. Reloads from disk so session-only
/// overrides (CLI flags) are never written back.
fn persist_prefs(update: impl FnOnce(&mut Config)) {
  let mut prefs = Config::load();
  update(&mut prefs);
  prefs.save();
}

fn step_selection(list_state: &mut ListState, count: usize, delta: isize) {
  if count == 0 {
    list_state.select(None);
    return;
  }
  let current = list_state.selected().unwrap_or(0).min(count - 1) as isize;
  let next = (current + delta).rem_euclid(count as isize) as usize;
  list_state.select(Some(next));
}

// --- App State ---

pub struct App {
  pub page: Page,
  pub focus: Focus,
  pub theme_index: usize,
  pub auto: AutoDownloadPage,
  pub extract: ExtractPage,
  pub search: SearchPage,
  pub wakame: WakamePage,
  pub modal: Option<FormatModal>,
  pub toasts: Vec<Toast>,
  pub last_error: Option<String>,
  /// Latest download progress line for the status bar.
  pub download_status: Option<String>,
  /// Result of the startup `/health` check.
  pub server_online: Option<bool>,
  pub should_quit: bool,
  api: ApiClient,
  download_dir: PathBuf,
  pub(crate) tasks: AsyncTasks,
  download_tx: mpsc::UnboundedSender<DownloadEvent>,
  download_rx: mpsc::UnboundedReceiver<DownloadEvent>,
  /// When the last error was set, used for auto-dismiss.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(api: ApiClient, config: Config, page: Page) -> Self {
    let theme_index = config.theme_name.as_deref().map(theme_index).unwrap_or(0);

    let mut instances = constants().instances.clone();
    let instance_index = match config.instance.as_deref() {
      Some(name) => match instances.iter().position(|i| i == name) {
        Some(i) => i,
        None => {
          instances.push(name.to_string());
          instances.len() - 1
        }
      },
      None => 0,
    };

    let (download_tx, download_rx) = mpsc::unbounded_channel();
    let download_dir = config.download_dir();

    Self {
      page,
      focus: Focus::Input,
      theme_index,
      auto: AutoDownloadPage::default(),
      extract: ExtractPage::default(),
      search: SearchPage { instances, instance_index, ..SearchPage::default() },
      wakame: WakamePage::default(),
      modal: None,
      toasts: Vec::new(),
      last_error: None,
      download_status: None,
      server_online: None,
      should_quit: false,
      api,
      download_dir,
      tasks: AsyncTasks::default(),
      download_tx,
      download_rx,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static Theme {
    // theme_index is bounded by theme_index() and the modular arithmetic in next_theme()
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    let name = self.theme().name.to_string();
    persist_prefs(|prefs| prefs.theme_name = Some(name));
  }

  pub fn server_url(&self) -> &str {
    self.api.base_url()
  }

  pub fn download_dir(&self) -> &PathBuf {
    &self.download_dir
  }

  // --- Messages ---

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    warn!(err = %msg, "ui error");
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  pub fn push_toast(&mut self, kind: ToastKind, message: String, secs: u64) {
    self.toasts.push(Toast { kind, message, expires_at: Instant::now() + Duration::from_secs(secs) });
  }

  /// Drop stale errors and toasts.
  pub fn expire_messages(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.clear_error();
    }
    let now = Instant::now();
    self.toasts.retain(|t| t.expires_at > now);
  }

  // --- Navigation ---

  pub fn set_page(&mut self, page: Page) {
    self.page = page;
    self.modal = None;
    self.focus = if self.result_count() > 0 { Focus::Results } else { Focus::Input };
  }

  pub fn input_mut(&mut self) -> &mut FormInput {
    match self.page {
      Page::AutoDownload => &mut self.auto.input,
      Page::Extract => &mut self.extract.input,
      Page::Search => &mut self.search.input,
      Page::Wakame => &mut self.wakame.input,
    }
  }

  /// The input of the current page changed: hide its previous error/result.
  pub fn input_changed(&mut self) {
    match self.page {
      Page::AutoDownload => self.auto.phase.dismiss(),
      Page::Extract => {
        self.extract.phase.dismiss();
        self.extract.list_state.select(None);
      }
      Page::Search => {
        self.search.phase.dismiss();
        self.search.list_state.select(None);
      }
      Page::Wakame => {
        self.wakame.phase.dismiss();
        self.wakame.list_state.select(None);
      }
    }
  }

  pub fn is_loading(&self) -> bool {
    match self.page {
      Page::AutoDownload => self.auto.phase.is_loading(),
      Page::Extract => self.extract.phase.is_loading(),
      Page::Search => self.search.phase.is_loading(),
      Page::Wakame => self.wakame.phase.is_loading(),
    }
  }

  /// Number of selectable rows on the current page.
  pub fn result_count(&self) -> usize {
    match self.page {
      Page::AutoDownload => 0,
      Page::Extract => self.extract.phase.ready().map_or(0, |v| v.formats.len()),
      Page::Search => self.search.phase.ready().map_or(0, |o| o.results.len()),
      Page::Wakame => self.wakame.phase.ready().map_or(0, Vec::len),
    }
  }

  /// Move the selection of the current results list by `delta`, wrapping around.
  pub fn move_selection(&mut self, delta: isize) {
    let count = self.result_count();
    match self.page {
      Page::AutoDownload => {}
      Page::Extract => step_selection(&mut self.extract.list_state, count, delta),
      Page::Search => step_selection(&mut self.search.list_state, count, delta),
      Page::Wakame => step_selection(&mut self.wakame.list_state, count, delta),
    }
  }

  pub fn modal_step(&mut self, forward: bool) {
    if let Some(modal) = self.modal.as_mut() {
      modal.step(forward);
    }
  }

  pub fn cycle_instance(&mut self) {
    if self.search.instances.is_empty() {
      return;
    }
    self.search.instance_index = (self.search.instance_index + 1) % self.search.instances.len();
    let instance = self.search.instance().to_string();
    debug!(instance = %instance, "search instance changed");
    persist_prefs(|prefs| prefs.instance = Some(instance));
  }

  // --- Submissions ---

  /// Submit the form of the current page. Ignored while that form is loading.
  pub fn submit(&mut self) {
    if self.is_loading() {
      debug!(page = self.page.label(), "submit ignored while loading");
      return;
    }
    self.clear_error();
    match self.page {
      Page::AutoDownload => self.submit_auto_download(),
      Page::Extract => self.submit_extract(),
      Page::Search => self.submit_search(),
      Page::Wakame => self.submit_wakame(),
    }
  }

  fn submit_auto_download(&mut self) {
    let url = self.auto.input.value().to_string();
    if url.is_empty() {
      self.auto.phase = Phase::Failed("Please enter a YouTube URL".to_string());
      return;
    }
    info!(url = %url, "auto download submitted");
    self.auto.phase = Phase::Loading;
    let api = self.api.clone();
    self.tasks.auto_rx = Some(spawn_request(async move { api.extract(&url).await }));
  }

  fn submit_extract(&mut self) {
    let url = self.extract.input.value().to_string();
    if url.is_empty() {
      self.extract.phase = Phase::Failed("Please enter a YouTube URL".to_string());
      return;
    }
    info!(url = %url, "extract submitted");
    self.extract.phase = Phase::Loading;
    self.extract.list_state.select(None);
    let api = self.api.clone();
    self.tasks.extract_rx = Some(spawn_request(async move { api.extract(&url).await }));
  }

  fn submit_search(&mut self) {
    let query = self.search.input.value().to_string();
    if query.is_empty() {
      self.search.phase = Phase::Failed("Enter a search keyword".to_string());
      return;
    }
    let instance = self.search.instance().to_string();
    info!(query = %query, instance = %instance, "search submitted");
    self.search.phase = Phase::Loading;
    self.search.list_state.select(None);
    self.search.submitted_instance = instance.clone();
    let api = self.api.clone();
    self.tasks.search_rx = Some(spawn_request(async move { api.search_videos(&query, &instance).await }));
  }

  fn submit_wakame(&mut self) {
    let query = self.wakame.input.value().to_string();
    if query.is_empty() {
      self.wakame.phase = Phase::Failed("Enter a search keyword".to_string());
      return;
    }
    info!(query = %query, "wakame search submitted");
    self.wakame.phase = Phase::Loading;
    self.wakame.list_state.select(None);
    let api = self.api.clone();
    self.tasks.wakame_rx = Some(spawn_request(async move { api.wakame_search(&query).await }));
  }

  /// Ask the backend once whether it is up; the header shows the answer.
  pub fn check_health(&mut self) {
    let api = self.api.clone();
    self.tasks.health_rx = Some(spawn_request(async move { api.health().await }));
  }

  // --- Row actions ---

  /// Extract the selected search result and offer all of its formats.
  pub fn search_extract_selected(&mut self) {
    let Some((video_id, url)) = self
      .search
      .phase
      .ready()
      .and_then(|o| self.search.list_state.selected().and_then(|i| o.results.get(i)))
      .map(|e| (e.video_id.clone(), e.watch_url()))
    else {
      return;
    };
    if self.search.extracting.is_some() {
      self.set_error("Already extracting, please wait.".to_string());
      return;
    }
    info!(video_id = %video_id, "search row extract");
    self.search.extracting = Some(video_id);
    let api = self.api.clone();
    self.tasks.search_row_rx = Some(spawn_request(async move { api.extract(&url).await }));
  }

  pub fn search_copy_selected(&mut self) {
    let url = self
      .search
      .phase
      .ready()
      .and_then(|o| self.search.list_state.selected().and_then(|i| o.results.get(i)))
      .map(|e| e.watch_url());
    if let Some(url) = url {
      self.copy_url(&url);
    }
  }

  fn selected_wakame(&self) -> Option<&WakameEntry> {
    self.wakame.phase.ready().and_then(|r| self.wakame.list_state.selected().and_then(|i| r.get(i)))
  }

  /// Extract the selected wakame result and offer its best format.
  pub fn wakame_extract_selected(&mut self) {
    let Some(url) = self.selected_wakame().map(|e| e.url.clone()) else { return };
    if self.wakame.extracting.is_some() {
      self.set_error("Already extracting, please wait.".to_string());
      return;
    }
    info!(url = %url, "wakame row extract");
    self.wakame.extracting = Some(url.clone());
    let api = self.api.clone();
    self.tasks.wakame_row_rx = Some(spawn_request(async move { api.extract(&url).await }));
  }

  pub fn wakame_open_selected(&mut self) {
    if let Some(url) = self.selected_wakame().map(|e| e.url.clone())
      && let Err(e) = browser::open_url(&url)
    {
      self.set_error(format!("Could not open browser: {:#}", e));
    }
  }

  pub fn wakame_copy_selected(&mut self) {
    if let Some(url) = self.selected_wakame().map(|e| e.url.clone()) {
      self.copy_url(&url);
    }
  }

  // --- Format actions ---

  /// The format under the cursor: the modal's selection if open, otherwise the
  /// extract page's list selection. Returned with the owning video title.
  pub fn selected_format(&self) -> Option<(String, Format)> {
    if let Some(modal) = &self.modal {
      return modal.selected_format().map(|f| (modal.video.title.clone(), f.clone()));
    }
    if self.page != Page::Extract {
      return None;
    }
    let video = self.extract.phase.ready()?;
    let format = self.extract.list_state.selected().and_then(|i| video.formats.get(i))?;
    Some((video.title.clone(), format.clone()))
  }

  /// Open the selected format in the browser, also copying its URL quietly.
  pub fn play_selected_format(&mut self) {
    let Some((_, format)) = self.selected_format() else { return };
    match browser::open_url(&format.url) {
      Ok(()) => {
        if let Err(e) = clipboard::copy_to_clipboard(&format.url) {
          debug!(err = %format!("{:#}", e), "quiet clipboard copy failed");
        }
      }
      Err(e) => self.set_error(format!("Could not open browser: {:#}", e)),
    }
  }

  pub fn download_selected_format(&mut self) {
    let Some((title, format)) = self.selected_format() else { return };
    self.start_download(&title, &format);
  }

  pub fn copy_selected_format(&mut self) {
    let Some((_, format)) = self.selected_format() else { return };
    self.copy_url(&format.url);
  }

  /// Spawn a background download and return the file name it will use.
  fn start_download(&mut self, title: &str, format: &Format) -> String {
    let quality = format.quality_label();
    let (filename, _handle) = spawn_download(
      self.api.http().clone(),
      format.url.clone(),
      self.download_dir.clone(),
      title,
      &quality,
      self.download_tx.clone(),
    );
    self.push_toast(ToastKind::Success, format!("Download started: {}", filename), constants().download_toast_secs);
    filename
  }

  fn copy_url(&mut self, url: &str) {
    match clipboard::copy_to_clipboard(url) {
      Ok(_) => self.push_toast(ToastKind::Success, "URL copied to clipboard!".to_string(), constants().copy_toast_secs),
      Err(e) => {
        warn!(err = %format!("{:#}", e), "clipboard copy failed");
        self.set_error("Failed to copy URL to clipboard".to_string());
      }
    }
  }

  // --- Polling ---

  pub fn has_pending(&self) -> bool {
    self.tasks.any_pending()
  }

  /// Apply any finished requests and download events. Called once per UI tick.
  pub fn check_pending(&mut self) {
    if let Some(result) = take_ready(&mut self.tasks.auto_rx) {
      self.finish_auto_download(result);
    }
    if let Some(result) = take_ready(&mut self.tasks.extract_rx) {
      self.finish_extract(result);
    }
    if let Some(result) = take_ready(&mut self.tasks.search_rx) {
      self.finish_search(result);
    }
    if let Some(result) = take_ready(&mut self.tasks.wakame_rx) {
      self.finish_wakame(result);
    }
    if let Some(result) = take_ready_with(&mut self.tasks.search_row_rx, mp4_link_error) {
      self.search.extracting = None;
      match result {
        Ok(video) if !video.formats.is_empty() => self.modal = Some(FormatModal::all_formats(video)),
        Ok(_) => self.set_error(MP4_LINK_FAILED.to_string()),
        Err(msg) => self.set_error(msg),
      }
    }
    if let Some(result) = take_ready(&mut self.tasks.wakame_row_rx) {
      self.wakame.extracting = None;
      match result.map(FormatModal::best_format) {
        Ok(Some(modal)) => self.modal = Some(modal),
        Ok(None) => self.set_error("Extraction failed: no formats".to_string()),
        Err(msg) => self.set_error(format!("Extraction failed: {}", msg)),
      }
    }
    if let Some(result) = take_ready(&mut self.tasks.health_rx) {
      let online = matches!(result, Ok(true));
      info!(online, server = %self.api.base_url(), "backend health");
      self.server_online = Some(online);
    }
    self.drain_downloads();
  }

  fn finish_auto_download(&mut self, result: Result<Video, String>) {
    self.auto.phase = match result {
      Ok(video) => match video.best_format() {
        Some(best) => {
          info!(title = %video.title, quality = %best.quality_label(), "auto download: best format chosen");
          let info = summary_line(&video, best);
          let filename = self.start_download(&video.title, best);
          Phase::Ready(AutoDownloadView { title: video.title.clone(), info, filename })
        }
        None => Phase::Failed("Failed to fetch video".to_string()),
      },
      Err(msg) => Phase::Failed(msg),
    };
  }

  fn finish_extract(&mut self, result: Result<Video, String>) {
    match result {
      Ok(video) => {
        info!(title = %video.title, formats = video.formats.len(), "extract: done");
        let has_formats = !video.formats.is_empty();
        self.extract.list_state.select(has_formats.then_some(0));
        self.extract.phase = Phase::Ready(video);
        if has_formats && self.page == Page::Extract {
          self.focus = Focus::Results;
        }
      }
      Err(msg) => self.extract.phase = Phase::Failed(msg),
    }
  }

  fn finish_search(&mut self, result: Result<SearchOutcome, String>) {
    match result {
      Ok(outcome) if outcome.results.is_empty() => {
        self.search.phase = Phase::Failed("No results found".to_string());
      }
      Ok(outcome) => {
        info!(results = outcome.results.len(), instance = ?outcome.instance, "search: done");
        if let Some(notice) = outcome.fallback_notice(&self.search.submitted_instance) {
          self.push_toast(ToastKind::Info, notice, constants().fallback_toast_secs);
        }
        self.search.list_state.select(Some(0));
        self.search.phase = Phase::Ready(outcome);
        if self.page == Page::Search {
          self.focus = Focus::Results;
        }
      }
      Err(msg) => self.search.phase = Phase::Failed(msg),
    }
  }

  fn finish_wakame(&mut self, result: Result<Vec<WakameEntry>, String>) {
    match result {
      Ok(results) => {
        info!(results = results.len(), "wakame search: done");
        let has_results = !results.is_empty();
        self.wakame.list_state.select(has_results.then_some(0));
        self.wakame.phase = Phase::Ready(results);
        if has_results && self.page == Page::Wakame {
          self.focus = Focus::Results;
        }
      }
      Err(msg) => self.wakame.phase = Phase::Failed(msg),
    }
  }

  fn drain_downloads(&mut self) {
    while let Ok(event) = self.download_rx.try_recv() {
      match event {
        DownloadEvent::Started { filename } => {
          self.download_status = Some(format!("Downloading {}", filename));
        }
        DownloadEvent::Progress { filename, downloaded, total } => {
          let line = match total {
            Some(t) if t > 0 => format!("Downloading {} {:>3}%", filename, downloaded * 100 / t),
            _ => format!("Downloading {} ({:.1} MB)", filename, downloaded as f64 / 1024.0 / 1024.0),
          };
          self.download_status = Some(line);
        }
        DownloadEvent::Finished { path } => {
          self.download_status = None;
          self.push_toast(
            ToastKind::Success,
            format!("Saved {}", path.display()),
            constants().download_toast_secs,
          );
        }
        DownloadEvent::Failed { filename, error } => {
          self.download_status = None;
          self.set_error(format!("Download of {} failed: {}", filename, error));
        }
      }
    }
  }
}
