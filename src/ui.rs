use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, Focus, ModalKind, Page, Phase, ToastKind};
use crate::constants::constants;
use crate::models::{
  format_duration, format_file_size, format_minutes_seconds, format_size_mb_suffix, format_view_count, truncate_title,
};
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn rounded_block<'a>(theme: &Theme, title: impl Into<Line<'a>>) -> Block<'a> {
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
}

/// A `width` x `height` rect centered in `area`, clamped to it.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect { x: area.x + (area.width - width) / 2, y: area.y + (area.height - height) / 2, width, height }
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  match app.page {
    Page::AutoDownload => render_auto_download(frame, app, main_area),
    Page::Extract => render_extract(frame, app, main_area),
    Page::Search => render_search(frame, app, main_area),
    Page::Wakame => render_wakame(frame, app, main_area),
  }
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);

  if app.modal.is_some() {
    render_modal(frame, app, main_area);
  }
  render_toasts(frame, app, main_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut spans = vec![Span::styled(" ▶ vlook ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];
  for page in Page::ALL {
    let style = if page == app.page {
      Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.muted)
    };
    spans.push(Span::raw(" "));
    spans.push(Span::styled(format!(" {} ", page.label()), style));
  }
  frame.render_widget(Line::from(spans), area);

  let (dot, dot_color) = match app.server_online {
    Some(true) => ("● online", theme.success),
    Some(false) => ("● offline", theme.error),
    None => ("○ checking", theme.muted),
  };
  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(vec![
    Span::styled(dot, Style::default().fg(dot_color)),
    Span::raw("  "),
    Span::styled(&version, Style::default().fg(theme.muted)),
  ]);
  let right_w = (dot.chars().count() + 2 + version.len()) as u16;
  let right_area = Rect { x: area.x + area.width.saturating_sub(right_w), width: right_w.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

/// Centered message inside a rounded block, for idle/loading/error states.
fn render_message(frame: &mut Frame, theme: &Theme, area: Rect, title: &str, lines: Vec<Line>) {
  let paragraph =
    Paragraph::new(lines).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(rounded_block(theme, title));
  frame.render_widget(paragraph, area);
}

fn failure_lines<'a>(theme: &Theme, msg: &'a str) -> Vec<Line<'a>> {
  vec![
    Line::from(""),
    Line::from(Span::styled("⚠  Error", Style::default().fg(theme.error).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled(msg, Style::default().fg(theme.fg))),
  ]
}

fn loading_lines(theme: &Theme, label: &str) -> Vec<Line<'static>> {
  vec![Line::from(""), Line::from(Span::styled(format!("⏳ {}", label), Style::default().fg(theme.status)))]
}

fn idle_lines(theme: &Theme, headline: &str, hint: &str) -> Vec<Line<'static>> {
  vec![
    Line::from(""),
    Line::from(Span::styled(
      headline.to_string(),
      Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    Line::from(Span::styled(hint.to_string(), Style::default().fg(theme.muted))),
  ]
}

fn label_line<'a>(theme: &Theme, label: &'a str, value: String) -> Line<'a> {
  Line::from(vec![
    Span::styled(label, Style::default().fg(theme.muted)),
    Span::styled(value, Style::default().fg(theme.fg)),
  ])
}

// --- Pages ---

fn render_auto_download(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let title = " Auto download ";
  match &app.auto.phase {
    Phase::Idle => render_message(
      frame,
      theme,
      area,
      title,
      idle_lines(theme, "▶  Paste a video URL", "The best quality is downloaded as soon as it resolves."),
    ),
    Phase::Loading => render_message(frame, theme, area, title, loading_lines(theme, "Processing…")),
    Phase::Failed(msg) => render_message(frame, theme, area, title, failure_lines(theme, msg)),
    Phase::Ready(view) => {
      let lines = vec![
        Line::from(""),
        Line::from(Span::styled(view.title.as_str(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(view.info.as_str(), Style::default().fg(theme.muted))),
        Line::from(""),
        Line::from(Span::styled(
          format!("✓ Download started: {}", view.filename),
          Style::default().fg(theme.success),
        )),
        Line::from(Span::styled(
          format!("Saving to {}", app.download_dir().display()),
          Style::default().fg(theme.muted),
        )),
      ];
      render_message(frame, theme, area, title, lines);
    }
  }
}

fn render_extract(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let video = match &app.extract.phase {
    Phase::Idle => {
      let lines = idle_lines(theme, "▶  Extract a video", "Enter a URL below to list its MP4 formats.");
      return render_message(frame, theme, area, " Extract ", lines);
    }
    Phase::Loading => return render_message(frame, theme, area, " Extract ", loading_lines(theme, "Extracting…")),
    Phase::Failed(msg) => return render_message(frame, theme, area, " Extract ", failure_lines(theme, msg)),
    Phase::Ready(video) => video,
  };

  let [info_area, list_area] = Layout::vertical([Constraint::Length(7), Constraint::Min(3)]).areas(area);
  let inner_w = info_area.width.saturating_sub(4) as usize;

  let info = vec![
    Line::from(Span::styled(
      truncate_str(&video.title, inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
    label_line(theme, "Uploader   ", video.uploader.clone().unwrap_or_else(|| "Unknown".to_string())),
    label_line(theme, "Duration   ", format_duration(video.duration_secs())),
    label_line(theme, "Thumbnail  ", truncate_str(video.thumbnail.as_deref().unwrap_or("-"), inner_w.saturating_sub(11))),
    label_line(theme, "Formats    ", video.formats.len().to_string()),
  ];
  frame.render_widget(
    Paragraph::new(info).block(rounded_block(theme, " Video ").padding(Padding::horizontal(1))),
    info_area,
  );

  let selected = app.extract.list_state.selected();
  let items: Vec<ListItem> = video
    .formats
    .iter()
    .enumerate()
    .map(|(i, f)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      let fg = if Some(i) == selected { theme.highlight_fg } else { theme.fg };
      let mut spans = vec![
        Span::styled(format!("{:<8}", f.quality_label()), Style::default().fg(fg).add_modifier(Modifier::BOLD)),
        Span::styled(format!("{:>10}", format_file_size(f.filesize)), Style::default().fg(fg)),
      ];
      if let Some(fps) = f.fps.filter(|fps| *fps > 0.0) {
        spans.push(Span::styled(format!("  {}fps", fps.round() as u32), Style::default().fg(theme.status)));
      }
      spans.push(Span::styled(format!("  [{}]", f.format_id_label()), Style::default().fg(theme.muted)));
      ListItem::new(Line::from(spans)).bg(bg)
    })
    .collect();

  let list = if items.is_empty() {
    List::new(vec![ListItem::new(Span::styled("No MP4 formats available", Style::default().fg(theme.muted)))])
  } else {
    List::new(items)
  };
  let list = list
    .block(rounded_block(theme, " Formats "))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));
  frame.render_stateful_widget(list, list_area, &mut app.extract.list_state);
}

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let outcome = match &app.search.phase {
    Phase::Idle => {
      let hint = format!("Instance: {}  (^n to change)", app.search.instance());
      return render_message(frame, theme, area, " Search ", idle_lines(theme, "▶  Search videos", &hint));
    }
    Phase::Loading => {
      let label = format!("Searching via {}…", app.search.instance());
      return render_message(frame, theme, area, " Search ", loading_lines(theme, &label));
    }
    Phase::Failed(msg) => return render_message(frame, theme, area, " Search ", failure_lines(theme, msg)),
    Phase::Ready(outcome) => outcome,
  };

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let selected = app.search.list_state.selected();

  let items: Vec<ListItem> = outcome
    .results
    .iter()
    .enumerate()
    .map(|(i, entry)| {
      let is_selected = Some(i) == selected;
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let meta_fg = if is_selected { theme.highlight_fg } else { theme.muted };
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };

      let extracting = app.search.extracting.as_deref() == Some(entry.video_id.as_str());
      let duration = format_duration(entry.length_secs());
      let mut title = truncate_str(&entry.title, inner_w.saturating_sub(duration.len() + 2));
      let gap = inner_w.saturating_sub(title.chars().count() + duration.len());
      title.push_str(&" ".repeat(gap));

      let mut meta = vec![entry.author.clone().unwrap_or_else(|| "Unknown".to_string()), format_view_count(entry.view_count)];
      if let Some(published) = entry.published_text.as_deref().filter(|p| !p.is_empty()) {
        meta.push(published.to_string());
      }
      let meta_line = if extracting {
        Line::from(Span::styled("⏳ Extracting formats…", Style::default().fg(theme.status)))
      } else {
        Line::from(Span::styled(truncate_str(&meta.join(" · "), inner_w), Style::default().fg(meta_fg)))
      };

      ListItem::new(vec![
        Line::from(vec![
          Span::styled(title, Style::default().fg(fg).add_modifier(Modifier::BOLD)),
          Span::styled(duration, Style::default().fg(meta_fg)),
        ]),
        meta_line,
      ])
      .bg(bg)
    })
    .collect();

  let source = outcome.instance.as_deref().unwrap_or(app.search.instance());
  let title = format!(" Results ({}) · {} ", outcome.results.len(), source);
  let list = List::new(items)
    .block(rounded_block(theme, title))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg));
  frame.render_stateful_widget(list, area, &mut app.search.list_state);
}

const CARD_HEIGHT: u16 = 6;
const CARD_MIN_WIDTH: u16 = 34;

fn render_wakame(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let results = match &app.wakame.phase {
    Phase::Idle => {
      let lines = idle_lines(theme, "▶  Wakame search", "Search through the alternate backend.");
      return render_message(frame, theme, area, " Wakame ", lines);
    }
    Phase::Loading => return render_message(frame, theme, area, " Wakame ", loading_lines(theme, "Searching…")),
    Phase::Failed(msg) => return render_message(frame, theme, area, " Wakame ", failure_lines(theme, msg)),
    Phase::Ready(results) => results,
  };

  let outer = rounded_block(theme, format!(" {} results ", results.len()));
  let grid_area = outer.inner(area);
  frame.render_widget(outer, area);

  let columns = (grid_area.width / CARD_MIN_WIDTH).clamp(1, 4) as usize;
  let visible_rows = (grid_area.height / CARD_HEIGHT).max(1) as usize;
  let selected = app.wakame.list_state.selected();
  let selected_row = selected.unwrap_or(0) / columns;
  let first_row = selected_row.saturating_sub(visible_rows - 1);
  let card_w = grid_area.width / columns as u16;
  let max_title = constants().wakame_title_max_chars;

  for (i, entry) in results.iter().enumerate().skip(first_row * columns).take(visible_rows * columns) {
    let row = (i / columns - first_row) as u16;
    let col = (i % columns) as u16;
    let card_area = Rect {
      x: grid_area.x + col * card_w,
      y: grid_area.y + row * CARD_HEIGHT,
      width: card_w,
      height: CARD_HEIGHT.min(grid_area.height.saturating_sub(row * CARD_HEIGHT)),
    };
    let is_selected = Some(i) == selected;
    let border = if is_selected { theme.accent } else { theme.border };
    let inner_w = card_w.saturating_sub(4) as usize;

    let extracting = app.wakame.extracting.as_deref() == Some(entry.url.as_str());
    let mut details = vec![entry.views.as_ref().map(ToString::to_string).unwrap_or_else(|| "Unknown".to_string())];
    if let Some(published) = entry.published_time.as_deref().filter(|p| !p.is_empty()) {
      details.push(published.to_string());
    }
    if let Some(duration) = entry.duration_formatted.as_deref().filter(|d| !d.is_empty()) {
      details.push(duration.to_string());
    }

    let lines = vec![
      Line::from(Span::styled(
        truncate_str(&truncate_title(&entry.title, max_title), inner_w),
        Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
      )),
      Line::from(Span::styled(
        truncate_str(entry.uploader.as_deref().unwrap_or("Unknown"), inner_w),
        Style::default().fg(theme.muted),
      )),
      Line::from(Span::styled(truncate_str(&details.join(" · "), inner_w), Style::default().fg(theme.muted))),
      if extracting {
        Line::from(Span::styled("⏳ Extracting…", Style::default().fg(theme.status)))
      } else {
        Line::from("")
      },
    ];
    let card = Paragraph::new(lines).block(
      Block::bordered()
        .border_type(if is_selected { BorderType::Thick } else { BorderType::Rounded })
        .border_style(Style::default().fg(border))
        .padding(Padding::horizontal(1)),
    );
    frame.render_widget(card, card_area);
  }

  app.wakame.columns = columns;
}

// --- Status, input, footer ---

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if app.is_loading() {
    (format!(" ⏳ {}…", loading_label(app.page)), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(progress) = &app.download_status {
    (format!(" ⬇ {}", progress), Style::default().fg(theme.status))
  } else {
    (format!(" Ready · {}", app.server_url()), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn loading_label(page: Page) -> &'static str {
  match page {
    Page::AutoDownload => "Processing",
    Page::Extract => "Extracting",
    Page::Search | Page::Wakame => "Searching",
  }
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.focus == Focus::Input && app.modal.is_none();
  let border_color = if focused { theme.accent } else { theme.border };
  let title = match app.page {
    Page::AutoDownload | Page::Extract => " Video URL ".to_string(),
    Page::Search => format!(" Search · instance: {} ", app.search.instance()),
    Page::Wakame => " Wakame search ".to_string(),
  };
  let input_block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = (area.width.saturating_sub(4) as usize).max(1);
  let input = app.input_mut();
  let cursor_col = display_width(&input.text, input.cursor);

  if cursor_col < input.scroll {
    input.scroll = cursor_col;
  } else if cursor_col >= input.scroll + inner_w {
    input.scroll = cursor_col.saturating_sub(inner_w) + 1;
  }
  let scroll = input.scroll;

  let visible: String = input
    .text
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= scroll)
    .take_while(|(start, _, _)| *start < scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused {
    let cursor_x = area.x + 2 + (cursor_col - scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn footer_keys(app: &App) -> Vec<(&'static str, &'static str)> {
  if app.modal.is_some() {
    return vec![("j/k", "Navigate"), ("p", "Play"), ("d", "Download"), ("c", "Copy URL"), ("Esc", "Close")];
  }
  let mut k = match (app.focus, app.page) {
    (Focus::Input, page) => {
      let action = match page {
        Page::AutoDownload => "Download",
        Page::Extract => "Extract",
        Page::Search | Page::Wakame => "Search",
      };
      let mut k = vec![("Enter", action), ("Tab", "Page")];
      if page == Page::Search {
        k.push(("^n", "Instance"));
      }
      if app.result_count() > 0 {
        k.push(("↓", "Results"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    (Focus::Results, Page::Extract) => {
      vec![("Enter", "Play"), ("d", "Download"), ("c", "Copy URL"), ("j/k", "Navigate"), ("Esc", "Back")]
    }
    (Focus::Results, Page::Search) => vec![("Enter", "Formats"), ("c", "Copy URL"), ("j/k", "Navigate"), ("Esc", "Back")],
    (Focus::Results, Page::Wakame) => {
      vec![("Enter", "Best format"), ("p", "Open"), ("c", "Copy URL"), ("hjkl", "Navigate"), ("Esc", "Back")]
    }
    (Focus::Results, Page::AutoDownload) => vec![("Esc", "Back")],
  };
  k.push(("^t", "Theme"));
  k
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys = footer_keys(app);

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

// --- Overlays ---

/// Clear `area` and draw a bordered box with `lines`. Shared by the modal and toasts.
fn render_overlay(frame: &mut Frame, theme: &Theme, area: Rect, title: &str, border: Color, lines: Vec<Line>) {
  frame.render_widget(Clear, area);
  let block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border))
    .style(Style::default().bg(theme.bg))
    .padding(Padding::horizontal(1));
  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_modal(frame: &mut Frame, app: &App, area: Rect) {
  let Some(modal) = &app.modal else { return };
  let theme = app.theme();
  let width = (area.width * 7 / 10).max(40);
  let inner_w = width.saturating_sub(4) as usize;

  let mut lines = vec![
    Line::from(Span::styled(
      truncate_str(&modal.video.title, inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
  ];
  if let Some(secs) = modal.video.duration_secs() {
    lines.push(label_line(theme, "Duration: ", format_minutes_seconds(secs)));
  }
  lines.push(Line::from(""));
  for (row, &idx) in modal.choices.iter().enumerate() {
    let Some(format) = modal.video.formats.get(idx) else { continue };
    let text = format!("{}{}", format.quality_label(), format_size_mb_suffix(format.filesize));
    let line = if row == modal.selected {
      Line::from(Span::styled(
        format!("▶ {}", text),
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD),
      ))
    } else {
      Line::from(Span::styled(format!("  {}", text), Style::default().fg(theme.fg)))
    };
    lines.push(line);
  }
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled("p play · d download · c copy URL · Esc close", Style::default().fg(theme.muted))));

  let title = match modal.kind {
    ModalKind::Formats => " Select format ",
    ModalKind::BestFormat => " Best format ",
  };
  let height = lines.len() as u16 + 2;
  render_overlay(frame, theme, centered_rect(area, width, height), title, theme.accent, lines);
}

fn render_toasts(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut y = area.y;
  for toast in &app.toasts {
    let color = match toast.kind {
      ToastKind::Info => theme.status,
      ToastKind::Success => theme.success,
    };
    let width = (toast.message.chars().count() as u16 + 4).min(area.width);
    if y + 3 > area.y + area.height {
      break;
    }
    let rect = Rect { x: area.x + area.width - width, y, width, height: 3 };
    let lines = vec![Line::from(Span::styled(toast.message.as_str(), Style::default().fg(theme.fg)))];
    render_overlay(frame, theme, rect, "", color, lines);
    y += 3;
  }
}
