use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::constants::constants;

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Extraction ---

/// One quality variant of a video with its own direct media URL.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Format {
  pub format_id: Option<String>,
  pub quality: Option<String>,
  pub height: Option<u32>,
  pub fps: Option<f64>,
  pub filesize: Option<u64>,
  #[serde(deserialize_with = "null_as_default")]
  pub url: String,
}

impl Format {
  /// Quality label, falling back to `{height}p` and then "Unknown".
  pub fn quality_label(&self) -> String {
    match (&self.quality, self.height) {
      (Some(q), _) if !q.is_empty() => q.clone(),
      (_, Some(h)) if h > 0 => format!("{}p", h),
      _ => "Unknown".to_string(),
    }
  }

  pub fn format_id_label(&self) -> &str {
    self.format_id.as_deref().filter(|s| !s.is_empty()).unwrap_or("MP4")
  }
}

/// Metadata for a resolved video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Video {
  pub title: String,
  pub uploader: Option<String>,
  /// Seconds. The backend may send a float.
  pub duration: Option<f64>,
  pub thumbnail: Option<String>,
  pub formats: Vec<Format>,
}

/// The `video` object of an `/extract` reply. `formats` stays optional so a
/// missing or null list can be told apart from an explicit `[]`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VideoPayload {
  #[serde(deserialize_with = "null_as_default")]
  pub title: String,
  pub uploader: Option<String>,
  pub duration: Option<f64>,
  pub thumbnail: Option<String>,
  pub formats: Option<Vec<Format>>,
}

impl VideoPayload {
  /// `None` when the reply carried no format list.
  pub fn into_video(self) -> Option<Video> {
    let formats = self.formats?;
    Some(Video { title: self.title, uploader: self.uploader, duration: self.duration, thumbnail: self.thumbnail, formats })
  }
}

impl Video {
  pub fn duration_secs(&self) -> Option<u64> {
    self.duration.filter(|d| d.is_finite() && *d > 0.0).map(|d| d as u64)
  }

  /// Highest format, see [`best_format_index`].
  pub fn best_format(&self) -> Option<&Format> {
    best_format_index(&self.formats).and_then(|i| self.formats.get(i))
  }
}

/// Pick the format with the greatest height. Missing heights count as 0 and the
/// earliest format wins a tie.
pub fn best_format_index(formats: &[Format]) -> Option<usize> {
  formats.iter().enumerate().fold(None, |best: Option<(usize, u32)>, (i, f)| {
    let h = f.height.unwrap_or(0);
    match best {
      Some((_, best_h)) if h <= best_h => best,
      _ => Some((i, h)),
    }
  })
  .map(|(i, _)| i)
}

// --- Search ---

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thumbnail {
  pub url: Option<String>,
}

/// A result from `/search-videos`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchEntry {
  #[serde(deserialize_with = "null_as_default")]
  pub video_id: String,
  #[serde(deserialize_with = "null_as_default")]
  pub title: String,
  pub author: Option<String>,
  pub length_seconds: Option<f64>,
  pub view_count: Option<u64>,
  pub published_text: Option<String>,
  pub description: Option<String>,
  #[serde(deserialize_with = "null_as_default")]
  pub video_thumbnails: Vec<Thumbnail>,
}

impl SearchEntry {
  pub fn watch_url(&self) -> String {
    watch_url(&self.video_id)
  }

  pub fn length_secs(&self) -> Option<u64> {
    self.length_seconds.filter(|d| d.is_finite() && *d > 0.0).map(|d| d as u64)
  }
}

/// View counts arrive either as a number or as preformatted text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Views {
  Count(u64),
  Text(String),
}

impl fmt::Display for Views {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Views::Count(n) => write!(f, "{}", format_view_count(Some(*n))),
      Views::Text(s) => f.write_str(s),
    }
  }
}

/// A result from `/wakame-search`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WakameEntry {
  #[serde(deserialize_with = "null_as_default")]
  pub title: String,
  #[serde(deserialize_with = "null_as_default")]
  pub url: String,
  pub thumbnail: Option<String>,
  pub uploader: Option<String>,
  pub views: Option<Views>,
  pub published_time: Option<String>,
  pub duration_formatted: Option<String>,
}

/// Outcome of a keyword search, including which backend answered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
  pub results: Vec<SearchEntry>,
  pub used_fallback: bool,
  pub method: Option<String>,
  pub instance: Option<String>,
}

impl SearchOutcome {
  /// Notice to show when the backend answered from somewhere other than the
  /// selected instance. `selected` is the instance the user asked for.
  pub fn fallback_notice(&self, selected: &str) -> Option<String> {
    if !self.used_fallback {
      return None;
    }
    let used = self.instance.as_deref().unwrap_or("unknown");
    let mut msg = if self.method.as_deref() == Some("yt-dlp") {
      "Used yt-dlp direct search".to_string()
    } else {
      format!("Used {} server", used)
    };
    if !selected.is_empty() && selected != "auto" && self.instance.as_deref() != Some(selected) {
      msg.push_str(&format!(" ({} unavailable)", selected));
    }
    Some(msg)
  }
}

// --- Formatting ---

/// Canonical watch page for a video id.
pub fn watch_url(video_id: &str) -> String {
  format!("{}{}", constants().watch_url_prefix, video_id)
}

/// `h:mm:ss` for an hour or more, otherwise `m:ss`. Missing or zero is "Unknown".
pub fn format_duration(seconds: Option<u64>) -> String {
  let Some(s) = seconds.filter(|s| *s > 0) else { return "Unknown".to_string() };
  let hours = s / 3600;
  let minutes = (s % 3600) / 60;
  let secs = s % 60;
  if hours > 0 { format!("{}:{:02}:{:02}", hours, minutes, secs) } else { format!("{}:{:02}", minutes, secs) }
}

/// `m:ss` with unbounded minutes, as used in compact summaries.
pub fn format_minutes_seconds(seconds: u64) -> String {
  format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// 1024-based human size with one decimal.
pub fn format_file_size(bytes: Option<u64>) -> String {
  let Some(b) = bytes.filter(|b| *b > 0) else { return "Unknown size".to_string() };
  const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
  let mut value = b as f64;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", value, UNITS[unit])
}

/// Size in MB with one decimal, e.g. ` (12.3MB)`. Empty when unknown.
pub fn format_size_mb_suffix(bytes: Option<u64>) -> String {
  match bytes.filter(|b| *b > 0) {
    Some(b) => format!(" ({:.1}MB)", b as f64 / 1024.0 / 1024.0),
    None => String::new(),
  }
}

pub fn format_view_count(views: Option<u64>) -> String {
  match views {
    None | Some(0) => "Unknown".to_string(),
    Some(v) if v >= 1_000_000 => format!("{:.1}M views", v as f64 / 1_000_000.0),
    Some(v) if v >= 1_000 => format!("{:.1}K views", v as f64 / 1_000.0),
    Some(v) => format!("{} views", v),
  }
}

/// `Uploader: X • Duration: m:ss • Quality: Q`, skipping missing parts.
pub fn summary_line(video: &Video, format: &Format) -> String {
  let mut parts = Vec::new();
  if let Some(uploader) = video.uploader.as_deref().filter(|u| !u.is_empty()) {
    parts.push(format!("Uploader: {}", uploader));
  }
  if let Some(secs) = video.duration_secs() {
    parts.push(format!("Duration: {}", format_minutes_seconds(secs)));
  }
  parts.push(format!("Quality: {}", format.quality_label()));
  parts.join(" • ")
}

/// Cut to `max` chars and append "..." when longer.
pub fn truncate_title(title: &str, max: usize) -> String {
  if title.chars().count() > max {
    let head: String = title.chars().take(max).collect();
    format!("{}...", head)
  } else {
    title.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fmt_h(height: Option<u32>, id: &str) -> Format {
    Format { format_id: Some(id.to_string()), height, url: format!("https://cdn/{}", id), ..Format::default() }
  }

  // --- best_format_index ---

  #[test]
  fn best_format_picks_max_height() {
    let formats = vec![fmt_h(Some(360), "a"), fmt_h(Some(1080), "b"), fmt_h(Some(720), "c")];
    assert_eq!(best_format_index(&formats), Some(1));
  }

  #[test]
  fn best_format_tie_keeps_first() {
    let formats = vec![fmt_h(Some(720), "a"), fmt_h(Some(720), "b")];
    assert_eq!(best_format_index(&formats), Some(0));
  }

  #[test]
  fn best_format_missing_height_counts_as_zero() {
    let formats = vec![fmt_h(None, "a"), fmt_h(Some(144), "b"), fmt_h(None, "c")];
    assert_eq!(best_format_index(&formats), Some(1));
    let unknown = vec![fmt_h(None, "a"), fmt_h(None, "b")];
    assert_eq!(best_format_index(&unknown), Some(0));
  }

  #[test]
  fn best_format_empty() {
    assert_eq!(best_format_index(&[]), None);
  }

  // --- formatting ---

  #[test]
  fn duration_formats() {
    assert_eq!(format_duration(None), "Unknown");
    assert_eq!(format_duration(Some(0)), "Unknown");
    assert_eq!(format_duration(Some(65)), "1:05");
    assert_eq!(format_duration(Some(3725)), "1:02:05");
    assert_eq!(format_minutes_seconds(3725), "62:05");
  }

  #[test]
  fn file_size_formats() {
    assert_eq!(format_file_size(None), "Unknown size");
    assert_eq!(format_file_size(Some(512)), "512.0 B");
    assert_eq!(format_file_size(Some(1536)), "1.5 KB");
    assert_eq!(format_file_size(Some(5 * 1024 * 1024)), "5.0 MB");
    assert_eq!(format_size_mb_suffix(Some(3 * 1024 * 1024)), " (3.0MB)");
    assert_eq!(format_size_mb_suffix(None), "");
  }

  #[test]
  fn view_count_formats() {
    assert_eq!(format_view_count(None), "Unknown");
    assert_eq!(format_view_count(Some(999)), "999 views");
    assert_eq!(format_view_count(Some(1_500)), "1.5K views");
    assert_eq!(format_view_count(Some(2_340_000)), "2.3M views");
  }

  #[test]
  fn quality_label_fallbacks() {
    let f = Format { quality: Some("720p".into()), ..Format::default() };
    assert_eq!(f.quality_label(), "720p");
    let f = Format { height: Some(480), ..Format::default() };
    assert_eq!(f.quality_label(), "480p");
    assert_eq!(Format::default().quality_label(), "Unknown");
  }

  #[test]
  fn summary_skips_missing_parts() {
    let video = Video { title: "T".into(), uploader: Some("Chan".into()), duration: Some(125.0), ..Video::default() };
    let format = Format { quality: Some("1080p".into()), ..Format::default() };
    assert_eq!(summary_line(&video, &format), "Uploader: Chan • Duration: 2:05 • Quality: 1080p");
    let bare = Video { title: "T".into(), ..Video::default() };
    assert_eq!(summary_line(&bare, &format), "Quality: 1080p");
  }

  #[test]
  fn truncate_title_appends_ellipsis() {
    assert_eq!(truncate_title("short", 10), "short");
    assert_eq!(truncate_title("abcdefghij", 4), "abcd...");
  }

  // --- fallback notice ---

  #[test]
  fn fallback_notice_ytdlp() {
    let outcome = SearchOutcome {
      used_fallback: true,
      method: Some("yt-dlp".into()),
      instance: Some("yt-dlp-direct".into()),
      ..SearchOutcome::default()
    };
    assert_eq!(
      outcome.fallback_notice("yewtu.be").as_deref(),
      Some("Used yt-dlp direct search (yewtu.be unavailable)")
    );
  }

  #[test]
  fn fallback_notice_other_instance() {
    let outcome = SearchOutcome {
      used_fallback: true,
      method: Some("invidious".into()),
      instance: Some("invidious.fdn.fr".into()),
      ..SearchOutcome::default()
    };
    assert_eq!(outcome.fallback_notice("auto").as_deref(), Some("Used invidious.fdn.fr server"));
  }

  #[test]
  fn no_notice_without_fallback() {
    let outcome = SearchOutcome { used_fallback: false, ..SearchOutcome::default() };
    assert_eq!(outcome.fallback_notice("yewtu.be"), None);
  }

  // --- wire shapes ---

  #[test]
  fn search_entry_reads_camel_case() {
    let json = r#"{"videoId":"abc","title":"T","author":"A","lengthSeconds":61,"viewCount":12,
      "publishedText":"2 days ago","videoThumbnails":[{"url":"https://i/1.jpg"}]}"#;
    let entry: SearchEntry = serde_json::from_str(json).unwrap();
    assert_eq!(entry.video_id, "abc");
    assert_eq!(entry.length_secs(), Some(61));
    assert_eq!(entry.video_thumbnails.first().and_then(|t| t.url.as_deref()), Some("https://i/1.jpg"));
    assert!(entry.watch_url().ends_with("watch?v=abc"));
  }

  #[test]
  fn wakame_views_number_or_text() {
    let a: WakameEntry = serde_json::from_str(r#"{"title":"t","url":"u","views":2500}"#).unwrap();
    assert_eq!(a.views.map(|v| v.to_string()).as_deref(), Some("2.5K views"));
    let b: WakameEntry = serde_json::from_str(r#"{"title":"t","url":"u","views":"1万回"}"#).unwrap();
    assert_eq!(b.views.map(|v| v.to_string()).as_deref(), Some("1万回"));
  }

  #[test]
  fn video_tolerates_null_fields() {
    let json = r#"{"title":"T","uploader":null,"duration":212.0,"thumbnail":null,
      "formats":[{"format_id":"18","quality":"360p","height":360,"fps":null,"filesize":null,"url":"https://cdn/18"}]}"#;
    let payload: VideoPayload = serde_json::from_str(json).unwrap();
    let video = payload.into_video().unwrap();
    assert_eq!(video.duration_secs(), Some(212));
    assert_eq!(video.best_format().map(|f| f.url.as_str()), Some("https://cdn/18"));
  }

  #[test]
  fn video_payload_requires_format_list() {
    let missing: VideoPayload = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
    assert!(missing.into_video().is_none());
    let null: VideoPayload = serde_json::from_str(r#"{"title":"t","formats":null}"#).unwrap();
    assert!(null.into_video().is_none());
    let empty: VideoPayload = serde_json::from_str(r#"{"title":"t","formats":[]}"#).unwrap();
    assert_eq!(empty.into_video().map(|v| v.formats.len()), Some(0));
  }
}
