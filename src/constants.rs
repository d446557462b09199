//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Backend
  pub default_server_url: String,
  pub user_agent: String,
  pub watch_url_prefix: String,

  /// Search instance choices, first entry is the default.
  pub instances: Vec<String>,

  // Notices
  pub copy_toast_secs: u64,
  pub download_toast_secs: u64,
  pub fallback_toast_secs: u64,
  pub error_dismiss_secs: u64,

  // Wakame grid
  pub wakame_title_max_chars: usize,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed every test fails immediately.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
