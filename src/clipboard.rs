//! Clipboard writes.
//!
//! The primary path pipes text into the platform clipboard tool (`pbcopy`,
//! `wl-copy`, `xclip`, `xsel`). When none is installed, text is sent to the
//! terminal as an OSC 52 escape, which most modern terminals forward to the
//! system clipboard.

use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

pub trait ClipboardBackend {
  fn name(&self) -> &'static str;
  fn is_available(&self) -> bool;
  fn copy(&self, text: &str) -> Result<()>;
}

/// Use `primary` when it is available, otherwise `fallback`. A failure of the
/// chosen backend is reported, not retried on the other one.
pub fn copy_with_fallback(
  primary: &dyn ClipboardBackend,
  fallback: &dyn ClipboardBackend,
  text: &str,
) -> Result<&'static str> {
  let backend = if primary.is_available() { primary } else { fallback };
  debug!(backend = backend.name(), "clipboard: copying");
  backend.copy(text).with_context(|| format!("Clipboard copy via {} failed", backend.name()))?;
  Ok(backend.name())
}

/// Copy `text` with the best mechanism for this machine. Returns the backend used.
pub fn copy_to_clipboard(text: &str) -> Result<&'static str> {
  let used = copy_with_fallback(&CommandClipboard::detect(), &Osc52Clipboard, text)?;
  info!(backend = used, "clipboard: copied");
  Ok(used)
}

// --- Command backend ---

/// An external clipboard program fed through stdin.
pub struct CommandClipboard {
  program: &'static str,
  args: &'static [&'static str],
}

impl CommandClipboard {
  /// Pick the clipboard tool for the current platform/session.
  pub fn detect() -> Self {
    if cfg!(target_os = "macos") {
      return Self { program: "pbcopy", args: &[] };
    }
    if std::env::var_os("WAYLAND_DISPLAY").is_some() && find_in_path("wl-copy").is_some() {
      return Self { program: "wl-copy", args: &[] };
    }
    if find_in_path("xclip").is_some() {
      return Self { program: "xclip", args: &["-selection", "clipboard"] };
    }
    Self { program: "xsel", args: &["--clipboard", "--input"] }
  }

  fn session_present(&self) -> bool {
    match self.program {
      "pbcopy" => true,
      "wl-copy" => std::env::var_os("WAYLAND_DISPLAY").is_some(),
      _ => std::env::var_os("DISPLAY").is_some(),
    }
  }
}

impl ClipboardBackend for CommandClipboard {
  fn name(&self) -> &'static str {
    self.program
  }

  fn is_available(&self) -> bool {
    self.session_present() && find_in_path(self.program).is_some()
  }

  fn copy(&self, text: &str) -> Result<()> {
    let mut child = Command::new(self.program)
      .args(self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()
      .with_context(|| format!("Failed to spawn {}", self.program))?;
    {
      let stdin = child.stdin.as_mut().context("Failed to open clipboard stdin")?;
      stdin.write_all(text.as_bytes()).context("Failed to write to clipboard")?;
    }
    // Close stdin so the tool sees EOF.
    drop(child.stdin.take());
    let status = child.wait().context("Clipboard tool did not exit")?;
    if !status.success() {
      return Err(anyhow!("{} exited with {}", self.program, status));
    }
    Ok(())
  }
}

fn find_in_path(program: &str) -> Option<PathBuf> {
  let path = std::env::var_os("PATH")?;
  std::env::split_paths(&path).map(|dir| dir.join(program)).find(|p| p.is_file())
}

// --- OSC 52 backend ---

/// Terminal escape sequence that asks the terminal to set the clipboard.
pub fn osc52_sequence(text: &str) -> String {
  format!("\x1b]52;c;{}\x07", BASE64.encode(text.as_bytes()))
}

pub struct Osc52Clipboard;

impl ClipboardBackend for Osc52Clipboard {
  fn name(&self) -> &'static str {
    "osc52"
  }

  fn is_available(&self) -> bool {
    true
  }

  fn copy(&self, text: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(osc52_sequence(text).as_bytes()).context("Failed to write OSC 52 sequence")?;
    out.flush().context("Failed to flush terminal")?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;

  struct Fake {
    name: &'static str,
    available: bool,
    fail: bool,
    copied: RefCell<Vec<String>>,
  }

  impl Fake {
    fn new(name: &'static str, available: bool, fail: bool) -> Self {
      Self { name, available, fail, copied: RefCell::new(Vec::new()) }
    }
  }

  impl ClipboardBackend for Fake {
    fn name(&self) -> &'static str {
      self.name
    }
    fn is_available(&self) -> bool {
      self.available
    }
    fn copy(&self, text: &str) -> Result<()> {
      if self.fail {
        return Err(anyhow!("boom"));
      }
      self.copied.borrow_mut().push(text.to_string());
      Ok(())
    }
  }

  #[test]
  fn uses_primary_when_available() {
    let primary = Fake::new("primary", true, false);
    let fallback = Fake::new("fallback", true, false);
    assert_eq!(copy_with_fallback(&primary, &fallback, "url").unwrap(), "primary");
    assert_eq!(*primary.copied.borrow(), vec!["url".to_string()]);
    assert!(fallback.copied.borrow().is_empty());
  }

  #[test]
  fn falls_back_when_primary_unavailable() {
    let primary = Fake::new("primary", false, false);
    let fallback = Fake::new("fallback", true, false);
    assert_eq!(copy_with_fallback(&primary, &fallback, "url").unwrap(), "fallback");
    assert!(primary.copied.borrow().is_empty());
    assert_eq!(*fallback.copied.borrow(), vec!["url".to_string()]);
  }

  #[test]
  fn primary_failure_is_reported_not_retried() {
    let primary = Fake::new("primary", true, true);
    let fallback = Fake::new("fallback", true, false);
    let err = copy_with_fallback(&primary, &fallback, "url").unwrap_err();
    assert!(format!("{:#}", err).contains("primary"));
    assert!(fallback.copied.borrow().is_empty());
  }

  #[test]
  fn osc52_encodes_base64() {
    assert_eq!(osc52_sequence("hi"), "\x1b]52;c;aGk=\x07");
  }
}
