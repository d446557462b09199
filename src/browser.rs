use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use tracing::info;

/// Open `url` in the default browser without blocking the UI.
pub fn open_url(url: &str) -> Result<()> {
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";

  let mut child = Command::new(cmd)
    .arg(url)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .with_context(|| format!("Failed to open browser with {}", cmd))?;

  info!(url = %url, "browser: opened");
  // Reap the child in a background thread to avoid zombie processes.
  std::thread::spawn(move || {
    let _ = child.wait();
  });
  Ok(())
}
