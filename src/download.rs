use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

// --- Filenames ---

/// Build the download filename for a video title and quality label.
///
/// The title keeps only ASCII letters, digits, `_`, `-` and whitespace, with each
/// whitespace run turned into a single `_`. The quality keeps only ASCII letters,
/// digits and `_`. Result: `{title}_{quality}.mp4`.
pub fn download_filename(title: &str, quality: &str) -> String {
  let mut clean_title = String::with_capacity(title.len());
  let mut in_space = false;
  for c in title.chars() {
    if c.is_whitespace() {
      if !in_space {
        clean_title.push('_');
      }
      in_space = true;
    } else if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
      clean_title.push(c);
      in_space = false;
    }
  }
  let clean_quality: String = quality.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect();
  format!("{}_{}.mp4", clean_title, clean_quality)
}

fn part_path(path: &Path) -> PathBuf {
  let mut part_name = path.as_os_str().to_owned();
  part_name.push(".part");
  PathBuf::from(part_name)
}

/// Claim the first free path for `filename` in `dir`: `name.mp4`, then `name (1).mp4`,
/// `name (2).mp4`, ...
///
/// A name is taken once its final file or its `.part` file exists. The `.part` file is
/// created with `create_new`, so two downloads racing for one name never share it.
pub async fn reserve_path(dir: &Path, filename: &str) -> Result<PathBuf> {
  tokio::fs::create_dir_all(dir).await.context("Failed to create download directory")?;
  let (stem, ext) = match filename.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
    _ => (filename, None),
  };
  for n in 0u32..1000 {
    let candidate = match (n, ext) {
      (0, _) => dir.join(filename),
      (_, Some(ext)) => dir.join(format!("{} ({}).{}", stem, n, ext)),
      (_, None) => dir.join(format!("{} ({})", stem, n)),
    };
    if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
      continue;
    }
    match tokio::fs::OpenOptions::new().write(true).create_new(true).open(part_path(&candidate)).await {
      Ok(_) => return Ok(candidate),
      Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
      Err(e) => return Err(anyhow!(e).context("Failed to create download file")),
    }
  }
  Err(anyhow!("No free file name for {} in {}", filename, dir.display()))
}

// --- Downloads ---

/// Progress of a background download, sent to the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
  Started { filename: String },
  Progress { filename: String, downloaded: u64, total: Option<u64> },
  Finished { path: PathBuf },
  Failed { filename: String, error: String },
}

/// Stream `url` into `path`. Writes to `<path>.part` first, then renames.
/// The `.part` file is removed whenever the download fails.
pub async fn download_to(
  client: &Client,
  url: &str,
  path: &Path,
  tx: &mpsc::UnboundedSender<DownloadEvent>,
) -> Result<()> {
  let tmp_path = part_path(path);
  let result = fetch_into(client, url, path, &tmp_path, tx).await;
  if result.is_err() {
    let _ = tokio::fs::remove_file(&tmp_path).await;
  }
  result
}

async fn fetch_into(
  client: &Client,
  url: &str,
  path: &Path,
  tmp_path: &Path,
  tx: &mpsc::UnboundedSender<DownloadEvent>,
) -> Result<()> {
  let filename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

  let response = client.get(url).send().await.context("Failed to start download")?;
  let status = response.status();
  if !status.is_success() {
    return Err(anyhow!("Download failed: HTTP {}", status.as_u16()));
  }
  let total = response.content_length();

  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await.context("Failed to create download directory")?;
  }
  let mut file = tokio::fs::File::create(tmp_path).await.context("Failed to create download file")?;

  let mut stream = response.bytes_stream();
  let mut downloaded: u64 = 0;
  // Throttle progress events: at most every 100ms
  let mut last_progress = Instant::now();

  while let Some(chunk) = stream.next().await {
    let chunk = chunk.context("Error while downloading")?;
    file.write_all(&chunk).await.context("Error writing download file")?;
    downloaded += chunk.len() as u64;
    if last_progress.elapsed() >= Duration::from_millis(100) {
      let _ = tx.send(DownloadEvent::Progress { filename: filename.clone(), downloaded, total });
      last_progress = Instant::now();
    }
  }

  file.flush().await.context("Error flushing download file")?;
  drop(file);

  tokio::fs::rename(tmp_path, path).await.context("Failed to finalize download file")?;
  Ok(())
}

/// Spawn a download of `url` into `dir` under the sanitized name for `title`/`quality`.
pub fn spawn_download(
  client: Client,
  url: String,
  dir: PathBuf,
  title: &str,
  quality: &str,
  tx: mpsc::UnboundedSender<DownloadEvent>,
) -> (String, JoinHandle<()>) {
  let filename = download_filename(title, quality);
  let name = filename.clone();
  let handle = tokio::spawn(async move {
    let path = match reserve_path(&dir, &name).await {
      Ok(path) => path,
      Err(e) => {
        error!(err = %format!("{:#}", e), dir = %dir.display(), "download: no target file");
        let _ = tx.send(DownloadEvent::Failed { filename: name, error: format!("{:#}", e) });
        return;
      }
    };
    let shown = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| name.clone());
    info!(url = %url, path = %path.display(), "download: starting");
    let _ = tx.send(DownloadEvent::Started { filename: shown.clone() });
    match download_to(&client, &url, &path, &tx).await {
      Ok(()) => {
        info!(path = %path.display(), "download: finished");
        let _ = tx.send(DownloadEvent::Finished { path });
      }
      Err(e) => {
        error!(err = %format!("{:#}", e), path = %path.display(), "download: failed");
        let _ = tx.send(DownloadEvent::Failed { filename: shown, error: format!("{:#}", e) });
      }
    }
  });
  (filename, handle)
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  // --- download_filename ---

  #[test]
  fn filename_strips_title_punctuation() {
    assert_eq!(download_filename("Hello, World! (Live)", "720p"), "Hello_World_Live_720p.mp4");
  }

  #[test]
  fn filename_collapses_whitespace_runs() {
    assert_eq!(download_filename("a  b\t\tc", "1080p"), "a_b_c_1080p.mp4");
  }

  #[test]
  fn filename_keeps_dash_and_underscore() {
    assert_eq!(download_filename("my-clip_v2", "480p"), "my-clip_v2_480p.mp4");
  }

  #[test]
  fn filename_drops_non_ascii() {
    assert_eq!(download_filename("日本語 Title", "360p"), "_Title_360p.mp4");
  }

  #[test]
  fn filename_cleans_quality() {
    assert_eq!(download_filename("t", "720p (webm)"), "t_720pwebm.mp4");
    assert_eq!(download_filename("t", "hd_60"), "t_hd_60.mp4");
  }

  // --- reserve_path ---

  #[tokio::test]
  async fn reserve_path_numbers_collisions() {
    let dir = tempfile::tempdir().unwrap();
    let first = reserve_path(dir.path(), "clip_720p.mp4").await.unwrap();
    assert_eq!(first, dir.path().join("clip_720p.mp4"));
    assert!(dir.path().join("clip_720p.mp4.part").exists());

    // A pending .part holds the name just like a finished file.
    let second = reserve_path(dir.path(), "clip_720p.mp4").await.unwrap();
    assert_eq!(second, dir.path().join("clip_720p (1).mp4"));

    std::fs::write(dir.path().join("clip_720p (2).mp4"), b"x").unwrap();
    let third = reserve_path(dir.path(), "clip_720p.mp4").await.unwrap();
    assert_eq!(third, dir.path().join("clip_720p (3).mp4"));
  }

  #[tokio::test]
  async fn reserve_path_creates_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a/b");
    let path = reserve_path(&nested, "noext").await.unwrap();
    assert_eq!(path, nested.join("noext"));
    assert_eq!(reserve_path(&nested, "noext").await.unwrap(), nested.join("noext (1)"));
  }

  // --- download_to ---

  #[tokio::test]
  async fn download_writes_body_and_removes_part_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/media/18.mp4"))
      .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-mp4-bytes".to_vec()))
      .expect(1)
      .mount(&server)
      .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("clip_360p.mp4");
    let (tx, _rx) = mpsc::unbounded_channel();
    let url = format!("{}/media/18.mp4", server.uri());

    download_to(&Client::new(), &url, &target, &tx).await.unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"fake-mp4-bytes");
    assert!(!dir.path().join("clip_360p.mp4.part").exists());
  }

  #[tokio::test]
  async fn download_http_error_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(403)).mount(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("clip.mp4");
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = download_to(&Client::new(), &format!("{}/x", server.uri()), &target, &tx).await.unwrap_err();
    assert!(err.to_string().contains("403"));
    assert!(!target.exists());
  }

  #[tokio::test]
  async fn failed_rename_removes_part_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec())).mount(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("clip.mp4");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep"), b"x").unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = download_to(&Client::new(), &format!("{}/x", server.uri()), &target, &tx).await.unwrap_err();
    assert!(err.to_string().contains("finalize"));
    assert!(!dir.path().join("clip.mp4.part").exists());
    assert!(target.is_dir());
  }

  #[tokio::test]
  async fn concurrent_downloads_of_one_name_keep_both_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(
        ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()).set_delay(Duration::from_millis(100)),
      )
      .expect(2)
      .mount(&server)
      .await;

    let dir = tempfile::tempdir().unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let url = format!("{}/v", server.uri());
    let (_, first) = spawn_download(Client::new(), url.clone(), dir.path().to_path_buf(), "Clip", "720p", tx.clone());
    let (_, second) = spawn_download(Client::new(), url, dir.path().to_path_buf(), "Clip", "720p", tx);
    first.await.unwrap();
    second.await.unwrap();

    let mut names: Vec<String> =
      std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect();
    names.sort();
    assert_eq!(names, vec!["Clip_720p (1).mp4".to_string(), "Clip_720p.mp4".to_string()]);
  }

  #[tokio::test]
  async fn spawned_download_reports_finish() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec())).mount(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (name, handle) =
      spawn_download(Client::new(), format!("{}/v", server.uri()), dir.path().to_path_buf(), "My Clip", "720p", tx);
    handle.await.unwrap();

    assert_eq!(name, "My_Clip_720p.mp4");
    assert_eq!(rx.recv().await, Some(DownloadEvent::Started { filename: "My_Clip_720p.mp4".to_string() }));
    let mut last = None;
    while let Ok(ev) = rx.try_recv() {
      last = Some(ev);
    }
    assert_eq!(last, Some(DownloadEvent::Finished { path: dir.path().join("My_Clip_720p.mp4") }));
  }
}
