use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::constants;

/// User preferences persisted in `prefs.toml`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub server_url: Option<String>,
  pub download_dir: Option<PathBuf>,
  pub instance: Option<String>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "vlook") {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file)
        && let Ok(config) = toml::from_str(&content)
      {
        return config;
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "vlook") {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }

  pub fn server_url(&self) -> String {
    self.server_url.clone().unwrap_or_else(|| constants().default_server_url.clone())
  }

  /// Configured download dir, else the user's Downloads folder, else the working dir.
  pub fn download_dir(&self) -> PathBuf {
    self
      .download_dir
      .clone()
      .or_else(|| UserDirs::new().and_then(|d| d.download_dir().map(|p| p.to_path_buf())))
      .unwrap_or_else(|| PathBuf::from("."))
  }
}
