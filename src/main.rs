mod api;
mod app;
mod browser;
mod clipboard;
mod config;
mod constants;
mod download;
mod input;
mod logging;
mod models;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use api::ApiClient;
use app::{App, Page};
use config::Config;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Backend base URL (default: prefs.toml, then http://127.0.0.1:5000)
  #[arg(short, long)]
  server: Option<String>,

  /// Directory downloads are saved into (default: prefs.toml, then ~/Downloads)
  #[arg(short, long)]
  download_dir: Option<PathBuf>,

  /// Page shown at startup: 'auto', 'extract', 'search' or 'wakame'
  #[arg(short, long, default_value = "auto")]
  page: Page,

  /// Search instance to preselect, e.g. 'yewtu.be'
  #[arg(short, long)]
  instance: Option<String>,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    return Ok(());
  }

  // No log file means no logging; the TUI owns the terminal.
  let _log_guard = logging::init_logging().ok();

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, args).await;
  ratatui::restore();
  if let Err(e) = &result {
    tracing::error!(err = %format!("{:#}", e), "vlook exited with error");
  }
  result
}

async fn run(terminal: &mut DefaultTerminal, args: Args) -> Result<()> {
  // CLI flags override prefs for this session only.
  let mut config = Config::load();
  if args.server.is_some() {
    config.server_url = args.server;
  }
  if args.download_dir.is_some() {
    config.download_dir = args.download_dir;
  }
  if args.instance.is_some() {
    config.instance = args.instance;
  }

  let server_url = config.server_url();
  let api = ApiClient::new(&server_url).context("Failed to build HTTP client")?;
  info!(server = %server_url, page = args.page.label(), "vlook starting");

  let mut app = App::new(api, config, args.page);
  app.check_health();

  loop {
    app.check_pending();
    app.expire_messages();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("vlook exiting");
  Ok(())
}
