mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod handler;
mod keys;
mod logging;
mod operation;
mod tui;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::app::App;
use crate::config::{AppConfig, LogConfig, TreeConfig, WatcherConfig};
use crate::event::{Event, EventHandler};
use crate::fs::watcher::FsWatcher;
use crate::tui::{install_panic_hook, Tui};

/// A terminal file-tree navigator with mark-then-act file operations.
#[derive(Parser, Debug)]
#[command(name = "tnav", version, about)]
struct Cli {
    /// Root path to display (defaults to current directory)
    path: Option<PathBuf>,

    /// Disable filesystem watcher (auto-refresh)
    #[arg(long)]
    no_watcher: bool,

    /// Path to a config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "tnav=trace"
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// List directories before files
    #[arg(long)]
    dirs_first: bool,
}

impl Cli {
    /// Flags that were actually given, as a partial config.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            tree: TreeConfig {
                dirs_first: self.dirs_first.then_some(true),
            },
            watcher: WatcherConfig {
                enabled: self.no_watcher.then_some(false),
                ..Default::default()
            },
            log: LogConfig {
                level: self.log_level.clone(),
                file: None,
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), cli.overrides());

    logging::init(config.log_level(), config.log_file().as_deref());

    let requested = cli
        .path
        .clone()
        .or_else(|| config.general.default_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = requested.canonicalize().map_err(|_| {
        error::AppError::InvalidPath(format!("{} does not exist", requested.display()))
    })?;

    let mut app = App::new(&path, config.dirs_first())?;
    info!(root = %path.display(), "starting");

    install_panic_hook();

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    let mut watcher = match events.sender().filter(|_| config.watcher_enabled()) {
        Some(tx) => match FsWatcher::new(
            Duration::from_millis(config.debounce_ms()),
            config.ignore_patterns(),
            tx,
        )
        .and_then(|mut w| w.watch(&path).map(|()| w))
        .map_err(error::AppError::from)
        {
            Ok(w) => Some(w),
            Err(e) => {
                warn!(error = %e, "watcher unavailable");
                app.set_status_message(e.to_string());
                None
            }
        },
        None => None,
    };

    let outcome: error::Result<()> = loop {
        if let Err(e) = tui.terminal_mut().draw(|frame| ui::render(&mut app, frame)) {
            break Err(error::AppError::from(e));
        }

        let event = match events.next().await {
            Ok(event) => event,
            Err(e) => break Err(e),
        };
        match event {
            Event::Key(key) => handler::handle_key_event(&mut app, key, watcher.as_mut()),
            Event::Tick => app.clear_expired_status(),
            Event::Resize => {}
            Event::FsChange(dirs) => app.handle_fs_change(dirs),
            Event::Error(msg) => break Err(error::AppError::Terminal(msg)),
        }

        if app.should_quit {
            break Ok(());
        }
    };

    tui.restore()?;
    match &outcome {
        Ok(()) => info!("exiting"),
        Err(e) => tracing::error!(error = %e, "exiting after failure"),
    }
    outcome
}
