use anyhow::{Context, Result};
use clap::Parser;
use newsticker::config::Config;
use newsticker::display::{DisplayGuard, DisplaySink, LogSink, PanelGeometry, TerminalSink};
use newsticker::engine::{Engine, EngineSettings};
use newsticker::feed::HttpFetcher;
use newsticker::input::{self, run_keyboard};
use newsticker::keybindings::KeyMap;
use newsticker::shutdown::ShutdownCoordinator;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Button presses buffered between the keyboard and the engine.
const INPUT_QUEUE: usize = 16;

#[derive(Parser, Debug)]
#[command(
    name = "newsticker",
    about = "Scrolls RSS/Atom headlines across a small monochrome panel"
)]
struct Args {
    /// Config file (default: ~/.config/newsticker/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run without a terminal preview; frames are logged instead
    #[arg(long)]
    headless: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Get the default config file path (~/.config/newsticker/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("newsticker")
        .join("config.toml"))
}

/// Sets up tracing. The terminal preview owns the screen, so without a log
/// file its logs are discarded rather than written over the panel.
fn init_tracing(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsticker=info"));

    match &args.log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if args.headless => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .init();
        }
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{}'", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;
    config.validate().context("Invalid configuration")?;

    let mut keymap = KeyMap::new();
    for warning in keymap.apply_overrides(&config.keybindings) {
        tracing::warn!(%warning, "Keybinding override ignored");
    }

    let settings = EngineSettings {
        refresh_interval: config.refresh_interval(),
        tick: config.tick(),
        scroll: config.scroll_config(),
        auto_advance: config.auto_advance(),
        active_hours: config.active_hours()?,
    };
    let fetcher = HttpFetcher::new(config.fetch_timeout(), config.max_articles_per_feed)
        .context("Failed to build HTTP client")?;
    let engine = Engine::new(config.sources(), Arc::new(fetcher), settings)?;

    let geometry = PanelGeometry {
        width_px: config.display.width_px,
        glyph_width_px: config.display.glyph_width_px,
    };
    let sink: Box<dyn DisplaySink> = if args.headless {
        Box::new(LogSink::new(geometry))
    } else {
        Box::new(TerminalSink::acquire(geometry).context("Failed to set up terminal")?)
    };
    let guard = DisplayGuard::acquire(sink);
    let display = guard.handle();
    let mut coordinator = ShutdownCoordinator::new(guard, config.shutdown_grace());

    let (input_tx, input_rx) = input::channel(INPUT_QUEUE, config.debounce());
    if !args.headless {
        let trigger = coordinator.trigger();
        let signal = coordinator.signal();
        coordinator.spawn("keyboard", run_keyboard(keymap, input_tx, trigger, signal));
    }

    engine.start(&mut coordinator, input_rx, display);

    let waited = coordinator.wait_for_termination().await;
    let report = coordinator.shutdown().await;
    waited.context("Failed to install signal handlers")?;

    if !report.aborted.is_empty() {
        tracing::warn!(tasks = ?report.aborted, "Some tasks had to be aborted");
    }
    Ok(())
}
