//! d3term console host
//!
//! Runs the session controller inside the current terminal, with the
//! loopback backend standing in for the desktop session host.
//!
//! ```text
//! d3term                      # Loopback session with the user config
//! d3term --config d3.toml     # Use another config file
//! d3term --preview            # No backend: diagnostic view only
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event};
use serde_json::Value;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use d3term::config::{normalize, read_raw_config, resolve_config_path};
use d3term::core::{Backend, DetachedBackend, SessionController};
use d3term::loopback::LoopbackBackend;
use d3term::runtime::{EventLoop, LoopEvent, LoopSender};
use d3term::ui::{ConsoleHost, ConsoleSurface, KeyAction, KeyMapper, ObserverSet};
use d3term::watcher::ConfigWatcher;

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often the input thread checks whether the loop is still alive
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Command line options
#[derive(Debug, Default)]
struct Options {
    /// Run without a backend
    preview: bool,
    /// Config file override
    config_path: Option<PathBuf>,
}

fn print_version() {
    eprintln!("d3term {}", VERSION);
}

fn print_help() {
    eprintln!("d3term {} - terminal session controller", VERSION);
    eprintln!();
    eprintln!("Usage: d3term [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>       Config file (default: $XDG_CONFIG_HOME/d3term/config.toml)");
    eprintln!("  --preview             Run without a backend session");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Ctrl+Shift+V          Paste from the clipboard");
    eprintln!("  Ctrl+D                End the loopback session");
    eprintln!("  Ctrl+Q                Quit");
    eprintln!();
    eprintln!("Logs are written to ~/.d3term/d3term.log (level via RUST_LOG).");
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "--preview" => {
                options.preview = true;
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing config path".to_string());
                }
                options.config_path = Some(PathBuf::from(&args[i]));
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Log to `~/.d3term/d3term.log`; RUST_LOG overrides the INFO default
fn init_logging() {
    let log_path = env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(".d3term").join("d3term.log"))
        .unwrap_or_else(|| PathBuf::from("d3term.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("d3term {} starting...", VERSION);

    let event_loop = EventLoop::new();
    let host = ConsoleHost::new();
    spawn_input_thread(event_loop.sender(), host.observers());

    if options.preview {
        info!("Preview mode, no backend");
        return run(DetachedBackend, host, event_loop);
    }

    let config_path = options.config_path.unwrap_or_else(resolve_config_path);
    let raw_config = match read_raw_config(&config_path) {
        Ok(value) => value,
        Err(e) => {
            warn!("{}; using defaults", e);
            Value::Null
        }
    };
    info!("Config: {}", config_path.display());

    let _watcher = match ConfigWatcher::start(
        &config_path,
        normalize(&raw_config),
        event_loop.sender(),
    ) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("{}; live reload disabled", e);
            None
        }
    };

    let backend = LoopbackBackend::new(
        event_loop.sender(),
        raw_config,
        config_path.display().to_string(),
    );
    run(backend, host, event_loop)
}

fn run<B: Backend>(backend: B, host: ConsoleHost, event_loop: EventLoop) -> anyhow::Result<()> {
    let mut controller = SessionController::new(ConsoleSurface::new(), backend, host);
    let result = event_loop.run(&mut controller);
    drop(controller);

    if let Err(e) = &result {
        error!("Session failed: {:#}", e);
        eprintln!("d3term: {:#}", e);
    }
    info!("d3term exiting");
    result
}

/// Forward console events to the loop until it stops or the user quits
fn spawn_input_thread(sender: LoopSender, observers: ObserverSet) {
    thread::spawn(move || loop {
        match event::poll(INPUT_POLL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                error!("Console input failed: {}", e);
                sender.send(LoopEvent::Shutdown);
                return;
            }
        }

        let event = match event::read() {
            Ok(event) => event,
            Err(e) => {
                error!("Console input failed: {}", e);
                sender.send(LoopEvent::Shutdown);
                return;
            }
        };

        let delivered = match event {
            Event::Key(key) => match KeyMapper::translate(&key) {
                Some(KeyAction::Input(text)) => sender.send(LoopEvent::Input(text)),
                Some(KeyAction::Paste) => match clipboard_text() {
                    Some(text) => sender.send(LoopEvent::Input(text)),
                    None => true,
                },
                Some(KeyAction::Quit) => {
                    sender.send(LoopEvent::Shutdown);
                    return;
                }
                None => true,
            },
            Event::Paste(text) => sender.send(LoopEvent::Input(text)),
            Event::Resize(_, _) => observers
                .resize_events()
                .into_iter()
                .all(|event| sender.send(event)),
            _ => true,
        };

        if !delivered {
            return;
        }
    });
}

/// Clipboard text with line breaks as the Enter key sends them
fn clipboard_text() -> Option<String> {
    let mut clipboard = match arboard::Clipboard::new() {
        Ok(clipboard) => clipboard,
        Err(e) => {
            warn!("Clipboard unavailable: {}", e);
            return None;
        }
    };
    match clipboard.get_text() {
        Ok(text) if !text.is_empty() => Some(text.replace("\r\n", "\r").replace('\n', "\r")),
        Ok(_) => None,
        Err(e) => {
            warn!("Clipboard read failed: {}", e);
            None
        }
    }
}
