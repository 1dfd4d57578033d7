//! Config file watcher for live reload.
//!
//! Watches the directory holding `config.toml` and pushes changes into the
//! event loop the way the session host does: `config:updated` only when the
//! normalized configuration actually changed, `warning` when the file cannot
//! be reloaded. Events arriving within [`RELOAD_QUIET_PERIOD`] of the last
//! reload are ignored, which absorbs the burst of events editors produce
//! on save.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{load_config, AppConfig, ConfigError};
use crate::core::EventKind;
use crate::runtime::LoopSender;

pub const RELOAD_QUIET_PERIOD: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to create config watcher: {0}")]
    Create(#[source] notify::Error),

    #[error("Failed to watch {}: {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Result of one reload attempt
#[derive(Debug)]
pub enum Reload {
    /// Within the quiet period of the previous reload
    Skipped,
    Unchanged,
    Changed(AppConfig),
    Failed(ConfigError),
}

/// Reload state for one config file
pub struct ConfigReloader {
    path: PathBuf,
    current: AppConfig,
    last_reload_at: Option<Instant>,
}

impl ConfigReloader {
    /// `current` is the configuration the session was started with
    pub fn new(path: impl Into<PathBuf>, current: AppConfig) -> Self {
        Self {
            path: path.into(),
            current,
            last_reload_at: None,
        }
    }

    pub fn current(&self) -> &AppConfig {
        &self.current
    }

    fn in_quiet_period(&self, now: Instant) -> bool {
        self.last_reload_at
            .is_some_and(|last| now.saturating_duration_since(last) < RELOAD_QUIET_PERIOD)
    }

    pub fn reload(&mut self, now: Instant) -> Reload {
        if self.in_quiet_period(now) {
            return Reload::Skipped;
        }
        self.last_reload_at = Some(now);

        match load_config(&self.path) {
            Ok(next) if next == self.current => Reload::Unchanged,
            Ok(next) => {
                self.current = next.clone();
                Reload::Changed(next)
            }
            Err(err) => Reload::Failed(err),
        }
    }

    /// Whether a file system event can affect the config file
    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.is_empty()
            || event
                .paths
                .iter()
                .any(|path| path == &self.path || self.path.starts_with(path))
    }

    /// React to one watcher notification, publishing through `sender`
    pub fn handle(&mut self, event: notify::Result<Event>, now: Instant, sender: &LoopSender) {
        let event = match event {
            Ok(event) if !self.is_relevant(&event) => return,
            Ok(event) => event,
            Err(err) => {
                if !self.in_quiet_period(now) {
                    self.last_reload_at = Some(now);
                    publish_warning(sender, format!("設定ファイル監視エラー: {}", err));
                }
                return;
            }
        };

        match self.reload(now) {
            Reload::Skipped => debug!("Config event within quiet period: {:?}", event.kind),
            Reload::Unchanged => debug!("Config reloaded, nothing changed"),
            Reload::Changed(next) => match serde_json::to_value(&next) {
                Ok(config) => {
                    info!("Config changed: {}", self.path.display());
                    sender.publish(
                        EventKind::ConfigUpdated.topic(),
                        json!({ "config": config, "path": self.path.display().to_string() }),
                    );
                }
                Err(err) => warn!("Failed to encode config: {}", err),
            },
            Reload::Failed(err) => {
                warn!("Config reload failed: {}", err);
                publish_warning(sender, format!("設定の再読込に失敗しました: {}", err));
            }
        }
    }
}

fn publish_warning(sender: &LoopSender, message: String) {
    sender.publish(EventKind::Warning.topic(), json!({ "message": message }));
}

/// Closest existing directory to watch for `config_path`, with whether it
/// has to be watched recursively
pub fn watch_root(config_path: &Path) -> (PathBuf, RecursiveMode) {
    if let Some(parent) = config_path.parent() {
        if parent.is_dir() {
            return (parent.to_path_buf(), RecursiveMode::NonRecursive);
        }
        if let Some(grand_parent) = parent.parent() {
            if grand_parent.is_dir() {
                return (grand_parent.to_path_buf(), RecursiveMode::Recursive);
            }
        }
    }

    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    (home, RecursiveMode::Recursive)
}

/// Keeps the file system watcher alive; dropping it stops the reload thread
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher").finish_non_exhaustive()
    }
}

impl ConfigWatcher {
    pub fn start(
        config_path: &Path,
        current: AppConfig,
        sender: LoopSender,
    ) -> Result<Self, WatchError> {
        let (root, mode) = watch_root(config_path);
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();

        let mut watcher =
            RecommendedWatcher::new(tx, NotifyConfig::default()).map_err(WatchError::Create)?;
        watcher
            .watch(&root, mode)
            .map_err(|source| WatchError::Watch {
                path: root.clone(),
                source,
            })?;
        info!("Watching {} for config changes", root.display());

        let mut reloader = ConfigReloader::new(config_path, current);
        thread::spawn(move || {
            for event in rx {
                reloader.handle(event, Instant::now(), &sender);
            }
            debug!("Config watcher stopped");
        });

        Ok(Self { _watcher: watcher })
    }
}
