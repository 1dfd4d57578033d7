//! Session controller.
//!
//! Owns the terminal view lifecycle and mediates between the rendering
//! surface, the host environment and the backend:
//!
//! ```text
//! keystrokes   surface ──► InputBuffer (4ms) ──► write_stdin
//! geometry     host ──► resize frame (16ms) ──► fit + resize
//! pty:data     backend ──► surface.write
//! config       backend ──► normalize ──► display options + palette
//! ```
//!
//! Everything runs on the event loop thread. Time-dependent calls take the
//! current `Instant`; due timers are fired through [`SessionController::poll_timers`].

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::backend::{Backend, BackendError, BackendEvent, EventKind, ListenerId, SessionInfo};
use super::banner::WarningBanner;
use super::host::{Host, Observer};
use super::input::InputBuffer;
use super::surface::{grid_size, DisplayOptions, RenderingSurface, SurfaceSettings};
use super::timers::{TimerId, TimerKind, TimerQueue};
use crate::config::{default_config, normalize, AppConfig, ThemeMode};
use crate::theme::resolve_theme;

/// Animation frame interval used to batch geometry changes
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

const NO_BACKEND_LINES: [&str; 2] = [
    "d3term backend is unavailable in preview mode.",
    "Start the d3term desktop host to open a shell session.",
];
const NO_BACKEND_WARNING: &str =
    "バックエンドに接続できないため、PTYを起動できません。デスクトップ版で実行してください。";
const FALLBACK_WARNING: &str = "指定コマンドを使えないため、通常シェルで起動しました。";

/// Lifecycle of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Running,
    /// No backend reachable: the view only shows a diagnostic
    DegradedNoBackend,
    Disposed,
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Controller cannot be initialized from state {0:?}")]
    AlreadyInitialized(SessionState),

    #[error("Failed to subscribe to {topic}: {source}")]
    Subscribe {
        topic: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("Failed to start session: {0}")]
    StartSession(#[source] BackendError),
}

pub struct SessionController<S: RenderingSurface, B: Backend, H: Host> {
    surface: S,
    backend: B,
    host: H,
    /// Current configuration, replaced wholesale
    config: AppConfig,
    state: SessionState,
    prefers_dark: bool,
    listeners: Vec<ListenerId>,
    observers: Vec<Observer>,
    timers: TimerQueue,
    input: InputBuffer,
    /// Set once backend subscriptions are in place
    input_enabled: bool,
    resize_frame: Option<TimerId>,
    banner: WarningBanner,
    session: Option<SessionInfo>,
}

impl<S: RenderingSurface, B: Backend, H: Host> SessionController<S, B, H> {
    pub fn new(surface: S, backend: B, host: H) -> Self {
        let prefers_dark = host.prefers_dark();
        Self {
            surface,
            backend,
            host,
            config: default_config().clone(),
            state: SessionState::Uninitialized,
            prefers_dark,
            listeners: Vec::new(),
            observers: Vec::new(),
            timers: TimerQueue::new(),
            input: InputBuffer::new(),
            input_enabled: false,
            resize_frame: None,
            banner: WarningBanner::new(),
            session: None,
        }
    }

    /// Open the view and start the backend session.
    ///
    /// Only a failing `start_session` (or subscription) is reported; the
    /// caller is still expected to call [`dispose`](Self::dispose).
    pub fn init(&mut self, now: Instant) -> Result<(), ControllerError> {
        if self.state != SessionState::Uninitialized {
            return Err(ControllerError::AlreadyInitialized(self.state));
        }
        self.state = SessionState::Initializing;

        self.surface.open(&SurfaceSettings::default());
        self.apply_config(default_config().clone());

        self.attach(Observer::ContainerGeometry);
        self.attach(Observer::WindowResize);
        self.attach(Observer::ColorScheme);
        self.fit_and_resize();

        if !self.backend.is_available() {
            warn!("Backend unavailable, terminal runs without a session");
            for line in NO_BACKEND_LINES {
                self.surface.writeln(line);
            }
            self.show_warning(NO_BACKEND_WARNING, now);
            self.state = SessionState::DegradedNoBackend;
            return Ok(());
        }

        // Subscriptions must be live before start_session so no early
        // output is lost.
        self.register_backend_events()?;
        self.input_enabled = true;
        self.start_session(now)
    }

    /// Release every subscription, observer and timer, stop the session
    /// and release the surface. Safe to call repeatedly and before `init`.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        debug!("Disposing controller in state {:?}", self.state);

        for id in self.listeners.drain(..) {
            self.backend.unlisten(id);
        }
        for observer in self.observers.drain(..) {
            self.host.detach(observer);
        }

        self.input_enabled = false;
        self.input.cancel(&mut self.timers);
        if let Some(id) = self.resize_frame.take() {
            self.timers.cancel(id);
        }
        self.banner.clear(&mut self.host, &mut self.timers);
        self.timers.clear();

        if self.backend.is_available() {
            if let Err(err) = self.backend.stop_session() {
                debug!("stop_session ignored: {}", err);
            }
        }
        self.surface.dispose();
        self.session = None;
        self.state = SessionState::Disposed;
    }

    /// Keystrokes or pasted text from the surface
    pub fn handle_input(&mut self, data: &str, now: Instant) {
        if !self.input_enabled || data.is_empty() {
            return;
        }
        self.input.push(data, &mut self.timers, now);
    }

    /// Container or window geometry changed
    pub fn request_resize(&mut self, now: Instant) {
        if !self.is_live() || self.resize_frame.is_some() {
            return;
        }
        self.resize_frame = Some(self.timers.schedule(TimerKind::ResizeFrame, now + FRAME_INTERVAL));
    }

    /// System color-scheme preference changed
    pub fn set_prefers_dark(&mut self, prefers_dark: bool) {
        if !self.is_live() {
            return;
        }
        self.prefers_dark = prefers_dark;
        if self.config.terminal.theme == ThemeMode::System {
            self.apply_theme();
        }
    }

    pub fn handle_backend_event(&mut self, event: BackendEvent, now: Instant) {
        if !self.is_live() {
            debug!("Dropping {} event, controller is {:?}", event.kind().topic(), self.state);
            return;
        }

        match event {
            BackendEvent::PtyData(payload) => self.surface.write(&payload.data),
            BackendEvent::SessionExit(payload) => {
                let code = payload
                    .code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                info!("Session exited: {}", code);
                self.surface.writeln(&format!("\r\n[process exited: {}]", code));
            }
            BackendEvent::Warning(payload) => {
                warn!("Backend warning: {}", payload.message);
                self.show_warning(&payload.message, now);
            }
            BackendEvent::ConfigUpdated(payload) => {
                info!("Config updated from {}", payload.path);
                self.apply_config(normalize(&payload.config));
                self.fit_and_resize();
            }
        }
    }

    /// Fire every timer due at `now`
    pub fn poll_timers(&mut self, now: Instant) {
        for (_, kind) in self.timers.pop_due(now) {
            match kind {
                TimerKind::InputFlush => self.flush_input(),
                TimerKind::ResizeFrame => {
                    self.resize_frame = None;
                    self.fit_and_resize();
                }
                TimerKind::BannerDismiss => self.banner.dismiss(&mut self.host),
            }
        }
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn banner_message(&self) -> Option<&str> {
        self.banner.message()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn attached_observers(&self) -> usize {
        self.observers.len()
    }

    fn is_live(&self) -> bool {
        matches!(
            self.state,
            SessionState::Initializing | SessionState::Running | SessionState::DegradedNoBackend
        )
    }

    fn attach(&mut self, observer: Observer) {
        self.host.attach(observer);
        self.observers.push(observer);
    }

    fn register_backend_events(&mut self) -> Result<(), ControllerError> {
        for kind in EventKind::ALL {
            let id = self
                .backend
                .listen(kind)
                .map_err(|source| ControllerError::Subscribe {
                    topic: kind.topic(),
                    source,
                })?;
            self.listeners.push(id);
        }
        Ok(())
    }

    fn start_session(&mut self, now: Instant) -> Result<(), ControllerError> {
        let (cols, rows) = grid_size(self.surface.size());
        let info = self
            .backend
            .start_session(cols, rows)
            .map_err(ControllerError::StartSession)?;
        info!(
            "Session started: {} (pid {:?}, {}x{})",
            info.command, info.pid, cols, rows
        );

        if info.fallback_used {
            self.show_warning(FALLBACK_WARNING, now);
        }
        self.session = Some(info);
        self.surface.focus();
        self.state = SessionState::Running;
        Ok(())
    }

    fn flush_input(&mut self) {
        if let Some(chunk) = self.input.take() {
            if let Err(err) = self.backend.write_stdin(&chunk) {
                debug!("write_stdin ignored ({} bytes): {}", chunk.len(), err);
            }
        }
    }

    fn fit_and_resize(&mut self) {
        self.surface.fit();
        let (cols, rows) = grid_size(self.surface.size());
        if !self.backend.is_available() {
            return;
        }
        if let Err(err) = self.backend.resize(cols, rows) {
            debug!("resize to {}x{} ignored: {}", cols, rows, err);
        }
    }

    fn apply_config(&mut self, next: AppConfig) {
        self.config = next;
        self.surface
            .set_options(&DisplayOptions::from(&self.config.terminal));
        self.apply_theme();
    }

    fn apply_theme(&mut self) {
        let marker = resolve_theme(self.config.terminal.theme, self.prefers_dark);
        self.surface.set_palette(&marker.palette());
        self.host.set_theme_marker(marker);
    }

    fn show_warning(&mut self, message: &str, now: Instant) {
        self.banner.show(&mut self.host, &mut self.timers, message, now);
    }
}

impl<S: RenderingSurface, B: Backend, H: Host> Drop for SessionController<S, B, H> {
    fn drop(&mut self) {
        self.dispose();
    }
}
