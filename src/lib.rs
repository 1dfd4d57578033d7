//! d3term - client-side controller for an embedded terminal view
//!
//! d3term drives a terminal widget attached to a backend-owned PTY session
//! (optionally wrapped in tmux or zellij). The backend process runs the
//! shell; this crate owns everything on the view side.
//!
//! # Features
//!
//! - **Config normalization**: any untrusted JSON/TOML value becomes a
//!   complete, clamped [`config::AppConfig`]
//! - **Session lifecycle**: subscribe, start, stream, resize and stop through
//!   [`core::SessionController`]
//! - **Input coalescing**: keystrokes within 4ms are sent as one write
//! - **Resize batching**: geometry changes collapse into one resize per frame
//! - **Themes**: system/dark/light with fixed palettes
//! - **Warning banner**: transient messages with a restarting timeout
//! - **Live reload**: edits to the config file reach the session as
//!   `config:updated`
//!
//! # Architecture
//!
//! ```text
//! main
//! ├── runtime::EventLoop ── LoopEvent channel
//! │   └── core::SessionController
//! │       ├── ui::ConsoleSurface   (RenderingSurface)
//! │       ├── loopback / Detached  (Backend)
//! │       └── ui::ConsoleHost      (Host)
//! ├── input thread ── ui::KeyMapper
//! └── watcher::ConfigWatcher ── config:updated / warning
//! ```

pub mod config;
pub mod core;
pub mod loopback;
pub mod runtime;
pub mod theme;
pub mod ui;
pub mod watcher;
