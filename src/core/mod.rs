//! Core session control.
//!
//! This module contains the controller and the seams it drives:
//!
//! - **backend**: Backend channel (commands + pushed events)
//! - **surface**: Rendering surface capability (the terminal widget)
//! - **host**: Window/document plumbing (observers, theme marker, banner)
//! - **controller**: `SessionController`, the lifecycle state machine
//! - **input** / **banner** / **timers**: coalescing and timeout helpers
//!
//! # Architecture
//!
//! ```text
//! SessionController
//! ├── RenderingSurface (view)
//! ├── Backend (start/stop/write_stdin/resize + subscriptions)
//! ├── Host (observers, theme marker, banner element)
//! └── TimerQueue
//!     ├── InputBuffer   (input flush)
//!     ├── resize frame  (fit + resize)
//!     └── WarningBanner (dismiss)
//! ```

pub mod backend;
pub mod banner;
pub mod controller;
pub mod host;
pub mod input;
pub mod surface;
pub mod timers;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{Backend, BackendError, BackendEvent, DetachedBackend, EventKind, SessionInfo};
pub use controller::{ControllerError, SessionController, SessionState};
pub use host::{Host, Observer};
pub use surface::{DisplayOptions, RenderingSurface, SurfaceSettings};
