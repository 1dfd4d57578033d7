//! Console front end.
//!
//! - **console**: `ConsoleSurface` and `ConsoleHost` on top of crossterm
//! - **keymapper**: Keyboard events to session input and host shortcuts

pub mod console;
pub mod keymapper;

pub use console::{ConsoleHost, ConsoleSurface, ObserverSet};
pub use keymapper::{KeyAction, KeyMapper, Modifiers};
