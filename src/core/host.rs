//! Window/document plumbing around the terminal view.

use crate::theme::ThemeMarker;

/// Environment signal the controller can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observer {
    /// Size changes of the element hosting the terminal
    ContainerGeometry,
    /// Window resize
    WindowResize,
    /// System dark/light preference changes
    ColorScheme,
}

/// Host environment of the terminal view.
///
/// Attached observers report through the event loop
/// (`LoopEvent::ContainerResized`, `WindowResized`, `ColorSchemeChanged`).
pub trait Host {
    /// Current system color-scheme preference
    fn prefers_dark(&self) -> bool;

    fn attach(&mut self, observer: Observer);

    fn detach(&mut self, observer: Observer);

    /// Publish the resolved theme for surrounding styling
    fn set_theme_marker(&mut self, marker: ThemeMarker);

    fn show_banner(&mut self, message: &str);

    fn hide_banner(&mut self);
}
