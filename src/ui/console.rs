//! Console host for the terminal view
//!
//! Runs the controller inside the current terminal: session output is
//! passed through to stdout inside a scroll region, and the bottom row is
//! kept for the warning banner.

use std::collections::HashSet;
use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex};

use crossterm::{
    cursor::{MoveTo, RestorePosition, SavePosition, Show},
    event::{DisableBracketedPaste, EnableBracketedPaste},
    queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::debug;
use unicode_width::UnicodeWidthChar;

use crate::core::{DisplayOptions, Host, Observer, RenderingSurface, SurfaceSettings};
use crate::runtime::LoopEvent;
use crate::theme::{Palette, ThemeMarker};

/// Rows reserved below the session for the banner
const BANNER_ROWS: u16 = 1;

/// Size of the controlling terminal, `(80, 24)` when unknown
fn terminal_size() -> (u16, u16) {
    terminal::size().unwrap_or((80, 24))
}

/// Rendering surface backed by the controlling terminal
pub struct ConsoleSurface {
    stdout: Stdout,
    opened: bool,
    /// Session grid, excluding the banner row
    size: (u16, u16),
    palette: Option<Palette>,
}

impl Default for ConsoleSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            opened: false,
            size: session_area(terminal_size()),
            palette: None,
        }
    }

    fn try_open(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        queue_setup(&mut self.stdout)?;
        self.opened = true;
        self.apply_scroll_region()?;
        self.stdout.flush()
    }

    /// Keep session output away from the banner row
    fn apply_scroll_region(&mut self) -> io::Result<()> {
        let (_, rows) = self.size;
        queue!(self.stdout, SavePosition, Print(format!("\x1b[1;{}r", rows)), RestorePosition)
    }

    fn try_dispose(&mut self) -> io::Result<()> {
        queue_teardown(&mut self.stdout)?;
        self.stdout.flush()?;
        terminal::disable_raw_mode()
    }
}

impl RenderingSurface for ConsoleSurface {
    fn open(&mut self, settings: &SurfaceSettings) {
        debug!("Opening console surface: {:?}", settings);
        if let Err(err) = self.try_open() {
            debug!("Console setup failed: {}", err);
        }
    }

    fn write(&mut self, data: &str) {
        let result = self
            .stdout
            .write_all(data.as_bytes())
            .and_then(|_| self.stdout.flush());
        if let Err(err) = result {
            debug!("Console write failed: {}", err);
        }
    }

    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn focus(&mut self) {
        if let Err(err) = queue!(self.stdout, Show).and_then(|_| self.stdout.flush()) {
            debug!("Console focus failed: {}", err);
        }
    }

    fn set_options(&mut self, options: &DisplayOptions) {
        // Fonts belong to the hosting terminal
        debug!(
            "Display options: {} {}px, scrollback {}",
            options.font_family, options.font_size, options.scrollback
        );
    }

    fn set_palette(&mut self, palette: &Palette) {
        self.palette = Some(*palette);
        let result = queue!(
            self.stdout,
            SetBackgroundColor(palette.background.to_crossterm()),
            SetForegroundColor(palette.foreground.to_crossterm())
        )
        .and_then(|_| self.stdout.flush());
        if let Err(err) = result {
            debug!("Console palette failed: {}", err);
        }
    }

    fn fit(&mut self) {
        self.size = session_area(terminal_size());
        if self.opened {
            if let Err(err) = self.apply_scroll_region().and_then(|_| self.stdout.flush()) {
                debug!("Console scroll region failed: {}", err);
            }
        }
    }

    fn dispose(&mut self) {
        if !self.opened {
            return;
        }
        self.opened = false;
        if let Err(err) = self.try_dispose() {
            debug!("Console restore failed: {}", err);
        }
    }
}

impl Drop for ConsoleSurface {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Alternate screen with bracketed paste, so pasted text arrives as one
/// `Event::Paste`
fn queue_setup<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(
        out,
        EnterAlternateScreen,
        EnableBracketedPaste,
        Clear(ClearType::All),
        MoveTo(0, 0)
    )
}

/// Undo [`queue_setup`] and the scroll region
fn queue_teardown<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(
        out,
        Print("\x1b[r"),
        DisableBracketedPaste,
        ResetColor,
        Show,
        LeaveAlternateScreen
    )
}

/// Session area for a terminal of `(cols, rows)`
fn session_area((cols, rows): (u16, u16)) -> (u16, u16) {
    (cols, rows.saturating_sub(BANNER_ROWS))
}

/// Observers attached by the controller, shared with the input thread
#[derive(Debug, Clone, Default)]
pub struct ObserverSet {
    inner: Arc<Mutex<HashSet<Observer>>>,
}

impl ObserverSet {
    pub fn contains(&self, observer: Observer) -> bool {
        self.inner
            .lock()
            .map(|set| set.contains(&observer))
            .unwrap_or(false)
    }

    fn insert(&self, observer: Observer) {
        if let Ok(mut set) = self.inner.lock() {
            set.insert(observer);
        }
    }

    fn remove(&self, observer: Observer) {
        if let Ok(mut set) = self.inner.lock() {
            set.remove(&observer);
        }
    }

    /// Loop events for a console resize. The console window is also the
    /// container, so each attached geometry observer gets its event.
    pub fn resize_events(&self) -> Vec<LoopEvent> {
        let mut events = Vec::new();
        if self.contains(Observer::ContainerGeometry) {
            events.push(LoopEvent::ContainerResized);
        }
        if self.contains(Observer::WindowResize) {
            events.push(LoopEvent::WindowResized);
        }
        events
    }
}

/// Host plumbing for the console: banner row, theme marker and the
/// color-scheme preference.
///
/// The preference comes from `COLORFGBG`, read once at startup. A console
/// has no live color-scheme signal, so attaching `Observer::ColorScheme`
/// never produces `LoopEvent::ColorSchemeChanged`.
pub struct ConsoleHost {
    stdout: Stdout,
    prefers_dark: bool,
    marker: ThemeMarker,
    observers: ObserverSet,
    banner: Option<String>,
}

impl Default for ConsoleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleHost {
    pub fn new() -> Self {
        let colorfgbg = std::env::var("COLORFGBG").ok();
        let prefers_dark = colorfgbg_prefers_dark(colorfgbg.as_deref());
        debug!("COLORFGBG={:?}, prefers dark: {}", colorfgbg, prefers_dark);
        Self {
            stdout: io::stdout(),
            prefers_dark,
            marker: ThemeMarker::Dark,
            observers: ObserverSet::default(),
            banner: None,
        }
    }

    pub fn theme_marker(&self) -> ThemeMarker {
        self.marker
    }

    pub fn is_observing(&self, observer: Observer) -> bool {
        self.observers.contains(observer)
    }

    /// Handle for producers that only forward events while observed
    pub fn observers(&self) -> ObserverSet {
        self.observers.clone()
    }

    fn draw_banner(&mut self, message: Option<&str>) -> io::Result<()> {
        let (cols, rows) = terminal_size();
        let row = rows.saturating_sub(1);
        queue!(self.stdout, SavePosition, MoveTo(0, row), Clear(ClearType::CurrentLine))?;
        if let Some(message) = message {
            let palette = self.marker.palette();
            queue!(
                self.stdout,
                SetBackgroundColor(palette.yellow.to_crossterm()),
                SetForegroundColor(palette.black.to_crossterm()),
                Print(fit_width(message, cols as usize)),
                ResetColor
            )?;
        }
        queue!(self.stdout, RestorePosition)?;
        self.stdout.flush()
    }
}

impl Host for ConsoleHost {
    fn prefers_dark(&self) -> bool {
        self.prefers_dark
    }

    fn attach(&mut self, observer: Observer) {
        debug!("Observing {:?}", observer);
        self.observers.insert(observer);
    }

    fn detach(&mut self, observer: Observer) {
        self.observers.remove(observer);
    }

    fn set_theme_marker(&mut self, marker: ThemeMarker) {
        debug!("Theme: {}", marker.as_str());
        self.marker = marker;
    }

    fn show_banner(&mut self, message: &str) {
        self.banner = Some(message.to_string());
        if let Err(err) = self.draw_banner(Some(message)) {
            debug!("Banner draw failed: {}", err);
        }
    }

    fn hide_banner(&mut self) {
        if self.banner.take().is_some() {
            if let Err(err) = self.draw_banner(None) {
                debug!("Banner clear failed: {}", err);
            }
        }
    }
}

/// Interpret `COLORFGBG` (`"fg;bg"` or `"fg;default;bg"`).
///
/// Background indices 0-6 and 8 are dark; anything unreadable counts as dark.
pub fn colorfgbg_prefers_dark(value: Option<&str>) -> bool {
    let background = value
        .and_then(|value| value.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok());
    match background {
        Some(bg) => bg <= 6 || bg == 8,
        None => true,
    }
}

/// Truncate `text` to at most `width` terminal columns
pub fn fit_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorfgbg() {
        assert!(colorfgbg_prefers_dark(Some("15;0")));
        assert!(colorfgbg_prefers_dark(Some("7;default;8")));
        assert!(!colorfgbg_prefers_dark(Some("0;15")));
        assert!(!colorfgbg_prefers_dark(Some("0;7")));
        assert!(colorfgbg_prefers_dark(Some("garbage")));
        assert!(colorfgbg_prefers_dark(None));
    }

    #[test]
    fn test_fit_width_ascii() {
        assert_eq!(fit_width("hello", 10), "hello");
        assert_eq!(fit_width("hello", 3), "hel");
        assert_eq!(fit_width("hello", 0), "");
    }

    #[test]
    fn test_fit_width_wide_chars() {
        // Each kana is two columns wide
        assert_eq!(fit_width("バックエンド", 4), "バッ");
        assert_eq!(fit_width("バックエンド", 5), "バッ");
        assert_eq!(fit_width("aバ", 2), "a");
    }

    #[test]
    fn test_host_tracks_observers_and_marker() {
        let mut host = ConsoleHost::new();
        host.attach(Observer::WindowResize);
        host.attach(Observer::ColorScheme);
        host.detach(Observer::ColorScheme);
        assert!(host.is_observing(Observer::WindowResize));
        assert!(!host.is_observing(Observer::ColorScheme));

        host.set_theme_marker(ThemeMarker::Light);
        assert_eq!(host.theme_marker(), ThemeMarker::Light);
    }

    #[test]
    fn test_resize_events_follow_attached_observers() {
        let mut host = ConsoleHost::new();
        let observers = host.observers();
        assert!(observers.resize_events().is_empty());

        host.attach(Observer::WindowResize);
        let events = observers.resize_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LoopEvent::WindowResized));

        host.attach(Observer::ContainerGeometry);
        assert_eq!(observers.resize_events().len(), 2);

        host.detach(Observer::WindowResize);
        host.detach(Observer::ContainerGeometry);
        assert!(observers.resize_events().is_empty());
    }

    #[test]
    fn test_bracketed_paste_is_toggled() {
        let mut setup = Vec::new();
        queue_setup(&mut setup).unwrap();
        assert!(String::from_utf8_lossy(&setup).contains("\x1b[?2004h"));

        let mut teardown = Vec::new();
        queue_teardown(&mut teardown).unwrap();
        let teardown = String::from_utf8_lossy(&teardown);
        assert!(teardown.contains("\x1b[?2004l"));
        assert!(teardown.contains("\x1b[r"));
    }

    #[test]
    fn test_session_area_reserves_banner_row() {
        assert_eq!(session_area((80, 24)), (80, 23));
        assert_eq!(session_area((80, 0)), (80, 0));
    }
}
