//! Rendering surface capability.
//!
//! The terminal widget itself (screen buffer, escape sequences, glyph
//! rendering) lives outside d3term; the controller only drives it through
//! [`RenderingSurface`].

use crate::config::TerminalConfig;
use crate::theme::Palette;

/// Smallest grid ever reported to the backend
pub const MIN_COLS: u16 = 2;
pub const MIN_ROWS: u16 = 1;

/// Widget options fixed for the lifetime of the surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSettings {
    pub cursor_blink: bool,
    pub font_weight: u16,
    pub font_weight_bold: u16,
    pub minimum_contrast_ratio: f64,
    pub draw_bold_text_in_bright_colors: bool,
    pub right_click_selects_word: bool,
    /// Leave `\n` as-is; the PTY already emits `\r\n`
    pub convert_eol: bool,
    pub unicode_version: &'static str,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            cursor_blink: true,
            font_weight: 500,
            font_weight_bold: 700,
            minimum_contrast_ratio: 1.1,
            draw_bold_text_in_bright_colors: true,
            right_click_selects_word: true,
            convert_eol: false,
            unicode_version: "11",
        }
    }
}

/// Display options driven by the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayOptions {
    pub font_family: String,
    pub font_size: f64,
    pub letter_spacing: f64,
    pub line_height: f64,
    pub scrollback: u32,
}

impl From<&TerminalConfig> for DisplayOptions {
    fn from(terminal: &TerminalConfig) -> Self {
        Self {
            font_family: terminal.font_family.clone(),
            font_size: terminal.font_size,
            letter_spacing: terminal.letter_spacing,
            line_height: terminal.line_height,
            scrollback: terminal.scrollback,
        }
    }
}

/// Terminal view driven by the controller
pub trait RenderingSurface {
    /// Attach to the container and apply the fixed settings
    fn open(&mut self, settings: &SurfaceSettings);

    /// Write raw terminal data
    fn write(&mut self, data: &str);

    fn writeln(&mut self, line: &str) {
        self.write(line);
        self.write("\r\n");
    }

    /// Current grid size as `(cols, rows)`
    fn size(&self) -> (u16, u16);

    fn focus(&mut self);

    fn set_options(&mut self, options: &DisplayOptions);

    fn set_palette(&mut self, palette: &Palette);

    /// Recompute the grid size from the container geometry
    fn fit(&mut self);

    fn dispose(&mut self);
}

/// Clamp a surface size to the minimum grid accepted by the backend
pub fn grid_size((cols, rows): (u16, u16)) -> (u16, u16) {
    (cols.max(MIN_COLS), rows.max(MIN_ROWS))
}
