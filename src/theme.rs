//! Color palettes and theme resolution.
//!
//! d3term ships exactly two palettes, `dark` and `light`. The configured
//! [`ThemeMode`] picks one of them, `system` deferring to the live
//! color-scheme preference reported by the host.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ThemeMode;

/// Color definition (RGBA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Convert to crossterm Color (alpha is dropped)
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// `#rrggbb`, or `#rrggbbaa` when not fully opaque
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// Resolved theme, also published to the host as the document theme marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeMarker {
    Dark,
    Light,
}

impl ThemeMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Self::Dark => Palette::dark(),
            Self::Light => Palette::light(),
        }
    }
}

/// Pick the palette for a theme mode
pub fn resolve_theme(mode: ThemeMode, prefers_dark: bool) -> ThemeMarker {
    match mode {
        ThemeMode::Dark => ThemeMarker::Dark,
        ThemeMode::Light => ThemeMarker::Light,
        ThemeMode::System if prefers_dark => ThemeMarker::Dark,
        ThemeMode::System => ThemeMarker::Light,
    }
}

/// Terminal palette: UI colors plus the 16 standard terminal colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub cursor: Color,
    pub selection_background: Color,
    pub selection_inactive_background: Color,

    pub black: Color,
    pub red: Color,
    pub green: Color,
    pub yellow: Color,
    pub blue: Color,
    pub magenta: Color,
    pub cyan: Color,
    pub white: Color,
    pub bright_black: Color,
    pub bright_red: Color,
    pub bright_green: Color,
    pub bright_yellow: Color,
    pub bright_blue: Color,
    pub bright_magenta: Color,
    pub bright_cyan: Color,
    pub bright_white: Color,
}

impl Palette {
    /// Dark palette (deep navy background)
    pub const fn dark() -> Self {
        Self {
            background: Color::new(11, 16, 32),
            foreground: Color::new(212, 217, 229),
            cursor: Color::new(247, 249, 255),
            selection_background: Color::with_alpha(42, 53, 84, 122),
            selection_inactive_background: Color::with_alpha(33, 44, 70, 114),

            black: Color::new(15, 20, 34),
            red: Color::new(228, 120, 132),
            green: Color::new(125, 201, 168),
            yellow: Color::new(217, 191, 122),
            blue: Color::new(98, 187, 234),
            magenta: Color::new(215, 119, 230),
            cyan: Color::new(110, 201, 219),
            white: Color::new(219, 226, 239),
            bright_black: Color::new(102, 112, 134),
            bright_red: Color::new(240, 142, 154),
            bright_green: Color::new(153, 219, 190),
            bright_yellow: Color::new(234, 210, 155),
            bright_blue: Color::new(139, 204, 239),
            bright_magenta: Color::new(225, 154, 235),
            bright_cyan: Color::new(149, 217, 230),
            bright_white: Color::new(241, 244, 251),
        }
    }

    /// Light palette (paper white background)
    pub const fn light() -> Self {
        Self {
            background: Color::new(248, 250, 252),
            foreground: Color::new(39, 50, 69),
            cursor: Color::new(27, 35, 48),
            selection_background: Color::with_alpha(198, 216, 235, 143),
            selection_inactive_background: Color::with_alpha(216, 228, 243, 147),

            black: Color::new(33, 41, 54),
            red: Color::new(191, 95, 117),
            green: Color::new(47, 127, 95),
            yellow: Color::new(155, 121, 52),
            blue: Color::new(50, 111, 161),
            magenta: Color::new(143, 85, 196),
            cyan: Color::new(51, 125, 153),
            white: Color::new(236, 240, 248),
            bright_black: Color::new(78, 88, 105),
            bright_red: Color::new(207, 111, 133),
            bright_green: Color::new(60, 153, 116),
            bright_yellow: Color::new(182, 148, 73),
            bright_blue: Color::new(72, 137, 190),
            bright_magenta: Color::new(159, 107, 209),
            bright_cyan: Color::new(76, 149, 176),
            bright_white: Color::new(255, 255, 255),
        }
    }

    /// The 16 standard colors in SGR order (0-7 normal, 8-15 bright)
    pub fn ansi(&self) -> [Color; 16] {
        [
            self.black,
            self.red,
            self.green,
            self.yellow,
            self.blue,
            self.magenta,
            self.cyan,
            self.white,
            self.bright_black,
            self.bright_red,
            self.bright_green,
            self.bright_yellow,
            self.bright_blue,
            self.bright_magenta,
            self.bright_cyan,
            self.bright_white,
        ]
    }
}
