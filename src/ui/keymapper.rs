//! Key mapping for the console host
//!
//! Converts crossterm key events into the text the surface hands to the
//! controller as input, and recognizes the host's own shortcuts.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// What a key press means to the console host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Text for the session
    Input(String),
    /// Ctrl+Shift+V
    Paste,
    /// Ctrl+Q
    Quit,
}

pub struct KeyMapper;

impl KeyMapper {
    /// Classify a key event. Releases and unmapped keys yield `None`.
    pub fn translate(event: &KeyEvent) -> Option<KeyAction> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let mods = Modifiers::from(event.modifiers);

        if let KeyCode::Char(ch) = event.code {
            if mods == Modifiers::CTRL && ch.eq_ignore_ascii_case(&'q') {
                return Some(KeyAction::Quit);
            }
            if mods == Modifiers::CTRL | Modifiers::SHIFT && ch.eq_ignore_ascii_case(&'v') {
                return Some(KeyAction::Paste);
            }
        }

        Self::map(event.code, mods).map(KeyAction::Input)
    }

    /// Encode a key as the sequence an xterm-compatible terminal sends
    pub fn map(code: KeyCode, mods: Modifiers) -> Option<String> {
        let text = match code {
            KeyCode::Char(ch) => Self::map_char(ch, mods),
            KeyCode::Enter => "\r".to_string(),
            KeyCode::Backspace if mods.contains(Modifiers::ALT) => "\x1b\x7f".to_string(),
            KeyCode::Backspace => "\x7f".to_string(),
            KeyCode::Tab if mods.contains(Modifiers::SHIFT) => "\x1b[Z".to_string(),
            KeyCode::Tab => "\t".to_string(),
            KeyCode::BackTab => "\x1b[Z".to_string(),
            KeyCode::Esc => "\x1b".to_string(),

            KeyCode::Up => Self::cursor_key('A', mods),
            KeyCode::Down => Self::cursor_key('B', mods),
            KeyCode::Right => Self::cursor_key('C', mods),
            KeyCode::Left => Self::cursor_key('D', mods),
            KeyCode::Home => Self::cursor_key('H', mods),
            KeyCode::End => Self::cursor_key('F', mods),

            KeyCode::Insert => Self::tilde_key(2, mods),
            KeyCode::Delete => Self::tilde_key(3, mods),
            KeyCode::PageUp => Self::tilde_key(5, mods),
            KeyCode::PageDown => Self::tilde_key(6, mods),

            KeyCode::F(n) => Self::function_key(n, mods)?,
            _ => return None,
        };
        Some(text)
    }

    fn map_char(ch: char, mods: Modifiers) -> String {
        let ctrl = mods.contains(Modifiers::CTRL);
        let alt = mods.contains(Modifiers::ALT);

        if ctrl {
            if let Some(code) = Self::control_code(ch) {
                let control = char::from(code).to_string();
                return if alt { format!("\x1b{}", control) } else { control };
            }
        }
        if alt {
            return format!("\x1b{}", ch);
        }
        ch.to_string()
    }

    /// C0 code produced by Ctrl + `ch`
    fn control_code(ch: char) -> Option<u8> {
        if ch.is_ascii_alphabetic() {
            return Some(ch.to_ascii_lowercase() as u8 - b'a' + 1);
        }
        match ch {
            '@' | '`' | ' ' | '2' => Some(0x00),
            '[' | '3' => Some(0x1B),
            '\\' | '4' => Some(0x1C),
            ']' | '5' => Some(0x1D),
            '^' | '~' | '6' => Some(0x1E),
            '_' | '?' | '7' => Some(0x1F),
            _ => None,
        }
    }

    /// Arrow, Home and End: `ESC [ X` or `ESC [ 1 ; mod X`
    fn cursor_key(key: char, mods: Modifiers) -> String {
        if mods.is_empty() {
            format!("\x1b[{}", key)
        } else {
            format!("\x1b[1;{}{}", Self::modifier_code(mods), key)
        }
    }

    fn tilde_key(code: u8, mods: Modifiers) -> String {
        if mods.is_empty() {
            format!("\x1b[{}~", code)
        } else {
            format!("\x1b[{};{}~", code, Self::modifier_code(mods))
        }
    }

    fn function_key(n: u8, mods: Modifiers) -> Option<String> {
        // F1-F4 use SS3 unmodified
        if let Some(key) = match n {
            1 => Some('P'),
            2 => Some('Q'),
            3 => Some('R'),
            4 => Some('S'),
            _ => None,
        } {
            return Some(if mods.is_empty() {
                format!("\x1bO{}", key)
            } else {
                format!("\x1b[1;{}{}", Self::modifier_code(mods), key)
            });
        }

        let code = match n {
            5 => 15,
            6 => 17,
            7 => 18,
            8 => 19,
            9 => 20,
            10 => 21,
            11 => 23,
            12 => 24,
            _ => return None,
        };
        Some(Self::tilde_key(code, mods))
    }

    /// xterm modifier parameter
    fn modifier_code(mods: Modifiers) -> u8 {
        1 + if mods.contains(Modifiers::SHIFT) { 1 } else { 0 }
            + if mods.contains(Modifiers::ALT) { 2 } else { 0 }
            + if mods.contains(Modifiers::CTRL) { 4 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, mods: KeyModifiers) -> Option<KeyAction> {
        KeyMapper::translate(&KeyEvent::new(code, mods))
    }

    fn input(text: &str) -> Option<KeyAction> {
        Some(KeyAction::Input(text.to_string()))
    }

    #[test]
    fn test_char_keys() {
        assert_eq!(press(KeyCode::Char('a'), KeyModifiers::NONE), input("a"));
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::CONTROL), input("\x03"));
        assert_eq!(press(KeyCode::Char('d'), KeyModifiers::CONTROL), input("\x04"));
        assert_eq!(press(KeyCode::Char('x'), KeyModifiers::ALT), input("\x1bx"));
        assert_eq!(
            press(KeyCode::Char('b'), KeyModifiers::CONTROL | KeyModifiers::ALT),
            input("\x1b\x02")
        );
        assert_eq!(press(KeyCode::Char('あ'), KeyModifiers::NONE), input("あ"));
    }

    #[test]
    fn test_editing_keys() {
        assert_eq!(press(KeyCode::Enter, KeyModifiers::NONE), input("\r"));
        assert_eq!(press(KeyCode::Backspace, KeyModifiers::NONE), input("\x7f"));
        assert_eq!(press(KeyCode::Tab, KeyModifiers::SHIFT), input("\x1b[Z"));
        assert_eq!(press(KeyCode::Delete, KeyModifiers::NONE), input("\x1b[3~"));
        assert_eq!(press(KeyCode::PageUp, KeyModifiers::SHIFT), input("\x1b[5;2~"));
    }

    #[test]
    fn test_arrow_keys() {
        assert_eq!(press(KeyCode::Up, KeyModifiers::NONE), input("\x1b[A"));
        assert_eq!(press(KeyCode::Up, KeyModifiers::CONTROL), input("\x1b[1;5A"));
        assert_eq!(press(KeyCode::Home, KeyModifiers::NONE), input("\x1b[H"));
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(press(KeyCode::F(1), KeyModifiers::NONE), input("\x1bOP"));
        assert_eq!(press(KeyCode::F(1), KeyModifiers::SHIFT), input("\x1b[1;2P"));
        assert_eq!(press(KeyCode::F(5), KeyModifiers::NONE), input("\x1b[15~"));
        assert_eq!(press(KeyCode::F(12), KeyModifiers::ALT), input("\x1b[24;3~"));
        assert_eq!(press(KeyCode::F(13), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_host_shortcuts() {
        assert_eq!(press(KeyCode::Char('q'), KeyModifiers::CONTROL), Some(KeyAction::Quit));
        assert_eq!(
            press(KeyCode::Char('V'), KeyModifiers::CONTROL | KeyModifiers::SHIFT),
            Some(KeyAction::Paste)
        );
        // Plain Ctrl+V still reaches the session
        assert_eq!(press(KeyCode::Char('v'), KeyModifiers::CONTROL), input("\x16"));
    }

    #[test]
    fn test_release_is_ignored() {
        let mut event = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(KeyMapper::translate(&event), None);
    }
}
