//! Key representation
//!
//! Terminal key events are reduced to a [`Key`]: either a character, where
//! control characters stand for themselves (Ctrl+D is `'\x04'`, Enter is
//! `'\r'`), or one of the named navigation keys. Named keys carry the
//! classic curses key codes so messages stay stable across terminals.

use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::primitives::ascii;

const KEY_DOWN: u32 = 258;
const KEY_UP: u32 = 259;
const KEY_LEFT: u32 = 260;
const KEY_RIGHT: u32 = 261;
const KEY_HOME: u32 = 262;
const KEY_BACKSPACE: u32 = 263;
const KEY_F0: u32 = 264;
const KEY_DC: u32 = 330;
const KEY_IC: u32 = 331;
const KEY_NPAGE: u32 = 338;
const KEY_PPAGE: u32 = 339;
const KEY_BTAB: u32 = 353;
const KEY_END: u32 = 360;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character, including ASCII control characters
    Char(char),
    /// A character typed with Alt held
    Alt(char),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Backspace,
    Delete,
    Insert,
    PageUp,
    PageDown,
    BackTab,
    F(u8),
}

impl Key {
    /// Numeric key code
    pub fn code(self) -> u32 {
        match self {
            Key::Char(c) => c as u32,
            Key::Alt(c) => c as u32 | 0x80,
            Key::Up => KEY_UP,
            Key::Down => KEY_DOWN,
            Key::Left => KEY_LEFT,
            Key::Right => KEY_RIGHT,
            Key::Home => KEY_HOME,
            Key::End => KEY_END,
            Key::Backspace => KEY_BACKSPACE,
            Key::Delete => KEY_DC,
            Key::Insert => KEY_IC,
            Key::PageUp => KEY_PPAGE,
            Key::PageDown => KEY_NPAGE,
            Key::BackTab => KEY_BTAB,
            Key::F(n) => KEY_F0 + u32::from(n),
        }
    }

    /// Symbolic name for control characters and named keys
    pub fn name(self) -> Option<&'static str> {
        match self {
            Key::Char(c) => ascii::control_name(c as u32),
            Key::Alt(_) | Key::F(_) => None,
            Key::Up => Some("KEY_UP"),
            Key::Down => Some("KEY_DOWN"),
            Key::Left => Some("KEY_LEFT"),
            Key::Right => Some("KEY_RIGHT"),
            Key::Home => Some("KEY_HOME"),
            Key::End => Some("KEY_END"),
            Key::Backspace => Some("KEY_BACKSPACE"),
            Key::Delete => Some("KEY_DC"),
            Key::Insert => Some("KEY_IC"),
            Key::PageUp => Some("KEY_PPAGE"),
            Key::PageDown => Some("KEY_NPAGE"),
            Key::BackTab => Some("KEY_BTAB"),
        }
    }

    /// Name and code for messages, e.g. `KEY_UP (259)` or `200`
    pub fn describe(self) -> String {
        match self.name() {
            Some(name) => format!("{} ({})", name, self.code()),
            None => self.code().to_string(),
        }
    }

    /// Characters that are inserted into the line as typed
    pub fn printable(self) -> Option<char> {
        match self {
            Key::Char(c) if !c.is_control() => Some(c),
            _ => None,
        }
    }

    /// Convert a terminal key event. Releases and unsupported keys give `None`.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        if event.kind == KeyEventKind::Release {
            return None;
        }

        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let alt = event.modifiers.contains(KeyModifiers::ALT);

        let key = match event.code {
            KeyCode::Char(c) if ctrl && !alt => return control_char(c).map(Key::Char),
            KeyCode::Char(c) if alt && !ctrl => Key::Alt(c),
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Char(ascii::CR),
            KeyCode::Tab => Key::Char(ascii::HT),
            KeyCode::Esc => Key::Char(ascii::ESC),
            KeyCode::BackTab => Key::BackTab,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Insert => Key::Insert,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::F(n) => Key::F(n),
            _ => return None,
        };
        Some(key)
    }
}

/// Control character produced by Ctrl+`c`
fn control_char(c: char) -> Option<char> {
    let c = c.to_ascii_lowercase();
    if c.is_ascii_lowercase() {
        // Ctrl+A = 0x01, Ctrl+B = 0x02, etc.
        return Some(char::from(c as u8 - b'a' + 1));
    }
    match c {
        '[' | '3' => Some('\x1b'),
        '\\' | '4' => Some('\x1c'),
        ']' | '5' => Some('\x1d'),
        '^' | '6' => Some('\x1e'),
        '_' | '7' => Some('\x1f'),
        '@' | '2' | ' ' => Some('\x00'),
        '?' => Some(ascii::DEL),
        _ => None,
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
