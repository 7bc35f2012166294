//! Per-mode keystroke dispatch
//!
//! [`resolve`] maps a key to an [`Action`] for the active [`Mode`] and
//! [`handle`] applies it to the [`Session`]. Printable characters skip the
//! tables: they edit the live line, or the browsed entry in history mode.

use std::fmt;

use crate::app::session::Session;
use crate::input::key::Key;
use crate::input::mode::Mode;
use crate::model::line::CursorMove;
use crate::primitives::ascii;

/// What a key does in a given mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert(char),
    Backspace,
    Move(CursorMove),
    Commit,
    Terminate,
    SetMode(Mode),
    Complete,
    Search,
    Noop,
    /// Continue editing from the browsed history entry
    EditBrowsed(char),
    BackspaceBrowsed,
    Browse(isize),
    CommitBrowsed,
}

/// The key was processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Complete,
    /// The handler ran but the feature behind it is incomplete
    Partial,
}

/// No handler is bound to the key in the active mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    pub key: Key,
    pub mode: Mode,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Line functionality {} not implemented yet",
            self.key.describe()
        )
    }
}

impl std::error::Error for Rejected {}

/// Keys bound the same way in every mode
fn resolve_common(key: Key) -> Option<Action> {
    let action = match key {
        Key::Char(ascii::BEL) => Action::SetMode(Mode::Normal),
        Key::Char(ascii::HT) => Action::Complete,
        Key::Char(ascii::DC2) => Action::Search,
        Key::Char(ascii::ESC) => Action::SetMode(Mode::Escape),
        Key::Char(ascii::EOT) | Key::Char(ascii::ETX) => Action::Terminate,
        Key::Home => Action::Move(CursorMove::Home),
        Key::End => Action::Move(CursorMove::End),
        Key::Left => Action::Move(CursorMove::Left),
        Key::Right => Action::Move(CursorMove::Right),
        _ => return None,
    };
    Some(action)
}

/// Action bound to `key` in `mode`
pub fn resolve(mode: Mode, key: Key) -> Option<Action> {
    if mode.edits_live_line() {
        if let Some(c) = key.printable() {
            return Some(Action::Insert(c));
        }
        let action = match key {
            Key::Char(ascii::CR) | Key::Char(ascii::NL) => Action::Commit,
            Key::Backspace => Action::Backspace,
            Key::Up => Action::SetMode(Mode::History),
            Key::Down => Action::Noop,
            _ => return resolve_common(key),
        };
        return Some(action);
    }

    if let Some(c) = key.printable() {
        return Some(Action::EditBrowsed(c));
    }
    let action = match key {
        Key::Char(ascii::CR) | Key::Char(ascii::NL) => Action::CommitBrowsed,
        Key::Backspace => Action::BackspaceBrowsed,
        Key::Up => Action::Browse(-1),
        Key::Down => Action::Browse(1),
        _ => return resolve_common(key),
    };
    Some(action)
}

/// Apply `key` to the session according to `mode`
pub fn handle(mode: Mode, key: Key, session: &mut Session) -> Result<Handled, Rejected> {
    let action = resolve(mode, key).ok_or(Rejected { key, mode })?;
    tracing::trace!("Processing key {} as {:?}", key, action);
    Ok(perform(action, session))
}

fn perform(action: Action, session: &mut Session) -> Handled {
    match action {
        Action::Insert(c) => {
            session.line_current_mut().write(c.encode_utf8(&mut [0; 4]));
        }
        Action::Backspace => {
            session.line_current_mut().delete(1);
        }
        Action::Move(request) => session.pos_update(request),
        Action::Commit => {
            session.newline();
            session.mode_set(Mode::Normal);
        }
        Action::Terminate => session.terminate(),
        Action::SetMode(mode) => session.mode_set(mode),
        Action::Complete => {
            session.mode_set(Mode::Completion);
            session.complete();
        }
        Action::Search => {
            session.mode_set(Mode::Search);
            return session.search();
        }
        Action::Noop => {}
        Action::EditBrowsed(c) => {
            session.edit_browsed();
            session.line_current_mut().write(c.encode_utf8(&mut [0; 4]));
            session.mode_set(Mode::Normal);
        }
        Action::BackspaceBrowsed => {
            session.edit_browsed();
            session.line_current_mut().delete(1);
            session.mode_set(Mode::Normal);
        }
        Action::Browse(shift) => {
            if !session.history_mut().pos_update(shift) {
                session.mode_set(Mode::Normal);
            }
        }
        Action::CommitBrowsed => {
            session.newline();
            session.history_mut().reset();
            session.mode_set(Mode::Normal);
        }
    }
    Handled::Complete
}
