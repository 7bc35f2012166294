//! Command line operating modes

use std::fmt;

/// Interpretation context for keystrokes. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Normal,
    Completion,
    Escape,
    History,
    Search,
}

impl Mode {
    /// Title shown on the command pane while the mode is active
    pub fn title(self) -> &'static str {
        match self {
            Mode::Normal => "Commands",
            Mode::Completion => "Completion mode",
            Mode::Escape => "(escaped mode) commands",
            Mode::History => "History mode",
            Mode::Search => "Search mode",
        }
    }

    /// Whether the live line is edited directly in this mode
    pub fn edits_live_line(self) -> bool {
        !matches!(self, Mode::History)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Normal => "normal",
            Mode::Completion => "completion",
            Mode::Escape => "escape",
            Mode::History => "history",
            Mode::Search => "search",
        };
        f.write_str(name)
    }
}
