//! Submitted command history
//!
//! Entries are unique: submitting a line that is already known moves it to
//! the end instead of storing a second copy. The browse cursor is used by the
//! history mode of the command line.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the history file in the user's home directory
pub const HISTORY_FILE_NAME: &str = ".sercom_history";

#[derive(Debug)]
pub enum HistoryError {
    /// Reading or writing the history file failed
    Io { path: PathBuf, source: io::Error },
    /// History search is not available yet
    SearchUnsupported,
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            HistoryError::SearchUnsupported => write!(f, "history search is not supported"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::Io { source, .. } => Some(source),
            HistoryError::SearchUnsupported => None,
        }
    }
}

#[derive(Debug)]
pub struct History {
    entries: Vec<String>,
    /// Browse cursor, -1 while the history is empty
    pos: isize,
    file: Option<PathBuf>,
    persist: bool,
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            pos: -1,
            file: None,
            persist: false,
        }
    }

    /// Build a history holding `entries`, without persistence
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut history = Self::new();
        history.entries = entries.into_iter().map(Into::into).collect();
        history.reset();
        history
    }

    /// Default history file location, `$HOME/.sercom_history`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pos(&self) -> isize {
        self.pos
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Record a submitted line.
    ///
    /// Empty lines are ignored. An existing copy of `line` is moved to the
    /// end. The file is rewritten whenever the entries changed.
    pub fn append(&mut self, line: &str) -> Result<(), HistoryError> {
        if line.is_empty() {
            return Ok(());
        }

        let changed = match self.entries.iter().position(|entry| entry == line) {
            Some(idx) if idx + 1 == self.entries.len() => {
                tracing::debug!("\"{}\" already in history", line);
                false
            }
            Some(idx) => {
                tracing::debug!("\"{}\" already in history at {}, moving it", line, idx);
                self.entries.remove(idx);
                true
            }
            None => true,
        };

        if changed {
            self.entries.push(line.to_string());
        }
        self.reset();

        if changed {
            self.save()?;
        }
        Ok(())
    }

    /// The entry under the browse cursor
    pub fn line_current(&self) -> Option<&str> {
        usize::try_from(self.pos)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .map(String::as_str)
    }

    /// Move the browse cursor by `shift`.
    ///
    /// Returns `false` when the cursor ran past the newest entry, in which
    /// case it stays on the newest entry.
    pub fn pos_update(&mut self, shift: isize) -> bool {
        self.pos += shift;
        if self.pos < 0 {
            self.pos = 0;
            return true;
        }
        if self.pos >= self.entries.len() as isize {
            self.pos = (self.entries.len() as isize - 1).max(0);
            return false;
        }
        tracing::trace!("History idx at {}/{}", self.pos, self.entries.len() - 1);
        true
    }

    /// Load entries from `file`, or from the default file.
    ///
    /// The loaded entries are added after the existing ones. A missing
    /// default file is not an error since it is created on the first save.
    pub fn load(&mut self, persist: bool, file: Option<PathBuf>) -> Result<(), HistoryError> {
        let (path, tolerate_missing) = match file {
            Some(path) => (Some(path), false),
            None => (Self::default_path(), true),
        };
        self.persist = persist;
        self.file = path.clone();
        if !persist {
            return Ok(());
        }

        let Some(path) = path else {
            tracing::warn!("No home directory, history will not be saved");
            return Ok(());
        };
        self.read_file(&path, tolerate_missing)
    }

    fn read_file(&mut self, path: &Path, tolerate_missing: bool) -> Result<(), HistoryError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if tolerate_missing && e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No history file at {}", path.display());
                return Ok(());
            }
            Err(source) => {
                return Err(HistoryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        self.entries.extend(
            contents
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(String::from),
        );
        tracing::debug!("Loaded {} history entries from {}", self.len(), path.display());
        self.reset();
        Ok(())
    }

    /// Put the browse cursor back on the newest entry
    pub fn reset(&mut self) {
        self.pos = self.entries.len() as isize - 1;
    }

    /// Write all entries to the history file, when persistence is enabled
    pub fn save(&self) -> Result<(), HistoryError> {
        let Some(path) = self.file.as_ref().filter(|_| self.persist) else {
            return Ok(());
        };
        let contents: String = self.entries.iter().map(|e| format!("{e}\n")).collect();
        std::fs::write(path, contents).map_err(|source| HistoryError::Io {
            path: path.clone(),
            source,
        })
    }

    /// Entries matching `content`
    pub fn search(&self, _content: &str) -> Result<Vec<String>, HistoryError> {
        Err(HistoryError::SearchUnsupported)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
