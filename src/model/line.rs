//! Editable line buffer
//!
//! A [`Line`] couples a logical text buffer and a cursor with the fixed-width
//! screen area it is displayed in. All offsets are in characters.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::primitives::line_wrapping::{tail, wrap_chunks};

/// Prompt used for numbered editable lines
pub const PROMPT_LINE: &str = "line";
/// Prompt used for rows of the history browser
pub const PROMPT_HISTORY: &str = "History";

/// Screen position as `(row, col)` relative to the first row of the line
pub type ScreenPos = (usize, usize);

/// Cursor movement requests understood by [`Line::update_pos`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Home,
    End,
    Left,
    Right,
    /// Relative shift, clamped to the content bounds
    Shift(isize),
}

/// Display attributes of a line. The default is the normal style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStyle {
    pub bold: bool,
    pub highlighted: bool,
}

#[derive(Clone)]
pub struct Line {
    content: String,
    pos: usize,
    cols: usize,
    rows: usize,
    prompt: String,
    style: LineStyle,
}

impl Line {
    /// Create an empty line for a screen area of `rows` x `cols`
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_content(rows, cols, "")
    }

    /// Create a line holding `content`, with the cursor at its end
    pub fn with_content(rows: usize, cols: usize, content: impl Into<String>) -> Self {
        let content = content.into();
        let pos = content.chars().count();
        Self {
            content,
            pos,
            cols,
            rows,
            prompt: String::new(),
            style: LineStyle::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Number of characters in the content, prompt excluded
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Cursor offset in characters
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn style(&self) -> LineStyle {
        self.style
    }

    pub fn bold(&mut self) {
        self.style.bold = true;
    }

    pub fn highlight(&mut self) {
        self.style.highlighted = true;
    }

    /// Back to the normal style
    pub fn normal(&mut self) {
        self.style = LineStyle::default();
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Number the line using the `line {n:5}: ` format
    pub fn prompt_set(&mut self, num: usize) {
        self.prompt = format!("{PROMPT_LINE} {num:5}: ");
    }

    /// Insert `text` at the cursor and move the cursor after it
    pub fn write(&mut self, text: &str) -> ScreenPos {
        let offset = self.byte_offset(self.pos);
        self.content.insert_str(offset, text);
        self.pos += text.chars().count();
        self.screen_pos()
    }

    /// Remove up to `num` characters before the cursor
    pub fn delete(&mut self, num: usize) -> ScreenPos {
        let num = num.min(self.pos);
        tracing::trace!("Deleting {} character(s) from pos {}", num, self.pos);
        let start = self.byte_offset(self.pos - num);
        let end = self.byte_offset(self.pos);
        self.content.replace_range(start..end, "");
        self.pos -= num;
        self.screen_pos()
    }

    /// Replace the whole content, keeping the prompt and style
    pub fn overwrite(&mut self, content: &str) -> ScreenPos {
        self.content = content.to_string();
        self.pos = self.len();
        self.screen_pos()
    }

    pub fn update_pos(&mut self, request: CursorMove) -> ScreenPos {
        let len = self.len();
        self.pos = match request {
            CursorMove::Home => 0,
            CursorMove::End => len,
            CursorMove::Left => self.pos.saturating_sub(1),
            CursorMove::Right => (self.pos + 1).min(len),
            CursorMove::Shift(shift) => self.pos.saturating_add_signed(shift).min(len),
        };
        self.screen_pos()
    }

    /// Prompt and content split into rows of the line width.
    ///
    /// # Panics
    ///
    /// Panics if the cursor lies outside of the prompt and content, which
    /// means the cursor state got out of sync with the buffer.
    pub fn content(&self) -> Vec<String> {
        assert!(
            self.pos <= self.len() + self.prompt.chars().count(),
            "cursor {} outside of line {:?}",
            self.pos,
            self
        );
        wrap_chunks(&format!("{}{}", self.prompt, self.content), self.cols)
    }

    /// The last `max` rows of [`Line::content`], defaulting to the line height
    pub fn get(&self, max: Option<usize>) -> Vec<String> {
        tail(self.content(), max.unwrap_or(self.rows))
    }

    pub fn screen_pos(&self) -> ScreenPos {
        let total = self.pos + self.prompt.chars().count();
        let cols = self.cols.max(1);
        (total / cols, total % cols)
    }

    fn byte_offset(&self, char_pos: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_pos)
            .map_or(self.content.len(), |(offset, _)| offset)
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}

impl Eq for Line {}

impl PartialEq<str> for Line {
    fn eq(&self, other: &str) -> bool {
        self.content == other
    }
}

impl Hash for Line {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content.hash(state);
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Line")
            .field("content", &self.content)
            .field("pos", &self.pos)
            .field("prompt", &self.prompt)
            .finish()
    }
}
