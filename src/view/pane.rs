//! Named pane with a queued redraw
//!
//! Writing to a pane composes the visible rows and pushes them on the pane's
//! channel. Nothing is displayed until the UI loop calls [`Pane::redraw`],
//! which keeps the most recent frame. A [`PaneWriter`] can be moved to
//! another thread to feed a pane without sharing it.

use std::sync::mpsc;

use ratatui::layout::Rect;

use crate::config::PaneLayout;
use crate::model::line::{Line, LineStyle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneRow {
    pub text: String,
    pub style: LineStyle,
}

/// Rows to display below the title, and where the cursor sits among them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaneFrame {
    pub rows: Vec<PaneRow>,
    /// `(row, col)` relative to the first content row
    pub cursor: Option<(u16, u16)>,
}

/// Sending half of a pane, able to create lines of the pane's geometry
#[derive(Debug, Clone)]
pub struct PaneWriter {
    name: String,
    sender: mpsc::Sender<PaneFrame>,
    rows: usize,
    cols: usize,
    numbered: bool,
}

impl PaneWriter {
    /// Create a line sized for the pane, numbered `num` if the pane shows prompts
    pub fn line_create(&self, content: &str, num: usize) -> Line {
        let mut line = Line::with_content(self.rows, self.cols, content);
        if self.numbered {
            line.prompt_set(num);
        }
        line
    }

    /// Lay out `lines` bottom-up: the last line is always visible and older
    /// lines fill the remaining rows. Lines that cannot show are not visited.
    pub fn compose<'a, I>(&self, lines: I) -> PaneFrame
    where
        I: IntoIterator<Item = &'a Line>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut quota = self.rows;
        let mut blocks = Vec::new();
        let mut cursor_in_last = None;

        for (idx, line) in lines.into_iter().rev().enumerate() {
            if quota == 0 {
                break;
            }
            let rows = line.get(Some(quota));
            if idx == 0 {
                let (row, col) = line.screen_pos();
                let hidden = line.content().len() - rows.len();
                cursor_in_last = Some((row.saturating_sub(hidden), col));
            }
            quota -= rows.len();
            blocks.push(
                rows.into_iter()
                    .map(|text| PaneRow {
                        text,
                        style: line.style(),
                    })
                    .collect::<Vec<_>>(),
            );
        }

        let last_len = blocks.first().map_or(0, Vec::len);
        let rows: Vec<PaneRow> = blocks.into_iter().rev().flatten().collect();
        let last_start = rows.len() - last_len;
        let max_row = self.rows.saturating_sub(1);
        let max_col = self.cols.saturating_sub(1);
        let cursor = cursor_in_last.map(|(row, col)| {
            (
                (last_start + row).min(max_row) as u16,
                col.min(max_col) as u16,
            )
        });

        PaneFrame { rows, cursor }
    }

    /// Queue `lines` for display
    pub fn write<'a, I>(&self, lines: I)
    where
        I: IntoIterator<Item = &'a Line>,
        I::IntoIter: DoubleEndedIterator,
    {
        if self.sender.send(self.compose(lines)).is_err() {
            tracing::trace!("Pane {} is gone, dropping frame", self.name);
        }
    }
}

#[derive(Debug)]
pub struct Pane {
    layout: PaneLayout,
    title: Option<String>,
    cursor_enabled: bool,
    frame: PaneFrame,
    sender: mpsc::Sender<PaneFrame>,
    receiver: mpsc::Receiver<PaneFrame>,
}

impl Pane {
    pub fn new(layout: PaneLayout) -> Self {
        let (sender, receiver) = mpsc::channel();
        tracing::debug!(
            "{} pane: {}x{}@{}x{}",
            layout.name,
            layout.lines,
            layout.cols,
            layout.posy,
            layout.posx
        );
        let mut pane = Self {
            title: None,
            cursor_enabled: layout.cursor,
            layout,
            frame: PaneFrame::default(),
            sender,
            receiver,
        };
        if let Some(title) = pane.layout.title.clone() {
            pane.set_title(&title);
        }
        pane
    }

    pub fn name(&self) -> &str {
        &self.layout.name
    }

    /// Whether the first row of the pane is reserved for the title
    pub fn has_title_row(&self) -> bool {
        self.layout.title.is_some()
    }

    /// Rows available for content
    pub fn content_rows(&self) -> usize {
        usize::from(self.layout.lines).saturating_sub(usize::from(self.has_title_row()))
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the title, cut to the pane width
    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.chars().take(usize::from(self.layout.cols)).collect());
    }

    pub fn cursor_enabled(&self) -> bool {
        self.cursor_enabled
    }

    pub fn cursor_enable(&mut self, enabled: bool) {
        self.cursor_enabled = enabled;
    }

    pub fn writer(&self) -> PaneWriter {
        PaneWriter {
            name: self.layout.name.clone(),
            sender: self.sender.clone(),
            rows: self.content_rows(),
            cols: usize::from(self.layout.cols),
            numbered: self.layout.prompt,
        }
    }

    pub fn line_create(&self, content: &str, num: usize) -> Line {
        self.writer().line_create(content, num)
    }

    pub fn write<'a, I>(&self, lines: I)
    where
        I: IntoIterator<Item = &'a Line>,
        I::IntoIter: DoubleEndedIterator,
    {
        self.writer().write(lines);
    }

    /// Queue plain text rows, numbered from 1
    pub fn write_text<S: AsRef<str>>(&self, texts: &[S]) {
        let writer = self.writer();
        let lines: Vec<Line> = texts
            .iter()
            .enumerate()
            .map(|(idx, text)| writer.line_create(text.as_ref(), idx + 1))
            .collect();
        writer.write(&lines);
    }

    /// Take the most recent queued frame. Returns whether anything changed.
    pub fn redraw(&mut self) -> bool {
        let mut changed = false;
        while let Ok(frame) = self.receiver.try_recv() {
            self.frame = frame;
            changed = true;
        }
        changed
    }

    pub fn frame(&self) -> &PaneFrame {
        &self.frame
    }

    /// Screen area of the pane
    pub fn area(&self) -> Rect {
        Rect::new(
            self.layout.posx,
            self.layout.posy,
            self.layout.cols,
            self.layout.lines,
        )
    }
}
