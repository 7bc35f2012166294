//! The set of panes making up the screen, and their rendering

use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::config::PaneLayout;
use crate::model::line::{Line, LineStyle};
use crate::view::pane::Pane;
use crate::view::STATUS_PANE;

pub struct Interface {
    panes: Vec<Pane>,
    colors: bool,
}

impl Interface {
    pub fn new(layouts: Vec<PaneLayout>, colors: bool) -> Self {
        Self {
            panes: layouts.into_iter().map(Pane::new).collect(),
            colors,
        }
    }

    pub fn pane(&self, name: &str) -> Option<&Pane> {
        self.panes.iter().find(|p| p.name() == name)
    }

    pub fn pane_mut(&mut self, name: &str) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|p| p.name() == name)
    }

    /// Queue `lines` on the pane `name`. Returns false if there is no such pane.
    pub fn write(&self, name: &str, lines: &[Line]) -> bool {
        match self.pane(name) {
            Some(pane) => {
                pane.write(lines);
                true
            }
            None => {
                tracing::warn!("No pane named \"{}\"", name);
                false
            }
        }
    }

    /// Queue plain text rows on the pane `name`
    pub fn write_text<S: AsRef<str>>(&self, name: &str, texts: &[S]) -> bool {
        match self.pane(name) {
            Some(pane) => {
                pane.write_text(texts);
                true
            }
            None => {
                tracing::warn!("No pane named \"{}\"", name);
                false
            }
        }
    }

    /// Drain every pane queue. Returns whether any pane changed.
    pub fn redraw(&mut self) -> bool {
        self.panes
            .iter_mut()
            .fold(false, |changed, pane| pane.redraw() || changed)
    }

    fn row_style(&self, pane: &Pane, style: LineStyle) -> Style {
        let mut result = Style::default();
        if self.colors && pane.name() == STATUS_PANE {
            result = result.fg(Color::Red);
        }
        if style.bold {
            result = result.add_modifier(Modifier::BOLD);
        }
        if style.highlighted {
            result = result.add_modifier(Modifier::REVERSED);
        }
        result
    }

    fn title_style(&self) -> Style {
        let style = Style::default().add_modifier(Modifier::BOLD);
        if self.colors {
            style.fg(Color::Cyan)
        } else {
            style
        }
    }

    /// Draw every pane, and place the cursor in the first pane that shows one
    pub fn render(&self, frame: &mut Frame) {
        let screen = frame.area();
        let mut cursor_placed = false;

        for pane in &self.panes {
            let area = pane.area().intersection(screen);
            if area.is_empty() {
                continue;
            }

            let mut text = Vec::new();
            if pane.has_title_row() {
                let title = pane.title().unwrap_or_default().to_string();
                text.push(TextLine::from(Span::styled(title, self.title_style())));
            }
            let content = pane.frame();
            text.extend(content.rows.iter().map(|row| {
                TextLine::from(Span::styled(row.text.clone(), self.row_style(pane, row.style)))
            }));
            frame.render_widget(Paragraph::new(text), area);

            if cursor_placed || !pane.cursor_enabled() {
                continue;
            }
            if let Some((row, col)) = content.cursor {
                let y = area.y + row + u16::from(pane.has_title_row());
                let x = area.x + col;
                if within(area, x, y) {
                    frame.set_cursor_position(Position::new(x, y));
                    cursor_placed = true;
                }
            }
        }
    }
}

fn within(area: Rect, x: u16, y: u16) -> bool {
    x < area.right() && y < area.bottom()
}
