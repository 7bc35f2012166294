//! Command line session
//!
//! The [`Session`] owns everything the keystroke handlers mutate: the active
//! [`Mode`], the live line, the most recent committed lines, and the
//! history. It queues committed lines on the transport and collects messages for the status
//! pane, which the caller drains with [`Session::take_messages`].

use crate::input::command::{self, Handled};
use crate::input::completion::{common_prefix, CompletionTree};
use crate::input::key::Key;
use crate::input::mode::Mode;
use crate::model::history::History;
use crate::model::line::{CursorMove, Line, PROMPT_HISTORY};
use crate::services::serial::TransportHandle;
use crate::services::status_log::USER_TARGET;
use crate::services::termination::TerminationSignal;
use crate::view::pane::{Pane, PaneWriter};

/// Committed lines kept for display
pub const MAX_COMMITTED_LINES: usize = 5000;

pub struct Session {
    mode: Mode,
    line_current: Line,
    lines: Vec<Line>,
    committed: usize,
    history: History,
    completion: CompletionTree,
    transport: TransportHandle,
    termination: TerminationSignal,
    writer: PaneWriter,
    messages: Vec<String>,
}

impl Session {
    /// Create a session drawing on the pane behind `writer`
    pub fn new(
        writer: PaneWriter,
        history: History,
        completion: CompletionTree,
        transport: TransportHandle,
        termination: TerminationSignal,
    ) -> Self {
        Self {
            mode: Mode::default(),
            line_current: writer.line_create("", 1),
            lines: Vec::new(),
            committed: 0,
            history,
            completion,
            transport,
            termination,
            writer,
            messages: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Title of the command pane for the active mode
    pub fn title(&self) -> &'static str {
        self.mode.title()
    }

    pub fn line_current(&self) -> &Line {
        &self.line_current
    }

    pub fn line_current_mut(&mut self) -> &mut Line {
        &mut self.line_current
    }

    /// The most recent committed lines, oldest first
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_set()
    }

    /// Show `message` in the status pane
    pub fn notify(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Status messages produced since the last call
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    /// Switch to `mode`. Requesting the active mode does nothing, and
    /// history mode is refused while the history is empty.
    pub fn mode_set(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        if mode == Mode::History && self.history.is_empty() {
            self.notify("No command in history");
            return;
        }

        tracing::info!("Switching from {} to {} mode", self.mode, mode);
        if mode == Mode::History {
            self.history.reset();
        }
        self.mode = mode;
    }

    /// Commit the live line, or the browsed entry in history mode
    pub fn newline(&mut self) {
        let text = if self.mode == Mode::History {
            self.history.line_current().unwrap_or_default().to_string()
        } else {
            self.line_current.as_str().to_string()
        };
        self.commit(&text);
    }

    fn commit(&mut self, text: &str) {
        tracing::debug!("Committing \"{}\"", text);
        self.push_line(text);
        self.transport.write(text);
        if let Err(e) = self.history.append(text) {
            self.notify(format!("Failed to add to history: {e}"));
        }
    }

    /// Add `text` below the committed lines and start a fresh live line
    fn push_line(&mut self, text: &str) {
        self.committed += 1;
        self.lines.push(self.writer.line_create(text, self.committed));
        if self.lines.len() > MAX_COMMITTED_LINES {
            let excess = self.lines.len() - MAX_COMMITTED_LINES;
            self.lines.drain(..excess);
        }
        self.line_current = self.writer.line_create("", self.committed + 1);
    }

    /// Replace the live line with `content`
    pub fn overwrite(&mut self, content: &str) {
        self.line_current.overwrite(content);
    }

    /// Continue editing from the browsed history entry
    pub fn edit_browsed(&mut self) {
        if let Some(entry) = self.history.line_current().map(str::to_string) {
            self.overwrite(&entry);
        }
    }

    pub fn pos_update(&mut self, request: CursorMove) {
        self.line_current.update_pos(request);
    }

    pub fn terminate(&mut self) {
        tracing::info!("Terminating session");
        self.termination.trigger();
    }

    /// Complete the live line from the completion tree
    pub fn complete(&mut self) {
        let (prefix, candidates) = self.completion.search(self.line_current.as_str());
        match candidates.as_slice() {
            [] => self.notify("No completion"),
            [only] => {
                let completed = format!("{prefix}{only} ");
                self.overwrite(&completed);
            }
            _ => {
                let extended = format!("{prefix}{}", common_prefix(&candidates));
                if extended.len() > self.line_current.as_str().len() {
                    self.overwrite(&extended);
                }
                self.notify(format!("Completions: {}", candidates.join(" ")));
            }
        }
    }

    /// History search is not available yet
    pub fn search(&mut self) -> Handled {
        tracing::debug!("Search requested for \"{}\"", self.line_current);
        if let Err(e) = self.history.search(self.line_current.as_str()) {
            tracing::debug!("{}", e);
        }
        Handled::Partial
    }

    /// Process one key. Returns whether the key was handled, possibly partially.
    pub fn handle_key(&mut self, key: Key) -> bool {
        match command::handle(self.mode, key, self) {
            Ok(Handled::Complete) => true,
            Ok(Handled::Partial) => {
                self.notify(format!(
                    "Line functionality {} not fully implemented yet",
                    key.describe()
                ));
                true
            }
            Err(rejected) => {
                tracing::warn!(target: USER_TARGET, "{} in {} mode", rejected, rejected.mode);
                self.notify(rejected.to_string());
                false
            }
        }
    }

    /// Show every complete line of `input` as committed, without sending it
    /// or recording it in the history. A trailing partial line becomes the
    /// live line.
    pub fn preload(&mut self, input: &str) {
        let mut rest = input;
        while let Some((line, tail)) = rest.split_once('\n') {
            self.push_line(line.trim_end_matches('\r'));
            rest = tail;
        }
        if !rest.is_empty() {
            self.overwrite(rest);
        }
    }

    /// Redraw the command pane: the history browser in history mode,
    /// otherwise the committed lines followed by the live line
    pub fn update(&self, pane: &mut Pane) {
        pane.set_title(self.title());

        if self.mode == Mode::History {
            let browsed = usize::try_from(self.history.pos()).ok();
            let rows: Vec<Line> = self
                .history
                .entries()
                .iter()
                .enumerate()
                .map(|(idx, entry)| {
                    let mut line = self.writer.line_create(entry, idx + 1);
                    line.set_prompt(format!("{PROMPT_HISTORY} {:5}: ", idx + 1));
                    if Some(idx) == browsed {
                        line.highlight();
                    }
                    line
                })
                .collect();
            pane.cursor_enable(false);
            pane.write(&rows);
            return;
        }

        pane.cursor_enable(true);
        pane.write(self.lines.iter().chain(std::iter::once(&self.line_current)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaneLayout;
    use crate::primitives::ascii;
    use std::sync::mpsc;

    struct Fixture {
        session: Session,
        pane: Pane,
        outbound: mpsc::Receiver<String>,
    }

    fn fixture(history: History, completion: CompletionTree) -> Fixture {
        let pane = Pane::new(PaneLayout {
            name: "command".to_string(),
            cols: 40,
            lines: 10,
            posy: 0,
            posx: 0,
            title: Some("Commands".to_string()),
            cursor: true,
            prompt: true,
        });
        let (transport, outbound) = TransportHandle::channel();
        let session = Session::new(
            pane.writer(),
            history,
            completion,
            transport,
            TerminationSignal::new(),
        );
        Fixture {
            session,
            pane,
            outbound,
        }
    }

    fn type_text(session: &mut Session, text: &str) {
        for c in text.chars() {
            assert!(session.handle_key(Key::Char(c)));
        }
    }

    fn tree() -> CompletionTree {
        serde_json::from_str(
            r#"{"help": ["all", "abort"], "mmc": {"dev": ["0", "1"], "list": []}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_commit_queues_and_records() {
        let mut f = fixture(History::new(), CompletionTree::default());
        type_text(&mut f.session, "version");
        f.session.handle_key(Key::Char(ascii::CR));

        assert_eq!(f.outbound.try_recv().unwrap(), "version");
        assert_eq!(f.session.history().entries(), ["version"]);
        assert_eq!(f.session.lines().len(), 1);
        assert!(f.session.line_current().is_empty());
        assert_eq!(f.session.line_current().prompt(), "line     2: ");
    }

    #[test]
    fn test_empty_history_refuses_history_mode() {
        let mut f = fixture(History::new(), CompletionTree::default());
        f.session.handle_key(Key::Up);
        assert_eq!(f.session.mode(), Mode::Normal);
        assert_eq!(f.session.take_messages(), vec!["No command in history"]);
    }

    #[test]
    fn test_history_browse_and_edit() {
        let history = History::from_entries(["ls", "reset"]);
        let mut f = fixture(history, CompletionTree::default());

        f.session.handle_key(Key::Up);
        assert_eq!(f.session.mode(), Mode::History);
        assert_eq!(f.session.title(), "History mode");
        assert_eq!(f.session.history().line_current(), Some("reset"));

        f.session.handle_key(Key::Up);
        assert_eq!(f.session.history().line_current(), Some("ls"));

        f.session.handle_key(Key::Char('x'));
        assert_eq!(f.session.mode(), Mode::Normal);
        assert_eq!(f.session.line_current().as_str(), "lsx");
    }

    #[test]
    fn test_history_down_past_newest_returns_to_normal() {
        let history = History::from_entries(["ls"]);
        let mut f = fixture(history, CompletionTree::default());
        f.session.handle_key(Key::Up);
        f.session.handle_key(Key::Down);
        assert_eq!(f.session.mode(), Mode::Normal);
    }

    #[test]
    fn test_history_commit_sends_browsed_entry() {
        let history = History::from_entries(["ls", "reset"]);
        let mut f = fixture(history, CompletionTree::default());
        type_text(&mut f.session, "ignored");
        f.session.handle_key(Key::Up);
        f.session.handle_key(Key::Up);
        f.session.handle_key(Key::Char(ascii::CR));

        assert_eq!(f.outbound.try_recv().unwrap(), "ls");
        assert_eq!(f.session.mode(), Mode::Normal);
        assert_eq!(f.session.history().entries(), ["reset", "ls"]);
    }

    #[test]
    fn test_history_backspace_edits_copy() {
        let history = History::from_entries(["reset"]);
        let mut f = fixture(history, CompletionTree::default());
        f.session.handle_key(Key::Up);
        f.session.handle_key(Key::Backspace);
        assert_eq!(f.session.mode(), Mode::Normal);
        assert_eq!(f.session.line_current().as_str(), "rese");
    }

    #[test]
    fn test_rejected_key_leaves_state() {
        let mut f = fixture(History::new(), CompletionTree::default());
        type_text(&mut f.session, "ab");
        assert!(!f.session.handle_key(Key::PageUp));
        assert_eq!(f.session.line_current().as_str(), "ab");
        assert_eq!(
            f.session.take_messages(),
            vec!["Line functionality KEY_PPAGE (339) not implemented yet"]
        );
    }

    #[test]
    fn test_search_is_partial() {
        let mut f = fixture(History::new(), CompletionTree::default());
        assert!(f.session.handle_key(Key::Char(ascii::DC2)));
        assert_eq!(f.session.mode(), Mode::Search);
        let messages = f.session.take_messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].ends_with("not fully implemented yet"));
    }

    #[test]
    fn test_escape_then_bel_returns_to_normal() {
        let mut f = fixture(History::new(), CompletionTree::default());
        f.session.handle_key(Key::Char(ascii::ESC));
        assert_eq!(f.session.title(), "(escaped mode) commands");
        f.session.handle_key(Key::Char(ascii::BEL));
        assert_eq!(f.session.mode(), Mode::Normal);
    }

    #[test]
    fn test_completion_single_candidate() {
        let mut f = fixture(History::new(), tree());
        type_text(&mut f.session, "mmc l");
        f.session.handle_key(Key::Char(ascii::HT));
        assert_eq!(f.session.mode(), Mode::Completion);
        assert_eq!(f.session.line_current().as_str(), "mmc list ");
    }

    #[test]
    fn test_completion_common_prefix() {
        let mut f = fixture(History::new(), tree());
        type_text(&mut f.session, "help a");
        f.session.handle_key(Key::Char(ascii::HT));
        assert_eq!(f.session.line_current().as_str(), "help a");
        assert_eq!(f.session.take_messages(), vec!["Completions: all abort"]);

        let mut f = fixture(History::new(), tree());
        type_text(&mut f.session, "m");
        f.session.handle_key(Key::Char(ascii::HT));
        assert_eq!(f.session.line_current().as_str(), "mmc ");
    }

    #[test]
    fn test_completion_none() {
        let mut f = fixture(History::new(), tree());
        type_text(&mut f.session, "zz");
        f.session.handle_key(Key::Char(ascii::HT));
        assert_eq!(f.session.take_messages(), vec!["No completion"]);
        assert_eq!(f.session.line_current().as_str(), "zz");
    }

    #[test]
    fn test_terminate() {
        let mut f = fixture(History::new(), CompletionTree::default());
        assert!(!f.session.is_terminated());
        f.session.handle_key(Key::Char(ascii::EOT));
        assert!(f.session.is_terminated());
    }

    #[test]
    fn test_commit_returns_to_normal() {
        for (key, mode) in [
            (ascii::HT, Mode::Completion),
            (ascii::ESC, Mode::Escape),
            (ascii::DC2, Mode::Search),
        ] {
            let mut f = fixture(History::new(), CompletionTree::default());
            f.session.handle_key(Key::Char(key));
            assert_eq!(f.session.mode(), mode);
            type_text(&mut f.session, "ls");
            f.session.handle_key(Key::Char(ascii::NL));

            assert_eq!(f.outbound.try_recv().unwrap(), "ls");
            assert_eq!(f.session.mode(), Mode::Normal);
            assert_eq!(f.session.title(), "Commands");
        }
    }

    #[test]
    fn test_history_failure_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("history");
        std::fs::write(&path, "").unwrap();
        let mut history = History::new();
        history.load(true, Some(path.clone())).unwrap();
        // The file turns into a directory, so saving fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let mut f = fixture(history, CompletionTree::default());
        type_text(&mut f.session, "ls");
        f.session.handle_key(Key::Char(ascii::CR));

        assert_eq!(f.outbound.try_recv().unwrap(), "ls");
        assert_eq!(f.session.lines().len(), 1);
        let messages = f.session.take_messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Failed to add to history: "));
        assert!(messages[0].contains(&path.display().to_string()));
    }

    #[test]
    fn test_preload() {
        let mut f = fixture(History::new(), CompletionTree::default());
        f.session.preload("setenv a 1\r\nboot\npartial");
        assert!(f.outbound.try_recv().is_err());
        assert!(f.session.history().is_empty());

        let lines: Vec<&str> = f.session.lines().iter().map(Line::as_str).collect();
        assert_eq!(lines, vec!["setenv a 1", "boot"]);
        assert_eq!(f.session.line_current().as_str(), "partial");
        assert_eq!(f.session.line_current().prompt(), "line     3: ");
    }

    #[test]
    fn test_committed_lines_are_capped() {
        let mut f = fixture(History::new(), CompletionTree::default());
        let input: String = (0..MAX_COMMITTED_LINES + 3)
            .map(|idx| format!("{idx}\n"))
            .collect();
        f.session.preload(&input);

        let lines = f.session.lines();
        assert_eq!(lines.len(), MAX_COMMITTED_LINES);
        assert_eq!(lines[0].as_str(), "3");
        assert_eq!(lines[0].prompt(), "line     4: ");
        assert_eq!(f.session.line_current().prompt(), "line  5004: ");

        f.session.update(&mut f.pane);
        assert!(f.pane.redraw());
        let rows = &f.pane.frame().rows;
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[8].text, "line  5004: ");
        assert_eq!(rows[7].text, "line  5003: 5002");
    }

    #[test]
    fn test_update_history_view() {
        let history = History::from_entries(["ls", "reset"]);
        let mut f = fixture(history, CompletionTree::default());
        f.session.handle_key(Key::Up);
        f.session.update(&mut f.pane);
        assert!(f.pane.redraw());

        assert!(!f.pane.cursor_enabled());
        assert_eq!(f.pane.title(), Some("History mode"));
        let rows = &f.pane.frame().rows;
        assert_eq!(rows[0].text, "History     1: ls");
        assert!(!rows[0].style.highlighted);
        assert_eq!(rows[1].text, "History     2: reset");
        assert!(rows[1].style.highlighted);
    }

    #[test]
    fn test_update_command_view() {
        let mut f = fixture(History::new(), CompletionTree::default());
        type_text(&mut f.session, "ls");
        f.session.handle_key(Key::Char(ascii::CR));
        type_text(&mut f.session, "pw");
        f.session.update(&mut f.pane);
        assert!(f.pane.redraw());

        assert!(f.pane.cursor_enabled());
        let frame = f.pane.frame();
        let rows: Vec<&str> = frame.rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(rows, vec!["line     1: ls", "line     2: pw"]);
        assert_eq!(frame.cursor, Some((1, 14)));
    }
}
