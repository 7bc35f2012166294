//! Application state driven by the UI loop
//!
//! [`App`] ties the [`Session`] to the panes it draws on, collects status
//! messages from the session and the tracing status layer, and watches the
//! serial worker.

pub mod session;

use std::thread::JoinHandle;

use anyhow::{Context, Result};
use ratatui::Frame;

use crate::input::completion::CompletionTree;
use crate::input::key::Key;
use crate::model::history::History;
use crate::services::serial::{TransportError, TransportHandle};
use crate::services::status_log::StatusLogHandle;
use crate::services::termination::TerminationSignal;
use crate::view::interface::Interface;
use crate::view::{COMMAND_PANE, STATUS_PANE};

pub use session::Session;

/// Status messages kept for display
const MAX_STATUS_MESSAGES: usize = 100;

pub struct App {
    session: Session,
    interface: Interface,
    status: Vec<String>,
    status_log: Option<StatusLogHandle>,
    worker: Option<JoinHandle<Result<(), TransportError>>>,
    termination: TerminationSignal,
}

impl App {
    pub fn new(
        interface: Interface,
        history: History,
        completion: CompletionTree,
        transport: TransportHandle,
        termination: TerminationSignal,
    ) -> Result<Self> {
        let writer = interface
            .pane(COMMAND_PANE)
            .map(|pane| pane.writer())
            .context("No command pane in the interface")?;
        let session = Session::new(
            writer,
            history,
            completion,
            transport,
            termination.clone(),
        );

        let mut app = Self {
            session,
            interface,
            status: Vec::new(),
            status_log: None,
            worker: None,
            termination,
        };
        app.refresh();
        Ok(app)
    }

    /// Mirror the WARN+ log events received on `handle`
    pub fn attach_status_log(&mut self, handle: StatusLogHandle) {
        self.status_log = Some(handle);
    }

    /// Watch the serial worker; its failure ends the application
    pub fn attach_worker(&mut self, worker: JoinHandle<Result<(), TransportError>>) {
        self.worker = Some(worker);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    /// Messages currently in the status pane, oldest first
    pub fn status_messages(&self) -> &[String] {
        &self.status
    }

    /// Show `message` in the status pane
    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.push_status(message.into());
        self.write_status();
    }

    fn push_status(&mut self, message: String) {
        self.status.push(message);
        if self.status.len() > MAX_STATUS_MESSAGES {
            self.status.remove(0);
        }
    }

    fn write_status(&self) {
        self.interface.write_text(STATUS_PANE, &self.status);
    }

    pub fn handle_key(&mut self, key: Key) {
        self.session.handle_key(key);
        self.refresh();
    }

    /// Show preloaded input, see [`Session::preload`]
    pub fn preload(&mut self, input: &str) {
        self.session.preload(input);
        self.refresh();
    }

    /// Push the session state to its panes
    fn refresh(&mut self) {
        let messages = self.session.take_messages();
        if !messages.is_empty() {
            for message in messages {
                self.push_status(message);
            }
            self.write_status();
        }
        if let Some(pane) = self.interface.pane_mut(COMMAND_PANE) {
            self.session.update(pane);
        }
    }

    /// Pick up log messages and check on the serial worker.
    ///
    /// Returns an error when the worker stopped on its own because of a
    /// failure.
    pub fn process_async_messages(&mut self) -> Result<()> {
        let logged = self
            .status_log
            .as_ref()
            .map(StatusLogHandle::drain)
            .unwrap_or_default();
        if !logged.is_empty() {
            for message in logged {
                self.push_status(message);
            }
            self.write_status();
        }

        if !self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            return Ok(());
        }
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.join() {
            Ok(result) => result.context("Serial worker failed"),
            Err(_) => anyhow::bail!("Serial worker panicked"),
        }
    }

    pub fn should_quit(&self) -> bool {
        self.session.is_terminated()
    }

    /// Apply queued pane updates and draw the screen
    pub fn render(&mut self, frame: &mut Frame) {
        self.interface.redraw();
        self.interface.render(frame);
    }

    /// Stop the serial worker and wait for it
    pub fn shutdown(&mut self) {
        self.termination.trigger();
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(Ok(())) => tracing::debug!("Serial worker joined"),
                Ok(Err(e)) => tracing::warn!("Serial worker failed: {}", e),
                Err(_) => tracing::error!("Serial worker panicked"),
            }
        }
    }
}
