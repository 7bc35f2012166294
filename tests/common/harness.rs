use std::collections::VecDeque;
use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use ratatui::backend::TestBackend;
use ratatui::Terminal;
use sercom::app::App;
use sercom::config::Config;
use sercom::input::completion::CompletionTree;
use sercom::input::key::Key;
use sercom::model::history::History;
use sercom::services::serial::{SerialDevice, TransportHandle};
use sercom::services::termination::TerminationSignal;
use sercom::view::interface::Interface;

/// Serial device recording what is written and replaying scripted reads
#[derive(Clone, Default)]
pub struct FakeDevice {
    written: Arc<Mutex<Vec<u8>>>,
    reads: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl FakeDevice {
    pub fn reply(&self, data: &str) {
        self.reads.lock().unwrap().push_back(data.as_bytes().to_vec());
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.written.lock().unwrap()).into_owned()
    }
}

impl SerialDevice for FakeDevice {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.lock().unwrap().pop_front() {
            Some(data) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            None => Ok(0),
        }
    }
}

/// An [`App`] on a test backend, with the outbound queue exposed
pub struct TerminalHarness {
    pub app: App,
    pub terminal: Terminal<TestBackend>,
    pub outbound: Option<mpsc::Receiver<String>>,
    pub termination: TerminationSignal,
    width: u16,
}

impl TerminalHarness {
    pub fn new(width: u16, height: u16) -> anyhow::Result<Self> {
        Self::with_state(width, height, History::new(), CompletionTree::default())
    }

    pub fn with_state(
        width: u16,
        height: u16,
        history: History,
        completion: CompletionTree,
    ) -> anyhow::Result<Self> {
        let layouts = Config::default().interface_parse(width, height)?;
        let (transport, outbound) = TransportHandle::channel();
        let termination = TerminationSignal::new();
        let app = App::new(
            Interface::new(layouts, false),
            history,
            completion,
            transport,
            termination.clone(),
        )?;
        Ok(Self {
            app,
            terminal: Terminal::new(TestBackend::new(width, height))?,
            outbound: Some(outbound),
            termination,
            width,
        })
    }

    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.app.handle_key(Key::Char(c));
        }
    }

    pub fn press(&mut self, key: Key) {
        self.app.handle_key(key);
    }

    pub fn render(&mut self) -> anyhow::Result<()> {
        let app = &mut self.app;
        self.terminal.draw(|frame| app.render(frame))?;
        Ok(())
    }

    /// Screen row `y` between columns `from` and `to`
    pub fn screen_text(&self, y: u16, from: u16, to: u16) -> String {
        let buffer = self.terminal.backend().buffer();
        (from..to.min(self.width))
            .map(|x| buffer[(x, y)].symbol())
            .collect()
    }

    pub fn sent(&self) -> Vec<String> {
        self.outbound
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }
}
