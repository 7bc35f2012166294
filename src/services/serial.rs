//! Serial transport
//!
//! A background worker owns the serial device. Each loop iteration it sends
//! at most one queued outbound payload, then reads whatever arrived and
//! republishes the accumulated inbound lines to the serial pane.
//!
//! The UI talks to the worker only through a [`TransportHandle`] (an mpsc
//! sender) and the shared [`TerminationSignal`].

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serialport::{DataBits, SerialPort, StopBits};

use crate::config::{Parity, SerialConfig};
use crate::model::line::Line;
use crate::services::termination::TerminationSignal;
use crate::view::pane::PaneWriter;

/// Read timeout of the device, bounding one worker iteration
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Inbound lines kept for display
pub const MAX_RETAINED_LINES: usize = 5000;

/// Pending inbound bytes flushed even without a newline
const MAX_PENDING: usize = 4096;

const LINE_TERMINATOR: u8 = b'\n';

#[derive(Debug)]
pub enum TransportError {
    /// The device could not be opened
    Open {
        port: String,
        source: serialport::Error,
    },
    /// The backend cannot express this parity
    UnsupportedParity(Parity),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Open { port, source } => {
                write!(f, "failed to open serial port {port}: {source}")
            }
            TransportError::UnsupportedParity(parity) => {
                write!(f, "parity \"{parity}\" is not supported by the serial backend")
            }
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Open { source, .. } => Some(source),
            TransportError::UnsupportedParity(_) => None,
        }
    }
}

/// Anything that can be queued for sending
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
    Lines(Vec<String>),
}

impl Payload {
    /// Normalize to text. Lines are joined with `\n`, invalid UTF-8 is dropped.
    pub fn into_text(self) -> String {
        match self {
            Payload::Text(text) => text,
            Payload::Lines(lines) => lines.join("\n"),
            Payload::Bytes(bytes) => bytes.utf8_chunks().map(|chunk| chunk.valid()).collect(),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&Line> for Payload {
    fn from(line: &Line) -> Self {
        Payload::Text(line.as_str().to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(bytes.to_vec())
    }
}

impl From<Vec<String>> for Payload {
    fn from(lines: Vec<String>) -> Self {
        Payload::Lines(lines)
    }
}

/// Producer side of the outbound queue
#[derive(Debug, Clone)]
pub struct TransportHandle {
    sender: mpsc::Sender<String>,
}

impl TransportHandle {
    /// Create a handle and the receiving end of its queue
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }

    /// Queue `payload` for sending. Never blocks.
    pub fn write(&self, payload: impl Into<Payload>) {
        let text = payload.into().into_text();
        if self.sender.send(text).is_err() {
            tracing::warn!("Serial worker stopped, dropping outbound data");
        }
    }
}

/// Byte-level access to a serial device
pub trait SerialDevice: Send {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read into `buf`. `Ok(0)` when nothing arrived before the timeout.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl SerialDevice for Box<dyn SerialPort> {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            result => result,
        }
    }
}

/// Open the device described by `config`
pub fn open(config: &SerialConfig) -> Result<Box<dyn SerialPort>, TransportError> {
    let parity = match config.parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
        other @ (Parity::Mark | Parity::Space) => {
            return Err(TransportError::UnsupportedParity(other))
        }
    };
    let data_bits = match config.bytesize {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    };
    let stop_bits = match config.stopbits {
        2 => StopBits::Two,
        _ => StopBits::One,
    };

    tracing::info!(
        "Opening {} at {} baud ({}{}{})",
        config.port,
        config.baudrate,
        config.bytesize,
        config.parity,
        config.stopbits
    );
    serialport::new(config.port.clone(), config.baudrate)
        .data_bits(data_bits)
        .parity(parity)
        .stop_bits(stop_bits)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|source| TransportError::Open {
            port: config.port.clone(),
            source,
        })
}

/// Splits the byte stream into chunks ending at a newline, or at a timeout
#[derive(Debug, Default)]
struct ChunkReader {
    pending: Vec<u8>,
}

impl ChunkReader {
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == LINE_TERMINATOR)?;
        Some(self.pending.drain(..=end).collect())
    }

    /// Take at most `MAX_PENDING` bytes, keeping an unfinished UTF-8
    /// sequence for the next read
    fn flush(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.len().min(MAX_PENDING);
        let end = end - incomplete_utf8_tail(&self.pending[..end]);
        (end > 0).then(|| self.pending.drain(..end).collect())
    }

    fn next_chunk<D: SerialDevice>(&mut self, device: &mut D) -> Option<Vec<u8>> {
        if let Some(line) = self.take_line() {
            return Some(line);
        }

        let mut buf = [0u8; 1024];
        match device.read_bytes(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                self.pending.extend_from_slice(&buf[..n]);
                if let Some(line) = self.take_line() {
                    return Some(line);
                }
                if self.pending.len() < MAX_PENDING {
                    return None;
                }
            }
            Err(e) => {
                tracing::debug!("Serial read failed: {}", e);
                return None;
            }
        }

        // Timed out, or too much data without a newline
        self.flush()
    }
}

/// Length of a UTF-8 sequence cut short at the end of `bytes`
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    let start = bytes.len().saturating_sub(3);
    for (idx, &byte) in bytes[start..].iter().enumerate().rev() {
        if byte & 0xc0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => 1,
        };
        let present = bytes.len() - (start + idx);
        return if present < needed { present } else { 0 };
    }
    0
}

/// Inbound lines, the last one still receiving data
#[derive(Debug, Default)]
pub struct InboundLines {
    lines: Vec<Line>,
}

impl InboundLines {
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Add a decoded chunk, creating lines through `writer`
    pub fn push_chunk(&mut self, chunk: &str, writer: &PaneWriter) {
        let trimmed = chunk.trim_end_matches(['\r', '\n']);
        match self.lines.last_mut() {
            Some(last) => {
                last.write(trimmed);
            }
            None => {
                let line = writer.line_create(trimmed, self.lines.len() + 1);
                self.lines.push(line);
            }
        }
        if chunk.ends_with('\n') {
            let line = writer.line_create("", self.lines.len() + 1);
            self.lines.push(line);
        }
        if self.lines.len() > MAX_RETAINED_LINES {
            let excess = self.lines.len() - MAX_RETAINED_LINES;
            self.lines.drain(..excess);
        }
    }
}

/// The worker loop state
pub struct Transport<D: SerialDevice> {
    device: D,
    outbound: mpsc::Receiver<String>,
    byte_delay: Option<Duration>,
    reader: ChunkReader,
    inbound: InboundLines,
    sink: PaneWriter,
}

impl<D: SerialDevice> Transport<D> {
    pub fn new(
        device: D,
        outbound: mpsc::Receiver<String>,
        byte_delay: Option<Duration>,
        sink: PaneWriter,
    ) -> Self {
        Self {
            device,
            outbound,
            byte_delay,
            reader: ChunkReader::default(),
            inbound: InboundLines::default(),
            sink,
        }
    }

    pub fn inbound(&self) -> &InboundLines {
        &self.inbound
    }

    /// Run until `termination` is set
    pub fn run(&mut self, termination: &TerminationSignal) {
        tracing::debug!("Starting serial worker");
        while !termination.is_set() {
            self.step();
        }
        tracing::debug!("Serial worker stopped");
    }

    /// One loop iteration: send one queued payload, then receive
    pub fn step(&mut self) {
        self.send_queued();
        self.receive();
    }

    fn send_queued(&mut self) {
        let Ok(payload) = self.outbound.try_recv() else {
            return;
        };
        tracing::info!("Sending \"{}\" on serial", payload);
        if let Err(e) = self.send(&payload) {
            tracing::warn!("Error writing serial: {}", e);
        }
    }

    /// Write `payload` followed by the line terminator
    fn send(&mut self, payload: &str) -> io::Result<()> {
        let Some(delay) = self.byte_delay else {
            let mut bytes = Vec::with_capacity(payload.len() + 1);
            bytes.extend_from_slice(payload.as_bytes());
            bytes.push(LINE_TERMINATOR);
            return self.device.write_bytes(&bytes);
        };

        for byte in payload.bytes().chain(std::iter::once(LINE_TERMINATOR)) {
            let started = Instant::now();
            self.device.write_bytes(&[byte])?;
            if let Some(remaining) = delay.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }
        Ok(())
    }

    fn receive(&mut self) {
        let Some(raw) = self.reader.next_chunk(&mut self.device) else {
            return;
        };
        let chunk: String = raw.utf8_chunks().map(|c| c.valid()).collect();
        self.inbound.push_chunk(&chunk, &self.sink);
        tracing::trace!("{} inbound lines", self.inbound.lines().len());
        self.sink.write(self.inbound.lines());
    }
}

/// Start the worker thread. The device is opened on the worker; failing to
/// open it ends the thread with an error.
pub fn spawn(
    config: SerialConfig,
    sink: PaneWriter,
    termination: TerminationSignal,
) -> io::Result<(TransportHandle, JoinHandle<Result<(), TransportError>>)> {
    let (handle, outbound) = TransportHandle::channel();
    let byte_delay = config.byte_delay();

    let worker = thread::Builder::new()
        .name("serial".to_string())
        .spawn(move || -> Result<(), TransportError> {
            let device = open(&config).inspect_err(|e| tracing::error!("{}", e))?;
            Transport::new(device, outbound, byte_delay, sink).run(&termination);
            Ok(())
        })?;

    Ok((handle, worker))
}
