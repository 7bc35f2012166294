//! Status pane log layer
//!
//! Mirrors WARN and ERROR events into the status pane: each event is
//! formatted with a timestamp and pushed on a channel the UI loop drains.
//! Repeats of the same message within a short window are suppressed so a
//! failing device does not flood the pane.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Target of events the user has already been shown. They are not mirrored.
pub const USER_TARGET: &str = "sercom::user";

const DEDUP_WINDOW: Duration = Duration::from_secs(5);
const DEDUP_MAX_ENTRIES: usize = 100;

/// Recently forwarded messages, by hash
struct RecentMessages {
    seen: HashMap<u64, (Instant, usize)>,
    window: Duration,
}

impl RecentMessages {
    fn new(window: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            window,
        }
    }

    /// `Some(suppressed)` when `message` should be forwarded, where
    /// `suppressed` counts the repeats hidden since it was last shown
    fn admit(&mut self, message: &str) -> Option<usize> {
        let mut hasher = DefaultHasher::new();
        message.hash(&mut hasher);
        let hash = hasher.finish();
        let now = Instant::now();

        if self.seen.len() > DEDUP_MAX_ENTRIES {
            let window = self.window;
            self.seen
                .retain(|_, (time, _)| now.duration_since(*time) < window * 2);
        }

        match self.seen.get_mut(&hash) {
            Some((last, count)) if now.duration_since(*last) < self.window => {
                *count += 1;
                *last = now;
                None
            }
            Some((last, count)) => {
                let suppressed = count.saturating_sub(1);
                *count = 1;
                *last = now;
                Some(suppressed)
            }
            None => {
                self.seen.insert(hash, (now, 1));
                Some(0)
            }
        }
    }
}

/// Forwards WARN+ events to the status pane
pub struct StatusLogLayer {
    sender: mpsc::Sender<String>,
    recent: Arc<Mutex<RecentMessages>>,
}

/// Receiving end of the status messages
pub struct StatusLogHandle {
    pub receiver: mpsc::Receiver<String>,
}

impl StatusLogHandle {
    /// All messages logged since the last call
    pub fn drain(&self) -> Vec<String> {
        self.receiver.try_iter().collect()
    }
}

pub fn create() -> (StatusLogLayer, StatusLogHandle) {
    create_with_window(DEDUP_WINDOW)
}

fn create_with_window(window: Duration) -> (StatusLogLayer, StatusLogHandle) {
    let (sender, receiver) = mpsc::channel();
    let layer = StatusLogLayer {
        sender,
        recent: Arc::new(Mutex::new(RecentMessages::new(window))),
    };
    (layer, StatusLogHandle { receiver })
}

impl<S> Layer<S> for StatusLogLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::WARN || event.metadata().target() == USER_TARGET {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let suppressed = match self.recent.lock() {
            Ok(mut recent) => recent.admit(&visitor.0),
            Err(_) => Some(0),
        };
        let Some(suppressed) = suppressed else {
            return;
        };

        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let message = if suppressed > 0 {
            format!("{timestamp} {level}: {} ({suppressed} repeats)", visitor.0)
        } else {
            format!("{timestamp} {level}: {}", visitor.0)
        };

        // The UI may already be gone during shutdown
        let _ = self.sender.send(message);
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl MessageVisitor {
    fn push(&mut self, name: &str, value: String) {
        if name == "message" {
            self.0 = value;
        } else if self.0.is_empty() {
            self.0 = format!("{name}={value}");
        } else {
            self.0.push_str(&format!(" {name}={value}"));
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.push(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field.name(), value.to_string());
    }
}
