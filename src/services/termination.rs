//! Session-wide termination flag shared by the UI loop and the serial worker

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct TerminationSignal(Arc<AtomicBool>);

impl TerminationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of the signal to stop
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
