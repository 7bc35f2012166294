//! View layer
//!
//! Panes are named rectangles of the terminal. Producers push composed
//! frames through a pane's queue; the UI loop drains the queues and renders
//! every pane with ratatui.

pub mod interface;
pub mod pane;

/// Pane holding the editable command line
pub const COMMAND_PANE: &str = "command";
/// Pane showing data received from the device
pub const SERIAL_PANE: &str = "serial";
/// Pane showing status and error messages
pub const STATUS_PANE: &str = "error";
