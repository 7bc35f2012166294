pub mod log_dirs;
pub mod serial;
pub mod status_log;
pub mod terminal_modes;
pub mod termination;
pub mod tracing_setup;
