//! Log file location
//!
//! Logs live in `$XDG_STATE_HOME/sercom/logs/` (typically
//! `~/.local/state/sercom/logs/`), one file per process so several
//! terminals can run side by side.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::config_io::TOOL_NAME;

static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// The log directory, created on first use. Falls back to the system temp
/// directory when the state directory cannot be created.
pub fn log_dir() -> &'static PathBuf {
    LOG_DIR.get_or_init(|| {
        let fallback = || std::env::temp_dir().join(format!("{TOOL_NAME}-logs"));
        let dir = state_log_dir().unwrap_or_else(fallback);

        if let Err(e) = fs::create_dir_all(&dir) {
            eprintln!("Failed to create log directory {}: {}", dir.display(), e);
            let dir = fallback();
            let _ = fs::create_dir_all(&dir);
            return dir;
        }
        dir
    })
}

fn state_log_dir() -> Option<PathBuf> {
    if let Some(state_home) = std::env::var_os("XDG_STATE_HOME").map(PathBuf::from) {
        if state_home.is_absolute() {
            return Some(state_home.join(TOOL_NAME).join("logs"));
        }
    }
    dirs::home_dir().map(|home| home.join(".local").join("state").join(TOOL_NAME).join("logs"))
}

/// `{log_dir}/sercom-{PID}.log`
pub fn main_log_path() -> PathBuf {
    log_dir().join(format!("{}-{}.log", TOOL_NAME, std::process::id()))
}
