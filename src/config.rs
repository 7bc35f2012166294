use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::primitives::layout_expr;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Use colors when drawing titles and status messages
    #[serde(default = "default_true")]
    pub colors: bool,

    /// Persist submitted lines to the history file
    #[serde(default = "default_true")]
    pub history_save: bool,

    /// Project whose completion tree is loaded from `completion.json`
    #[serde(default = "default_project")]
    pub project: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Pane layout
    #[serde(default = "default_interface")]
    pub interface: Vec<PaneConfig>,

    #[serde(default)]
    pub serial: SerialConfig,
}

fn default_true() -> bool {
    true
}

fn default_project() -> String {
    "DEFAULT".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            colors: true,
            history_save: true,
            project: default_project(),
            logging: LoggingConfig::default(),
            interface: default_interface(),
            serial: SerialConfig::default(),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter, overridden by `RUST_LOG` and `-v`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file. A per-process file in the state directory when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
    Mark,
    Space,
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Parity::None => "none",
            Parity::Even => "even",
            Parity::Odd => "odd",
            Parity::Mark => "mark",
            Parity::Space => "space",
        };
        f.write_str(name)
    }
}

/// Serial device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,

    #[serde(default = "default_bytesize")]
    pub bytesize: u8,

    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default)]
    pub parity: Parity,

    /// Maximum outbound rate in bytes per second, `null` for no limit
    #[serde(default = "default_ratelimit")]
    pub ratelimit: Option<u32>,

    #[serde(default = "default_stopbits")]
    pub stopbits: u8,
}

/// Field names that may be given at the top level of the overrides
pub const SERIAL_FIELDS: [&str; 6] = [
    "baudrate",
    "bytesize",
    "parity",
    "port",
    "ratelimit",
    "stopbits",
];

fn default_baudrate() -> u32 {
    115_200
}

fn default_bytesize() -> u8 {
    8
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_ratelimit() -> Option<u32> {
    Some(100_000)
}

fn default_stopbits() -> u8 {
    1
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baudrate: default_baudrate(),
            bytesize: default_bytesize(),
            port: default_port(),
            parity: Parity::None,
            ratelimit: default_ratelimit(),
            stopbits: default_stopbits(),
        }
    }
}

impl SerialConfig {
    /// Minimum delay between two outbound bytes.
    ///
    /// `None` when there is no rate limit, or when the limit is higher than
    /// the baud rate and therefore meaningless.
    pub fn byte_delay(&self) -> Option<Duration> {
        match self.ratelimit {
            None | Some(0) => None,
            Some(ratelimit) if ratelimit > self.baudrate => {
                tracing::warn!(
                    "Rate-limit higher than the baudrate ({} v. {}), disabling",
                    ratelimit,
                    self.baudrate
                );
                None
            }
            Some(ratelimit) => Some(Duration::from_micros(1_000_000 / u64::from(ratelimit))),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=8).contains(&self.bytesize) {
            return Err(ConfigError::ValidationError(format!(
                "serial bytesize must be between 5 and 8, got {}",
                self.bytesize
            )));
        }
        if !(1..=2).contains(&self.stopbits) {
            return Err(ConfigError::ValidationError(format!(
                "serial stopbits must be 1 or 2, got {}",
                self.stopbits
            )));
        }
        if self.baudrate == 0 {
            return Err(ConfigError::ValidationError(
                "serial baudrate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// A layout value: a plain number or an expression over `{cols}` and `{lines}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Value(u16),
    Expr(String),
}

impl Dimension {
    /// Evaluate against a terminal of `cols` x `lines`.
    ///
    /// Fractional results are truncated. Negative or unknown results give
    /// `None`.
    pub fn resolve(&self, cols: u16, lines: u16) -> Option<u16> {
        match self {
            Dimension::Value(value) => Some(*value),
            Dimension::Expr(expr) => {
                let value = layout_expr::eval(&layout_expr::substitute(expr, cols, lines))?;
                (value >= 0.0).then(|| value.min(f64::from(u16::MAX)) as u16)
            }
        }
    }

    /// Whether the value is a number or an expression the evaluator understands
    pub fn is_valid(&self) -> bool {
        match self {
            Dimension::Value(_) => true,
            Dimension::Expr(expr) => {
                layout_expr::eval(&layout_expr::substitute(expr, 80, 24)).is_some()
            }
        }
    }
}

impl From<&str> for Dimension {
    fn from(expr: &str) -> Self {
        Dimension::Expr(expr.to_string())
    }
}

impl From<u16> for Dimension {
    fn from(value: u16) -> Self {
        Dimension::Value(value)
    }
}

/// Pane placement as written in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneConfig {
    pub name: String,
    pub cols: Dimension,
    pub lines: Dimension,
    pub posy: Dimension,
    pub posx: Dimension,

    #[serde(default)]
    pub title: Option<String>,

    /// Show the terminal cursor in this pane
    #[serde(default)]
    pub cursor: bool,

    /// Number the lines of this pane
    #[serde(default)]
    pub prompt: bool,
}

/// Pane placement evaluated for a terminal size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneLayout {
    pub name: String,
    pub cols: u16,
    pub lines: u16,
    pub posy: u16,
    pub posx: u16,
    pub title: Option<String>,
    pub cursor: bool,
    pub prompt: bool,
}

impl PaneConfig {
    pub fn resolve(&self, cols: u16, lines: u16) -> Result<PaneLayout, ConfigError> {
        let field = |value: &Dimension, what: &str| {
            value.resolve(cols, lines).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "pane \"{}\": invalid {} {:?}",
                    self.name, what, value
                ))
            })
        };
        Ok(PaneLayout {
            name: self.name.clone(),
            cols: field(&self.cols, "cols")?,
            lines: field(&self.lines, "lines")?,
            posy: field(&self.posy, "posy")?,
            posx: field(&self.posx, "posx")?,
            title: self.title.clone(),
            cursor: self.cursor,
            prompt: self.prompt,
        })
    }
}

fn default_interface() -> Vec<PaneConfig> {
    vec![
        PaneConfig {
            name: "error".to_string(),
            cols: "{cols}".into(),
            lines: Dimension::Value(3),
            posy: "{lines} - 3".into(),
            posx: Dimension::Value(0),
            title: Some("Information".to_string()),
            cursor: false,
            prompt: false,
        },
        PaneConfig {
            name: "serial".to_string(),
            cols: "{cols} // 2".into(),
            lines: "{lines} - 3".into(),
            posy: Dimension::Value(0),
            posx: "{cols} // 2".into(),
            title: Some("Serial".to_string()),
            cursor: false,
            prompt: false,
        },
        PaneConfig {
            name: "command".to_string(),
            cols: "{cols} // 2".into(),
            lines: "{lines} - 3".into(),
            posy: Dimension::Value(0),
            posx: Dimension::Value(0),
            title: Some("Commands".to_string()),
            cursor: true,
            prompt: true,
        },
    ]
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Evaluate the pane layout for a terminal of `cols` x `lines`
    pub fn interface_parse(&self, cols: u16, lines: u16) -> Result<Vec<PaneLayout>, ConfigError> {
        self.interface
            .iter()
            .map(|pane| pane.resolve(cols, lines))
            .collect()
    }

    /// Validate the configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.serial.validate()?;

        let mut names = std::collections::HashSet::new();
        for pane in &self.interface {
            if !names.insert(pane.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "pane \"{}\" is defined twice",
                    pane.name
                )));
            }
            // Catch malformed expressions before the terminal is set up
            for (what, value) in [
                ("cols", &pane.cols),
                ("lines", &pane.lines),
                ("posy", &pane.posy),
                ("posx", &pane.posx),
            ] {
                if !value.is_valid() {
                    return Err(ConfigError::ValidationError(format!(
                        "pane \"{}\": invalid {} {:?}",
                        pane.name, what, value
                    )));
                }
            }
        }
        if !names.contains("command") {
            return Err(ConfigError::ValidationError(
                "the interface needs a \"command\" pane".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
