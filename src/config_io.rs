//! Configuration loading
//!
//! The effective configuration is built from three layers, each one deep
//! merged over the previous:
//!
//! 1. compiled-in defaults
//! 2. the JSON configuration file
//! 3. explicit overrides, usually from the command line
//!
//! Objects are merged key by key, any other value (including arrays such as
//! the pane list) replaces the one below it.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::{Config, ConfigError, SERIAL_FIELDS};
use crate::input::completion::CompletionTree;

/// Name of the tool, used for its configuration directory
pub const TOOL_NAME: &str = "sercom";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const COMPLETION_FILE_NAME: &str = "completion.json";

/// Directories used by the application
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    /// Config directory, e.g. `~/.config/sercom` on Linux
    pub config_dir: PathBuf,
}

impl DirectoryContext {
    /// Create a DirectoryContext from the system directories
    pub fn from_system() -> std::io::Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine config directory",
                )
            })?
            .join(TOOL_NAME);

        Ok(Self { config_dir })
    }

    /// Context rooted in a single directory, for tests
    pub fn for_testing(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn completion_path(&self) -> PathBuf {
        self.config_dir.join(COMPLETION_FILE_NAME)
    }
}

/// Recursively merge `overlay` into `base`
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Move top-level serial settings (`port`, `baudrate`, ...) under `serial`
pub fn normalize_overrides(mut overrides: Value) -> Value {
    let Value::Object(map) = &mut overrides else {
        return overrides;
    };
    let mut serial = serde_json::Map::new();
    for field in SERIAL_FIELDS {
        if let Some(value) = map.remove(field) {
            serial.insert(field.to_string(), value);
        }
    }
    if !serial.is_empty() {
        let mut nested = Value::Object(serial);
        if let Some(existing) = map.remove("serial") {
            let mut merged = existing;
            merge_json(&mut merged, nested);
            nested = merged;
        }
        map.insert("serial".to_string(), nested);
    }
    overrides
}

/// Read a JSON file, `None` if it does not exist
fn read_json(path: &Path) -> Result<Option<Value>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::IoError(format!("{}: {}", path.display(), e))),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Resolves the configuration layers into a [`Config`]
pub struct ConfigResolver {
    dir_context: DirectoryContext,
    /// Explicit configuration file, which must exist
    config_file: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(dir_context: DirectoryContext, config_file: Option<PathBuf>) -> Self {
        Self {
            dir_context,
            config_file,
        }
    }

    /// Path of the configuration file layer
    pub fn config_path(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(|| self.dir_context.config_path())
    }

    fn load_file_layer(&self) -> Result<Option<Value>, ConfigError> {
        let path = self.config_path();
        let layer = read_json(&path)?;
        match (&layer, &self.config_file) {
            (None, Some(_)) => Err(ConfigError::IoError(format!(
                "{}: configuration file not found",
                path.display()
            ))),
            (None, None) => {
                tracing::debug!("No configuration file at {}", path.display());
                Ok(None)
            }
            (Some(_), _) => {
                tracing::debug!("Loaded configuration layer {}", path.display());
                Ok(layer)
            }
        }
    }

    /// Merge defaults, the configuration file and `overrides`, then validate
    pub fn resolve(&self, overrides: Value) -> Result<Config, ConfigError> {
        let mut merged = serde_json::to_value(Config::default())
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        if let Some(file_layer) = self.load_file_layer()? {
            merge_json(&mut merged, normalize_overrides(file_layer));
        }
        merge_json(&mut merged, normalize_overrides(overrides));

        let config: Config =
            serde_json::from_value(merged).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the completion tree of `project`.
    ///
    /// A missing file or project disables completion with a warning.
    pub fn load_completion(&self, project: &str) -> Result<CompletionTree, ConfigError> {
        let projects = load_project_json(COMPLETION_FILE_NAME, Some(&self.dir_context.config_dir))?
            .unwrap_or(Value::Object(serde_json::Map::new()));

        let Some(tree) = projects.get(project) else {
            tracing::warn!("Completion for \"{}\" not found, completion disabled", project);
            return Ok(CompletionTree::default());
        };
        tracing::debug!("Loading completion for \"{}\"", project);
        serde_json::from_value(tree.clone()).map_err(|e| {
            ConfigError::ParseError(format!("{COMPLETION_FILE_NAME} [{project}]: {e}"))
        })
    }
}

/// Load a JSON file given by absolute path, or relative to `config_dir`
pub fn load_project_json(
    filename: impl AsRef<Path>,
    config_dir: Option<&Path>,
) -> Result<Option<Value>, ConfigError> {
    let filename = filename.as_ref();
    let path = match config_dir {
        Some(dir) if filename.is_relative() => dir.join(filename),
        _ => filename.to_path_buf(),
    };
    read_json(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parity;
    use serde_json::json;
    use tempfile::TempDir;

    fn resolver(dir: &TempDir) -> ConfigResolver {
        let context = DirectoryContext::for_testing(dir.path());
        std::fs::create_dir_all(&context.config_dir).unwrap();
        ConfigResolver::new(context, None)
    }

    #[test]
    fn test_merge_json_is_deep() {
        let mut base = json!({"a": {"b": 1, "c": 2}, "list": [1, 2]});
        merge_json(&mut base, json!({"a": {"c": 3, "d": 4}, "list": [9]}));
        assert_eq!(base, json!({"a": {"b": 1, "c": 3, "d": 4}, "list": [9]}));
    }

    #[test]
    fn test_normalize_moves_serial_fields() {
        let value = normalize_overrides(json!({
            "port": "/dev/ttyS1",
            "serial": {"baudrate": 9600},
            "colors": false
        }));
        assert_eq!(
            value,
            json!({"serial": {"baudrate": 9600, "port": "/dev/ttyS1"}, "colors": false})
        );
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = resolver(&dir).resolve(json!({})).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_then_overrides() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir);
        std::fs::write(
            resolver.config_path(),
            r#"{"history_save": false, "serial": {"parity": "even", "baudrate": 9600}}"#,
        )
        .unwrap();

        let config = resolver
            .resolve(json!({"baudrate": 57600, "colors": false}))
            .unwrap();
        assert!(!config.history_save);
        assert!(!config.colors);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.baudrate, 57600);
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
    }

    #[test]
    fn test_malformed_file_fails() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir);
        std::fs::write(resolver.config_path(), "{ not json").unwrap();
        assert!(matches!(
            resolver.resolve(json!({})),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_bad_override_type_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            resolver(&dir).resolve(json!({"baudrate": "fast"})),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let resolver = ConfigResolver::new(
            DirectoryContext::for_testing(dir.path()),
            Some(dir.path().join("missing.json")),
        );
        assert!(matches!(
            resolver.resolve(json!({})),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_load_completion_for_project() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir);
        std::fs::write(
            resolver.dir_context.completion_path(),
            r#"{"board": {"gpio": {"set": ["0", "1"]}, "reboot": []}}"#,
        )
        .unwrap();

        let tree = resolver.load_completion("board").unwrap();
        assert_eq!(tree.entries(["gpio", "set"]), vec!["0", "1"]);

        let missing = resolver.load_completion("other").unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_load_completion_without_file() {
        let dir = TempDir::new().unwrap();
        assert!(resolver(&dir).load_completion("DEFAULT").unwrap().is_empty());
    }

    #[test]
    fn test_load_project_json_absolute_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abs.json");
        std::fs::write(&path, r#"{"k": 1}"#).unwrap();
        let value = load_project_json(&path, Some(Path::new("/nonexistent"))).unwrap();
        assert_eq!(value, Some(json!({"k": 1})));
        assert_eq!(
            load_project_json("nope.json", Some(dir.path())).unwrap(),
            None
        );
    }
}
