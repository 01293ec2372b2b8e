//! Runtime configuration: embedded defaults, then `.offload/config.json`,
//! then `OFFLOAD_*` environment variables.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use offload_base::config::constants::{CONFIG_FILE, STORE_DIR};
use offload_base::config::{DEFAULTS, EngineKind};

pub const ENV_ENGINE: &str = "OFFLOAD_ENGINE";
pub const ENV_TIMEOUT_MS: &str = "OFFLOAD_TIMEOUT_MS";
pub const ENV_STEP_DELAY_MS: &str = "OFFLOAD_STEP_DELAY_MS";
pub const ENV_ACCELERATION: &str = "OFFLOAD_ACCELERATION";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Settings handed to the selected engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub kind: EngineKind,
    /// Simulated acceleration check result
    pub acceleration: bool,
    pub step_delay_ms: u64,
    pub max_new_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub engine: EngineSettings,
    pub generation_timeout_ms: Option<u64>,
}

/// Partial override stored in `.offload/config.json`. Every field is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub engine: Option<EngineKind>,
    pub acceleration: Option<bool>,
    pub step_delay_ms: Option<u64>,
    pub max_new_tokens: Option<usize>,
    pub generation_timeout_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let d = &*DEFAULTS;
        Self {
            engine: EngineSettings {
                kind: d.engine.kind,
                acceleration: d.engine.acceleration,
                step_delay_ms: d.engine.step_delay_ms,
                max_new_tokens: d.engine.max_new_tokens,
            },
            generation_timeout_ms: d.controller.generation_timeout_ms,
        }
    }
}

impl RuntimeConfig {
    /// Resolve the configuration for a session rooted at `root`.
    ///
    /// Reads `.env` through dotenvy first so its values take part in the
    /// environment layer.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Some(file) = read_config_file(&root.join(STORE_DIR).join(CONFIG_FILE))? {
            config.apply_file(file);
        }
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(kind) = file.engine {
            self.engine.kind = kind;
        }
        if let Some(acceleration) = file.acceleration {
            self.engine.acceleration = acceleration;
        }
        if let Some(ms) = file.step_delay_ms {
            self.engine.step_delay_ms = ms;
        }
        if let Some(n) = file.max_new_tokens {
            self.engine.max_new_tokens = n;
        }
        if file.generation_timeout_ms.is_some() {
            self.generation_timeout_ms = file.generation_timeout_ms;
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_ENGINE) {
            self.engine.kind =
                EngineKind::parse(&value).ok_or(ConfigError::InvalidEnv { var: ENV_ENGINE, value: value.clone() })?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            // 0 disables the timeout
            let ms = parse_env::<u64>(ENV_TIMEOUT_MS, &value)?;
            self.generation_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(value) = lookup(ENV_STEP_DELAY_MS) {
            self.engine.step_delay_ms = parse_env(ENV_STEP_DELAY_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_ACCELERATION) {
            self.engine.acceleration = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(ConfigError::InvalidEnv { var: ENV_ACCELERATION, value }),
            };
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv { var, value: value.to_string() })
}

/// `Ok(None)` when the file does not exist
pub fn read_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_come_from_yaml() {
        let config = RuntimeConfig::default();
        assert_eq!(config.engine.kind, EngineKind::Phrasebook);
        assert!(config.engine.acceleration);
        assert_eq!(config.generation_timeout_ms, None);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_config_file(&dir.path().join("config.json")).unwrap().is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join(STORE_DIR);
        fs::create_dir_all(&store).unwrap();
        fs::write(store.join(CONFIG_FILE), r#"{"engine":"caption","generation_timeout_ms":30000}"#).unwrap();

        let file = read_config_file(&store.join(CONFIG_FILE)).unwrap().unwrap();
        let mut config = RuntimeConfig::default();
        config.apply_file(file);
        assert_eq!(config.engine.kind, EngineKind::Caption);
        assert_eq!(config.generation_timeout_ms, Some(30_000));
        assert_eq!(config.engine.max_new_tokens, DEFAULTS.engine.max_new_tokens);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = read_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn env_overrides_everything() {
        let mut config = RuntimeConfig::default();
        config
            .apply_env(env(&[
                (ENV_ENGINE, "vision"),
                (ENV_TIMEOUT_MS, "1500"),
                (ENV_STEP_DELAY_MS, "0"),
                (ENV_ACCELERATION, "off"),
            ]))
            .unwrap();
        assert_eq!(config.engine.kind, EngineKind::Caption);
        assert_eq!(config.generation_timeout_ms, Some(1500));
        assert_eq!(config.engine.step_delay_ms, 0);
        assert!(!config.engine.acceleration);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let mut config = RuntimeConfig { generation_timeout_ms: Some(10), ..RuntimeConfig::default() };
        config.apply_env(env(&[(ENV_TIMEOUT_MS, "0")])).unwrap();
        assert_eq!(config.generation_timeout_ms, None);
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let mut config = RuntimeConfig::default();
        let err = config.apply_env(env(&[(ENV_STEP_DELAY_MS, "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_STEP_DELAY_MS, .. }));
        let err = config.apply_env(env(&[(ENV_ENGINE, "gpt")])).unwrap_err();
        assert!(err.to_string().contains("OFFLOAD_ENGINE"));
    }
}
