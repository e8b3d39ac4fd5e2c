use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "state/ingest.db";
pub const DEFAULT_MIN_CORE_TOKENS: usize = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// SQLite file holding the ingest history and the media unit catalog.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Shortest shared token prefix allowed to merge primary stems into one core.
    #[serde(default = "default_min_core_tokens")]
    pub min_core_tokens: usize,
    /// Strip digit runs and short letter/digit codes from stem edges before deriving cores.
    #[serde(default = "default_trim")]
    pub trim_structural_decorations: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            min_core_tokens: DEFAULT_MIN_CORE_TOKENS,
            trim_structural_decorations: true,
        }
    }
}

impl AppConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            min_core_tokens: self.min_core_tokens.max(1),
            trim_structural_decorations: self.trim_structural_decorations,
        }
    }
}

/// The subset of configuration the pure analysis functions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub min_core_tokens: usize,
    pub trim_structural_decorations: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        AppConfig::default().engine_settings()
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

fn default_min_core_tokens() -> usize {
    DEFAULT_MIN_CORE_TOKENS
}

fn default_trim() -> bool {
    true
}

/// Layered load: optional `Config.toml`, then `MEDIA_INGEST_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("MEDIA_INGEST").try_parsing(true))
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    if config.min_core_tokens == 0 {
        return Err(ConfigError::Message(
            "min_core_tokens must be at least 1".to_string(),
        ));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("state/ingest.db"));
        assert_eq!(config.min_core_tokens, 2);
        assert!(config.trim_structural_decorations);
    }

    #[test]
    fn test_partial_source_fills_defaults() {
        let config = Config::builder()
            .set_override("min_core_tokens", 3)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>()
            .unwrap();
        assert_eq!(config.min_core_tokens, 3);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(config.trim_structural_decorations);
    }

    #[test]
    fn test_engine_settings_clamps_threshold() {
        let config = AppConfig {
            min_core_tokens: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.engine_settings().min_core_tokens, 1);
    }
}
