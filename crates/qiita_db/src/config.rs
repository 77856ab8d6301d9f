//! TOML configuration for the Qiita data layer.
//!
//! # Responsibility
//! - Describe where the database, log files and upload folders live.
//! - Fill unspecified sections with defaults so a partial file is valid.
//!
//! # Invariants
//! - A loaded config has passed `validate()`.
//! - Upload roots are absolute paths.

use crate::logging::{normalize_log_dir, LogLevel};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file for binaries.
pub const CONFIG_ENV_VAR: &str = "QIITA_CONFIG";

const DEFAULT_DB_FILE: &str = "qiita.sqlite3";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "config parse error: {err}"),
            Self::Invalid(message) => write!(f, "config invalid: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QiitaConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub uploads: UploadsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// File logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default_for_build(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    /// Mount points holding one `<study_id>/` folder per study.
    pub roots: Vec<PathBuf>,
}

impl QiitaConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: QiitaConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database.path cannot be empty".to_string(),
            ));
        }
        if let Some(dir) = &self.logging.dir {
            normalize_log_dir(dir).map_err(ConfigError::Invalid)?;
        }
        for root in &self.uploads.roots {
            if !root.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "uploads.roots entries must be absolute, got `{}`",
                    root.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, QiitaConfig};
    use crate::logging::LogLevel;
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = QiitaConfig::from_toml_str("").unwrap();
        assert_eq!(config, QiitaConfig::default());
        assert_eq!(config.database.path, PathBuf::from("qiita.sqlite3"));
        assert!(config.uploads.roots.is_empty());
    }

    #[test]
    fn full_document_is_parsed() {
        let config = QiitaConfig::from_toml_str(
            r#"
            [database]
            path = "/srv/qiita/qiita.sqlite3"

            [logging]
            level = "WARN"
            dir = "/var/log/qiita"

            [uploads]
            roots = ["/srv/qiita/uploads", "/mnt/uploads"]
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/qiita")));
        assert_eq!(config.uploads.roots.len(), 2);
    }

    #[test]
    fn relative_upload_root_is_invalid() {
        let err = QiitaConfig::from_toml_str("[uploads]\nroots = [\"uploads\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("uploads")));
    }

    #[test]
    fn unknown_level_is_a_parse_error() {
        let err = QiitaConfig::from_toml_str("[logging]\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
