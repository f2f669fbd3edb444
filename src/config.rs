//! Migration configuration from `migrate.yaml`
//!
//! Every setting has a default, so the file is optional. Values are resolved
//! in this order: command-line flag, environment (`DATABASE_URL`,
//! `MIGRATE_DUMP_PATH`), config file, built-in default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::migrate::LoadOptions;
use crate::store::{is_valid_identifier, Zone};

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "migrate.yaml";

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_DUMP_PATH: &str = "MIGRATE_DUMP_PATH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateConfig {
    #[serde(default = "default_dump_path")]
    pub dump_path: PathBuf,
    #[serde(default)]
    pub database_url: Option<String>,
    /// Attendee rows between progress lines.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Characters of a per-row error message kept in the log.
    #[serde(default = "default_error_message_limit")]
    pub error_message_limit: usize,
    #[serde(default = "default_zones")]
    pub zones: Vec<ZoneSeed>,
    /// Tables whose row count is printed at the end of the run.
    #[serde(default = "default_summary_tables")]
    pub summary_tables: Vec<String>,
}

/// A zone created before hospitals are loaded
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ZoneSeed {
    pub code: String,
    pub name: String,
}

impl From<&ZoneSeed> for Zone {
    fn from(seed: &ZoneSeed) -> Self {
        Zone {
            code: seed.code.clone(),
            name: seed.name.clone(),
        }
    }
}

fn default_dump_path() -> PathBuf {
    PathBuf::from("prisma/legacy/registration.sql")
}

fn default_batch_size() -> usize {
    100
}

fn default_error_message_limit() -> usize {
    100
}

fn default_zones() -> Vec<ZoneSeed> {
    vec![ZoneSeed {
        code: "C01".to_string(),
        name: "Central".to_string(),
    }]
}

fn default_summary_tables() -> Vec<String> {
    [
        "zone",
        "hospital",
        "member",
        "attendee",
        "finance",
        "hotel",
        "airline",
        "food_type",
        "travel_type",
        "register_type",
        "position",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

impl Default for MigrateConfig {
    fn default() -> Self {
        MigrateConfig {
            dump_path: default_dump_path(),
            database_url: None,
            batch_size: default_batch_size(),
            error_message_limit: default_error_message_limit(),
            zones: default_zones(),
            summary_tables: default_summary_tables(),
        }
    }
}

impl MigrateConfig {
    /// Load configuration from `path`, or from `migrate.yaml` when it exists.
    ///
    /// An explicit path must exist; the implicit file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: MigrateConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Override file values with the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override file values from `lookup`; empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database_url = Some(url);
        }
        if let Some(path) = lookup(ENV_DUMP_PATH) {
            self.dump_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }
        if self.zones.is_empty() {
            return Err(ConfigError::Invalid("at least one zone must be seeded".to_string()));
        }
        if let Some(zone) = self.zones.iter().find(|z| z.code.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "zone '{}' has an empty code",
                zone.name
            )));
        }
        if let Some(table) = self.summary_tables.iter().find(|t| !is_valid_identifier(t)) {
            return Err(ConfigError::Invalid(format!(
                "summary table '{}' is not a valid table name",
                table
            )));
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            zones: self.zones.iter().map(Zone::from).collect(),
            batch_size: self.batch_size,
            error_message_limit: self.error_message_limit,
            summary_tables: self.summary_tables.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MigrateConfig::default();
        assert_eq!(config.dump_path, PathBuf::from("prisma/legacy/registration.sql"));
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.zones.len(), 1);
        assert_eq!(config.zones[0].code, "C01");
        assert_eq!(config.summary_tables.len(), 11);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dump_path: /data/legacy.sql").unwrap();
        writeln!(file, "batch_size: 25").unwrap();

        let config = MigrateConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.dump_path, PathBuf::from("/data/legacy.sql"));
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.error_message_limit, 100);
        assert_eq!(config.zones, default_zones());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dump_file: typo.sql").unwrap();
        let err = MigrateConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = MigrateConfig::load(Some(Path::new("/nonexistent/migrate.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DATABASE_URL, "postgres://localhost/registration"),
            (ENV_DUMP_PATH, ""),
        ]);
        let mut config = MigrateConfig::default();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/registration")
        );
        // Empty variables do not clear the configured path.
        assert_eq!(config.dump_path, default_dump_path());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MigrateConfig::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = MigrateConfig::default();
        config.summary_tables.push("hotel; DROP TABLE member".to_string());
        assert!(config.validate().is_err());

        let mut config = MigrateConfig::default();
        config.zones.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_options() {
        let options = MigrateConfig::default().load_options();
        assert_eq!(options.zones[0].code, "C01");
        assert_eq!(options.batch_size, 100);
        assert_eq!(options.error_message_limit, 100);
    }
}
