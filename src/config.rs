//! Binary configuration.
//!
//! Reads `pgsync.toml`: connection settings for the primary and shadow
//! databases, the desired-schema paths, and the target namespace. Per §1's
//! Non-goals, credential handling and `.env` loading belong to the CLI
//! collaborator; this only covers the shape the core's `pgsync` binary
//! needs to wire `desired_schema::load`, `introspect::introspect`, and
//! `executor::execute` together.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub desired_schema: DesiredSchemaConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            desired_schema: DesiredSchemaConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DesiredSchemaConfig {
    /// Paths to `.lp.sql` files or directories (§6).
    #[serde(default = "default_paths")]
    pub paths: Vec<PathBuf>,
}

impl Default for DesiredSchemaConfig {
    fn default() -> Self {
        Self { paths: default_paths() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Postgres schema to reconcile (§6, default `public`).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Skip shadow rehearsal before the primary apply. Mandatory rehearsal
    /// is the default (§4.7); this is the caller's explicit opt-out.
    #[serde(default)]
    pub skip_rehearsal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            skip_rehearsal: false,
        }
    }
}

fn default_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("schema")]
}

fn default_namespace() -> String {
    "public".to_string()
}

impl Config {
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.desired_schema.paths.is_empty() {
            return Err(ConfigError::Validation("desired_schema.paths must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_and_validate(toml_str: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn default_namespace_is_public() {
        assert_eq!(Config::default().database.namespace, "public");
    }

    #[test]
    fn empty_paths_rejected() {
        let toml = "[desired_schema]\npaths = []";
        let err = parse_and_validate(toml).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn skip_rehearsal_defaults_to_false() {
        assert!(!Config::default().database.skip_rehearsal);
    }

    #[test]
    fn custom_paths_and_namespace_parse() {
        let toml = "[desired_schema]\npaths = [\"db/schema\"]\n[database]\nnamespace = \"app\"\nskip_rehearsal = true";
        let config = parse_and_validate(toml).unwrap();
        assert_eq!(config.desired_schema.paths, vec![PathBuf::from("db/schema")]);
        assert_eq!(config.database.namespace, "app");
        assert!(config.database.skip_rehearsal);
    }
}
