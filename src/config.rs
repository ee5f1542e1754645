use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::materializer::sqlite::IN_MEMORY;
use crate::schema_catalog::naming::is_valid_identifier;
use crate::schema_catalog::{ColumnConvention, SnakeCaseNaming};

pub const ENV_DATABASE: &str = "AUTHFILTER_DATABASE";
pub const ENV_TABLE_PREFIX: &str = "AUTHFILTER_TABLE_PREFIX";
pub const ENV_SINGULAR_TABLES: &str = "AUTHFILTER_SINGULAR_TABLES";
pub const ENV_COLUMN_CONVENTION: &str = "AUTHFILTER_COLUMN_CONVENTION";
pub const ENV_LOG: &str = "AUTHFILTER_LOG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Adapter configuration: where the data lives and how its tables are named.
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// SQLite database file, or `:memory:`
    #[validate(length(min = 1, message = "Database path cannot be empty"))]
    pub database_path: String,

    /// Prepended to every table name
    #[validate(custom(function = "validate_table_prefix"))]
    pub table_prefix: String,

    /// Use `user` instead of `users`
    pub singular_tables: bool,

    pub column_convention: ColumnConvention,

    /// env_logger filter used when `RUST_LOG` is unset
    #[validate(length(min = 1, message = "Log filter cannot be empty"))]
    pub log_filter: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            database_path: IN_MEMORY.to_string(),
            table_prefix: String::new(),
            singular_tables: false,
            column_convention: ColumnConvention::SnakeCase,
            log_filter: "info".to_string(),
        }
    }
}

impl AdapterConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            database_path: env::var(ENV_DATABASE).unwrap_or_else(|_| IN_MEMORY.to_string()),
            table_prefix: env::var(ENV_TABLE_PREFIX).unwrap_or_default(),
            singular_tables: parse_env_var(ENV_SINGULAR_TABLES, "false")?,
            column_convention: parse_env_var(ENV_COLUMN_CONVENTION, "snake_case")?,
            log_filter: env::var(ENV_LOG).unwrap_or_else(|_| "info".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            database_path: cli.database_path,
            table_prefix: cli.table_prefix,
            singular_tables: cli.singular_tables,
            column_convention: cli.column_convention,
            log_filter: cli.log_filter,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file. Missing keys take their defaults.
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Naming strategy matching the configured table layout.
    pub fn naming(&self) -> SnakeCaseNaming {
        SnakeCaseNaming::new()
            .with_table_prefix(self.table_prefix.clone())
            .with_singular_tables(self.singular_tables)
            .with_column_convention(self.column_convention)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub database_path: String,
    pub table_prefix: String,
    pub singular_tables: bool,
    pub column_convention: ColumnConvention,
    pub log_filter: String,
}

/// Empty, or a valid start of an unquoted SQL identifier.
fn validate_table_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() || is_valid_identifier(prefix) {
        Ok(())
    } else {
        Err(ValidationError::new("table_prefix")
            .with_message("Table prefix must match [A-Za-z_][A-Za-z0-9_]*".into()))
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
