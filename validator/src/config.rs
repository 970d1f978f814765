/// Validator configuration module
/// Selects the deployment environment and loads backend, lookup and field-limit settings

use lazy_static::lazy_static;
use regex::Regex;
use shared::{Environment, FieldLimits};
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

lazy_static! {
    /// Plain or schema-qualified SQL identifier
    static ref IDENTIFIER_REGEX: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap();
}

/// Read a variable from the process environment
fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Parse an optional numeric variable, falling back to `default`
fn parse_or<F>(lookup: &F, key: &str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
            ConfigError::InvalidConfig(format!("Invalid {}: {} ({})", key, raw, e))
        }),
        None => Ok(default),
    }
}

/// Check that a configured table or column name is safe to place in SQL text
pub fn validate_identifier(key: &str, value: &str) -> Result<(), ConfigError> {
    if IDENTIFIER_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfig(format!(
            "{} must be a plain SQL identifier, got '{}'",
            key, value
        )))
    }
}

/// Parse the deployment environment name
pub fn parse_environment(value: &str) -> Result<Environment, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "production" | "prod" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        s => Err(ConfigError::InvalidEnvironment(s.to_string())),
    }
}

/// Backend table and columns the existence check runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub table: String,
    pub invoice_column: String,
    pub customer_column: String,
}

impl LookupConfig {
    pub const DEFAULT_TABLE: &'static str = "hhhordhp";
    pub const DEFAULT_INVOICE_COLUMN: &'static str = "invno";
    pub const DEFAULT_CUSTOMER_COLUMN: &'static str = "custno";

    /// Build a lookup configuration, rejecting names that are not identifiers
    pub fn new(
        table: impl Into<String>,
        invoice_column: impl Into<String>,
        customer_column: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = LookupConfig {
            table: table.into(),
            invoice_column: invoice_column.into(),
            customer_column: customer_column.into(),
        };
        validate_identifier("LOOKUP_TABLE", &config.table)?;
        validate_identifier("LOOKUP_INVOICE_COLUMN", &config.invoice_column)?;
        validate_identifier("LOOKUP_CUSTOMER_COLUMN", &config.customer_column)?;
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let table = lookup("LOOKUP_TABLE").unwrap_or_else(|| Self::DEFAULT_TABLE.to_string());
        let invoice_column = lookup("LOOKUP_INVOICE_COLUMN")
            .unwrap_or_else(|| Self::DEFAULT_INVOICE_COLUMN.to_string());
        let customer_column = lookup("LOOKUP_CUSTOMER_COLUMN")
            .unwrap_or_else(|| Self::DEFAULT_CUSTOMER_COLUMN.to_string());

        let config = LookupConfig::new(table, invoice_column, customer_column)?;

        debug!(
            "Lookup configuration loaded: table={}, invoice_column={}, customer_column={}",
            config.table, config.invoice_column, config.customer_column
        );

        Ok(config)
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig {
            table: Self::DEFAULT_TABLE.to_string(),
            invoice_column: Self::DEFAULT_INVOICE_COLUMN.to_string(),
            customer_column: Self::DEFAULT_CUSTOMER_COLUMN.to_string(),
        }
    }
}

/// Load per-field maximum lengths
pub fn limits_from_lookup<F>(lookup: &F) -> Result<FieldLimits, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let customer_max_length = parse_or(
        lookup,
        "CUSTOMER_MAX_LENGTH",
        FieldLimits::DEFAULT_CUSTOMER_MAX_LENGTH,
    )?;
    let invoice_max_length = parse_or(
        lookup,
        "INVOICE_MAX_LENGTH",
        FieldLimits::DEFAULT_INVOICE_MAX_LENGTH,
    )?;

    if customer_max_length == 0 || invoice_max_length == 0 {
        return Err(ConfigError::InvalidConfig(
            "Field maximum lengths must be at least 1".to_string(),
        ));
    }

    Ok(FieldLimits::new(customer_max_length, invoice_max_length))
}

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub query_timeout: Option<Duration>,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("connection_string", &"<redacted>")
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl DatabaseConfig {
    /// Load database configuration from environment
    pub fn from_env(environment: Environment) -> Result<Self, ConfigError> {
        Self::from_lookup(environment, &process_env)
    }

    /// The per-environment URL wins over the generic `DATABASE_URL`
    pub fn from_lookup<F>(environment: Environment, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_key = match environment {
            Environment::Production => "DATABASE_URL_PRODUCTION",
            Environment::Test => "DATABASE_URL_TEST",
        };

        let connection_string = lookup(env_key)
            .or_else(|| lookup("DATABASE_URL"))
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnv(env_key.to_string()))?;

        let query_timeout = match lookup("DB_QUERY_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    ConfigError::InvalidConfig(format!("Invalid query timeout: {} ({})", raw, e))
                })?;

                // 1 second to 5 minutes
                if !(1..=300).contains(&secs) {
                    return Err(ConfigError::InvalidConfig(
                        "Query timeout must be between 1 and 300 seconds".to_string(),
                    ));
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        debug!(
            "Database configuration loaded: environment={}, query_timeout={:?}",
            environment, query_timeout
        );

        Ok(DatabaseConfig {
            connection_string,
            query_timeout,
        })
    }
}

/// Service configuration that does not depend on a live backend
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub environment: Environment,
    pub lookup: LookupConfig,
    pub limits: FieldLimits,
}

impl ServiceConfig {
    /// Load full service configuration
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("VALIDATOR_ENVIRONMENT") {
            Some(value) => parse_environment(&value)?,
            None => Environment::Test,
        };
        let lookup_config = LookupConfig::from_lookup(lookup)?;
        let limits = limits_from_lookup(lookup)?;

        info!(
            "Service configuration loaded: environment={}, table={}, customer_max={}, invoice_max={}",
            environment,
            lookup_config.table,
            limits.customer_max_length,
            limits.invoice_max_length
        );

        Ok(ServiceConfig {
            environment,
            lookup: lookup_config,
            limits,
        })
    }
}
