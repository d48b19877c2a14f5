//! Configuration management for the Warehouse Stock Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WSM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Email notification gateway configuration
    pub email: EmailConfig,

    /// Alerting configuration
    pub alerts: AlertConfig,

    /// Bulk operation configuration
    pub bulk: BulkConfig,

    /// Business policy configuration
    pub policy: PolicyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for validating JWT tokens issued by the identity provider
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// Email gateway API endpoint
    pub gateway_endpoint: String,

    /// Email gateway API key
    pub gateway_api_key: String,

    /// Sender address for alert notifications
    pub from_address: String,

    /// Recipient addresses for stock alert notifications
    pub alert_recipients: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    /// Days before expiry within which a newly created batch gets an alert
    pub batch_expiry_window_days: i64,
}

/// Chunked bulk operations trade full atomicity for bounded lock duration.
/// Lock-wait and statement timeouts are left to the Postgres deployment
/// (`lock_timeout`, `statement_timeout`); each chunk rolls back on its own.
#[derive(Debug, Deserialize, Clone)]
pub struct BulkConfig {
    /// Rows per sub-transaction for reset-to-zero and deactivate-expired
    pub chunk_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolicyConfig {
    /// Whether non-central warehouses may receive external stock directly.
    /// When false, stock enters through the central warehouse and is
    /// redistributed via transfers; an explicit per-request override is
    /// still honoured for authorized callers.
    pub allow_non_central_receive: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("WSM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("email.from_address", "alerts@warehouse.local")?
            .set_default("email.alert_recipients", Vec::<String>::new())?
            .set_default("alerts.batch_expiry_window_days", 30)?
            .set_default("bulk.chunk_size", 100)?
            .set_default("policy.allow_non_central_receive", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WSM_ prefix)
            .add_source(
                Environment::with_prefix("WSM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
