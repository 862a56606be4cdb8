//! Configuration management for the Retail POS Back Office
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with POS_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::variance::VarianceThresholds;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Inventory ledger policy configuration
    pub inventory: InventoryConfig,
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

/// Which cost the variance check compares new receipts against.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VarianceBaseline {
    /// Cost of the most recently received active batch, falling back to
    /// the product cost when no batch exists.
    PreviousBatch,
    /// The product's current (blended) cost price.
    ProductCost,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Baseline mode for cost variance checks
    pub variance_baseline: VarianceBaseline,

    /// |change %| at or above this classifies as medium severity
    pub variance_medium_percent: Decimal,

    /// |change %| at or above this classifies as high severity
    pub variance_high_percent: Decimal,

    /// Changes below this |change %| are not reported at all
    pub variance_report_floor_percent: Decimal,

    /// Suppress clean integer cost multiples as unit-of-measure artifacts
    pub unit_multiple_suppression: bool,

    /// Lower bound of the suppressed multiple range
    pub unit_multiple_min: u32,

    /// Upper bound of the suppressed multiple range
    pub unit_multiple_max: u32,

    /// Bounded retries for the allocate-and-commit sequence on
    /// serialization failure or lock timeout
    pub allocation_max_retries: u32,

    /// Minimum length of a manual adjustment reason
    pub adjustment_reason_min_len: usize,
}

impl InventoryConfig {
    /// Variance thresholds in the form the classifier consumes.
    pub fn variance_thresholds(&self) -> VarianceThresholds {
        VarianceThresholds {
            medium_percent: self.variance_medium_percent,
            high_percent: self.variance_high_percent,
            report_floor_percent: self.variance_report_floor_percent,
            unit_multiple_suppression: self.unit_multiple_suppression,
            unit_multiple_min: self.unit_multiple_min,
            unit_multiple_max: self.unit_multiple_max,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("POS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("inventory.variance_baseline", "previous_batch")?
            .set_default("inventory.variance_medium_percent", 20)?
            .set_default("inventory.variance_high_percent", 50)?
            .set_default("inventory.variance_report_floor_percent", 0)?
            .set_default("inventory.unit_multiple_suppression", true)?
            .set_default("inventory.unit_multiple_min", 2)?
            .set_default("inventory.unit_multiple_max", 200)?
            .set_default("inventory.allocation_max_retries", 3)?
            .set_default("inventory.adjustment_reason_min_len", 5)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (POS_ prefix)
            .add_source(
                Environment::with_prefix("POS")
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
