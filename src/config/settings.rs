//! Application settings loaded from config.toml.
//!
//! The file carries the server bind address, the database URL, the purchase
//! policy knobs the booking core consults at validation time, and an optional
//! list of articles seeded on first start. Every section has defaults, so a
//! missing config.toml yields a runnable development configuration. Secrets
//! (admin credentials, session secret) are never stored here; they come from
//! the environment and are read directly before use.

use crate::core::booking::PurchasePolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Purchase policy consulted by the booking core
    pub policy: PurchasePolicy,
    /// Articles seeded while the article table is empty
    pub articles: Vec<ArticleSeed>,
}

/// HTTP server settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address, host:port
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Database settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SeaORM connection URL; `DATABASE_URL` overrides it
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/barkasse.sqlite?mode=rwc".to_string(),
        }
    }
}

/// Configuration for a single seeded article
#[derive(Debug, Deserialize, Clone)]
pub struct ArticleSeed {
    /// Article name
    pub name: String,
    /// Unit price in euros
    pub preis: f64,
    /// Initial stock count
    #[serde(default)]
    pub bestand: i32,
    /// Low-stock threshold; falls back to the policy default
    pub mindestbestand: Option<i32>,
    /// Display order
    pub order: Option<i32>,
}

/// Loads the application configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the configuration from the default location (./config.toml),
/// falling back to built-in defaults when the file does not exist.
pub fn load_default_config() -> Result<AppConfig> {
    if Path::new("config.toml").exists() {
        load_config("config.toml")
    } else {
        Ok(AppConfig::default())
    }
}
