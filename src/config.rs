use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use anyhow::Result;
use ::config::{Config, Environment, File};
use moka::future::Cache;
use sea_orm::Database;
use serde::Deserialize;
use tracing::{debug, info};

use crate::schemas::AppState;

/// Runtime settings.
///
/// Resolved from built-in defaults, then an optional `registrar.toml` in the
/// working directory, then `REGISTRAR_*` environment variables
/// (e.g. `REGISTRAR_JWT_SECRET`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: u64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub cache_ttl_seconds: u64,
    pub cache_capacity: u64,
    pub request_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://registrar.db?mode=rwc".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            jwt_secret: "change-me".to_string(),
            jwt_ttl_seconds: 8 * 60 * 60,
            cookie_name: "registrar_token".to_string(),
            cookie_secure: false,
            cache_ttl_seconds: 300,
            cache_capacity: 1000,
            request_timeout_seconds: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("database_url", defaults.database_url)?
            .set_default("bind_address", defaults.bind_address)?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_ttl_seconds", defaults.jwt_ttl_seconds as i64)?
            .set_default("cookie_name", defaults.cookie_name)?
            .set_default("cookie_secure", defaults.cookie_secure)?
            .set_default("cache_ttl_seconds", defaults.cache_ttl_seconds as i64)?
            .set_default("cache_capacity", defaults.cache_capacity as i64)?
            .set_default(
                "request_timeout_seconds",
                defaults.request_timeout_seconds as i64,
            )?
            .add_source(File::with_name("registrar").required(false))
            .add_source(Environment::with_prefix("REGISTRAR").try_parsing(true))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        if config.jwt_secret == "change-me" {
            tracing::warn!("Using the default JWT secret; set REGISTRAR_JWT_SECRET");
        }
        Ok(config)
    }

    /// Apply command line overrides.
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        self
    }
}

/// Initialize application state from configuration
pub async fn initialize_app_state(config: AppConfig) -> Result<AppState> {
    info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;
    debug!("Database connection established");

    let cache = Cache::builder()
        .max_capacity(config.cache_capacity)
        .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
        .build();

    Ok(AppState {
        db,
        cache,
        record_epoch: Arc::new(AtomicU64::new(0)),
        config: Arc::new(config),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_only_given_values() {
        let config = AppConfig::default().with_overrides(Some("sqlite::memory:".to_string()), None);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_address, "0.0.0.0:3000");
    }
}
