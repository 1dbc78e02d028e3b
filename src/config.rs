//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; the vendor client identifiers are
//! protocol constants and live next to the client, not here.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID (Firestore + KMS)
    pub gcp_project_id: String,
    /// GCP region for the KMS key ring
    pub gcp_region: String,
    /// Minutes between automatic sync passes
    pub sync_interval_minutes: u64,
    /// How many days back each sync pass covers
    pub sync_lookback_days: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development a `.env` file is honored.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "europe-west1".to_string()),
            sync_interval_minutes: env::var("SYNC_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            sync_lookback_days: env::var("SYNC_LOOKBACK_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            gcp_region: "europe-west1".to_string(),
            sync_interval_minutes: 60,
            sync_lookback_days: 7,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("GCP_PROJECT_ID", "test-project");
        env::set_var("SYNC_INTERVAL_MINUTES", "15");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.gcp_project_id, "test-project");
        assert_eq!(config.sync_interval_minutes, 15);
        assert_eq!(config.sync_lookback_days, 7);
    }
}
