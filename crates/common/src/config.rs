//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default cap on the total uncompressed size of a published site (100 MB)
pub const DEFAULT_MAX_SITE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (PostgreSQL)
    pub database_url: String,

    /// Root directory under which site content is staged and served
    pub pages_root: PathBuf,

    /// Maximum total uncompressed size of one deployed site, in bytes
    pub max_site_size_bytes: u64,

    /// Runtime configuration
    pub log_level: String,
    pub rust_log: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?,

            pages_root: env::var("PAGES_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/var/lib/pagedock")),

            max_site_size_bytes: env::var("MAX_SITE_SIZE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_SITE_SIZE_BYTES),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "pagedock=debug".to_string()),
        };

        Ok(config)
    }
}
