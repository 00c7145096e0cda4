use crate::storage::StorageConfig;
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Default number of messages per history page.
    pub history_page_size: i64,
    /// Hard ceiling for a client-supplied `limit`.
    pub history_page_size_max: i64,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let history_page_size = env::var("HISTORY_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(20);
        let history_page_size_max = env::var("HISTORY_PAGE_SIZE_MAX")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            port,
            history_page_size,
            history_page_size_max,
            storage: StorageConfig::from_env(),
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            port: 3000,
            history_page_size: 20,
            history_page_size_max: 100,
            storage: StorageConfig::test_defaults(),
        }
    }
}
