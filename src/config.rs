use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres store when set; in-memory store otherwise.
    pub database_url: Option<String>,
    pub port: u16,
    /// Upper bound on the conversation-list fetch; on expiry the endpoint
    /// fails soft with an empty list.
    pub list_fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let list_fetch_timeout = env::var("LIST_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        Ok(Self {
            database_url,
            port,
            list_fetch_timeout,
        })
    }

    pub fn test_defaults() -> Self {
        Self {
            database_url: None,
            port: 3000,
            list_fetch_timeout: Duration::from_secs(10),
        }
    }
}
