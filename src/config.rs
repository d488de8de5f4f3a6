use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub database_url: String,
    pub cache_ttl_days: i64,
    pub omdb_rps: u32,
    pub omdb_timeout: Duration,
    pub max_concurrent: usize,
    pub shared_cache_url: Option<String>,
    pub evict_after_days: Option<i64>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let omdb_api_key = std::env::var("OMDB_API_KEY").unwrap_or_default();
        let omdb_base_url = std::env::var("OMDB_BASE_URL")
            .unwrap_or_else(|_| "https://www.omdbapi.com".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cinecache.db?mode=rwc".to_string());

        let cache_ttl_days: i64 =
            std::env::var("CACHE_TTL_DAYS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let omdb_rps: u32 =
            std::env::var("OMDB_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(4);

        let omdb_timeout_secs: u64 =
            std::env::var("OMDB_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let max_concurrent: usize =
            std::env::var("MAX_CONCURRENT_FETCHES").ok().and_then(|s| s.parse().ok()).unwrap_or(6);

        let shared_cache_url =
            std::env::var("SHARED_CACHE_URL").ok().filter(|s| !s.trim().is_empty());

        let evict_after_days: Option<i64> =
            std::env::var("EVICT_AFTER_DAYS").ok().and_then(|s| s.parse().ok());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            omdb_api_key,
            omdb_base_url,
            database_url,
            cache_ttl_days,
            omdb_rps,
            omdb_timeout: Duration::from_secs(omdb_timeout_secs),
            max_concurrent: max_concurrent.max(1),
            shared_cache_url,
            evict_after_days,
        })
    }
}
