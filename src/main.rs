use std::sync::Arc;

use anyhow::Context;
use cinecache::{
    AppState, app,
    config::Config,
    db,
    local::{LocalCacheStore, SqliteLocalStore, days_ago},
    omdb::{OmdbClient, RemoteMetadataClient},
    orchestrator::CacheOrchestrator,
    shared::{DbSharedStore, HttpSharedStore, SharedCacheStore},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinecache=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("cinecache/0.1")
        .timeout(config.omdb_timeout)
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await.context("database")?;
    let local = SqliteLocalStore::new(db.clone(), config.cache_ttl_days);

    if let Some(days) = config.evict_after_days {
        let cutoff = days_ago(days).context("EVICT_AFTER_DAYS")?;
        let removed = local.evict_older_than(cutoff).await.context("startup eviction")?;
        tracing::info!(removed, days, "evicted old local records");
    }

    let (shared, hub): (Arc<dyn SharedCacheStore>, Option<Arc<dyn SharedCacheStore>>) =
        match &config.shared_cache_url {
            Some(url) => {
                tracing::info!(url = %url, "using remote shared cache");
                (Arc::new(HttpSharedStore::new(http.clone(), url.clone())), None)
            },
            None => {
                tracing::info!("hosting shared cache");
                let store: Arc<dyn SharedCacheStore> = Arc::new(DbSharedStore::new(db));
                (store.clone(), Some(store))
            },
        };

    let remote: Arc<dyn RemoteMetadataClient> = Arc::new(OmdbClient::new(
        http,
        config.omdb_api_key.clone(),
        config.omdb_base_url.clone(),
        config.omdb_rps,
    ));
    let local: Arc<dyn LocalCacheStore> = Arc::new(local);

    let orchestrator = CacheOrchestrator::new(local, shared, remote, config.max_concurrent);
    let state = Arc::new(AppState { config: config.clone(), orchestrator });

    let app = app(state, hub).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any)),
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
