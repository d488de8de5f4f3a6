pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod indexer;
pub mod local;
pub mod models;
pub mod omdb;
pub mod orchestrator;
pub mod routes;
pub mod shared;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{config::Config, orchestrator::CacheOrchestrator, shared::SharedCacheStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: CacheOrchestrator,
}

/// Caller-facing routes, plus the shared-tier endpoints when `hub` is given.
pub fn app(state: Arc<AppState>, hub: Option<Arc<dyn SharedCacheStore>>) -> Router {
    let router = Router::new()
        .route("/films/{id}", get(routes::film))
        .route("/films/{id}/refresh", post(routes::refresh))
        .route("/search", get(routes::search))
        .route("/collection/view", post(routes::collection_view))
        .with_state(state);

    match hub {
        Some(store) => router.merge(shared::router(store)),
        None => router,
    }
}
