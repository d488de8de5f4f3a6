use std::{collections::BTreeSet, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::{AppError, AppResult},
    indexer::{self, CollectionFilter, CollectionItem, CollectionSort},
    models::{CollectionEntry, FilmId, SearchPage},
    orchestrator::{Origin, Resolved},
};

fn parse_id(raw: &str) -> AppResult<FilmId> {
    FilmId::parse(raw).ok_or_else(|| AppError::BadRequest("film id is required".into()))
}

pub async fn film(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Resolved>> {
    let id = parse_id(&id)?;
    Ok(Json(state.orchestrator.resolve(&id).await?))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Resolved>> {
    let id = parse_id(&id)?;
    Ok(Json(state.orchestrator.refresh(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    page: Option<u32>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<SearchPage>> {
    let query = q.q.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("query is required".into()));
    }
    let page = q.page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::BadRequest("page numbers start at 1".into()));
    }
    Ok(Json(state.orchestrator.search(query, page).await?))
}

#[derive(Debug, Deserialize)]
pub struct CollectionViewRequest {
    entries: Vec<CollectionEntry>,
    #[serde(default)]
    filter: CollectionFilter,
    #[serde(default)]
    sort: CollectionSort,
}

#[derive(Serialize)]
struct ViewItem<'a> {
    #[serde(flatten)]
    item: CollectionItem<'a>,
    origin: Option<Origin>,
}

#[derive(Serialize)]
struct CollectionViewResponse<'a> {
    items: Vec<ViewItem<'a>>,
    genres: BTreeSet<String>,
}

pub async fn collection_view(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CollectionViewRequest>,
) -> Response {
    let resolved = indexer::warm(
        &state.orchestrator,
        req.entries.iter().map(|e| e.id.clone()),
        state.config.max_concurrent,
    )
    .await;
    let lookup = |id: &FilmId| resolved.get(id).map(|r| &r.record);

    let items = indexer::collection_view(&req.entries, &req.filter, req.sort, lookup)
        .into_iter()
        .map(|item| {
            let origin = resolved.get(&item.entry.id).map(|r| r.origin);
            ViewItem { item, origin }
        })
        .collect();
    let genres = indexer::available_genres(&req.entries, lookup);

    Json(CollectionViewResponse { items, genres }).into_response()
}
