use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use reqwest::StatusCode as HttpStatus;
use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};
use tracing::{debug, warn};

use crate::{
    db::RecordRow,
    entities::shared_film_metadata,
    error::{AppError, AppResult, StorageError, StorageResult},
    models::{FilmId, FilmMetadataRecord, now_sec},
};

/// Tier visible to every installation. Never expires records; concurrent
/// writers of the same identifier overwrite each other without error.
#[async_trait]
pub trait SharedCacheStore: Send + Sync {
    async fn get(&self, id: &FilmId) -> StorageResult<Option<FilmMetadataRecord>>;

    async fn put(&self, record: &FilmMetadataRecord) -> StorageResult<()>;
}

/// Client for a remote shared hub exposing [`router`].
pub struct HttpSharedStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSharedStore {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn record_url(&self, id: &FilmId) -> String {
        format!(
            "{}/shared/films/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(id.as_str())
        )
    }
}

#[async_trait]
impl SharedCacheStore for HttpSharedStore {
    async fn get(&self, id: &FilmId) -> StorageResult<Option<FilmMetadataRecord>> {
        let resp = self.client.get(self.record_url(id)).send().await?;
        match resp.status() {
            HttpStatus::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let record: FilmMetadataRecord = resp.json().await?;
                if record.id != *id || !record.is_supported() {
                    debug!(id = %id, "shared hub returned an unusable record");
                    return Ok(None);
                }
                Ok(Some(record))
            },
            status => Err(StorageError::Status(status.as_u16())),
        }
    }

    async fn put(&self, record: &FilmMetadataRecord) -> StorageResult<()> {
        let resp = self.client.put(self.record_url(&record.id)).json(record).send().await?;
        if !resp.status().is_success() {
            return Err(StorageError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

/// Shared tier backed by this process's own database, used when it is the hub.
#[derive(Clone)]
pub struct DbSharedStore {
    db: DatabaseConnection,
}

impl DbSharedStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SharedCacheStore for DbSharedStore {
    async fn get(&self, id: &FilmId) -> StorageResult<Option<FilmMetadataRecord>> {
        let row = shared_film_metadata::Entity::find_by_id(id.as_str().to_string())
            .one(&self.db)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let record = RecordRow {
            payload: row.payload,
            fetched_at: row.fetched_at,
            schema_version: row.schema_version,
        }
        .decode(id.clone())?;
        Ok(record.is_supported().then_some(record))
    }

    async fn put(&self, record: &FilmMetadataRecord) -> StorageResult<()> {
        let row = RecordRow::encode(record)?;
        let model = shared_film_metadata::ActiveModel {
            id: Set(record.id.as_str().to_string()),
            payload: Set(row.payload),
            fetched_at: Set(row.fetched_at),
            schema_version: Set(row.schema_version),
            stored_at: Set(now_sec()),
        };

        shared_film_metadata::Entity::insert(model)
            .on_conflict(
                OnConflict::column(shared_film_metadata::Column::Id)
                    .update_columns([
                        shared_film_metadata::Column::Payload,
                        shared_film_metadata::Column::FetchedAt,
                        shared_film_metadata::Column::SchemaVersion,
                        shared_film_metadata::Column::StoredAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }
}

/// Hub endpoints consumed by [`HttpSharedStore`].
pub fn router(store: Arc<dyn SharedCacheStore>) -> Router {
    Router::new().route("/shared/films/{id}", get(get_record).put(put_record)).with_state(store)
}

async fn get_record(
    State(store): State<Arc<dyn SharedCacheStore>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = FilmId::parse(&id).ok_or_else(|| AppError::BadRequest("empty film id".into()))?;
    match store.get(&id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

async fn put_record(
    State(store): State<Arc<dyn SharedCacheStore>>,
    Path(id): Path<String>,
    Json(record): Json<FilmMetadataRecord>,
) -> AppResult<StatusCode> {
    let id = FilmId::parse(&id).ok_or_else(|| AppError::BadRequest("empty film id".into()))?;
    if record.id != id {
        warn!(path_id = %id, body_id = %record.id, "rejected mismatched shared record");
        return Err(AppError::BadRequest("record id does not match path".into()));
    }
    store.put(&record).await?;
    Ok(StatusCode::NO_CONTENT)
}
