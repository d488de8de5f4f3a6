use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};
use tracing::debug;

use crate::{
    db::RecordRow,
    entities::film_metadata,
    error::StorageResult,
    models::{FilmId, FilmMetadataRecord, now_sec},
};

/// Per-installation persistent tier. The only tier that expires records.
#[async_trait]
pub trait LocalCacheStore: Send + Sync {
    async fn get(&self, id: &FilmId) -> StorageResult<Option<FilmMetadataRecord>>;

    /// Replaces any prior record for the same identifier.
    async fn put(&self, record: &FilmMetadataRecord) -> StorageResult<()>;

    fn freshness(&self) -> Duration;

    fn is_stale(&self, record: &FilmMetadataRecord) -> bool {
        let window = i64::try_from(self.freshness().as_secs()).unwrap_or(i64::MAX);
        now_sec().saturating_sub(record.fetched_at.as_second()) > window
    }
}

/// Instant `days` whole days before now, for eviction sweeps.
pub fn days_ago(days: i64) -> StorageResult<jiff::Timestamp> {
    let span = jiff::SignedDuration::from_secs(days.max(0).saturating_mul(86_400));
    Ok(jiff::Timestamp::now().checked_sub(span)?)
}

#[derive(Clone)]
pub struct SqliteLocalStore {
    db: DatabaseConnection,
    ttl_seconds: i64,
}

impl SqliteLocalStore {
    pub fn new(db: DatabaseConnection, ttl_days: i64) -> Self {
        Self { db, ttl_seconds: ttl_days.max(0).saturating_mul(86_400) }
    }

    pub async fn remove(&self, id: &FilmId) -> StorageResult<bool> {
        let res =
            film_metadata::Entity::delete_by_id(id.as_str().to_string()).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    /// Drops records fetched before `cutoff`, returning how many were removed.
    pub async fn evict_older_than(&self, cutoff: jiff::Timestamp) -> StorageResult<u64> {
        let res = film_metadata::Entity::delete_many()
            .filter(film_metadata::Column::FetchedAt.lt(cutoff.as_second()))
            .exec(&self.db)
            .await?;
        debug!(removed = res.rows_affected, cutoff = %cutoff, "evicted local records");
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl LocalCacheStore for SqliteLocalStore {
    async fn get(&self, id: &FilmId) -> StorageResult<Option<FilmMetadataRecord>> {
        let Some(row) =
            film_metadata::Entity::find_by_id(id.as_str().to_string()).one(&self.db).await?
        else {
            return Ok(None);
        };

        let record = RecordRow {
            payload: row.payload,
            fetched_at: row.fetched_at,
            schema_version: row.schema_version,
        }
        .decode(id.clone())?;

        if !record.is_supported() {
            debug!(id = %id, schema_version = record.schema_version, "ignoring newer local record");
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn put(&self, record: &FilmMetadataRecord) -> StorageResult<()> {
        let row = RecordRow::encode(record)?;
        let model = film_metadata::ActiveModel {
            id: Set(record.id.as_str().to_string()),
            payload: Set(row.payload),
            fetched_at: Set(row.fetched_at),
            schema_version: Set(row.schema_version),
            stored_at: Set(now_sec()),
        };

        film_metadata::Entity::insert(model)
            .on_conflict(
                OnConflict::column(film_metadata::Column::Id)
                    .update_columns([
                        film_metadata::Column::Payload,
                        film_metadata::Column::FetchedAt,
                        film_metadata::Column::SchemaVersion,
                        film_metadata::Column::StoredAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }

    fn freshness(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.ttl_seconds).unwrap_or(0))
    }
}
