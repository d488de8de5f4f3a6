use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

use crate::{
    error::StorageResult,
    models::{FilmId, FilmMetadata, FilmMetadataRecord},
};

pub async fn connect_and_migrate(database_url: &str) -> StorageResult<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url);
    opts.connect_timeout(Duration::from_secs(10)).sqlx_logging(false);
    // Every pooled connection to `:memory:` would otherwise see its own database.
    if database_url.contains(":memory:") {
        opts.max_connections(1).min_connections(1);
    }
    let db = Database::connect(opts).await?;

    const PRAGMAS: [&str; 3] =
        ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL", "PRAGMA cache_size=-64000"];
    for pragma in PRAGMAS {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string())).await?;
    }

    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Columns shared by both record tables.
pub(crate) struct RecordRow {
    pub payload: String,
    pub fetched_at: i64,
    pub schema_version: i32,
}

impl RecordRow {
    pub fn encode(record: &FilmMetadataRecord) -> StorageResult<Self> {
        Ok(Self {
            payload: serde_json::to_string(&record.metadata)?,
            fetched_at: record.fetched_at.as_second(),
            schema_version: i32::try_from(record.schema_version).unwrap_or(i32::MAX),
        })
    }

    pub fn decode(self, id: FilmId) -> StorageResult<FilmMetadataRecord> {
        let metadata: FilmMetadata = serde_json::from_str(&self.payload)?;
        Ok(FilmMetadataRecord {
            id,
            metadata,
            fetched_at: jiff::Timestamp::from_second(self.fetched_at)?,
            schema_version: u32::try_from(self.schema_version).unwrap_or(0),
        })
    }
}
