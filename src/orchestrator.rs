//! Tiered film-metadata lookup: local store, then shared store, then remote.
//!
//! Deeper hits are written through to every shallower tier so the next lookup
//! for the same identifier is served locally. Concurrent lookups that miss the
//! local tier share a single in-flight task per identifier.

use std::{collections::HashMap, sync::Arc};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::{
    error::FetchError,
    local::LocalCacheStore,
    models::{FilmId, FilmMetadataRecord, SearchPage},
    omdb::RemoteMetadataClient,
    shared::SharedCacheStore,
};

/// Tier that produced a resolved record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    Shared,
    Remote,
    /// Expired local copy served because the remote lookup failed.
    StaleLocal,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Resolved {
    pub record: FilmMetadataRecord,
    pub origin: Origin,
}

impl Resolved {
    pub fn is_stale(&self) -> bool {
        self.origin == Origin::StaleLocal
    }
}

type InFlight = Shared<BoxFuture<'static, Result<Resolved, FetchError>>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Lookup {
    /// Shared tier first, remote on miss.
    Tiered,
    /// Straight to remote.
    RemoteOnly,
}

#[derive(Clone)]
pub struct CacheOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    local: Arc<dyn LocalCacheStore>,
    shared: Arc<dyn SharedCacheStore>,
    remote: Arc<dyn RemoteMetadataClient>,
    permits: Semaphore,
    in_flight: Mutex<HashMap<FilmId, InFlight>>,
}

impl CacheOrchestrator {
    /// `max_concurrent` caps simultaneous remote requests.
    pub fn new(
        local: Arc<dyn LocalCacheStore>,
        shared: Arc<dyn SharedCacheStore>,
        remote: Arc<dyn RemoteMetadataClient>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                local,
                shared,
                remote,
                permits: Semaphore::new(max_concurrent.max(1)),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub async fn resolve(&self, id: &FilmId) -> Result<Resolved, FetchError> {
        let stale = match self.inner.local.get(id).await {
            Ok(Some(record)) if !self.inner.local.is_stale(&record) => {
                debug!(id = %id, "local hit");
                return Ok(Resolved { record, origin: Origin::Local });
            },
            Ok(Some(record)) => {
                debug!(id = %id, fetched_at = %record.fetched_at, "local record is stale");
                Some(record)
            },
            Ok(None) => {
                debug!(id = %id, "local miss");
                None
            },
            Err(err) => {
                warn!(id = %id, error = %err, "local tier unavailable, treating as miss");
                None
            },
        };

        self.join_or_start(id, Lookup::Tiered, stale).await
    }

    /// Bypasses both cache tiers and refetches from remote, writing through on
    /// success. Joins an in-flight lookup for the same identifier if one exists.
    /// When the remote fails the local copy is served, as `Local` while it is
    /// still fresh.
    pub async fn refresh(&self, id: &FilmId) -> Result<Resolved, FetchError> {
        let previous = match self.inner.local.get(id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(id = %id, error = %err, "local tier unavailable during refresh");
                None
            },
        };

        self.join_or_start(id, Lookup::RemoteOnly, previous).await
    }

    /// Remote search, never cached.
    pub async fn search(&self, query: &str, page: u32) -> Result<SearchPage, FetchError> {
        let _permit = self.inner.acquire().await?;
        self.inner.remote.search(query, page).await
    }

    /// Number of identifiers with a lookup currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    fn join_or_start(
        &self,
        id: &FilmId,
        lookup: Lookup,
        fallback: Option<FilmMetadataRecord>,
    ) -> InFlight {
        let mut in_flight = self.inner.in_flight.lock();
        if let Some(pending) = in_flight.get(id) {
            debug!(id = %id, "joining in-flight lookup");
            return pending.clone();
        }

        let inner = self.inner.clone();
        let key = id.clone();
        let task_fallback = fallback.clone();
        // The lock is held until the entry is inserted, so the task cannot
        // remove it first.
        let handle = tokio::spawn(async move {
            let _entry = EntryGuard { inner: inner.clone(), id: key.clone() };
            inner.settle(&key, lookup, task_fallback).await
        });

        let inner = self.inner.clone();
        let key = id.clone();
        let pending = handle
            .map(move |joined| {
                joined.unwrap_or_else(|err| {
                    let err = FetchError::Transient(format!("lookup task failed: {err}"));
                    inner.fall_back(&key, err, fallback)
                })
            })
            .boxed()
            .shared();
        in_flight.insert(id.clone(), pending.clone());
        pending
    }
}

/// Removes the in-flight entry when the lookup task finishes, panics included.
struct EntryGuard {
    inner: Arc<Inner>,
    id: FilmId,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        self.inner.in_flight.lock().remove(&self.id);
    }
}

impl Inner {
    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>, FetchError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| FetchError::Transient("fetch limiter closed".into()))
    }

    async fn settle(
        &self,
        id: &FilmId,
        lookup: Lookup,
        fallback: Option<FilmMetadataRecord>,
    ) -> Result<Resolved, FetchError> {
        if lookup == Lookup::Tiered {
            match self.shared.get(id).await {
                Ok(Some(record)) => {
                    debug!(id = %id, "shared hit");
                    self.write_local(&record).await;
                    return Ok(Resolved { record, origin: Origin::Shared });
                },
                Ok(None) => debug!(id = %id, "shared miss"),
                Err(err) => {
                    warn!(id = %id, error = %err, "shared tier unavailable, treating as miss")
                },
            }
        }

        let fetched = {
            let _permit = self.acquire().await?;
            self.remote.fetch(id).await
        };

        match fetched {
            Ok(record) => {
                debug!(id = %id, "remote hit");
                if let Err(err) = self.shared.put(&record).await {
                    warn!(id = %id, error = %err, "failed to write through to shared tier");
                }
                self.write_local(&record).await;
                Ok(Resolved { record, origin: Origin::Remote })
            },
            Err(err) => self.fall_back(id, err, fallback),
        }
    }

    /// Serves the local copy in place of a failed lookup, labelled by its age.
    fn fall_back(
        &self,
        id: &FilmId,
        err: FetchError,
        fallback: Option<FilmMetadataRecord>,
    ) -> Result<Resolved, FetchError> {
        match fallback {
            Some(record) if err.allows_stale_fallback() => {
                let origin =
                    if self.local.is_stale(&record) { Origin::StaleLocal } else { Origin::Local };
                warn!(id = %id, error = %err, ?origin, "remote failed, serving local record");
                Ok(Resolved { record, origin })
            },
            _ => {
                debug!(id = %id, error = %err, "remote lookup failed");
                Err(err)
            },
        }
    }

    async fn write_local(&self, record: &FilmMetadataRecord) {
        if let Err(err) = self.local.put(record).await {
            warn!(id = %record.id, error = %err, "failed to write through to local tier");
        }
    }
}
