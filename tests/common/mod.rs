#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cinecache::{
    error::{FetchError, StorageError, StorageResult},
    local::LocalCacheStore,
    models::{FilmId, FilmMetadata, FilmMetadataRecord, SearchHit, SearchPage},
    omdb::RemoteMetadataClient,
    orchestrator::CacheOrchestrator,
    shared::SharedCacheStore,
};
use jiff::SignedDuration;
use parking_lot::Mutex;

pub fn id(raw: &str) -> FilmId {
    FilmId::parse(raw).unwrap()
}

pub fn record(raw: &str, title: &str, year: &str) -> FilmMetadataRecord {
    FilmMetadataRecord::fetched_now(
        id(raw),
        FilmMetadata {
            title: Some(title.into()),
            year: Some(year.into()),
            genre: Some("Action, Crime, Drama".into()),
            director: Some("Christopher Nolan".into()),
            ..Default::default()
        },
    )
}

pub fn aged(mut record: FilmMetadataRecord, days: i64) -> FilmMetadataRecord {
    record.fetched_at = record.fetched_at - SignedDuration::from_hours(24 * days);
    record
}

fn unavailable() -> StorageError {
    StorageError::Status(503)
}

#[derive(Default)]
pub struct FakeLocal {
    pub records: Mutex<HashMap<FilmId, FilmMetadataRecord>>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub failing: AtomicBool,
}

impl FakeLocal {
    pub fn with(records: impl IntoIterator<Item = FilmMetadataRecord>) -> Self {
        let fake = Self::default();
        fake.records.lock().extend(records.into_iter().map(|r| (r.id.clone(), r)));
        fake
    }

    pub fn stored(&self, id: &FilmId) -> Option<FilmMetadataRecord> {
        self.records.lock().get(id).cloned()
    }
}

#[async_trait]
impl LocalCacheStore for FakeLocal {
    async fn get(&self, id: &FilmId) -> StorageResult<Option<FilmMetadataRecord>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.records.lock().get(id).cloned())
    }

    async fn put(&self, record: &FilmMetadataRecord) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.records.lock().insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn freshness(&self) -> Duration {
        Duration::from_secs(30 * 86_400)
    }
}

#[derive(Default)]
pub struct FakeShared {
    pub records: Mutex<HashMap<FilmId, FilmMetadataRecord>>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub failing: AtomicBool,
}

impl FakeShared {
    pub fn with(records: impl IntoIterator<Item = FilmMetadataRecord>) -> Self {
        let fake = Self::default();
        fake.records.lock().extend(records.into_iter().map(|r| (r.id.clone(), r)));
        fake
    }

    pub fn stored(&self, id: &FilmId) -> Option<FilmMetadataRecord> {
        self.records.lock().get(id).cloned()
    }
}

#[async_trait]
impl SharedCacheStore for FakeShared {
    async fn get(&self, id: &FilmId) -> StorageResult<Option<FilmMetadataRecord>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.records.lock().get(id).cloned())
    }

    async fn put(&self, record: &FilmMetadataRecord) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.records.lock().insert(record.id.clone(), record.clone());
        Ok(())
    }
}

/// Remote that answers from a fixed table; unknown ids are `NotFound`.
#[derive(Default)]
pub struct FakeRemote {
    pub films: Mutex<HashMap<FilmId, FilmMetadata>>,
    pub failure: Mutex<Option<FetchError>>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub searches: AtomicUsize,
    pub panicking: AtomicBool,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeRemote {
    pub fn with(films: impl IntoIterator<Item = FilmMetadataRecord>) -> Self {
        let fake = Self::default();
        fake.films.lock().extend(films.into_iter().map(|r| (r.id, r.metadata)));
        fake
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_with(&self, err: FetchError) {
        *self.failure.lock() = Some(err);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most `fetch` calls observed running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn answer(&self, id: &FilmId) -> Result<FilmMetadataRecord, FetchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        let metadata = self.films.lock().get(id).cloned();
        match metadata {
            Some(metadata) => Ok(FilmMetadataRecord::fetched_now(id.clone(), metadata)),
            None => Err(FetchError::NotFound(id.clone())),
        }
    }
}

#[async_trait]
impl RemoteMetadataClient for FakeRemote {
    async fn fetch(&self, id: &FilmId) -> Result<FilmMetadataRecord, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking.load(Ordering::SeqCst) {
            panic!("remote exploded fetching {id}");
        }
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        let result = self.answer(id).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, FetchError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let needle = query.to_lowercase();
        let results: Vec<SearchHit> = self
            .films
            .lock()
            .iter()
            .filter(|(_, m)| m.title.as_deref().is_some_and(|t| t.to_lowercase().contains(&needle)))
            .map(|(id, m)| SearchHit {
                id: id.clone(),
                title: m.title.clone().unwrap_or_default(),
                year: m.year.clone(),
                kind: Some("movie".into()),
                poster: None,
            })
            .collect();
        let total_results = u32::try_from(results.len()).unwrap();
        Ok(SearchPage { query: query.to_string(), page, total_results, results })
    }
}

pub struct Tiers {
    pub local: Arc<FakeLocal>,
    pub shared: Arc<FakeShared>,
    pub remote: Arc<FakeRemote>,
    pub orchestrator: CacheOrchestrator,
}

impl Tiers {
    pub fn new(local: FakeLocal, shared: FakeShared, remote: FakeRemote) -> Self {
        Self::with_cap(local, shared, remote, 6)
    }

    pub fn with_cap(
        local: FakeLocal,
        shared: FakeShared,
        remote: FakeRemote,
        max_concurrent: usize,
    ) -> Self {
        let local = Arc::new(local);
        let shared = Arc::new(shared);
        let remote = Arc::new(remote);
        let orchestrator = CacheOrchestrator::new(
            local.clone(),
            shared.clone(),
            remote.clone(),
            max_concurrent,
        );
        Self { local, shared, remote, orchestrator }
    }

    pub fn network_calls(&self) -> (usize, usize) {
        (self.shared.gets.load(Ordering::SeqCst), self.remote.calls())
    }
}
