use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Schema version written with every record this build produces.
pub const SCHEMA_VERSION: u32 = 1;

/// Fixed page size of the remote search endpoint.
pub const SEARCH_PAGE_SIZE: u32 = 10;

/// Opaque catalog identifier (e.g. `tt0468569`), the cache key at every tier.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilmId(String);

impl FilmId {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (!raw.is_empty()).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub source: String,
    pub value: String,
}

/// Descriptive attributes of one film. Unknown values are `None`, never a
/// placeholder string.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awards: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metascore: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_votes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_office: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ratings: Vec<Rating>,
}

impl FilmMetadata {
    pub fn genres(&self) -> Vec<&str> {
        self.genre
            .as_deref()
            .map(|g| g.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Leading year of the `year` field; series ranges such as `2008–2012`
    /// yield their first year.
    pub fn release_year(&self) -> Option<i32> {
        let year = self.year.as_deref()?.trim();
        let digits: String = year.chars().take_while(char::is_ascii_digit).collect();
        if digits.len() != 4 {
            return None;
        }
        digits.parse().ok()
    }
}

/// One film's cached metadata. Tiers store and replace records wholesale.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FilmMetadataRecord {
    pub id: FilmId,
    pub metadata: FilmMetadata,
    pub fetched_at: Timestamp,
    pub schema_version: u32,
}

impl FilmMetadataRecord {
    /// Record stamped as fetched now.
    pub fn fetched_now(id: FilmId, metadata: FilmMetadata) -> Self {
        Self { id, metadata, fetched_at: now_truncated(), schema_version: SCHEMA_VERSION }
    }

    pub fn is_supported(&self) -> bool {
        self.schema_version <= SCHEMA_VERSION
    }
}

/// User-owned reference to a film; joined with metadata at read time.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: FilmId,
    #[serde(default)]
    pub personal_rating: Option<u8>,
    #[serde(default)]
    pub watched: bool,
    #[serde(default)]
    pub watched_at: Option<Timestamp>,
    pub date_added: Timestamp,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: FilmId,
    pub title: String,
    pub year: Option<String>,
    pub kind: Option<String>,
    pub poster: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub query: String,
    pub page: u32,
    pub total_results: u32,
    pub results: Vec<SearchHit>,
}

impl SearchPage {
    pub fn empty(query: &str, page: u32) -> Self {
        Self { query: query.to_string(), page, total_results: 0, results: Vec::new() }
    }

    pub fn total_pages(&self) -> u32 {
        self.total_results.div_ceil(SEARCH_PAGE_SIZE)
    }
}

pub(crate) fn now_sec() -> i64 {
    Timestamp::now().as_second()
}

fn now_truncated() -> Timestamp {
    Timestamp::from_second(now_sec()).unwrap_or(Timestamp::UNIX_EPOCH)
}
