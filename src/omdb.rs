use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::FetchError,
    models::{FilmId, FilmMetadata, FilmMetadataRecord, Rating, SearchHit, SearchPage},
};

/// Source of truth for film metadata. One attempt per call, no caching.
#[async_trait]
pub trait RemoteMetadataClient: Send + Sync {
    async fn fetch(&self, id: &FilmId) -> Result<FilmMetadataRecord, FetchError>;

    /// `page` is 1-based.
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, FetchError>;
}

pub struct OmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl OmdbClient {
    /// `client` carries the per-request timeout.
    pub fn new(client: reqwest::Client, api_key: String, base_url: String, rps: u32) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("no OMDB_API_KEY provided, remote lookups will fail as auth_invalid");
        }

        let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self { client, api_key, base_url, limiter }
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<OmdbEnvelope, FetchError> {
        if self.api_key.trim().is_empty() {
            return Err(FetchError::AuthInvalid);
        }

        self.limiter.until_ready().await;

        let url = format!("{}/", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .get(url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        // OMDb reports quota and key problems as 401 with a JSON error body.
        if let Ok(envelope) = serde_json::from_str::<OmdbEnvelope>(&body) {
            if let Some(err) = envelope.error.as_deref() {
                if let Some(mapped) = classify_error(err) {
                    return Err(mapped);
                }
            }
            if status.is_success() {
                return Ok(envelope);
            }
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchError::AuthInvalid),
            s if s.is_server_error() => Err(FetchError::Transient(format!("status {s}"))),
            s if s.is_success() => {
                Err(FetchError::MalformedResponse("body is not an OMDb envelope".into()))
            },
            s => Err(FetchError::MalformedResponse(format!("unexpected status {s}"))),
        }
    }
}

#[async_trait]
impl RemoteMetadataClient for OmdbClient {
    async fn fetch(&self, id: &FilmId) -> Result<FilmMetadataRecord, FetchError> {
        debug!(id = %id, "fetching from OMDb");
        let envelope = self.get(&[("i", id.as_str()), ("plot", "full")]).await?;

        match envelope.response.as_deref() {
            Some("True") => {},
            _ => {
                return Err(match envelope.error.as_deref() {
                    Some(e) if is_not_found(e) => FetchError::NotFound(id.clone()),
                    Some(e) => FetchError::MalformedResponse(e.to_string()),
                    None => FetchError::MalformedResponse("missing Response flag".into()),
                });
            },
        }

        let detail: OmdbDetail = serde_json::from_value(serde_json::Value::Object(envelope.rest))
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        if let Some(returned) = clean(detail.imdb_id.clone()) {
            if returned != id.as_str() {
                return Err(FetchError::MalformedResponse(format!(
                    "requested {id}, received {returned}"
                )));
            }
        }

        Ok(FilmMetadataRecord::fetched_now(id.clone(), detail.into_metadata()))
    }

    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, FetchError> {
        let query = query.trim();
        if query.is_empty() || page == 0 {
            return Ok(SearchPage::empty(query, page));
        }

        debug!(query = %query, page = page, "searching OMDb");
        let page_str = page.to_string();
        let envelope =
            self.get(&[("s", query), ("page", page_str.as_str()), ("type", "movie")]).await?;

        if envelope.response.as_deref() != Some("True") {
            return match envelope.error.as_deref() {
                Some(e) if is_not_found(e) || e.starts_with("Too many results") => {
                    Ok(SearchPage::empty(query, page))
                },
                Some(e) => Err(FetchError::MalformedResponse(e.to_string())),
                None => Err(FetchError::MalformedResponse("missing Response flag".into())),
            };
        }

        let body: OmdbSearch = serde_json::from_value(serde_json::Value::Object(envelope.rest))
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;
        let total_results = body
            .total_results
            .as_deref()
            .and_then(|t| t.trim().parse().ok())
            .ok_or_else(|| FetchError::MalformedResponse("missing totalResults".into()))?;

        let results = body
            .search
            .into_iter()
            .filter_map(|hit| {
                Some(SearchHit {
                    id: FilmId::parse(&hit.imdb_id)?,
                    title: clean(hit.title)?,
                    year: clean(hit.year),
                    kind: clean(hit.kind),
                    poster: clean(hit.poster),
                })
            })
            .collect();

        Ok(SearchPage { query: query.to_string(), page, total_results, results })
    }
}

fn classify_error(message: &str) -> Option<FetchError> {
    let lower = message.to_ascii_lowercase();
    if lower.contains("limit reached") {
        Some(FetchError::RateLimited)
    } else if lower.contains("api key") {
        Some(FetchError::AuthInvalid)
    } else {
        None
    }
}

fn is_not_found(message: &str) -> bool {
    message.contains("not found") || message.starts_with("Incorrect IMDb ID")
}

/// OMDb uses `"N/A"` and empty strings for unknown values.
fn clean(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty() && s != "N/A")
}

#[derive(Debug, Deserialize)]
struct OmdbEnvelope {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OmdbSearch {
    #[serde(rename = "Search", default)]
    search: Vec<OmdbSearchHit>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmdbSearchHit {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbDetail {
    title: Option<String>,
    year: Option<String>,
    rated: Option<String>,
    released: Option<String>,
    runtime: Option<String>,
    genre: Option<String>,
    director: Option<String>,
    writer: Option<String>,
    actors: Option<String>,
    plot: Option<String>,
    language: Option<String>,
    country: Option<String>,
    awards: Option<String>,
    poster: Option<String>,
    metascore: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes")]
    imdb_votes: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "BoxOffice")]
    box_office: Option<String>,
    production: Option<String>,
    website: Option<String>,
    #[serde(default)]
    ratings: Vec<OmdbRating>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbRating {
    source: String,
    value: String,
}

impl OmdbDetail {
    fn into_metadata(self) -> FilmMetadata {
        FilmMetadata {
            title: clean(self.title),
            year: clean(self.year),
            rated: clean(self.rated),
            released: clean(self.released),
            runtime: clean(self.runtime),
            genre: clean(self.genre),
            director: clean(self.director),
            writer: clean(self.writer),
            actors: clean(self.actors),
            plot: clean(self.plot),
            language: clean(self.language),
            country: clean(self.country),
            awards: clean(self.awards),
            poster: clean(self.poster),
            metascore: clean(self.metascore),
            imdb_rating: clean(self.imdb_rating),
            imdb_votes: clean(self.imdb_votes),
            kind: clean(self.kind),
            box_office: clean(self.box_office),
            production: clean(self.production),
            website: clean(self.website),
            ratings: self
                .ratings
                .into_iter()
                .filter(|r| r.value != "N/A")
                .map(|r| Rating { source: r.source, value: r.value })
                .collect(),
        }
    }
}
