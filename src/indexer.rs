use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
};

use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    models::{CollectionEntry, FilmId, FilmMetadataRecord},
    orchestrator::{CacheOrchestrator, Resolved},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedFilter {
    #[default]
    All,
    Watched,
    Unwatched,
}

/// Categories combine with AND; genres within the selection combine with OR.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionFilter {
    pub watched: WatchedFilter,
    pub text: Option<String>,
    pub genres: BTreeSet<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Title,
    Year,
    #[default]
    DateAdded,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSort {
    pub key: SortKey,
    pub order: SortOrder,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CollectionItem<'a> {
    pub entry: &'a CollectionEntry,
    pub metadata: Option<&'a FilmMetadataRecord>,
}

impl CollectionFilter {
    fn matches(&self, entry: &CollectionEntry, metadata: Option<&FilmMetadataRecord>) -> bool {
        let watched_ok = match self.watched {
            WatchedFilter::All => true,
            WatchedFilter::Watched => entry.watched,
            WatchedFilter::Unwatched => !entry.watched,
        };
        if !watched_ok {
            return false;
        }

        let text = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if text.is_none() && self.genres.is_empty() {
            return true;
        }

        // Unresolved entries cannot match text or genre criteria.
        let Some(record) = metadata else {
            return false;
        };

        if let Some(text) = text {
            let needle = text.to_lowercase();
            let meta = &record.metadata;
            let hit = [&meta.title, &meta.director, &meta.actors]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if !self.genres.is_empty() {
            let hit = record.metadata.genres().into_iter().any(|g| {
                self.genres.iter().any(|selected| selected.eq_ignore_ascii_case(g))
            });
            if !hit {
                return false;
            }
        }

        true
    }
}

/// Filters and sorts `entries`, joining each with metadata from `lookup`.
/// The sort is stable; entries without metadata follow those with it when
/// sorting by title or year.
pub fn collection_view<'a, F>(
    entries: &'a [CollectionEntry],
    filter: &CollectionFilter,
    sort: CollectionSort,
    lookup: F,
) -> Vec<CollectionItem<'a>>
where
    F: Fn(&FilmId) -> Option<&'a FilmMetadataRecord>,
{
    let mut items: Vec<CollectionItem<'a>> = entries
        .iter()
        .map(|entry| CollectionItem { entry, metadata: lookup(&entry.id) })
        .filter(|item| filter.matches(item.entry, item.metadata))
        .collect();

    items.sort_by(|a, b| compare(a, b, sort));
    items
}

fn compare(a: &CollectionItem<'_>, b: &CollectionItem<'_>, sort: CollectionSort) -> Ordering {
    let directed = |ord: Ordering| match sort.order {
        SortOrder::Ascending => ord,
        SortOrder::Descending => ord.reverse(),
    };

    match sort.key {
        SortKey::DateAdded => directed(a.entry.date_added.cmp(&b.entry.date_added)),
        SortKey::Title => {
            let title = |item: &CollectionItem<'_>| {
                item.metadata.and_then(|r| r.metadata.title.as_deref()).map(str::to_lowercase)
            };
            known_first(title(a), title(b), directed)
        },
        SortKey::Year => {
            let year =
                |item: &CollectionItem<'_>| item.metadata.and_then(|r| r.metadata.release_year());
            known_first(year(a), year(b), directed)
        },
    }
}

fn known_first<T: Ord>(
    a: Option<T>,
    b: Option<T>,
    directed: impl Fn(Ordering) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Distinct genres across the resolved entries, sorted.
pub fn available_genres<'a, F>(entries: &'a [CollectionEntry], lookup: F) -> BTreeSet<String>
where
    F: Fn(&FilmId) -> Option<&'a FilmMetadataRecord>,
{
    entries
        .iter()
        .filter_map(|entry| lookup(&entry.id))
        .flat_map(|record| record.metadata.genres())
        .map(str::to_string)
        .collect()
}

/// Resolves every identifier with at most `max_concurrent` lookups at once.
/// Failed lookups are logged and left out of the result.
pub async fn warm(
    orchestrator: &CacheOrchestrator,
    ids: impl IntoIterator<Item = FilmId>,
    max_concurrent: usize,
) -> HashMap<FilmId, Resolved> {
    let ids: BTreeSet<FilmId> = ids.into_iter().collect();
    debug!(total_films = ids.len(), "warming metadata");

    let resolved: Vec<Option<(FilmId, Resolved)>> = stream::iter(ids)
        .map(|id| async move {
            match orchestrator.resolve(&id).await {
                Ok(resolved) => Some((id, resolved)),
                Err(err) => {
                    warn!(id = %id, error = %err, "failed to resolve film");
                    None
                },
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let out: HashMap<FilmId, Resolved> = resolved.into_iter().flatten().collect();
    debug!(resolved = out.len(), "completed warming");
    out
}
