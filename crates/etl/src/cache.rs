#![forbid(unsafe_code)]

use crate::error::CacheError;
use bi_core::JobCategory;
use bi_core::ids::RequestId;
use bi_storage::{SqliteStore, StoreError};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::warn;

/// Key/value storage for the request ids each feed ingested last.
pub trait CacheBackend {
    fn get_ids(&mut self, key: &str) -> Result<Option<BTreeSet<i64>>, CacheError>;

    fn set_ids(
        &mut self,
        key: &str,
        ids: &BTreeSet<i64>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, (BTreeSet<i64>, Option<Instant>)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryCache {
    fn get_ids(&mut self, key: &str) -> Result<Option<BTreeSet<i64>>, CacheError> {
        let now = Instant::now();
        let expired = self
            .entries
            .get(key)
            .is_some_and(|(_, expires)| expires.is_some_and(|at| at <= now));
        if expired {
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|(ids, _)| ids.clone()))
    }

    fn set_ids(
        &mut self,
        key: &str,
        ids: &BTreeSet<i64>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let expires = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries.insert(key.to_string(), (ids.clone(), expires));
        Ok(())
    }
}

/// Keeps id sets in the `cache_entries` table so that separate processes
/// sharing the database see the same dedup state.
pub struct SqliteCache {
    store: SqliteStore,
}

impl SqliteCache {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            store: SqliteStore::open(storage_dir)?,
        })
    }

    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

impl CacheBackend for SqliteCache {
    fn get_ids(&mut self, key: &str) -> Result<Option<BTreeSet<i64>>, CacheError> {
        let Some(entry) = self.store.cache_get(key)? else {
            return Ok(None);
        };
        let ids = serde_json::from_str(&entry.value).map_err(|source| CacheError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(ids))
    }

    fn set_ids(
        &mut self,
        key: &str,
        ids: &BTreeSet<i64>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let value = serde_json::to_string(ids).map_err(|source| CacheError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        let ttl_ms = ttl.map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        self.store.cache_set(key, &value, ttl_ms)?;
        Ok(())
    }
}

/// Dedup state for one run of one feed.
///
/// `previous` holds what the last run ingested, `current` what this run has
/// marked. Committing replaces the stored set with `current`, so ids that
/// dropped out of the feed are forgotten.
#[derive(Debug)]
pub struct DedupCache {
    category: JobCategory,
    previous: BTreeSet<i64>,
    current: BTreeSet<i64>,
    newly_marked: usize,
}

impl DedupCache {
    /// An unreadable stored set is treated as empty: the worst case is a
    /// re-ingest, which the store absorbs.
    pub fn load(
        backend: &mut impl CacheBackend,
        category: JobCategory,
    ) -> Result<Self, CacheError> {
        let previous = match backend.get_ids(category.cache_key()) {
            Ok(ids) => ids.unwrap_or_default(),
            Err(CacheError::Corrupt { key, source }) => {
                warn!(%key, %source, "discarding unreadable dedup cache entry");
                BTreeSet::new()
            }
            Err(err) => return Err(err),
        };
        Ok(Self {
            category,
            previous,
            current: BTreeSet::new(),
            newly_marked: 0,
        })
    }

    pub fn category(&self) -> JobCategory {
        self.category
    }

    /// True when the id was ingested by the previous run or already marked in this one.
    pub fn has_seen(&self, id: RequestId) -> bool {
        self.previous.contains(&id.get()) || self.current.contains(&id.get())
    }

    /// Returns true when the id is new to both the previous and this run.
    pub fn mark_seen(&mut self, id: RequestId) -> bool {
        let inserted = self.current.insert(id.get());
        let new = inserted && !self.previous.contains(&id.get());
        if new {
            self.newly_marked += 1;
        }
        new
    }

    pub fn has_new(&self) -> bool {
        self.newly_marked > 0
    }

    pub fn newly_marked(&self) -> usize {
        self.newly_marked
    }

    pub fn current(&self) -> &BTreeSet<i64> {
        &self.current
    }

    /// Persists this run's id set and reports whether it contained anything new.
    pub fn commit(
        self,
        backend: &mut impl CacheBackend,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        backend.set_ids(self.category.cache_key(), &self.current, ttl)?;
        Ok(self.has_new())
    }
}
