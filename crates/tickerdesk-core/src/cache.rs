//! Categorized in-memory cache for backend responses.
//!
//! Entries live in one map per [`CacheCategory`]; the category decides the
//! default TTL. Expired entries are dropped lazily on read and eagerly by
//! [`CacheStore::sweep`], which a background task can run on a timer via
//! [`CacheStore::spawn_sweeper`].

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::clock::Clock;

/// Closed set of cache categories, each with its own default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheCategory {
    Market,
    Chart,
    Fundamentals,
    News,
    /// Never stored.
    Chat,
    AiSummary,
    Header,
    Search,
}

impl CacheCategory {
    pub const COUNT: usize = 8;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Market,
        Self::Chart,
        Self::Fundamentals,
        Self::News,
        Self::Chat,
        Self::AiSummary,
        Self::Header,
        Self::Search,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Market => 0,
            Self::Chart => 1,
            Self::Fundamentals => 2,
            Self::News => 3,
            Self::Chat => 4,
            Self::AiSummary => 5,
            Self::Header => 6,
            Self::Search => 7,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Chart => "chart",
            Self::Fundamentals => "fundamentals",
            Self::News => "news",
            Self::Chat => "chat",
            Self::AiSummary => "aiSummary",
            Self::Header => "header",
            Self::Search => "search",
        }
    }

    pub const fn default_ttl(self) -> Duration {
        Duration::from_secs(match self {
            Self::Market => 10,
            Self::Chart => 300,
            Self::Fundamentals => 86_400,
            Self::News => 1_800,
            Self::Chat => 0,
            Self::AiSummary => 3_600,
            Self::Header => 60,
            Self::Search => 300,
        })
    }

    pub const fn is_cacheable(self) -> bool {
        !matches!(self, Self::Chat)
    }
}

impl Display for CacheCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored response. Replaced wholesale on overwrite.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    pub expires_at: Instant,
    pub written_at: Instant,
    pub category: CacheCategory,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: BTreeMap<CacheCategory, usize>,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn total_entries(&self) -> usize {
        self.entries.values().sum()
    }
}

#[derive(Debug)]
struct CacheInner {
    slots: [HashMap<String, CacheEntry>; CacheCategory::COUNT],
    ttls: [Duration; CacheCategory::COUNT],
}

impl CacheInner {
    fn new(overrides: &BTreeMap<CacheCategory, Duration>) -> Self {
        let ttls = CacheCategory::ALL.map(|category| {
            if category.is_cacheable() {
                overrides
                    .get(&category)
                    .copied()
                    .unwrap_or_else(|| category.default_ttl())
            } else {
                Duration::ZERO
            }
        });

        Self {
            slots: Default::default(),
            ttls,
        }
    }

    fn slot(&self, category: CacheCategory) -> &HashMap<String, CacheEntry> {
        &self.slots[category.index()]
    }

    fn slot_mut(&mut self, category: CacheCategory) -> &mut HashMap<String, CacheEntry> {
        &mut self.slots[category.index()]
    }

    fn remove_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        for slot in &mut self.slots {
            let before = slot.len();
            slot.retain(|_, entry| !entry.is_expired(now));
            removed += before - slot.len();
        }
        removed
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

/// Thread-safe categorized cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<RwLock<CacheInner>>,
    counters: Arc<Counters>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Create a store using the default TTL of every category.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl_overrides(clock, &BTreeMap::new())
    }

    /// Create a store with per-category TTL overrides. An override for
    /// [`CacheCategory::Chat`] is ignored.
    pub fn with_ttl_overrides(
        clock: Arc<dyn Clock>,
        overrides: &BTreeMap<CacheCategory, Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::new(overrides))),
            counters: Arc::new(Counters::default()),
            clock,
        }
    }

    /// Effective TTL for a category.
    pub async fn ttl(&self, category: CacheCategory) -> Duration {
        self.inner.read().await.ttls[category.index()]
    }

    /// Get a live entry, deleting it if it has expired.
    pub async fn get(&self, key: &str, category: CacheCategory) -> Option<Value> {
        let now = self.clock.now();
        {
            let store = self.inner.read().await;
            match store.slot(category).get(key) {
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    trace!(key, %category, "cache miss");
                    return None;
                }
                Some(entry) if !entry.is_expired(now) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(key, %category, "cache hit");
                    return Some(entry.data.clone());
                }
                Some(_) => {}
            }
        }

        let mut store = self.inner.write().await;
        let slot = store.slot_mut(category);
        if slot.get(key).is_some_and(|entry| entry.is_expired(now)) {
            slot.remove(key);
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            debug!(key, %category, "cache entry expired");
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `data` under `key`. A no-op for [`CacheCategory::Chat`] and for
    /// a resolved TTL of zero.
    pub async fn set(
        &self,
        key: impl Into<String>,
        data: Value,
        category: CacheCategory,
        ttl_override: Option<Duration>,
    ) {
        if !category.is_cacheable() {
            return;
        }

        let mut store = self.inner.write().await;
        let ttl = ttl_override.unwrap_or(store.ttls[category.index()]);
        if ttl.is_zero() {
            return;
        }

        let now = self.clock.now();
        let key = key.into();
        trace!(key = %key, %category, ttl_secs = ttl.as_secs(), "cache write");
        store.slot_mut(category).insert(
            key,
            CacheEntry {
                data,
                expires_at: now + ttl,
                written_at: now,
                category,
            },
        );
    }

    /// Full entry including timestamps, without expiry side effects.
    pub async fn entry(&self, key: &str, category: CacheCategory) -> Option<CacheEntry> {
        self.inner.read().await.slot(category).get(key).cloned()
    }

    /// Remove every expired entry in every category; returns the number removed.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let removed = self.inner.write().await.remove_expired(now);
        if removed > 0 {
            self.counters
                .expirations
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "cache sweep removed expired entries");
        }
        removed
    }

    /// Clear one category, or everything when `category` is `None`.
    pub async fn clear(&self, category: Option<CacheCategory>) {
        let mut store = self.inner.write().await;
        match category {
            Some(category) => store.slot_mut(category).clear(),
            None => store.slots.iter_mut().for_each(HashMap::clear),
        }
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.slots.iter().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn len_in(&self, category: CacheCategory) -> usize {
        self.inner.read().await.slot(category).len()
    }

    pub async fn stats(&self) -> CacheStats {
        let store = self.inner.read().await;
        CacheStats {
            entries: CacheCategory::ALL
                .iter()
                .map(|category| (*category, store.slot(*category).len()))
                .collect(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        }
    }

    /// Run [`sweep`](Self::sweep) every `interval` on the tokio runtime until
    /// the returned handle is stopped or dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let store = self.clone();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        store.sweep().await;
                    }
                }
            }
            debug!("cache sweeper stopped");
        });

        SweeperHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Owner of a background sweep task; cancels it on drop.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
