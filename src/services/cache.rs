use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::config::ColumnMapping;
use crate::services::insights::get_insights;
use crate::services::listing::SnapshotSource;
use crate::services::normalizer::normalize;
use crate::types::errors::RefreshError;
use crate::types::models::{InsightResult, Snapshot};

/// A snapshot as held by the cache. Insights are computed on first use and
/// kept for the lifetime of the snapshot.
#[derive(Debug)]
pub struct CachedSnapshot {
    pub snapshot: Snapshot,
    pub generation: u64,
    loaded_at: Instant,
    insights: OnceLock<InsightResult>,
}

impl CachedSnapshot {
    fn new(snapshot: Snapshot, generation: u64) -> Self {
        Self {
            snapshot,
            generation,
            loaded_at: Instant::now(),
            insights: OnceLock::new(),
        }
    }

    pub fn insights(&self) -> &InsightResult {
        self.insights.get_or_init(|| get_insights(&self.snapshot))
    }

    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }
}

/// Process-wide holder of the single live snapshot.
pub struct SnapshotCache {
    source: Arc<dyn SnapshotSource>,
    mapping: Arc<ColumnMapping>,
    ttl: Duration,
    slot: RwLock<Option<Arc<CachedSnapshot>>>,
    // holds the message of the last failed load
    refresh_lock: Mutex<Option<String>>,
    failed_loads: AtomicU64,
    generation: AtomicU64,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn SnapshotSource>, mapping: Arc<ColumnMapping>, ttl: Duration) -> Self {
        Self {
            source,
            mapping,
            ttl,
            slot: RwLock::new(None),
            refresh_lock: Mutex::new(None),
            failed_loads: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// The cached snapshot while it is younger than the TTL, otherwise a
    /// freshly fetched one. Requests queued behind a failing fetch share its
    /// error instead of fetching again.
    pub async fn current(&self) -> Result<Arc<CachedSnapshot>, RefreshError> {
        if let Some(cached) = self.fresh().await {
            return Ok(cached);
        }

        let failures_seen = self.failed_loads.load(Ordering::Acquire);
        let mut last_failure = self.refresh_lock.lock().await;
        // another request may have refreshed while we waited
        if let Some(cached) = self.fresh().await {
            tracing::debug!("Snapshot refreshed by a concurrent request");
            return Ok(cached);
        }
        if self.failed_loads.load(Ordering::Acquire) != failures_seen {
            if let Some(message) = &*last_failure {
                tracing::debug!("Reusing failure of a concurrent refresh");
                return Err(RefreshError::Concurrent(message.clone()));
            }
        }

        self.load_recording(&mut last_failure).await
    }

    /// Fetches unconditionally. On failure the previous snapshot stays cached.
    pub async fn refresh(&self) -> Result<Arc<CachedSnapshot>, RefreshError> {
        let mut last_failure = self.refresh_lock.lock().await;
        self.load_recording(&mut last_failure).await
    }

    pub async fn peek(&self) -> Option<Arc<CachedSnapshot>> {
        self.slot.read().await.clone()
    }

    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        if slot.take().is_some() {
            tracing::info!("Snapshot cache invalidated");
        }
    }

    async fn fresh(&self) -> Option<Arc<CachedSnapshot>> {
        let slot = self.slot.read().await;
        slot.as_ref().filter(|c| c.age() < self.ttl).cloned()
    }

    async fn load_recording(&self, last_failure: &mut Option<String>) -> Result<Arc<CachedSnapshot>, RefreshError> {
        let result = self.load().await;
        match &result {
            Ok(_) => *last_failure = None,
            Err(e) => {
                *last_failure = Some(e.to_string());
                self.failed_loads.fetch_add(1, Ordering::Release);
            }
        }
        result
    }

    // callers hold refresh_lock
    async fn load(&self) -> Result<Arc<CachedSnapshot>, RefreshError> {
        let raw = match self.source.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Snapshot fetch failed, keeping previous snapshot: {}", e);
                return Err(e.into());
            }
        };

        let snapshot = match normalize(&raw, &self.mapping, Utc::now()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Listing failed schema checks, keeping previous snapshot: {}", e);
                return Err(e.into());
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cached = Arc::new(CachedSnapshot::new(snapshot, generation));
        *self.slot.write().await = Some(cached.clone());

        tracing::info!(
            "Cached snapshot generation {} with {} coins",
            generation,
            cached.snapshot.len()
        );
        Ok(cached)
    }
}
