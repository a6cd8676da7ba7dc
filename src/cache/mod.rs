use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};

use crate::db;
use crate::errors::AppError;
use crate::models::department::Department;

/// Single-entry cache holding the last successful fetch of a resource.
///
/// Reads return the stored snapshot when present and otherwise run the
/// supplied fetch, with concurrent cold reads coalescing behind one
/// in-flight fetch. Invalidation bumps a generation counter so a fetch that
/// raced with an invalidation cannot publish its stale result (last refetch
/// wins).
pub struct SnapshotCache<T> {
    slot: RwLock<Option<Arc<T>>>,
    generation: AtomicU64,
    refresh: Mutex<()>,
}

impl<T> SnapshotCache<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            generation: AtomicU64::new(0),
            refresh: Mutex::new(()),
        }
    }

    pub async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(snapshot) = self.slot.read().await.clone() {
            return Ok(snapshot);
        }

        let _refresh = self.refresh.lock().await;

        // A concurrent reader may have refilled the slot while we waited.
        if let Some(snapshot) = self.slot.read().await.clone() {
            return Ok(snapshot);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let snapshot = Arc::new(fetch().await?);

        if self.generation.load(Ordering::Acquire) == generation {
            *self.slot.write().await = Some(snapshot.clone());
        }
        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        *self.slot.write().await = None;
    }
}

/// The one cache entry of the system, keyed "departments" in spirit: the
/// last successful department listing.
pub struct DepartmentCache {
    inner: Arc<SnapshotCache<Vec<Department>>>,
}

impl DepartmentCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SnapshotCache::new()),
        }
    }

    pub async fn departments(&self, pool: &PgPool) -> Result<Arc<Vec<Department>>, AppError> {
        self.inner
            .get_or_fetch(|| db::departments::fetch_departments(pool))
            .await
    }

    /// Drops the snapshot immediately and schedules a background refetch.
    /// A refetch failure is logged and leaves the entry empty, so the next
    /// read fetches lazily.
    pub async fn invalidate(&self, pool: &PgPool) {
        self.inner.invalidate().await;

        let inner = self.inner.clone();
        let pool = pool.clone();
        tokio::spawn(async move {
            if let Err(err) = inner
                .get_or_fetch(|| db::departments::fetch_departments(&pool))
                .await
            {
                log::error!("Refetch after invalidation failed: {}", err);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_fetch(counter: &AtomicUsize) -> impl Future<Output = Result<usize, String>> + '_ {
        async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
    }

    #[tokio::test]
    async fn second_read_is_served_from_the_snapshot() {
        let cache = SnapshotCache::new();
        let fetches = AtomicUsize::new(0);

        let first = cache.get_or_fetch(|| counting_fetch(&fetches)).await.unwrap();
        let second = cache.get_or_fetch(|| counting_fetch(&fetches)).await.unwrap();

        assert_eq!(*first, 1);
        assert_eq!(*second, 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_a_refetch() {
        let cache = SnapshotCache::new();
        let fetches = AtomicUsize::new(0);

        cache.get_or_fetch(|| counting_fetch(&fetches)).await.unwrap();
        cache.invalidate().await;
        let refreshed = cache.get_or_fetch(|| counting_fetch(&fetches)).await.unwrap();

        assert_eq!(*refreshed, 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_the_cache_empty() {
        let cache: SnapshotCache<usize> = SnapshotCache::new();

        let failed: Result<Arc<usize>, String> = cache
            .get_or_fetch(|| async { Err("fetch failed".to_string()) })
            .await;
        assert!(failed.is_err());

        let fetches = AtomicUsize::new(0);
        let recovered = cache.get_or_fetch(|| counting_fetch(&fetches)).await.unwrap();
        assert_eq!(*recovered, 1);
    }

    #[tokio::test]
    async fn invalidation_during_a_fetch_discards_the_stale_result() {
        let cache: SnapshotCache<usize> = SnapshotCache::new();

        // The fetch observes an invalidation before it completes, so its
        // result must not be published.
        let stale = cache
            .get_or_fetch(|| async {
                cache.invalidate().await;
                Ok::<_, String>(1)
            })
            .await
            .unwrap();
        assert_eq!(*stale, 1);

        let fetches = AtomicUsize::new(0);
        cache.get_or_fetch(|| counting_fetch(&fetches)).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }
}
