//! In-process cache whose entries carry a tag, so a whole family of keys
//! (every page of a listing, say) can be evicted with one call.
//!
//! Each tag has a generation counter. An entry remembers the generation its
//! computation started under and is only served while that generation is
//! current, so a fill that races an invalidation never outlives it.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;

type Value = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct Slot {
    tag: Arc<str>,
    generation: u64,
    value: Value,
}

/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct TagCache {
    entries: Cache<String, Slot>,
    /// One counter per tag name, bumped by every invalidation
    generations: Arc<DashMap<String, u64>>,
}

impl TagCache {
    pub fn new(max_capacity: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(max_capacity)
            .support_invalidation_closures();
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            entries: builder.build(),
            generations: Arc::new(DashMap::new()),
        }
    }

    /// Return the value cached under `key`, or run `init`, store its result
    /// under `key` tagged with `tag`, and return it. Errors are not cached.
    ///
    /// A stored value of a different type than `T` counts as a miss and is replaced.
    /// If `tag` is invalidated while `init` runs, the result is returned but not stored.
    pub async fn get_or_try_insert_with<T, E, F, Fut>(
        &self,
        key: &str,
        tag: &str,
        init: F,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(slot) = self.current(key).await {
            if let Ok(value) = slot.value.downcast::<T>() {
                tracing::debug!(target: "bookshelf-cache", key, "cache hit");
                return Ok(value);
            }
        }

        let generation = self.generation(tag);
        tracing::debug!(target: "bookshelf-cache", key, tag, generation, "cache miss");
        let value = Arc::new(init().await?);

        if self.generation(tag) != generation {
            tracing::debug!(target: "bookshelf-cache", key, tag, "tag invalidated during fill; not stored");
            return Ok(value);
        }

        let slot = Slot {
            tag: Arc::from(tag),
            generation,
            value: value.clone() as Value,
        };
        self.entries.insert(key.to_string(), slot).await;

        Ok(value)
    }

    /// Evict every entry stored under any of `tags`.
    pub async fn invalidate_tags(&self, tags: &[&str]) {
        for tag in tags {
            let generation = {
                let mut counter = self.generations.entry(tag.to_string()).or_insert(0);
                *counter += 1;
                *counter
            };

            // Entries of older generations are already unreachable; this
            // reclaims their memory.
            let owned: Arc<str> = Arc::from(*tag);
            if let Err(e) = self
                .entries
                .invalidate_entries_if(move |_, slot| slot.tag == owned)
            {
                tracing::warn!(target: "bookshelf-cache", tag, error = %e, "could not schedule eviction");
            }

            tracing::debug!(target: "bookshelf-cache", tag, generation, "tag invalidated");
        }
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.current(key).await.is_some()
    }

    /// Number of stored entries, once pending evictions have been applied
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    fn generation(&self, tag: &str) -> u64 {
        self.generations.get(tag).map(|g| *g).unwrap_or(0)
    }

    /// The slot under `key` if its tag has not been invalidated since it was filled
    async fn current(&self, key: &str) -> Option<Slot> {
        let slot = self.entries.get(key).await?;
        (slot.generation == self.generation(&slot.tag)).then_some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> TagCache {
        TagCache::new(100, None)
    }

    async fn load(cache: &TagCache, key: &str, tag: &str, calls: &AtomicUsize) -> Arc<String> {
        cache
            .get_or_try_insert_with(key, tag, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(format!("{key}#{n}"))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        let first = load(&cache, "getAllBooks-1-3", "booksCache", &calls).await;
        let second = load(&cache, "getAllBooks-1-3", "booksCache", &calls).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidating_a_tag_evicts_all_its_keys_only() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        load(&cache, "getAllBooks-1-3", "booksCache", &calls).await;
        load(&cache, "getAllBooks-2-3", "booksCache", &calls).await;
        load(&cache, "getAllAuthors-1-3", "authorsCache", &calls).await;

        cache.invalidate_tags(&["booksCache"]).await;

        assert!(!cache.contains_key("getAllBooks-1-3").await);
        assert!(!cache.contains_key("getAllBooks-2-3").await);
        assert!(cache.contains_key("getAllAuthors-1-3").await);

        let again = load(&cache, "getAllBooks-1-3", "booksCache", &calls).await;
        assert_eq!(again.as_str(), "getAllBooks-1-3#3");
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = cache();

        let failed: Result<Arc<u32>, &str> = cache
            .get_or_try_insert_with("k", "t", || async { Err("boom") })
            .await;
        assert!(failed.is_err());
        assert!(!cache.contains_key("k").await);

        let value = cache
            .get_or_try_insert_with("k", "t", || async { Ok::<_, &str>(7u32) })
            .await
            .unwrap();
        assert_eq!(*value, 7);
    }

    #[tokio::test]
    async fn type_mismatch_is_a_miss() {
        let cache = cache();

        cache
            .get_or_try_insert_with("k", "t", || async { Ok::<_, Infallible>(1u32) })
            .await
            .unwrap();
        let text = cache
            .get_or_try_insert_with("k", "t", || async { Ok::<_, Infallible>("one".to_string()) })
            .await
            .unwrap();

        assert_eq!(text.as_str(), "one");
    }

    #[tokio::test]
    async fn storage_stays_within_capacity_for_many_keys() {
        let cache = TagCache::new(2, None);
        let calls = AtomicUsize::new(0);

        for page in 1..=5000 {
            load(&cache, &format!("getAllBooks-{page}-3"), "booksCache", &calls).await;
        }

        assert!(cache.entry_count().await <= 2);
        assert_eq!(cache.generations.len(), 0);

        cache.invalidate_tags(&["booksCache"]).await;
        assert!(!cache.contains_key("getAllBooks-5000-3").await);
        assert_eq!(cache.generations.len(), 1);
    }

    #[tokio::test]
    async fn fill_racing_an_invalidation_is_not_kept() {
        let cache = cache();

        let during = cache
            .get_or_try_insert_with("getAllBooks-1-3", "booksCache", || async {
                let stale = "old".to_string();
                cache.invalidate_tags(&["booksCache"]).await;
                Ok::<_, Infallible>(stale)
            })
            .await
            .unwrap();
        assert_eq!(during.as_str(), "old");
        assert!(!cache.contains_key("getAllBooks-1-3").await);

        let after = cache
            .get_or_try_insert_with("getAllBooks-1-3", "booksCache", || async {
                Ok::<_, Infallible>("new".to_string())
            })
            .await
            .unwrap();
        assert_eq!(after.as_str(), "new");
    }

    #[tokio::test]
    async fn entries_from_before_an_invalidation_are_never_served() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        load(&cache, "getAllBooks-1-3", "booksCache", &calls).await;
        // Stored again behind the counter's back, as a late insert would be
        let stale = cache.entries.get("getAllBooks-1-3").await.unwrap();
        cache.invalidate_tags(&["booksCache"]).await;
        cache
            .entries
            .insert("getAllBooks-1-3".to_string(), stale)
            .await;

        assert!(!cache.contains_key("getAllBooks-1-3").await);
        let fresh = load(&cache, "getAllBooks-1-3", "booksCache", &calls).await;
        assert_eq!(fresh.as_str(), "getAllBooks-1-3#1");
    }

    #[tokio::test]
    async fn unknown_tag_is_a_no_op() {
        let cache = cache();
        cache.invalidate_tags(&["nothing"]).await;
    }
}
