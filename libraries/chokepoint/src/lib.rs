//! Single-flight async cache.
//!
//! Concurrent callers asking for the same key share one in-flight computation.
//! Completed values are kept either forever or, when built with
//! [`ChokePoint::with_ttl`], until they are older than the TTL.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::{Duration, Instant};

type SharedResult<V, E> = Shared<BoxFuture<'static, Result<Arc<V>, E>>>;

// `None` marks a value that was explicitly invalidated.
type Stamped<V> = (Arc<V>, Option<Instant>);

pub struct ChokePoint<K, V, E> {
    cache: Arc<DashMap<K, CacheEntry<V, E>>>,
    ttl: Option<Duration>,
}

enum CacheEntry<V, E> {
    Computing {
        future: SharedResult<V, E>,
        // value being replaced, still served to synchronous readers
        previous: Option<Stamped<V>>,
    },
    Completed {
        value: Arc<V>,
        loaded_at: Option<Instant>,
    },
}

enum Lookup<V, E> {
    Fresh(Arc<V>),
    Pending(SharedResult<V, E>),
    Recompute(Option<Stamped<V>>),
}

impl<K, V, E> Default for ChokePoint<K, V, E>
where
    K: Clone + Eq + Send + Sync + std::hash::Hash + 'static,
    V: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> ChokePoint<K, V, E>
where
    K: Clone + Eq + Send + Sync + std::hash::Hash + 'static,
    V: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            ttl: None,
        }
    }

    /// Completed values older than `ttl` are recomputed on the next `get`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            ttl: Some(ttl),
        }
    }

    fn is_fresh(&self, loaded_at: Option<Instant>) -> bool {
        match (loaded_at, self.ttl) {
            (None, _) => false,
            (Some(loaded_at), Some(ttl)) => loaded_at.elapsed() < ttl,
            (Some(_), None) => true,
        }
    }

    fn classify(&self, entry: Option<&CacheEntry<V, E>>) -> Lookup<V, E> {
        match entry {
            Some(CacheEntry::Completed { value, loaded_at }) => {
                if self.is_fresh(*loaded_at) {
                    Lookup::Fresh(Arc::clone(value))
                } else {
                    Lookup::Recompute(Some((Arc::clone(value), *loaded_at)))
                }
            }
            Some(CacheEntry::Computing { future, .. }) => Lookup::Pending(future.clone()),
            None => Lookup::Recompute(None),
        }
    }

    pub async fn get<Fut>(&self, key: K, compute: Fut) -> Result<Arc<V>, E>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        // Fast path: the shard guard is released before anything is awaited
        let lookup = self.classify(self.cache.get(&key).as_deref());
        match lookup {
            Lookup::Fresh(value) => return Ok(value),
            Lookup::Pending(future) => return future.await,
            Lookup::Recompute(_) => {}
        }

        // Slow path: re-check under the entry lock, then install our computation
        let entry = self.cache.entry(key.clone());
        let lookup = match &entry {
            Entry::Occupied(occupied) => self.classify(Some(occupied.get())),
            Entry::Vacant(_) => Lookup::Recompute(None),
        };
        let previous = match lookup {
            Lookup::Fresh(value) => return Ok(value),
            Lookup::Pending(future) => {
                drop(entry);
                return future.await;
            }
            Lookup::Recompute(previous) => previous,
        };

        let cache = Arc::clone(&self.cache);
        let restore = previous.clone();
        let wrapped = async move {
            let result = compute.await.map(Arc::new);
            match &result {
                Ok(value) => {
                    cache.insert(
                        key,
                        CacheEntry::Completed {
                            value: Arc::clone(value),
                            loaded_at: Some(Instant::now()),
                        },
                    );
                }
                Err(_) => match restore {
                    // keep serving the stale value; the next get retries
                    Some((value, loaded_at)) => {
                        cache.insert(key, CacheEntry::Completed { value, loaded_at });
                    }
                    None => {
                        cache.remove(&key);
                    }
                },
            }
            result
        }
        .boxed()
        .shared();

        drop(entry.insert(CacheEntry::Computing {
            future: wrapped.clone(),
            previous,
        }));

        wrapped.await
    }

    /// The last completed value for `key`, fresh or not, without computing anything.
    pub fn get_cached(&self, key: &K) -> Option<Arc<V>> {
        match self.cache.get(key).as_deref() {
            Some(CacheEntry::Completed { value, .. }) => Some(Arc::clone(value)),
            Some(CacheEntry::Computing { previous, .. }) => {
                previous.as_ref().map(|(value, _)| Arc::clone(value))
            }
            None => None,
        }
    }

    /// Marks the completed value for `key` stale so the next `get` recomputes it.
    /// An in-flight computation is left alone.
    pub fn invalidate(&self, key: &K) {
        if let Some(mut entry) = self.cache.get_mut(key)
            && let CacheEntry::Completed { loaded_at, .. } = &mut *entry
        {
            *loaded_at = None;
        }
    }
}
