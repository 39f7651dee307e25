//! Keyed background queries.
//!
//! A [`QueryCache`] runs one background job per distinct key and remembers its outcome,
//! the same way the map keeps one download per tile. Callers only ever look at the entry
//! for their current key, so a result for a key that has since been superseded is never
//! applied to a newer one. Failed queries are not retried.

use log::error;
use poll_promise::Promise;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// What a background job resolves to.
pub type QueryResult<T> = Result<T, Arc<eyre::Report>>;

/// The state of one query.
enum Query<T: Send + 'static> {
    /// The job is running.
    Pending(Promise<QueryResult<T>>),

    /// The job finished.
    Ready(T),

    /// The job failed.
    Failed(Arc<eyre::Report>),
}

/// A borrowed view on a query's state.
#[derive(Debug)]
pub enum QueryState<'a, T> {
    /// The job is still running.
    Loading,
    /// The job finished with a value.
    Ready(&'a T),
    /// The job failed.
    Failed(&'a eyre::Report),
}

impl<T> QueryState<'_, T> {
    /// The value, if the job finished successfully.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// One background job per key.
pub struct QueryCache<K, T: Send + 'static> {
    entries: HashMap<K, Query<T>>,
}

impl<K, T: Send + 'static> Default for QueryCache<K, T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, T> QueryCache<K, T>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    T: Clone + Send + 'static,
{
    /// Returns the state for `key`, starting the job with `spawn` if the key is new.
    ///
    /// `spawn` is called at most once per key over the life of the cache.
    pub fn fetch(
        &mut self,
        key: &K,
        spawn: impl FnOnce() -> Promise<QueryResult<T>>,
    ) -> QueryState<'_, T> {
        if !self.entries.contains_key(key) {
            self.entries.insert(key.clone(), Query::Pending(spawn()));
        }
        self.poll(key)
    }

    /// Returns the state for `key` without starting anything. `None` for unknown keys.
    pub fn get(&mut self, key: &K) -> Option<QueryState<'_, T>> {
        if self.entries.contains_key(key) {
            Some(self.poll(key))
        } else {
            None
        }
    }

    fn poll(&mut self, key: &K) -> QueryState<'_, T> {
        let Some(entry) = self.entries.get_mut(key) else {
            return QueryState::Loading;
        };

        if let Query::Pending(promise) = entry {
            if let Some(result) = promise.ready() {
                *entry = match result {
                    Ok(value) => Query::Ready(value.clone()),
                    Err(e) => {
                        error!("Query {:?} failed: {:?}", key, e);
                        Query::Failed(e.clone())
                    }
                };
            }
        }

        match entry {
            Query::Pending(_) => QueryState::Loading,
            Query::Ready(value) => QueryState::Ready(value),
            Query::Failed(e) => QueryState::Failed(&**e),
        }
    }

    /// The number of keys seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no job was ever started.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every key but `keep`. Running jobs of dropped keys finish unobserved.
    pub fn retain_only(&mut self, keep: Option<&K>) {
        self.entries.retain(|k, _| Some(k) == keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ready<T: Send + 'static>(value: T) -> Promise<QueryResult<T>> {
        Promise::from_ready(Ok(value))
    }

    #[test]
    fn spawns_once_per_key() {
        let mut cache: QueryCache<String, u32> = QueryCache::default();
        let spawned = Cell::new(0);
        let spawn = |value: u32| {
            spawned.set(spawned.get() + 1);
            ready(value)
        };

        let a = "a".to_string();
        assert_eq!(cache.fetch(&a, || spawn(1)).ready(), Some(&1));
        assert_eq!(cache.fetch(&a, || spawn(2)).ready(), Some(&1));
        assert_eq!(spawned.get(), 1);

        let b = "b".to_string();
        assert_eq!(cache.fetch(&b, || spawn(3)).ready(), Some(&3));
        assert_eq!(spawned.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_are_kept_and_not_retried() {
        let mut cache: QueryCache<u8, u32> = QueryCache::default();
        let failing = || Promise::from_ready(Err(Arc::new(eyre::eyre!("boom"))));

        match cache.fetch(&1, failing) {
            QueryState::Failed(e) => assert_eq!(e.to_string(), "boom"),
            other => panic!("unexpected state {other:?}"),
        }
        assert!(matches!(
            cache.fetch(&1, || ready(5)),
            QueryState::Failed(_)
        ));
    }

    #[test]
    fn pending_job_reports_loading() {
        let mut cache: QueryCache<u8, u32> = QueryCache::default();
        let (sender, promise) = Promise::new();

        assert!(matches!(cache.fetch(&7, || promise), QueryState::Loading));
        sender.send(Ok(42));
        assert_eq!(cache.get(&7).and_then(|s| s.ready().copied()), Some(42));
    }

    #[test]
    fn get_does_not_spawn() {
        let mut cache: QueryCache<u8, u32> = QueryCache::default();
        assert!(cache.get(&1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn retain_only_current_key() {
        let mut cache: QueryCache<u8, u32> = QueryCache::default();
        for key in 0..3 {
            cache.fetch(&key, || ready(key as u32));
        }
        cache.retain_only(Some(&2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2).and_then(|s| s.ready().copied()), Some(2));

        cache.retain_only(None);
        assert!(cache.is_empty());
    }
}
