//! Query cache in front of the posts API.
//!
//! Results are stored under segment-list keys such as `["post", "7"]`.
//! Reads hit the cache while an entry is fresh; misses go to the fetcher,
//! which is retried on failure. Mutations call [`QueryClient::invalidate`]
//! with a key prefix, dropping every entry underneath it.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::{ApiError, PostId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self(parts.into_iter().map(|p| p.to_string()).collect())
    }

    pub fn posts() -> Self {
        Self::new(["posts"])
    }

    pub fn recent_posts() -> Self {
        Self::new(["posts", "recent"])
    }

    pub fn post(id: PostId) -> Self {
        Self::new(["post".to_string(), id.to_string()])
    }

    pub fn post_comments(id: PostId) -> Self {
        Self::new(["post".to_string(), id.to_string(), "comments".to_string()])
    }

    pub fn recent_comments() -> Self {
        Self::new(["comments", "recent"])
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Age after which an entry is refetched. `None` keeps entries until
    /// they are invalidated.
    pub stale_after: Option<Duration>,
    /// Extra attempts after a failed fetch.
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_after: None,
            retries: 1,
            retry_delay: Duration::from_millis(200),
        }
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
}

/// Concurrent misses on the same key are not de-duplicated: each one runs
/// its own fetch and the last to finish wins.
pub struct QueryClient {
    options: QueryOptions,
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

impl QueryClient {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            options,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Returns the cached value for `key` if fresh, else runs `fetcher`
    /// (with retries) and caches its result. Errors are never cached and a
    /// 404 is not retried.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(hit) = self.cached::<T>(&key).await {
            debug!(%key, "query cache hit");
            return Ok(hit);
        }
        debug!(%key, "query cache miss");

        let mut attempt = 0;
        let value = loop {
            match fetcher().await {
                Ok(value) => break value,
                Err(e) if attempt < self.options.retries && !e.is_not_found() => {
                    attempt += 1;
                    warn!(%key, attempt, error = %e, "query failed, retrying");
                    if !self.options.retry_delay.is_zero() {
                        tokio::time::sleep(self.options.retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        };

        self.set(key, value.clone()).await;
        Ok(value)
    }

    /// Fresh cached value for `key`, if any.
    pub async fn cached<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        if let Some(limit) = self.options.stale_after {
            if entry.fetched_at.elapsed() >= limit {
                return None;
            }
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Stores `value` under `key` as if it had just been fetched.
    pub async fn set<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.entries.lock().await.insert(
            key,
            Entry {
                value: Arc::new(value),
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drops every entry whose key starts with `prefix`. Returns how many.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let dropped = before - entries.len();
        debug!(%prefix, dropped, "query cache invalidated");
        dropped
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}
