use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::{debug, info};

use crate::espn_api::{Fetch, Params};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub endpoint: String,
    pub params: Params,
}

impl CacheKey {
    pub fn new(endpoint: &str, params: &Params) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            params: params.clone(),
        }
    }
}

type Slot = Arc<OnceCell<Arc<Value>>>;

/// Process-lifetime memo of upstream responses. No eviction: the key space is
/// (view x season) and stays small.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<CacheKey, Slot>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached document for `key`, running `load` at most once per key.
    /// Concurrent callers for the same key block on the first load instead of
    /// issuing their own. A failed load leaves the slot empty so the next call retries.
    pub fn get_or_load(
        &self,
        key: CacheKey,
        load: impl FnOnce() -> Result<Arc<Value>>,
    ) -> Result<Arc<Value>> {
        let slot = {
            let mut guard = self
                .entries
                .lock()
                .map_err(|_| anyhow!("response cache lock poisoned"))?;
            guard.entry(key.clone()).or_default().clone()
        };
        if let Some(hit) = slot.get() {
            debug!(endpoint = %key.endpoint, "response cache hit");
            return Ok(hit.clone());
        }
        slot.get_or_try_init(|| {
            info!(endpoint = %key.endpoint, params = ?key.params, "response cache miss");
            load()
        })
        .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|guard| guard.values().filter(|slot| slot.get().is_some()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.clear();
        }
    }
}

/// A `Fetch` that memoizes another `Fetch` by (endpoint, parameters).
#[derive(Debug)]
pub struct CachedFetch<F> {
    inner: F,
    cache: ResponseCache,
}

impl<F: Fetch> CachedFetch<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cache: ResponseCache::new(),
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: Fetch> Fetch for CachedFetch<F> {
    fn fetch(&self, endpoint: &str, params: &Params) -> Result<Arc<Value>> {
        self.cache
            .get_or_load(CacheKey::new(endpoint, params), || {
                self.inner.fetch(endpoint, params)
            })
    }
}
