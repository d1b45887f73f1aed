//! Per-session attribute cache.
//!
//! Attributes for the authenticated principal are resolved at most once per
//! session. Concurrent first requests for the same session share a single
//! resolution; a failed resolution leaves the slot empty so the next
//! request retries.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

/// Named, multi-valued attributes.
pub type AttributeSet = BTreeMap<String, Vec<String>>;

/// Caches resolved attributes per session.
#[derive(Debug, Default)]
pub struct SessionAttributeCache {
    entries: DashMap<String, Arc<OnceCell<Arc<AttributeSet>>>>,
}

impl SessionAttributeCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached attributes, running `resolve` only if none are
    /// cached for the session yet.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error; nothing is cached in that case.
    pub async fn get_or_resolve<F, Fut, E>(
        &self,
        session_id: &str,
        resolve: F,
    ) -> Result<Arc<AttributeSet>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AttributeSet, E>>,
    {
        // Clone the cell out so the map shard is not held across the await.
        let cell = Arc::clone(&*self.entries.entry(session_id.to_string()).or_default());

        cell.get_or_try_init(|| async {
            tracing::debug!(session_id = %session_id, "resolving session attributes");
            resolve().await.map(Arc::new)
        })
        .await
        .cloned()
    }

    /// Returns the cached attributes for a session, if resolved.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<Arc<AttributeSet>> {
        self.entries
            .get(session_id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Drops the cached attributes for a session.
    pub fn invalidate(&self, session_id: &str) {
        self.entries.remove(session_id);
    }

    /// Returns the number of sessions with a cache slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
