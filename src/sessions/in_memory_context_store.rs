use crate::errors::TaskResult;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

use super::context_store::{ContextBlob, ContextStore};

/// In-memory implementation of [`ContextStore`].
///
/// Without a capacity the store grows for the life of the process. With a
/// capacity it evicts the least recently used session once full; both `save`
/// and `load` count as a use.
///
/// Recency is tracked explicitly: every access stamps the entry with a
/// monotonically increasing tick and `order` maps ticks back to session ids,
/// so the oldest entry is always the first key of `order`.
pub struct InMemoryContextStore {
    capacity: Option<NonZeroUsize>,
    inner: Mutex<Entries>,
}

#[derive(Default)]
struct Entries {
    by_session: HashMap<String, (ContextBlob, u64)>,
    order: BTreeMap<u64, String>,
    next_tick: u64,
}

impl Entries {
    fn touch(&mut self, session_id: &str) -> Option<&ContextBlob> {
        let tick = self.next_tick;
        let (blob, last) = self.by_session.get_mut(session_id)?;
        self.order.remove(&*last);
        *last = tick;
        self.order.insert(tick, session_id.to_string());
        self.next_tick += 1;
        Some(&*blob)
    }

    fn insert(&mut self, session_id: &str, blob: ContextBlob) {
        let tick = self.next_tick;
        self.next_tick += 1;
        if let Some((_, last)) = self
            .by_session
            .insert(session_id.to_string(), (blob, tick))
        {
            self.order.remove(&last);
        }
        self.order.insert(tick, session_id.to_string());
    }

    fn remove(&mut self, session_id: &str) {
        if let Some((_, tick)) = self.by_session.remove(session_id) {
            self.order.remove(&tick);
        }
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, session_id) = self.order.pop_first()?;
        self.by_session.remove(&session_id);
        Some(session_id)
    }
}

impl InMemoryContextStore {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self {
            capacity: None,
            inner: Mutex::new(Entries::default()),
        }
    }

    /// Creates a store holding at most `capacity` sessions.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: Some(capacity),
            inner: Mutex::new(Entries::default()),
        }
    }

    /// Number of sessions currently holding a context.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_session.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The session touched most recently, if any.
    pub async fn most_recent(&self) -> Option<String> {
        let entries = self.inner.lock().await;
        entries.order.last_key_value().map(|(_, id)| id.clone())
    }
}

impl Default for InMemoryContextStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn save(&self, session_id: &str, context: ContextBlob) -> TaskResult<()> {
        let mut entries = self.inner.lock().await;
        entries.insert(session_id, context);

        if let Some(capacity) = self.capacity {
            while entries.by_session.len() > capacity.get() {
                match entries.evict_oldest() {
                    Some(evicted) => {
                        tracing::debug!(session_id = %evicted, "evicted least recently used session context");
                    }
                    None => break,
                }
            }
        }
        Ok(())
    }

    async fn load(&self, session_id: &str) -> TaskResult<Option<ContextBlob>> {
        let mut entries = self.inner.lock().await;
        Ok(entries.touch(session_id).cloned())
    }

    async fn clear(&self, session_id: &str) -> TaskResult<()> {
        self.inner.lock().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blob(n: u64) -> ContextBlob {
        ContextBlob::new(json!({ "turn": n }))
    }

    #[tokio::test]
    async fn save_load_and_clear() {
        let store = InMemoryContextStore::new();
        assert!(store.load("s1").await.unwrap().is_none());

        store.save("s1", blob(1)).await.unwrap();
        store.save("s1", blob(2)).await.unwrap();
        assert_eq!(store.load("s1").await.unwrap(), Some(blob(2)));
        assert_eq!(store.len().await, 1);

        store.clear("s1").await.unwrap();
        assert!(store.load("s1").await.unwrap().is_none());
        store.clear("missing").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn sessions_do_not_share_context() {
        let store = InMemoryContextStore::new();
        store.save("a", blob(1)).await.unwrap();
        assert!(store.load("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let store = InMemoryContextStore::with_capacity(NonZeroUsize::new(2).unwrap());
        store.save("a", blob(1)).await.unwrap();
        store.save("b", blob(2)).await.unwrap();

        // Reading "a" makes "b" the eviction candidate.
        store.load("a").await.unwrap();
        store.save("c", blob(3)).await.unwrap();

        assert!(store.load("b").await.unwrap().is_none());
        assert_eq!(store.load("a").await.unwrap(), Some(blob(1)));
        assert_eq!(store.load("c").await.unwrap(), Some(blob(3)));
        assert_eq!(store.most_recent().await.as_deref(), Some("c"));
    }
}
