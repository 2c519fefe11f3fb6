use crate::query::QueryEngine;
use parking_lot::RwLock;
use std::sync::Arc;

/// Read-mostly handle for long-lived callers. Readers take a snapshot and
/// keep using it; a rebuild publishes a completely new engine in one swap.
pub struct SharedEngine {
    current: RwLock<Arc<QueryEngine>>,
}

impl SharedEngine {
    pub fn new(engine: QueryEngine) -> Self {
        Self { current: RwLock::new(Arc::new(engine)) }
    }

    pub fn snapshot(&self) -> Arc<QueryEngine> {
        self.current.read().clone()
    }

    /// Replace the live engine, returning the previous one.
    pub fn publish(&self, engine: QueryEngine) -> Arc<QueryEngine> {
        let next = Arc::new(engine);
        let prev = std::mem::replace(&mut *self.current.write(), next);
        tracing::info!(num_docs = self.current.read().index().num_docs(), "published rebuilt index");
        prev
    }
}
