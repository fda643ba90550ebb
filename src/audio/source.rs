//! Transient references to in-memory audio.
//!
//! The output never holds a track directly; it is bound through a
//! `SourceRef` handed out by the registry. A `SourceRef` cannot be cloned and
//! `revoke` consumes it, so every reference is released at most once, and
//! `live()` shows whether any were leaked.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Revocable handle to a registered payload.
#[derive(Debug, PartialEq, Eq)]
pub struct SourceRef {
    id: u64,
}

impl SourceRef {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    live: HashMap<u64, Arc<[u8]>>,
}

#[derive(Clone, Default)]
pub struct SourceRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, data: Arc<[u8]>) -> SourceRef {
        let mut reg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        reg.next_id += 1;
        let id = reg.next_id;
        reg.live.insert(id, data);
        SourceRef { id }
    }

    /// The payload behind `source`, while it is still live.
    pub fn resolve(&self, source: &SourceRef) -> Option<Arc<[u8]>> {
        let reg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        reg.live.get(&source.id).cloned()
    }

    pub fn revoke(&self, source: SourceRef) {
        let mut reg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        reg.live.remove(&source.id);
    }

    /// Number of references created and not yet revoked.
    pub fn live(&self) -> usize {
        let reg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        reg.live.len()
    }
}
