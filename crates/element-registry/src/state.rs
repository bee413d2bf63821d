use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use trolley_core_types::ElementToken;
use trolley_dom::NodeId;

use crate::errors::RegistryError;
use crate::metrics;

/// Mapping from generation-tagged tokens to live node handles.
///
/// Owned exclusively by the page context. Cleared and rebuilt at the start
/// of every observation pass; tokens minted before the latest
/// [`ElementRegistry::begin_pass`] fail resolution structurally (their pass
/// component no longer matches) instead of aliasing a new element.
pub struct ElementRegistry {
    entries: DashMap<u64, NodeId>,
    pass: AtomicU64,
    counter: AtomicU64,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            pass: AtomicU64::new(0),
            counter: AtomicU64::new(0),
        }
    }

    /// Discard all entries and open a new pass. Indices restart at 1.
    pub fn begin_pass(&self) -> u64 {
        self.entries.clear();
        self.counter.store(0, Ordering::SeqCst);
        let pass = self.pass.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_pass_started();
        metrics::set_entry_count(0);
        debug!(pass, "element registry pass started");
        pass
    }

    pub fn current_pass(&self) -> u64 {
        self.pass.load(Ordering::SeqCst)
    }

    /// Mint a fresh token for a node. Indices are never reused within one
    /// pass's lifetime.
    pub fn register(&self, node: NodeId) -> ElementToken {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.insert(index, node);
        metrics::set_entry_count(self.entries.len());
        ElementToken::new(self.current_pass(), index)
    }

    pub fn resolve(&self, token: &ElementToken) -> Result<NodeId, RegistryError> {
        let current_pass = self.current_pass();
        if token.pass != current_pass {
            metrics::record_stale_lookup();
            return Err(RegistryError::Stale {
                token: *token,
                current_pass,
            });
        }
        self.entries
            .get(&token.index)
            .map(|entry| *entry.value())
            .ok_or(RegistryError::Unknown { token: *token })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_resolve_within_their_pass() {
        let registry = ElementRegistry::new();
        registry.begin_pass();
        let token = registry.register(42);
        assert_eq!(token.index, 1);
        assert_eq!(registry.resolve(&token).unwrap(), 42);
    }

    #[test]
    fn indices_restart_each_pass() {
        let registry = ElementRegistry::new();
        registry.begin_pass();
        registry.register(1);
        registry.register(2);
        registry.begin_pass();
        let token = registry.register(3);
        assert_eq!(token.index, 1);
        assert_eq!(token.pass, 2);
    }

    #[test]
    fn stale_tokens_fail_structurally() {
        let registry = ElementRegistry::new();
        registry.begin_pass();
        let token = registry.register(7);
        registry.begin_pass();
        let err = registry.resolve(&token).unwrap_err();
        assert!(matches!(err, RegistryError::Stale { current_pass: 2, .. }));
    }

    #[test]
    fn unknown_index_in_current_pass_is_reported() {
        let registry = ElementRegistry::new();
        let pass = registry.begin_pass();
        let err = registry
            .resolve(&ElementToken::new(pass, 99))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unknown { .. }));
    }
}
