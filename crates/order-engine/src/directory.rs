//! Identity and connection resolution seam.
//!
//! Registration, login, and connection approval live outside the
//! engine. The engine only asks two questions: "which retailer is this
//! caller" and "is this retailer connected to this wholesaler".
//! Wholesaler-facing operations receive a typed id directly.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{RetailerId, WholesalerId};

/// Trait for identity resolution and connection checks.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolves an external retailer identity (e.g. a session subject)
    /// to its typed id. `None` means the identity is unknown.
    async fn resolve_retailer(&self, key: &str) -> Option<RetailerId>;

    /// Whether an approved connection exists between the pair.
    async fn is_connected(&self, retailer_id: RetailerId, wholesaler_id: WholesalerId) -> bool;
}

#[derive(Debug, Default)]
struct MemoryDirectoryState {
    retailers: HashMap<String, RetailerId>,
    connections: HashSet<(RetailerId, WholesalerId)>,
}

/// In-memory directory for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<RwLock<MemoryDirectoryState>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a retailer identity and returns its id.
    pub fn register_retailer(&self, key: &str) -> RetailerId {
        let id = RetailerId::new();
        self.state
            .write()
            .unwrap()
            .retailers
            .insert(key.to_string(), id);
        id
    }

    /// Registers a retailer identity under a pre-existing id.
    pub fn register_retailer_id(&self, key: &str, id: RetailerId) {
        self.state
            .write()
            .unwrap()
            .retailers
            .insert(key.to_string(), id);
    }

    /// Marks the pair as connected (approved).
    pub fn connect(&self, retailer_id: RetailerId, wholesaler_id: WholesalerId) {
        self.state
            .write()
            .unwrap()
            .connections
            .insert((retailer_id, wholesaler_id));
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn resolve_retailer(&self, key: &str) -> Option<RetailerId> {
        self.state.read().unwrap().retailers.get(key).copied()
    }

    async fn is_connected(&self, retailer_id: RetailerId, wholesaler_id: WholesalerId) -> bool {
        self.state
            .read()
            .unwrap()
            .connections
            .contains(&(retailer_id, wholesaler_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_registered_identities() {
        let dir = MemoryDirectory::new();
        let r = dir.register_retailer("retailer@shop");

        assert_eq!(dir.resolve_retailer("retailer@shop").await, Some(r));
        assert_eq!(dir.resolve_retailer("stranger").await, None);
    }

    #[tokio::test]
    async fn connection_is_directional_per_pair() {
        let dir = MemoryDirectory::new();
        let r = dir.register_retailer("r");
        let w = WholesalerId::new();

        assert!(!dir.is_connected(r, w).await);
        dir.connect(r, w);
        assert!(dir.is_connected(r, w).await);
        assert!(!dir.is_connected(RetailerId::new(), w).await);
    }
}
