//! Wholesaler record.
//!
//! Only the fields the lifecycle engine needs: the business name feeds
//! the order-number prefix and `order_sequence` is the per-wholesaler
//! monotonic counter behind order numbers. Profile CRUD belongs to the
//! excluded collaborator layers.

use common::WholesalerId;
use serde::{Deserialize, Serialize};

/// A wholesaler as seen by the order engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wholesaler {
    pub id: WholesalerId,
    pub business_name: String,
    /// Monotonic counter; order N gets sequence `order_sequence + 1`.
    /// Serialized per wholesaler by the store's checkout write unit.
    pub order_sequence: u32,
}

impl Wholesaler {
    pub fn new(business_name: impl Into<String>) -> Self {
        Self {
            id: WholesalerId::new(),
            business_name: business_name.into(),
            order_sequence: 0,
        }
    }
}
