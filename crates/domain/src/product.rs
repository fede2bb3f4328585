//! Product record and its inventory ledger.

use common::{Money, ProductId, WholesalerId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A product owned by a wholesaler, carrying the inventory ledger.
///
/// `stock` is the on-hand quantity; `reserved_stock` counts units locked
/// by orders the wholesaler has not yet accepted. The invariant protected
/// by every mutation is `available() >= 0` — a reservation must never
/// draw more than what is on hand and unreserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub wholesaler_id: WholesalerId,
    pub name: String,
    /// Unit of sale, e.g. "kg" or "box".
    pub unit: String,
    pub price: Money,
    pub mrp: Money,
    pub stock: u32,
    pub reserved_stock: u32,
    /// Optimistic-concurrency version, bumped on every stock mutation.
    pub version: u64,
}

impl Product {
    /// Creates a new product with nothing reserved.
    pub fn new(
        wholesaler_id: WholesalerId,
        name: impl Into<String>,
        unit: impl Into<String>,
        price: Money,
        mrp: Money,
        stock: u32,
    ) -> Self {
        Self {
            id: ProductId::new(),
            wholesaler_id,
            name: name.into(),
            unit: unit.into(),
            price,
            mrp,
            stock,
            reserved_stock: 0,
            version: 1,
        }
    }

    /// Quantity a new checkout may draw from.
    pub fn available(&self) -> i64 {
        self.stock as i64 - self.reserved_stock as i64
    }

    /// Checks that `qty` units can be reserved without mutating anything.
    pub fn check_reservable(&self, qty: u32) -> Result<(), DomainError> {
        if self.available() < qty as i64 {
            return Err(DomainError::InsufficientStock {
                product: self.name.clone(),
                requested: qty,
                available: self.available(),
            });
        }
        Ok(())
    }

    /// Locks `qty` units against unconfirmed demand.
    pub fn reserve(&mut self, qty: u32) -> Result<(), DomainError> {
        self.check_reservable(qty)?;
        self.reserved_stock += qty;
        self.version += 1;
        Ok(())
    }

    /// Converts a reservation into a committed sale: both the reservation
    /// and the on-hand stock drop by `qty`. Used at order acceptance.
    pub fn commit_reservation(&mut self, qty: u32) -> Result<(), DomainError> {
        if self.reserved_stock < qty {
            return Err(DomainError::InvalidState(format!(
                "reserved stock mismatch for {}: reserved {}, committing {}",
                self.name, self.reserved_stock, qty
            )));
        }
        if self.stock < qty {
            return Err(DomainError::InvalidState(format!(
                "stock insufficient at acceptance for {}: stock {}, committing {}",
                self.name, self.stock, qty
            )));
        }
        self.reserved_stock -= qty;
        self.stock -= qty;
        self.version += 1;
        Ok(())
    }

    /// Releases a reservation without touching on-hand stock. Used on
    /// rejection and cancellation; floored at zero.
    pub fn release_reservation(&mut self, qty: u32) {
        self.reserved_stock = self.reserved_stock.saturating_sub(qty);
        self.version += 1;
    }
}
