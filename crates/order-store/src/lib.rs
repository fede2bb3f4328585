//! Persistence layer for the order lifecycle engine.
//!
//! The [`Store`] trait is the seam between the engine and storage. Reads
//! are plain lookups; writes that must be atomic (checkout, status
//! transitions, payment decisions) go through dedicated write units that
//! carry the versions the caller read. A version mismatch fails the
//! whole unit with [`StoreError::Conflict`] and persists nothing, which
//! is what lets the engine retry optimistically instead of locking.
//!
//! Two implementations: [`MemoryStore`] (one lock, used by tests) and
//! [`PostgresStore`] (one SQL transaction per write unit with
//! version-guarded updates).

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    CartClearWrite, CheckoutWrite, OrderPaymentStatusWrite, PaymentDecisionWrite,
    ProductStockWrite, SequenceWrite, Store, TransitionWrite,
};
