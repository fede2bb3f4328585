//! Domain error types.

use thiserror::Error;

use crate::order::OrderStatus;

/// Business-rule violations surfaced to the caller.
///
/// All of these are expected outcomes of a single request, never
/// transient faults, so nothing here is retried.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The referenced entity does not exist (or is not visible to the
    /// caller; non-owned resources deliberately surface as not-found).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is not permitted to perform the operation.
    #[error("access denied: {0}")]
    AccessDenied(&'static str),

    /// The entity exists but is in the wrong state for the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The requested order status change is not in the transition table.
    #[error("invalid order status transition: {current} -> {requested}")]
    InvalidTransition {
        current: OrderStatus,
        requested: OrderStatus,
    },

    /// Available stock cannot cover the requested quantity.
    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: i64,
    },

    /// A payment amount is non-positive or exceeds the amount due.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The payment already reached a terminal state.
    #[error("payment already finalized: {0}")]
    AlreadyFinalized(&'static str),
}
