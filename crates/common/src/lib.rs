//! Shared types for the ordering core.
//!
//! Typed identifiers for every entity plus [`Money`], a fixed-point amount
//! in integer paise. Keeping these in one leaf crate lets the domain,
//! store, and engine layers agree on identity and money without depending
//! on each other.

pub mod ids;
pub mod money;

pub use ids::{CartId, LedgerEntryId, OrderId, PaymentId, ProductId, RetailerId, WholesalerId};
pub use money::Money;
