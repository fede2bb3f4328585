//! Domain model for the B2B order lifecycle engine.
//!
//! This crate holds the pure business rules with no I/O:
//! - Product inventory ledger (on-hand vs. reserved stock)
//! - Cart staging with advisory snapshots
//! - Order aggregate with its fulfillment state machine
//! - Payment lifecycle and the append-only account ledger
//!
//! Persistence and concurrency control live in `order-store`; the
//! services that drive these rules live in `order-engine`.

pub mod cart;
pub mod error;
pub mod ledger;
pub mod order;
pub mod party;
pub mod payment;
pub mod product;

pub use cart::{Cart, CartItem};
pub use error::DomainError;
pub use ledger::{EntryType, LedgerEntry, outstanding};
pub use order::{Order, OrderItem, OrderStatus, PaymentStatus};
pub use party::Wholesaler;
pub use payment::{Payment, PaymentMode, PaymentState};
pub use product::Product;
