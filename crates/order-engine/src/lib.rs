//! Order lifecycle engine.
//!
//! The services in this crate drive the domain rules against a `Store`:
//! - `CartService` — staging lines for a retailer/wholesaler pair
//! - `CheckoutService` — converts a cart into a binding order with
//!   all-or-nothing stock reservation
//! - `FulfillmentService` — moves orders through the status machine
//!   with the matching stock effects
//! - `PaymentService` — payment claims, confirmation, rejection
//! - `LedgerService` — account statements and outstanding balances
//!
//! Identity resolution and connection approval are external concerns
//! consumed through the `Directory` trait. Every write goes through one
//! of the store's atomic write units; version conflicts are retried a
//! bounded number of times before surfacing as `EngineError::Contention`.

pub mod carts;
pub mod checkout;
pub mod config;
pub mod directory;
pub mod error;
pub mod fulfillment;
pub mod ledger;
pub mod payments;

pub use carts::CartService;
pub use checkout::{CheckoutReceipt, CheckoutService};
pub use config::EngineConfig;
pub use directory::{Directory, MemoryDirectory};
pub use error::{EngineError, Result};
pub use fulfillment::FulfillmentService;
pub use ledger::LedgerService;
pub use payments::PaymentService;
