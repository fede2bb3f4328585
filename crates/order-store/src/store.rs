//! The `Store` trait and its atomic write units.

use async_trait::async_trait;
use common::{OrderId, PaymentId, ProductId, RetailerId, WholesalerId};
use domain::{
    Cart, EntryType, LedgerEntry, Order, OrderStatus, Payment, Product, Wholesaler,
};

use crate::error::Result;

/// A version-guarded replacement of one product's stock counters.
///
/// `product` is the mutated record (its `version` already bumped by the
/// domain mutation); `expected_version` is the version the caller read.
#[derive(Debug, Clone)]
pub struct ProductStockWrite {
    pub product: Product,
    pub expected_version: u64,
}

impl ProductStockWrite {
    /// Captures the expected version from a product about to be mutated.
    /// Call this *before* applying the stock mutation.
    pub fn expecting(product: &Product) -> u64 {
        product.version
    }
}

/// A guarded bump of a wholesaler's order sequence.
#[derive(Debug, Clone)]
pub struct SequenceWrite {
    pub wholesaler_id: WholesalerId,
    pub expected_sequence: u32,
    pub new_sequence: u32,
}

/// A guarded clear of the checked-out cart.
#[derive(Debug, Clone)]
pub struct CartClearWrite {
    /// The cart with its items already cleared and version bumped.
    pub cart: Cart,
    pub expected_version: u64,
}

/// Everything a successful checkout persists, all-or-nothing: the new
/// order with its item snapshots, the stock reservations, the sequence
/// bump that produced the order number, and the cart clear.
#[derive(Debug, Clone)]
pub struct CheckoutWrite {
    pub order: Order,
    pub products: Vec<ProductStockWrite>,
    pub sequence: SequenceWrite,
    pub cart: CartClearWrite,
}

/// A fulfillment transition plus its stock effects and, on acceptance,
/// the DEBIT ledger entry — one atomic unit.
#[derive(Debug, Clone)]
pub struct TransitionWrite {
    pub order: Order,
    pub expected_order_version: u64,
    pub products: Vec<ProductStockWrite>,
    pub ledger_entry: Option<LedgerEntry>,
}

/// An order payment-status recompute rider on a payment decision.
#[derive(Debug, Clone)]
pub struct OrderPaymentStatusWrite {
    pub order: Order,
    pub expected_order_version: u64,
}

/// A payment confirmation or rejection. A confirmed payment with no
/// ledger entry (or vice versa) is a correctness violation, so the
/// entry and the order recompute ride in the same unit.
#[derive(Debug, Clone)]
pub struct PaymentDecisionWrite {
    pub payment: Payment,
    pub expected_payment_version: u64,
    pub ledger_entry: Option<LedgerEntry>,
    pub order: Option<OrderPaymentStatusWrite>,
}

/// Persistence seam for the order lifecycle engine.
#[async_trait]
pub trait Store: Send + Sync {
    // Wholesalers

    async fn insert_wholesaler(&self, wholesaler: Wholesaler) -> Result<()>;
    async fn get_wholesaler(&self, id: WholesalerId) -> Result<Option<Wholesaler>>;

    // Products

    async fn insert_product(&self, product: Product) -> Result<()>;
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    // Carts

    async fn get_cart(
        &self,
        retailer_id: RetailerId,
        wholesaler_id: WholesalerId,
    ) -> Result<Option<Cart>>;

    /// Saves a cart. `expected_version = None` inserts a new cart (the
    /// (retailer, wholesaler) pair is unique; a duplicate is a conflict);
    /// `Some(v)` replaces the cart only if its stored version is `v`.
    async fn save_cart(&self, cart: Cart, expected_version: Option<u64>) -> Result<()>;

    // Orders

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;
    async fn orders_for_wholesaler(
        &self,
        id: WholesalerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>>;
    async fn orders_for_retailer(
        &self,
        id: RetailerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>>;

    // Payments

    async fn insert_payment(&self, payment: Payment) -> Result<()>;
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>>;

    // Ledger (append-only; writes happen only inside the units below)

    async fn ledger_for_pair(
        &self,
        wholesaler_id: WholesalerId,
        retailer_id: RetailerId,
    ) -> Result<Vec<LedgerEntry>>;
    async fn ledger_for_wholesaler(
        &self,
        wholesaler_id: WholesalerId,
        entry_type: Option<EntryType>,
    ) -> Result<Vec<LedgerEntry>>;
    async fn ledger_for_retailer(
        &self,
        retailer_id: RetailerId,
        entry_type: Option<EntryType>,
    ) -> Result<Vec<LedgerEntry>>;

    // Atomic write units

    async fn commit_checkout(&self, write: CheckoutWrite) -> Result<()>;
    async fn commit_transition(&self, write: TransitionWrite) -> Result<()>;
    async fn commit_payment_decision(&self, write: PaymentDecisionWrite) -> Result<()>;
}
