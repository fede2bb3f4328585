//! Order aggregate: immutable snapshot items, totals, and the
//! fulfillment state machine.

pub mod number;
pub mod status;

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, RetailerId, WholesalerId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::party::Wholesaler;
use crate::product::Product;

pub use status::OrderStatus;

/// Payment progress of an order, recomputed from confirmed payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Derives the status from the confirmed total against the order total.
    pub fn from_amounts(confirmed: Money, order_total: Money) -> Self {
        if !confirmed.is_positive() {
            PaymentStatus::Unpaid
        } else if confirmed < order_total {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Paid => "PAID",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(PaymentStatus::Unpaid),
            "PARTIAL" => Ok(PaymentStatus::Partial),
            "PAID" => Ok(PaymentStatus::Paid),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// An immutable point-in-time snapshot of one ordered line.
///
/// Captured once at checkout and never re-derived from the live product,
/// so later catalog edits cannot rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl OrderItem {
    /// Snapshots a product at checkout time.
    pub fn snapshot(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            unit: product.unit.clone(),
            quantity,
            unit_price: product.price,
            line_total: product.price.multiply(quantity),
        }
    }
}

/// A binding order between a retailer and a wholesaler.
///
/// Identity fields (number, items, totals) are fixed at creation; only
/// the fulfillment status, payment status, and stage timestamps move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: String,
    wholesaler_id: WholesalerId,
    retailer_id: RetailerId,
    status: OrderStatus,
    payment_status: PaymentStatus,
    items: Vec<OrderItem>,
    subtotal: Money,
    tax_amount: Money,
    delivery_charge: Money,
    total_amount: Money,
    placed_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    dispatched_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Order {
    /// Creates a newly placed order with its number assigned from the
    /// wholesaler's next sequence value.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        wholesaler: &Wholesaler,
        retailer_id: RetailerId,
        items: Vec<OrderItem>,
        subtotal: Money,
        tax_amount: Money,
        delivery_charge: Money,
        sequence: u32,
        placed_at: DateTime<Utc>,
    ) -> Self {
        let prefix = number::prefix(&wholesaler.business_name, wholesaler.id);
        Self {
            id: OrderId::new(),
            order_number: number::format_order_number(&prefix, sequence),
            wholesaler_id: wholesaler.id,
            retailer_id,
            status: OrderStatus::Placed,
            payment_status: PaymentStatus::Unpaid,
            items,
            subtotal,
            tax_amount,
            delivery_charge,
            total_amount: subtotal + tax_amount + delivery_charge,
            placed_at,
            accepted_at: None,
            dispatched_at: None,
            delivered_at: None,
            cancelled_at: None,
            version: 1,
        }
    }

    /// Rehydrates an order from storage. Store-layer use only.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OrderId,
        order_number: String,
        wholesaler_id: WholesalerId,
        retailer_id: RetailerId,
        status: OrderStatus,
        payment_status: PaymentStatus,
        items: Vec<OrderItem>,
        subtotal: Money,
        tax_amount: Money,
        delivery_charge: Money,
        total_amount: Money,
        placed_at: DateTime<Utc>,
        accepted_at: Option<DateTime<Utc>>,
        dispatched_at: Option<DateTime<Utc>>,
        delivered_at: Option<DateTime<Utc>>,
        cancelled_at: Option<DateTime<Utc>>,
        version: u64,
    ) -> Self {
        Self {
            id,
            order_number,
            wholesaler_id,
            retailer_id,
            status,
            payment_status,
            items,
            subtotal,
            tax_amount,
            delivery_charge,
            total_amount,
            placed_at,
            accepted_at,
            dispatched_at,
            delivered_at,
            cancelled_at,
            version,
        }
    }

    /// Moves the order along the transition table, stamping the stage
    /// timestamp for the target. Stock effects are the engine's job.
    pub fn transition(
        &mut self,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition(target) {
            return Err(DomainError::InvalidTransition {
                current: self.status,
                requested: target,
            });
        }
        match target {
            OrderStatus::Accepted => self.accepted_at = Some(now),
            OrderStatus::Rejected | OrderStatus::Cancelled => self.cancelled_at = Some(now),
            OrderStatus::Dispatched => self.dispatched_at = Some(now),
            OrderStatus::Delivered => self.delivered_at = Some(now),
            OrderStatus::Completed | OrderStatus::Placed | OrderStatus::Packing => {}
        }
        self.status = target;
        self.version += 1;
        Ok(())
    }

    /// Replaces the payment status after a confirmed-payment recompute.
    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.version += 1;
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn wholesaler_id(&self) -> WholesalerId {
        self.wholesaler_id
    }

    pub fn retailer_id(&self) -> RetailerId {
        self.retailer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax_amount(&self) -> Money {
        self.tax_amount
    }

    pub fn delivery_charge(&self) -> Money {
        self.delivery_charge
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    pub fn accepted_at(&self) -> Option<DateTime<Utc>> {
        self.accepted_at
    }

    pub fn dispatched_at(&self) -> Option<DateTime<Utc>> {
        self.dispatched_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed_order() -> Order {
        let wholesaler = Wholesaler::new("Diya Traders");
        let product = Product::new(
            wholesaler.id,
            "Basmati Rice",
            "kg",
            Money::from_rupees(100),
            Money::from_rupees(120),
            10,
        );
        let items = vec![OrderItem::snapshot(&product, 3)];
        let subtotal = Money::from_rupees(300);
        Order::place(
            &wholesaler,
            RetailerId::new(),
            items,
            subtotal,
            subtotal.percent_bps(500),
            Money::from_rupees(50),
            1,
            Utc::now(),
        )
    }

    #[test]
    fn place_computes_totals() {
        let order = placed_order();
        assert_eq!(order.subtotal(), Money::from_rupees(300));
        assert_eq!(order.tax_amount(), Money::from_rupees(15));
        assert_eq!(order.delivery_charge(), Money::from_rupees(50));
        assert_eq!(order.total_amount(), Money::from_rupees(365));
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.payment_status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn snapshot_item_holds_line_total() {
        let order = placed_order();
        let item = &order.items()[0];
        assert_eq!(item.quantity, 3);
        assert_eq!(item.unit_price, Money::from_rupees(100));
        assert_eq!(item.line_total, Money::from_rupees(300));
    }

    #[test]
    fn order_number_uses_sequence() {
        let order = placed_order();
        assert!(order.order_number().ends_with("-0001"));
        assert!(order.order_number().starts_with("DIY"));
    }

    #[test]
    fn transition_stamps_timestamps() {
        let mut order = placed_order();
        let now = Utc::now();

        order.transition(OrderStatus::Accepted, now).unwrap();
        assert_eq!(order.status(), OrderStatus::Accepted);
        assert_eq!(order.accepted_at(), Some(now));

        order.transition(OrderStatus::Packing, now).unwrap();
        order.transition(OrderStatus::Dispatched, now).unwrap();
        assert_eq!(order.dispatched_at(), Some(now));
        order.transition(OrderStatus::Delivered, now).unwrap();
        assert_eq!(order.delivered_at(), Some(now));
        order.transition(OrderStatus::Completed, now).unwrap();
        assert!(order.status().is_terminal());
    }

    #[test]
    fn rejection_stamps_cancelled_at() {
        let mut order = placed_order();
        let now = Utc::now();
        order.transition(OrderStatus::Rejected, now).unwrap();
        assert_eq!(order.cancelled_at(), Some(now));
    }

    #[test]
    fn disallowed_transition_reports_both_ends() {
        let mut order = placed_order();
        let err = order
            .transition(OrderStatus::Dispatched, Utc::now())
            .unwrap_err();
        match err {
            DomainError::InvalidTransition { current, requested } => {
                assert_eq!(current, OrderStatus::Placed);
                assert_eq!(requested, OrderStatus::Dispatched);
            }
            other => panic!("unexpected error: {other}"),
        }
        // nothing moved
        assert_eq!(order.status(), OrderStatus::Placed);
    }

    #[test]
    fn payment_status_from_amounts_is_exact() {
        let total = Money::from_paise(36500);
        assert_eq!(
            PaymentStatus::from_amounts(Money::zero(), total),
            PaymentStatus::Unpaid
        );
        assert_eq!(
            PaymentStatus::from_amounts(Money::from_paise(36499), total),
            PaymentStatus::Partial
        );
        assert_eq!(
            PaymentStatus::from_amounts(Money::from_paise(36500), total),
            PaymentStatus::Paid
        );
    }
}
