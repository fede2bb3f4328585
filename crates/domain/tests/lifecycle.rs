//! End-to-end domain rules: reservation, acceptance, and the ledger,
//! without any store or service in between.

use chrono::Utc;
use common::{Money, RetailerId};
use domain::{
    Cart, DomainError, LedgerEntry, Order, OrderItem, OrderStatus, PaymentMode, PaymentStatus,
    Payment, Product, Wholesaler, outstanding,
};

fn setup() -> (Wholesaler, RetailerId, Product) {
    let wholesaler = Wholesaler::new("Diya Traders");
    let product = Product::new(
        wholesaler.id,
        "Basmati Rice",
        "kg",
        Money::from_rupees(100),
        Money::from_rupees(120),
        10,
    );
    (wholesaler, RetailerId::new(), product)
}

#[test]
fn reservation_follows_order_acceptance() {
    let (wholesaler, retailer, mut product) = setup();
    let now = Utc::now();

    let mut cart = Cart::new(retailer, wholesaler.id);
    cart.add_line(&product, 3).unwrap();

    // checkout: snapshot, reserve, place
    let qty = cart.line(product.id).unwrap().quantity;
    product.reserve(qty).unwrap();
    let items = vec![OrderItem::snapshot(&product, qty)];
    let subtotal: Money = items.iter().map(|i| i.line_total).sum();
    let mut order = Order::place(
        &wholesaler,
        retailer,
        items,
        subtotal,
        subtotal.percent_bps(500),
        Money::from_rupees(50),
        wholesaler.order_sequence + 1,
        now,
    );
    cart.clear();

    assert_eq!(product.reserved_stock, 3);
    assert_eq!(order.total_amount(), Money::from_rupees(365));

    // acceptance converts the reservation into a sale and posts a debit
    order.transition(OrderStatus::Accepted, now).unwrap();
    for item in order.items() {
        product.commit_reservation(item.quantity).unwrap();
    }
    let debit = LedgerEntry::debit(
        wholesaler.id,
        retailer,
        order.total_amount(),
        format!("Order {} accepted", order.order_number()),
        now,
    );

    assert_eq!(product.stock, 7);
    assert_eq!(product.reserved_stock, 0);
    assert_eq!(outstanding(&[debit]), Money::from_rupees(365));
}

#[test]
fn rejection_releases_but_never_commits() {
    let (wholesaler, retailer, mut product) = setup();
    let now = Utc::now();

    product.reserve(4).unwrap();
    let items = vec![OrderItem::snapshot(&product, 4)];
    let subtotal: Money = items.iter().map(|i| i.line_total).sum();
    let mut order = Order::place(
        &wholesaler,
        retailer,
        items,
        subtotal,
        subtotal.percent_bps(500),
        Money::from_rupees(50),
        1,
        now,
    );

    order.transition(OrderStatus::Rejected, now).unwrap();
    for item in order.items() {
        product.release_reservation(item.quantity);
    }

    assert_eq!(product.stock, 10);
    assert_eq!(product.reserved_stock, 0);
    assert!(order.status().is_terminal());
}

#[test]
fn confirmed_payment_settles_the_ledger() {
    let (wholesaler, retailer, product) = setup();
    let now = Utc::now();
    let items = vec![OrderItem::snapshot(&product, 3)];
    let subtotal: Money = items.iter().map(|i| i.line_total).sum();
    let mut order = Order::place(
        &wholesaler,
        retailer,
        items,
        subtotal,
        subtotal.percent_bps(500),
        Money::from_rupees(50),
        1,
        now,
    );

    let mut payment = Payment::record(
        order.id(),
        wholesaler.id,
        retailer,
        order.total_amount(),
        PaymentMode::Upi,
        Some("UTR1".to_string()),
        None,
        now,
    );
    assert!(payment.confirm(wholesaler.id, now).unwrap());

    let entries = vec![
        LedgerEntry::debit(wholesaler.id, retailer, order.total_amount(), "Order", now),
        LedgerEntry::credit(
            wholesaler.id,
            retailer,
            payment.amount,
            payment.ledger_description(),
            now,
        ),
    ];
    order.set_payment_status(PaymentStatus::from_amounts(
        payment.amount,
        order.total_amount(),
    ));

    assert_eq!(outstanding(&entries), Money::zero());
    assert_eq!(order.payment_status(), PaymentStatus::Paid);
}

#[test]
fn stock_invariant_holds_through_mixed_outcomes() {
    let (_, _, mut product) = setup();

    product.reserve(6).unwrap();
    product.release_reservation(2);
    product.commit_reservation(4).unwrap();
    assert!(matches!(
        product.reserve(7),
        Err(DomainError::InsufficientStock { .. })
    ));

    assert!(product.available() >= 0);
    assert_eq!(product.stock, 6);
    assert_eq!(product.reserved_stock, 0);
}
