//! In-memory store implementation for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, PaymentId, ProductId, RetailerId, WholesalerId};
use domain::{
    Cart, EntryType, LedgerEntry, Order, OrderStatus, Payment, Product, Wholesaler,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{
    CheckoutWrite, PaymentDecisionWrite, ProductStockWrite, Store, TransitionWrite,
};

#[derive(Debug, Default)]
struct State {
    wholesalers: HashMap<WholesalerId, Wholesaler>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<(RetailerId, WholesalerId), Cart>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<PaymentId, Payment>,
    ledger: Vec<LedgerEntry>,
}

impl State {
    /// Version guards shared by every write unit. Nothing is applied
    /// unless all guards pass, so a failed unit leaves state untouched.
    fn check_products(&self, writes: &[ProductStockWrite]) -> Result<()> {
        for w in writes {
            let stored = self
                .products
                .get(&w.product.id)
                .ok_or(StoreError::Conflict { entity: "product" })?;
            if stored.version != w.expected_version {
                return Err(StoreError::Conflict { entity: "product" });
            }
        }
        Ok(())
    }

    fn apply_products(&mut self, writes: Vec<ProductStockWrite>) {
        for w in writes {
            self.products.insert(w.product.id, w.product);
        }
    }
}

/// In-memory store, all writes serialized behind a single lock.
///
/// Provides the same interface and conflict semantics as the PostgreSQL
/// implementation; every write unit is atomic because it runs under one
/// write-lock acquisition.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of ledger entries, across all pairs.
    pub async fn ledger_entry_count(&self) -> usize {
        self.state.read().await.ledger.len()
    }

    /// Returns the total number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_wholesaler(&self, wholesaler: Wholesaler) -> Result<()> {
        self.state
            .write()
            .await
            .wholesalers
            .insert(wholesaler.id, wholesaler);
        Ok(())
    }

    async fn get_wholesaler(&self, id: WholesalerId) -> Result<Option<Wholesaler>> {
        Ok(self.state.read().await.wholesalers.get(&id).cloned())
    }

    async fn insert_product(&self, product: Product) -> Result<()> {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_cart(
        &self,
        retailer_id: RetailerId,
        wholesaler_id: WholesalerId,
    ) -> Result<Option<Cart>> {
        Ok(self
            .state
            .read()
            .await
            .carts
            .get(&(retailer_id, wholesaler_id))
            .cloned())
    }

    async fn save_cart(&self, cart: Cart, expected_version: Option<u64>) -> Result<()> {
        let mut state = self.state.write().await;
        let key = (cart.retailer_id, cart.wholesaler_id);
        match (state.carts.get(&key), expected_version) {
            (None, None) => {
                state.carts.insert(key, cart);
                Ok(())
            }
            (Some(stored), Some(expected)) if stored.version == expected => {
                state.carts.insert(key, cart);
                Ok(())
            }
            _ => Err(StoreError::Conflict { entity: "cart" }),
        }
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn orders_for_wholesaler(
        &self,
        id: WholesalerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.wholesaler_id() == id)
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.placed_at().cmp(&a.placed_at()));
        Ok(orders)
    }

    async fn orders_for_retailer(
        &self,
        id: RetailerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.retailer_id() == id)
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.placed_at().cmp(&a.placed_at()));
        Ok(orders)
    }

    async fn insert_payment(&self, payment: Payment) -> Result<()> {
        self.state
            .write()
            .await
            .payments
            .insert(payment.id, payment);
        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.state.read().await.payments.get(&id).cloned())
    }

    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        let mut payments: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(payments)
    }

    async fn ledger_for_pair(
        &self,
        wholesaler_id: WholesalerId,
        retailer_id: RetailerId,
    ) -> Result<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .ledger
            .iter()
            .filter(|e| e.wholesaler_id == wholesaler_id && e.retailer_id == retailer_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
        Ok(entries)
    }

    async fn ledger_for_wholesaler(
        &self,
        wholesaler_id: WholesalerId,
        entry_type: Option<EntryType>,
    ) -> Result<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .ledger
            .iter()
            .filter(|e| e.wholesaler_id == wholesaler_id)
            .filter(|e| entry_type.is_none_or(|t| e.entry_type == t))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
        Ok(entries)
    }

    async fn ledger_for_retailer(
        &self,
        retailer_id: RetailerId,
        entry_type: Option<EntryType>,
    ) -> Result<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .ledger
            .iter()
            .filter(|e| e.retailer_id == retailer_id)
            .filter(|e| entry_type.is_none_or(|t| e.entry_type == t))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
        Ok(entries)
    }

    async fn commit_checkout(&self, write: CheckoutWrite) -> Result<()> {
        let mut state = self.state.write().await;

        // All guards first; apply only if every one passes.
        let wholesaler = state
            .wholesalers
            .get(&write.sequence.wholesaler_id)
            .ok_or(StoreError::Conflict {
                entity: "wholesaler sequence",
            })?;
        if wholesaler.order_sequence != write.sequence.expected_sequence {
            return Err(StoreError::Conflict {
                entity: "wholesaler sequence",
            });
        }
        state.check_products(&write.products)?;
        let cart_key = (write.cart.cart.retailer_id, write.cart.cart.wholesaler_id);
        let stored_cart = state
            .carts
            .get(&cart_key)
            .ok_or(StoreError::Conflict { entity: "cart" })?;
        if stored_cart.version != write.cart.expected_version {
            return Err(StoreError::Conflict { entity: "cart" });
        }

        state
            .wholesalers
            .get_mut(&write.sequence.wholesaler_id)
            .expect("guarded above")
            .order_sequence = write.sequence.new_sequence;
        state.apply_products(write.products);
        state.carts.insert(cart_key, write.cart.cart);
        state.orders.insert(write.order.id(), write.order);
        Ok(())
    }

    async fn commit_transition(&self, write: TransitionWrite) -> Result<()> {
        let mut state = self.state.write().await;

        let stored = state
            .orders
            .get(&write.order.id())
            .ok_or(StoreError::Conflict { entity: "order" })?;
        if stored.version() != write.expected_order_version {
            return Err(StoreError::Conflict { entity: "order" });
        }
        state.check_products(&write.products)?;

        state.apply_products(write.products);
        state.orders.insert(write.order.id(), write.order);
        if let Some(entry) = write.ledger_entry {
            state.ledger.push(entry);
        }
        Ok(())
    }

    async fn commit_payment_decision(&self, write: PaymentDecisionWrite) -> Result<()> {
        let mut state = self.state.write().await;

        let stored = state
            .payments
            .get(&write.payment.id)
            .ok_or(StoreError::Conflict { entity: "payment" })?;
        if stored.version != write.expected_payment_version {
            return Err(StoreError::Conflict { entity: "payment" });
        }
        if let Some(ref order_write) = write.order {
            let stored_order = state
                .orders
                .get(&order_write.order.id())
                .ok_or(StoreError::Conflict { entity: "order" })?;
            if stored_order.version() != order_write.expected_order_version {
                return Err(StoreError::Conflict { entity: "order" });
            }
        }

        state.payments.insert(write.payment.id, write.payment);
        if let Some(entry) = write.ledger_entry {
            state.ledger.push(entry);
        }
        if let Some(order_write) = write.order {
            state
                .orders
                .insert(order_write.order.id(), order_write.order);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::Money;
    use domain::OrderItem;

    async fn seeded_store() -> (MemoryStore, Wholesaler, RetailerId, Product) {
        let store = MemoryStore::new();
        let wholesaler = Wholesaler::new("Diya Traders");
        let retailer = RetailerId::new();
        let product = Product::new(
            wholesaler.id,
            "Basmati Rice",
            "kg",
            Money::from_rupees(100),
            Money::from_rupees(120),
            10,
        );
        store.insert_wholesaler(wholesaler.clone()).await.unwrap();
        store.insert_product(product.clone()).await.unwrap();
        (store, wholesaler, retailer, product)
    }

    fn checkout_write(
        wholesaler: &Wholesaler,
        retailer: RetailerId,
        product: &Product,
        cart: &Cart,
    ) -> CheckoutWrite {
        let mut reserved = product.clone();
        let expected_version = reserved.version;
        reserved.reserve(3).unwrap();

        let items = vec![OrderItem::snapshot(product, 3)];
        let subtotal: Money = items.iter().map(|i| i.line_total).sum();
        let order = Order::place(
            wholesaler,
            retailer,
            items,
            subtotal,
            subtotal.percent_bps(500),
            Money::from_rupees(50),
            wholesaler.order_sequence + 1,
            Utc::now(),
        );

        let mut cleared = cart.clone();
        let cart_expected = cleared.version;
        cleared.clear();

        CheckoutWrite {
            order,
            products: vec![ProductStockWrite {
                product: reserved,
                expected_version,
            }],
            sequence: crate::store::SequenceWrite {
                wholesaler_id: wholesaler.id,
                expected_sequence: wholesaler.order_sequence,
                new_sequence: wholesaler.order_sequence + 1,
            },
            cart: crate::store::CartClearWrite {
                cart: cleared,
                expected_version: cart_expected,
            },
        }
    }

    #[tokio::test]
    async fn save_cart_insert_then_guarded_update() {
        let (store, wholesaler, retailer, product) = seeded_store().await;

        let mut cart = Cart::new(retailer, wholesaler.id);
        cart.add_line(&product, 2).unwrap();
        let v = cart.version;
        store.save_cart(cart.clone(), None).await.unwrap();

        // inserting again conflicts on the unique pair
        let other = Cart::new(retailer, wholesaler.id);
        assert!(matches!(
            store.save_cart(other, None).await,
            Err(StoreError::Conflict { entity: "cart" })
        ));

        // stale expected version conflicts
        cart.add_line(&product, 1).unwrap();
        assert!(matches!(
            store.save_cart(cart.clone(), Some(v + 10)).await,
            Err(StoreError::Conflict { entity: "cart" })
        ));
        store.save_cart(cart, Some(v)).await.unwrap();
    }

    #[tokio::test]
    async fn checkout_write_is_all_or_nothing() {
        let (store, wholesaler, retailer, product) = seeded_store().await;
        let mut cart = Cart::new(retailer, wholesaler.id);
        cart.add_line(&product, 3).unwrap();
        store.save_cart(cart.clone(), None).await.unwrap();

        // stale product version: nothing persists
        let mut stale = checkout_write(&wholesaler, retailer, &product, &cart);
        stale.products[0].expected_version = 99;
        assert!(matches!(
            store.commit_checkout(stale).await,
            Err(StoreError::Conflict { entity: "product" })
        ));
        assert_eq!(store.order_count().await, 0);
        let untouched = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(untouched.reserved_stock, 0);
        assert!(
            !store
                .get_cart(retailer, wholesaler.id)
                .await
                .unwrap()
                .unwrap()
                .is_empty()
        );

        // correct versions: everything lands together
        let write = checkout_write(&wholesaler, retailer, &product, &cart);
        let order_id = write.order.id();
        store.commit_checkout(write).await.unwrap();
        assert!(store.get_order(order_id).await.unwrap().is_some());
        let reserved = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(reserved.reserved_stock, 3);
        assert!(
            store
                .get_cart(retailer, wholesaler.id)
                .await
                .unwrap()
                .unwrap()
                .is_empty()
        );
        let seq = store
            .get_wholesaler(wholesaler.id)
            .await
            .unwrap()
            .unwrap()
            .order_sequence;
        assert_eq!(seq, 1);
    }

    #[tokio::test]
    async fn sequence_guard_rejects_concurrent_bump() {
        let (store, wholesaler, retailer, product) = seeded_store().await;
        let mut cart = Cart::new(retailer, wholesaler.id);
        cart.add_line(&product, 1).unwrap();
        store.save_cart(cart.clone(), None).await.unwrap();

        let mut write = checkout_write(&wholesaler, retailer, &product, &cart);
        write.sequence.expected_sequence = 7;
        assert!(matches!(
            store.commit_checkout(write).await,
            Err(StoreError::Conflict {
                entity: "wholesaler sequence"
            })
        ));
    }
}
