//! Checkout: converts a cart into a binding order.

use chrono::Utc;
use common::{Money, OrderId, WholesalerId};
use domain::{DomainError, Order, OrderItem};
use order_store::{
    CartClearWrite, CheckoutWrite, ProductStockWrite, SequenceWrite, Store, StoreError,
};

use crate::config::EngineConfig;
use crate::directory::Directory;
use crate::error::{EngineError, Result};

/// What a successful checkout hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub order_number: String,
    pub total_amount: Money,
}

/// Drives the checkout pipeline: connection gate, validation pass,
/// exact totals, then an all-or-nothing commit of the order, its item
/// snapshots, the stock reservations, the sequence bump, and the cart
/// clear. Version conflicts restart the whole pipeline from a fresh
/// read, up to the configured retry bound.
pub struct CheckoutService<S, D> {
    store: S,
    directory: D,
    config: EngineConfig,
}

impl<S: Store, D: Directory> CheckoutService<S, D> {
    pub fn new(store: S, directory: D, config: EngineConfig) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    /// Checks out the caller's cart with the given wholesaler.
    ///
    /// The retailer is an external identity resolved through the
    /// directory; an unknown identity or a missing approved connection
    /// fails with `AccessDenied` before anything is read.
    #[tracing::instrument(skip(self))]
    pub async fn checkout_from_cart(
        &self,
        retailer_key: &str,
        wholesaler_id: WholesalerId,
    ) -> Result<CheckoutReceipt> {
        let retailer_id = self
            .directory
            .resolve_retailer(retailer_key)
            .await
            .ok_or(DomainError::AccessDenied("unknown retailer identity"))?;
        if !self.directory.is_connected(retailer_id, wholesaler_id).await {
            return Err(DomainError::AccessDenied(
                "retailer is not connected to this wholesaler",
            )
            .into());
        }

        for attempt in 0..=self.config.max_retries {
            let wholesaler = self
                .store
                .get_wholesaler(wholesaler_id)
                .await?
                .ok_or(DomainError::NotFound("wholesaler"))?;
            let cart = self
                .store
                .get_cart(retailer_id, wholesaler_id)
                .await?
                .filter(|c| !c.is_empty())
                .ok_or_else(|| DomainError::InvalidState("cart is empty".to_string()))?;

            // Validation pass: all lines must be reservable against live
            // products before anything mutates.
            let mut items = Vec::with_capacity(cart.items.len());
            let mut products = Vec::with_capacity(cart.items.len());
            for line in &cart.items {
                let product = self
                    .store
                    .get_product(line.product_id)
                    .await?
                    .ok_or(DomainError::NotFound("product"))?;
                product.check_reservable(line.quantity)?;

                items.push(OrderItem::snapshot(&product, line.quantity));
                let expected_version = ProductStockWrite::expecting(&product);
                let mut reserved = product;
                reserved.reserve(line.quantity)?;
                products.push(ProductStockWrite {
                    product: reserved,
                    expected_version,
                });
            }

            let subtotal: Money = items.iter().map(|i| i.line_total).sum();
            let tax = subtotal.percent_bps(self.config.gst_rate_bps);
            let sequence = wholesaler.order_sequence + 1;
            let order = Order::place(
                &wholesaler,
                retailer_id,
                items,
                subtotal,
                tax,
                self.config.delivery_charge,
                sequence,
                Utc::now(),
            );
            let receipt = CheckoutReceipt {
                order_id: order.id(),
                order_number: order.order_number().to_string(),
                total_amount: order.total_amount(),
            };

            let mut cleared = cart;
            let cart_expected = cleared.version;
            cleared.clear();

            let write = CheckoutWrite {
                order,
                products,
                sequence: SequenceWrite {
                    wholesaler_id,
                    expected_sequence: wholesaler.order_sequence,
                    new_sequence: sequence,
                },
                cart: CartClearWrite {
                    cart: cleared,
                    expected_version: cart_expected,
                },
            };

            match self.store.commit_checkout(write).await {
                Ok(()) => {
                    metrics::counter!("checkouts_total").increment(1);
                    tracing::info!(
                        order_number = %receipt.order_number,
                        total = %receipt.total_amount,
                        "checkout committed"
                    );
                    return Ok(receipt);
                }
                Err(StoreError::Conflict { entity }) => {
                    metrics::counter!("checkout_conflicts_total").increment(1);
                    tracing::debug!(attempt, entity, "checkout conflict, restarting");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Contention("checkout"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use common::RetailerId;
    use domain::{Cart, OrderStatus, PaymentStatus, Product, Wholesaler};
    use order_store::MemoryStore;

    struct Harness {
        service: CheckoutService<MemoryStore, MemoryDirectory>,
        store: MemoryStore,
        directory: MemoryDirectory,
        wholesaler: Wholesaler,
        product: Product,
        retailer: RetailerId,
    }

    async fn harness() -> Harness {
        let store = MemoryStore::new();
        let directory = MemoryDirectory::new();
        let wholesaler = Wholesaler::new("Diya Traders");
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

        let retailer = directory.register_retailer("retailer@shop");
        directory.connect(retailer, wholesaler.id);

        let service =
            CheckoutService::new(store.clone(), directory.clone(), EngineConfig::default());
        Harness {
            service,
            store,
            directory,
            wholesaler,
            product,
            retailer,
        }
    }

    async fn stage_cart(h: &Harness, qty: u32) {
        let mut cart = Cart::new(h.retailer, h.wholesaler.id);
        cart.add_line(&h.product, qty).unwrap();
        h.store.save_cart(cart, None).await.unwrap();
    }

    #[tokio::test]
    async fn checkout_produces_order_and_reserves_stock() {
        let h = harness().await;
        stage_cart(&h, 3).await;

        let receipt = h
            .service
            .checkout_from_cart("retailer@shop", h.wholesaler.id)
            .await
            .unwrap();

        // 3 × ₹100 + 5% GST + ₹50 delivery
        assert_eq!(receipt.total_amount, Money::from_rupees(365));
        assert!(receipt.order_number.starts_with("DIY"));
        assert!(receipt.order_number.ends_with("-0001"));

        let order = h.store.get_order(receipt.order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.payment_status(), PaymentStatus::Unpaid);
        assert_eq!(order.subtotal(), Money::from_rupees(300));
        assert_eq!(order.tax_amount(), Money::from_rupees(15));

        let product = h.store.get_product(h.product.id).await.unwrap().unwrap();
        assert_eq!(product.reserved_stock, 3);
        assert_eq!(product.stock, 10);

        let cart = h
            .store
            .get_cart(h.retailer, h.wholesaler.id)
            .await
            .unwrap()
            .unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn unknown_identity_is_access_denied() {
        let h = harness().await;
        stage_cart(&h, 1).await;
        let err = h
            .service
            .checkout_from_cart("stranger", h.wholesaler.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn unconnected_pair_is_access_denied() {
        let h = harness().await;
        stage_cart(&h, 1).await;
        h.directory.register_retailer("other@shop");
        let err = h
            .service
            .checkout_from_cart("other@shop", h.wholesaler.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn empty_cart_is_invalid_state() {
        let h = harness().await;
        let err = h
            .service
            .checkout_from_cart("retailer@shop", h.wholesaler.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::InvalidState(_))
        ));

        // no order, no reservation, no sequence bump
        assert_eq!(h.store.order_count().await, 0);
        let wholesaler = h
            .store
            .get_wholesaler(h.wholesaler.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(wholesaler.order_sequence, 0);
    }

    #[tokio::test]
    async fn insufficient_stock_aborts_whole_checkout() {
        let h = harness().await;
        stage_cart(&h, 11).await;

        let err = h
            .service
            .checkout_from_cart("retailer@shop", h.wholesaler.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::InsufficientStock { .. })
        ));

        let product = h.store.get_product(h.product.id).await.unwrap().unwrap();
        assert_eq!(product.reserved_stock, 0);
        assert_eq!(h.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn sequential_checkouts_get_consecutive_numbers() {
        let h = harness().await;

        stage_cart(&h, 1).await;
        let first = h
            .service
            .checkout_from_cart("retailer@shop", h.wholesaler.id)
            .await
            .unwrap();

        // restage after the clear
        let mut cart = h
            .store
            .get_cart(h.retailer, h.wholesaler.id)
            .await
            .unwrap()
            .unwrap();
        let expected = cart.version;
        cart.add_line(&h.product, 1).unwrap();
        h.store.save_cart(cart, Some(expected)).await.unwrap();

        let second = h
            .service
            .checkout_from_cart("retailer@shop", h.wholesaler.id)
            .await
            .unwrap();

        assert!(first.order_number.ends_with("-0001"));
        assert!(second.order_number.ends_with("-0002"));
        assert_ne!(first.order_id, second.order_id);
    }
}
