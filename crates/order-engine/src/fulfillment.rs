//! Fulfillment: order status transitions and their stock effects.

use chrono::Utc;
use common::{OrderId, RetailerId, WholesalerId};
use domain::{DomainError, LedgerEntry, Order, OrderStatus};
use order_store::{ProductStockWrite, Store, StoreError, TransitionWrite};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Moves orders through the status machine on behalf of the owning
/// wholesaler or retailer.
///
/// Ownership failures report `NotFound` rather than `AccessDenied`, so
/// callers cannot probe for the existence of other parties' orders.
pub struct FulfillmentService<S> {
    store: S,
    max_retries: u32,
}

impl<S: Store> FulfillmentService<S> {
    pub fn new(store: S, config: &EngineConfig) -> Self {
        Self {
            store,
            max_retries: config.max_retries,
        }
    }

    /// Wholesaler-driven transition. Acceptance converts every line's
    /// reservation into a committed sale and posts the order total as a
    /// DEBIT to the account ledger; rejection releases the reservations.
    /// Cancellation is the retailer's move and is refused here.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        wholesaler_id: WholesalerId,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order> {
        if target == OrderStatus::Cancelled {
            return Err(DomainError::AccessDenied(
                "only the retailer may cancel an order",
            )
            .into());
        }

        for attempt in 0..=self.max_retries {
            let current = self
                .store
                .get_order(order_id)
                .await?
                .filter(|o| o.wholesaler_id() == wholesaler_id)
                .ok_or(DomainError::NotFound("order"))?;

            let now = Utc::now();
            let mut order = current;
            let expected_order_version = order.version();
            order.transition(target, now)?;

            let mut products = Vec::new();
            let mut ledger_entry = None;
            match target {
                OrderStatus::Accepted => {
                    for item in order.items() {
                        let mut product = self
                            .store
                            .get_product(item.product_id)
                            .await?
                            .ok_or(DomainError::NotFound("product"))?;
                        let expected_version = ProductStockWrite::expecting(&product);
                        product.commit_reservation(item.quantity)?;
                        products.push(ProductStockWrite {
                            product,
                            expected_version,
                        });
                    }
                    ledger_entry = Some(LedgerEntry::debit(
                        wholesaler_id,
                        order.retailer_id(),
                        order.total_amount(),
                        format!("Order {} accepted", order.order_number()),
                        now,
                    ));
                }
                OrderStatus::Rejected => {
                    for item in order.items() {
                        let mut product = self
                            .store
                            .get_product(item.product_id)
                            .await?
                            .ok_or(DomainError::NotFound("product"))?;
                        let expected_version = ProductStockWrite::expecting(&product);
                        product.release_reservation(item.quantity);
                        products.push(ProductStockWrite {
                            product,
                            expected_version,
                        });
                    }
                }
                _ => {}
            }

            match self
                .store
                .commit_transition(TransitionWrite {
                    order: order.clone(),
                    expected_order_version,
                    products,
                    ledger_entry,
                })
                .await
            {
                Ok(()) => {
                    metrics::counter!("order_transitions_total").increment(1);
                    tracing::info!(
                        order_number = %order.order_number(),
                        status = %order.status(),
                        "order transitioned"
                    );
                    return Ok(order);
                }
                Err(StoreError::Conflict { entity }) => {
                    metrics::counter!("transition_conflicts_total").increment(1);
                    tracing::debug!(attempt, entity, "transition conflict, restarting");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Contention("order transition"))
    }

    /// Retailer-initiated cancellation, permitted only while the order
    /// is still PLACED. Releases the reservations like a rejection.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
    ) -> Result<Order> {
        for attempt in 0..=self.max_retries {
            let current = self
                .store
                .get_order(order_id)
                .await?
                .filter(|o| o.retailer_id() == retailer_id)
                .ok_or(DomainError::NotFound("order"))?;
            if current.status() != OrderStatus::Placed {
                return Err(DomainError::InvalidState(format!(
                    "order {} can no longer be cancelled",
                    current.order_number()
                ))
                .into());
            }

            let now = Utc::now();
            let mut order = current;
            let expected_order_version = order.version();
            order.transition(OrderStatus::Cancelled, now)?;

            let mut products = Vec::new();
            for item in order.items() {
                let mut product = self
                    .store
                    .get_product(item.product_id)
                    .await?
                    .ok_or(DomainError::NotFound("product"))?;
                let expected_version = ProductStockWrite::expecting(&product);
                product.release_reservation(item.quantity);
                products.push(ProductStockWrite {
                    product,
                    expected_version,
                });
            }

            match self
                .store
                .commit_transition(TransitionWrite {
                    order: order.clone(),
                    expected_order_version,
                    products,
                    ledger_entry: None,
                })
                .await
            {
                Ok(()) => {
                    metrics::counter!("order_cancellations_total").increment(1);
                    return Ok(order);
                }
                Err(StoreError::Conflict { entity }) => {
                    metrics::counter!("transition_conflicts_total").increment(1);
                    tracing::debug!(attempt, entity, "cancel conflict, restarting");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Contention("order cancellation"))
    }

    /// An order as seen by its wholesaler.
    pub async fn order_for_wholesaler(
        &self,
        wholesaler_id: WholesalerId,
        order_id: OrderId,
    ) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .filter(|o| o.wholesaler_id() == wholesaler_id)
            .ok_or(DomainError::NotFound("order").into())
    }

    /// An order as seen by its retailer.
    pub async fn order_for_retailer(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
    ) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .filter(|o| o.retailer_id() == retailer_id)
            .ok_or(DomainError::NotFound("order").into())
    }

    /// Orders received by a wholesaler, most recent first.
    pub async fn orders_for_wholesaler(
        &self,
        wholesaler_id: WholesalerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_wholesaler(wholesaler_id, status).await?)
    }

    /// Orders placed by a retailer, most recent first.
    pub async fn orders_for_retailer(
        &self,
        retailer_id: RetailerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_retailer(retailer_id, status).await?)
    }
}
