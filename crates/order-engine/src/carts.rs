//! Cart staging operations.

use common::{ProductId, RetailerId, WholesalerId};
use domain::{Cart, DomainError};
use order_store::{Store, StoreError};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Stages cart lines for a retailer/wholesaler pair.
///
/// Carts are created lazily on the first add. Saves are version-guarded,
/// so two rapid updates from the same retailer retry instead of losing
/// one of the writes.
pub struct CartService<S> {
    store: S,
    max_retries: u32,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S, config: &EngineConfig) -> Self {
        Self {
            store,
            max_retries: config.max_retries,
        }
    }

    /// Adds `qty` of a product, creating the cart if the pair has none.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        retailer_id: RetailerId,
        wholesaler_id: WholesalerId,
        product_id: ProductId,
        qty: u32,
    ) -> Result<Cart> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(DomainError::NotFound("product"))?;

        for _ in 0..=self.max_retries {
            let (mut cart, expected) = match self.store.get_cart(retailer_id, wholesaler_id).await?
            {
                Some(cart) => {
                    let version = cart.version;
                    (cart, Some(version))
                }
                None => (Cart::new(retailer_id, wholesaler_id), None),
            };
            cart.add_line(&product, qty)?;

            match self.store.save_cart(cart.clone(), expected).await {
                Ok(()) => return Ok(cart),
                Err(StoreError::Conflict { .. }) => {
                    metrics::counter!("cart_save_conflicts_total").increment(1);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Contention("cart update"))
    }

    /// Sets the quantity of an existing line; zero removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        retailer_id: RetailerId,
        wholesaler_id: WholesalerId,
        product_id: ProductId,
        qty: u32,
    ) -> Result<Cart> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(DomainError::NotFound("product"))?;

        for _ in 0..=self.max_retries {
            let mut cart = self
                .store
                .get_cart(retailer_id, wholesaler_id)
                .await?
                .ok_or(DomainError::NotFound("cart"))?;
            let expected = cart.version;
            cart.set_quantity(&product, qty)?;

            match self.store.save_cart(cart.clone(), Some(expected)).await {
                Ok(()) => return Ok(cart),
                Err(StoreError::Conflict { .. }) => {
                    metrics::counter!("cart_save_conflicts_total").increment(1);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Contention("cart update"))
    }

    /// Removes a line outright.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        retailer_id: RetailerId,
        wholesaler_id: WholesalerId,
        product_id: ProductId,
    ) -> Result<Cart> {
        for _ in 0..=self.max_retries {
            let mut cart = self
                .store
                .get_cart(retailer_id, wholesaler_id)
                .await?
                .ok_or(DomainError::NotFound("cart"))?;
            let expected = cart.version;
            cart.remove_line(product_id)?;

            match self.store.save_cart(cart.clone(), Some(expected)).await {
                Ok(()) => return Ok(cart),
                Err(StoreError::Conflict { .. }) => {
                    metrics::counter!("cart_save_conflicts_total").increment(1);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Contention("cart update"))
    }

    /// Returns the pair's cart, if one has been created.
    pub async fn get_cart(
        &self,
        retailer_id: RetailerId,
        wholesaler_id: WholesalerId,
    ) -> Result<Option<Cart>> {
        Ok(self.store.get_cart(retailer_id, wholesaler_id).await?)
    }
}
