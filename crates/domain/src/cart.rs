//! Cart staging area.

use common::{CartId, Money, ProductId, RetailerId, WholesalerId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::product::Product;

/// One line of a cart.
///
/// The `*_at_time` fields and `stock_snapshot` are advisory display data
/// captured at the last touch; checkout always re-validates against the
/// live product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_time: Money,
    pub mrp_at_time: Money,
    pub stock_snapshot: u32,
}

/// Mutable staging area for one (retailer, wholesaler) pair.
///
/// Created lazily on the first add and cleared (not deleted) on a
/// successful checkout. The pair is unique, so there is never cross-
/// retailer contention on a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub retailer_id: RetailerId,
    pub wholesaler_id: WholesalerId,
    pub items: Vec<CartItem>,
    /// Optimistic-concurrency version, bumped on every mutation.
    pub version: u64,
}

impl Cart {
    /// Creates an empty cart for the pair.
    pub fn new(retailer_id: RetailerId, wholesaler_id: WholesalerId) -> Self {
        Self {
            id: CartId::new(),
            retailer_id,
            wholesaler_id,
            items: Vec::new(),
            version: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the line for a product, if present.
    pub fn line(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Adds `qty` of a product, incrementing an existing line and
    /// refreshing its snapshots from the live product. Fails if the
    /// product belongs to a different wholesaler.
    pub fn add_line(&mut self, product: &Product, qty: u32) -> Result<(), DomainError> {
        if product.wholesaler_id != self.wholesaler_id {
            return Err(DomainError::InvalidState(format!(
                "product {} does not belong to this wholesaler",
                product.name
            )));
        }
        if qty == 0 {
            return Err(DomainError::InvalidState(
                "quantity to add must be positive".to_string(),
            ));
        }

        match self
            .items
            .iter_mut()
            .find(|i| i.product_id == product.id)
        {
            Some(item) => {
                item.quantity += qty;
                item.price_at_time = product.price;
                item.mrp_at_time = product.mrp;
                item.stock_snapshot = product.stock;
            }
            None => self.items.push(CartItem {
                product_id: product.id,
                quantity: qty,
                price_at_time: product.price,
                mrp_at_time: product.mrp,
                stock_snapshot: product.stock,
            }),
        }
        self.version += 1;
        Ok(())
    }

    /// Sets the quantity of an existing line. A quantity of zero (or the
    /// caller flooring a negative input to zero) removes the line.
    pub fn set_quantity(&mut self, product: &Product, qty: u32) -> Result<(), DomainError> {
        if self.line(product.id).is_none() {
            return Err(DomainError::NotFound("cart item"));
        }
        if qty == 0 {
            return self.remove_line(product.id);
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product.id)
            .expect("line checked above");
        item.quantity = qty;
        item.price_at_time = product.price;
        item.mrp_at_time = product.mrp;
        item.stock_snapshot = product.stock;
        self.version += 1;
        Ok(())
    }

    /// Removes a line outright.
    pub fn remove_line(&mut self, product_id: ProductId) -> Result<(), DomainError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(DomainError::NotFound("cart item"));
        }
        self.version += 1;
        Ok(())
    }

    /// Empties the cart, keeping the cart record itself.
    pub fn clear(&mut self) {
        self.items.clear();
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_for(wholesaler_id: WholesalerId) -> Product {
        Product::new(
            wholesaler_id,
            "Sunflower Oil",
            "ltr",
            Money::from_rupees(150),
            Money::from_rupees(180),
            40,
        )
    }

    #[test]
    fn add_creates_line_with_snapshots() {
        let w = WholesalerId::new();
        let mut cart = Cart::new(RetailerId::new(), w);
        let p = product_for(w);

        cart.add_line(&p, 2).unwrap();
        let line = cart.line(p.id).unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.price_at_time, Money::from_rupees(150));
        assert_eq!(line.stock_snapshot, 40);
    }

    #[test]
    fn add_existing_line_increments_and_refreshes() {
        let w = WholesalerId::new();
        let mut cart = Cart::new(RetailerId::new(), w);
        let mut p = product_for(w);

        cart.add_line(&p, 2).unwrap();
        p.price = Money::from_rupees(160);
        p.stock = 35;
        cart.add_line(&p, 3).unwrap();

        let line = cart.line(p.id).unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.price_at_time, Money::from_rupees(160));
        assert_eq!(line.stock_snapshot, 35);
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn add_foreign_product_fails() {
        let mut cart = Cart::new(RetailerId::new(), WholesalerId::new());
        let p = product_for(WholesalerId::new());
        assert!(matches!(
            cart.add_line(&p, 1),
            Err(DomainError::InvalidState(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_zero_removes_line() {
        let w = WholesalerId::new();
        let mut cart = Cart::new(RetailerId::new(), w);
        let p = product_for(w);

        cart.add_line(&p, 2).unwrap();
        cart.set_quantity(&p, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_on_missing_line_is_not_found() {
        let w = WholesalerId::new();
        let mut cart = Cart::new(RetailerId::new(), w);
        let p = product_for(w);
        assert!(matches!(
            cart.set_quantity(&p, 2),
            Err(DomainError::NotFound("cart item"))
        ));
    }

    #[test]
    fn clear_keeps_cart_but_drops_items() {
        let w = WholesalerId::new();
        let mut cart = Cart::new(RetailerId::new(), w);
        let p = product_for(w);
        cart.add_line(&p, 2).unwrap();

        let id = cart.id;
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.id, id);
    }
}
