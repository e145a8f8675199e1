//! Cart documents and the hydrated cart view.
//!
//! A [`Cart`] stores denormalized [`CartItem`] snapshots taken when each item
//! was added. The [`CartView`] shown to clients is rebuilt on every read from
//! live catalog data, so its prices can differ from the snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{CartId, Price, ProductId, UserId};

use super::product::Product;

/// A line in a stored cart.
///
/// Invariant: `quantity >= 1`. Mutations that would leave a line at zero or
/// below remove it instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price when the item was first added.
    pub price: Price,
    pub name: String,
    pub image: String,
}

impl CartItem {
    /// Snapshot a product at its current price.
    #[must_use]
    pub fn snapshot(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id.clone(),
            quantity,
            price: product.price,
            name: product.name.clone(),
            image: product.image.clone(),
        }
    }
}

/// What [`Cart::add_item`] did to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Appended,
    /// An existing line's quantity changed.
    Merged,
    /// The merged quantity dropped to zero or below and the line was removed.
    Removed,
}

/// Rejected quantity on a new cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("quantity must be at least 1 (got {0})")]
pub struct InvalidQuantity(pub i32);

/// A subject's cart. At most one exists per owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub owner: UserId,
    pub items: Vec<CartItem>,
    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// An empty cart for `owner`.
    #[must_use]
    pub fn new(owner: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::generate(),
            owner,
            items: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add `quantity` of `product`, merging into an existing line if present.
    ///
    /// The delta may be negative for an existing line; if the running quantity
    /// reaches zero or below the line is removed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidQuantity`] when appending a new line with `quantity < 1`.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i32,
    ) -> Result<AddOutcome, InvalidQuantity> {
        if let Some(pos) = self.position(&product.id) {
            let merged = self.items.get(pos).map_or(0, |item| item.quantity).saturating_add(quantity);
            if merged <= 0 {
                self.items.remove(pos);
                return Ok(AddOutcome::Removed);
            }
            if let Some(item) = self.items.get_mut(pos) {
                item.quantity = merged;
            }
            return Ok(AddOutcome::Merged);
        }

        if quantity < 1 {
            return Err(InvalidQuantity(quantity));
        }
        self.items.push(CartItem::snapshot(product, quantity));
        Ok(AddOutcome::Appended)
    }

    /// Set a line's quantity exactly. `quantity <= 0` removes the line.
    ///
    /// Returns `false` if `quantity > 0` and the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i32) -> bool {
        if quantity <= 0 {
            self.items.retain(|item| &item.product_id != product_id);
            return true;
        }
        match self.items.iter_mut().find(|item| &item.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if it was not present.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product_id != product_id);
        self.items.len() < before
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Refresh the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| &item.product_id == product_id)
    }
}

/// A cart line joined with the live product it refers to.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: i32,
}

/// The client-facing cart: hydrated lines and a total at current prices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_items: Vec<CartLine>,
    pub total: Price,
}

impl CartView {
    /// Join cart lines against `products`.
    ///
    /// Lines whose product is missing from `products` are left out of the view
    /// (they stay in storage). The total is Σ(current price × quantity).
    #[must_use]
    pub fn hydrate(items: &[CartItem], products: &HashMap<ProductId, Product>) -> Self {
        let cart_items: Vec<CartLine> = items
            .iter()
            .filter_map(|item| {
                products.get(&item.product_id).map(|product| CartLine {
                    product: product.clone(),
                    quantity: item.quantity,
                })
            })
            .collect();
        let total = cart_items
            .iter()
            .map(|line| line.product.price.times(line.quantity))
            .sum();

        Self { cart_items, total }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::product::tests::product;

    fn cart() -> Cart {
        Cart::new(UserId::new("u-1"))
    }

    #[test]
    fn test_add_merges_same_product() {
        let p = product("p1", "Office Suite", 1000);
        let mut cart = cart();

        assert_eq!(cart.add_item(&p, 2), Ok(AddOutcome::Appended));
        assert_eq!(cart.add_item(&p, 3), Ok(AddOutcome::Merged));

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[test]
    fn test_add_negative_delta_removes_line_at_zero() {
        let p = product("p1", "Office Suite", 1000);
        let mut cart = cart();
        cart.add_item(&p, 2).unwrap();

        assert_eq!(cart.add_item(&p, -1), Ok(AddOutcome::Merged));
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(cart.add_item(&p, -5), Ok(AddOutcome::Removed));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_new_line_requires_positive_quantity() {
        let p = product("p1", "Office Suite", 1000);
        let mut cart = cart();
        assert_eq!(cart.add_item(&p, 0), Err(InvalidQuantity(0)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_snapshot_keeps_price_at_add_time() {
        let mut p = product("p1", "Office Suite", 1000);
        let mut cart = cart();
        cart.add_item(&p, 1).unwrap();

        p.price = Price::from_minor(2000);
        cart.add_item(&p, 1).unwrap();
        assert_eq!(cart.items[0].price, Price::from_minor(1000));
    }

    #[test]
    fn test_set_quantity() {
        let p = product("p1", "Office Suite", 1000);
        let mut cart = cart();
        cart.add_item(&p, 4).unwrap();

        assert!(cart.set_quantity(&p.id, 2));
        assert_eq!(cart.items[0].quantity, 2);

        assert!(!cart.set_quantity(&ProductId::new("absent"), 3));
        assert_eq!(cart.items.len(), 1);

        assert!(cart.set_quantity(&p.id, 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_item_reports_absence() {
        let p = product("p1", "Office Suite", 1000);
        let mut cart = cart();
        cart.add_item(&p, 1).unwrap();

        assert!(cart.remove_item(&p.id));
        assert!(!cart.remove_item(&p.id));
    }

    #[test]
    fn test_hydrate_uses_live_prices_and_drops_missing_products() {
        let mut p1 = product("p1", "Office Suite", 1000);
        let p2 = product("p2", "Office Suite", 250);
        let mut cart = cart();
        cart.add_item(&p1, 2).unwrap();
        cart.add_item(&p2, 4).unwrap();

        p1.price = Price::from_minor(1500);
        let live: HashMap<ProductId, Product> = [(p1.id.clone(), p1)].into_iter().collect();

        let view = CartView::hydrate(&cart.items, &live);
        assert_eq!(view.cart_items.len(), 1);
        assert_eq!(view.total, Price::from_minor(3000));
        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_view_wire_format() {
        let p = product("p1", "Office Suite", 1000);
        let mut cart = cart();
        cart.add_item(&p, 2).unwrap();
        let live: HashMap<ProductId, Product> = [(p.id.clone(), p)].into_iter().collect();

        let json = serde_json::to_value(CartView::hydrate(&cart.items, &live)).unwrap();
        assert_eq!(json["cartItems"][0]["id"], "p1");
        assert_eq!(json["cartItems"][0]["quantity"], 2);
        assert_eq!(json["total"], 20.0);
    }
}
