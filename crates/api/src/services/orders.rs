//! Checkout and order history.
//!
//! An order is built from `(product, quantity)` requests priced against the
//! live catalog, persisted as `pending`, then settled through the configured
//! [`PaymentGateway`]. The buyer's cart is emptied only when payment is approved.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::instrument;

use bazaar_core::{OrderId, PaymentStatus, ProductId, UserId};

use super::CommerceError;
use super::cart::CartService;
use crate::db::Store;
use crate::models::{Order, OrderItem, OrderItemRequest, OrderRequest, Product};

/// Result of charging for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved,
    Declined,
}

impl From<PaymentOutcome> for PaymentStatus {
    fn from(outcome: PaymentOutcome) -> Self {
        match outcome {
            PaymentOutcome::Approved => Self::Completed,
            PaymentOutcome::Declined => Self::Failed,
        }
    }
}

/// Charges for orders.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt to collect `order.total` using the order's payment method.
    async fn charge(&self, order: &Order) -> PaymentOutcome;
}

/// Gateway that approves every payment without contacting anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubPaymentGateway;

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    async fn charge(&self, order: &Order) -> PaymentOutcome {
        tracing::debug!(order_code = %order.code, total = %order.total, "Stub payment approved");
        PaymentOutcome::Approved
    }
}

/// Order placement and lookup.
pub struct OrderService<'a> {
    store: &'a dyn Store,
    payments: &'a dyn PaymentGateway,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, payments: &'a dyn PaymentGateway) -> Self {
        Self { store, payments }
    }

    /// Place an order, settle payment, and on approval empty the buyer's cart.
    ///
    /// Only product ids and quantities are taken from the request; names,
    /// prices and images come from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidOrder` for an empty item list or an
    /// unknown product, `CommerceError::InvalidQuantity` for a quantity below
    /// one, and `CommerceError::Repository` if the store fails.
    #[instrument(skip(self, owner, request), fields(user_id = %owner, items = request.items.len()))]
    pub async fn place(&self, owner: &UserId, request: OrderRequest) -> Result<Order, CommerceError> {
        let items = self.price_items(&request.items).await?;
        let mut order = Order::pending(
            owner.clone(),
            items,
            request.shipping_address,
            request.payment_method,
            serde_json::Value::Object(request.payment_details),
        );
        self.store.insert_order(&order).await?;

        let outcome = self.payments.charge(&order).await;
        order.settle(outcome.into())?;
        self.store
            .update_order_status(&order.id, order.status, order.payment_status, order.updated_at)
            .await?;

        tracing::info!(
            order_code = %order.code,
            total = %order.total,
            status = %order.status,
            "Order placed"
        );

        if outcome == PaymentOutcome::Approved {
            CartService::new(self.store).clear(owner).await?;
        }
        Ok(order)
    }

    /// The owner's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    #[instrument(skip(self, owner), fields(user_id = %owner))]
    pub async fn list(&self, owner: &UserId) -> Result<Vec<Order>, CommerceError> {
        Ok(self.store.list_orders(owner).await?)
    }

    /// One of the owner's orders.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the order does not exist or belongs
    /// to someone else.
    #[instrument(skip(self, owner), fields(user_id = %owner))]
    pub async fn get(&self, owner: &UserId, id: &OrderId) -> Result<Order, CommerceError> {
        self.store
            .get_order(owner, id)
            .await?
            .ok_or(CommerceError::NotFound("Order"))
    }

    async fn price_items(
        &self,
        requested: &[OrderItemRequest],
    ) -> Result<Vec<OrderItem>, CommerceError> {
        if requested.is_empty() {
            return Err(CommerceError::InvalidOrder(
                "Order must contain at least one item".to_owned(),
            ));
        }
        if let Some(bad) = requested.iter().find(|r| r.quantity < 1) {
            return Err(CommerceError::InvalidQuantity(bad.quantity));
        }

        let ids: Vec<ProductId> = requested.iter().map(|r| r.product_id.clone()).collect();
        let catalog: HashMap<ProductId, Product> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        requested
            .iter()
            .map(|r| {
                catalog
                    .get(&r.product_id)
                    .map(|product| OrderItem::priced_from(product, r.quantity))
                    .ok_or_else(|| {
                        CommerceError::InvalidOrder(format!("Unknown product: {}", r.product_id))
                    })
            })
            .collect()
    }
}
