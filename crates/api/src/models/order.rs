//! Orders, their item snapshots and the checkout request body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    OrderCode, OrderId, OrderStatus, PaymentStatus, Price, ProductId, TransitionError, UserId,
};

use super::product::Product;

/// An item as captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: i32,
    pub image: String,
}

impl OrderItem {
    /// Snapshot a catalog product at its current price.
    #[must_use]
    pub fn priced_from(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity,
            image: product.image.clone(),
        }
    }

    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Where an order ships. Every field is required; none is validated further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "pincode", alias = "postalCode")]
    pub postal_code: String,
}

/// A placed order.
///
/// Immutable after creation apart from the settlement fields (`status`,
/// `payment_status`, `updated_at`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "orderId")]
    pub code: OrderCode,
    #[serde(skip)]
    pub owner: UserId,
    pub items: Vec<OrderItem>,
    /// Always Σ(item.price × item.quantity) over `items`.
    pub total: Price,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    #[serde(skip)]
    pub payment_details: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A new pending order. The total is computed from `items`.
    #[must_use]
    pub fn pending(
        owner: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: String,
        payment_details: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        let total = items.iter().map(OrderItem::line_total).sum();
        Self {
            id: OrderId::generate(),
            code: OrderCode::generate(),
            owner,
            items,
            total,
            status: OrderStatus::Pending,
            shipping_address,
            payment_method,
            payment_status: PaymentStatus::Pending,
            payment_details,
            created_at: now,
            updated_at: now,
        }
    }

    /// Settle payment, moving `status` and `payment_status` together.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the order has already settled or
    /// `outcome` is `Pending`.
    pub fn settle(&mut self, outcome: PaymentStatus) -> Result<(), TransitionError> {
        let payment_status = self.payment_status.transition(outcome)?;
        let status = self.status.transition(OrderStatus::from(outcome))?;
        self.payment_status = payment_status;
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A requested order line. Only the product and quantity are trusted;
/// any name, price or image sent alongside is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderItemRequest {
    #[serde(rename = "id", alias = "productId", alias = "product_id")]
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Checkout request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_details: serde_json::Map<String, serde_json::Value>,
}

/// A subject's orders, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
    pub total: usize,
}

impl From<Vec<Order>> for OrderList {
    fn from(orders: Vec<Order>) -> Self {
        Self {
            total: orders.len(),
            orders,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::models::product::tests::product;

    pub(crate) fn address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+44 20 7946 0000".into(),
            address: "12 Analytical Row".into(),
            city: "London".into(),
            state: "Greater London".into(),
            postal_code: "N1 9GU".into(),
        }
    }

    fn order() -> Order {
        let items = vec![
            OrderItem::priced_from(&product("p1", "Office Suite", 1999), 3),
            OrderItem::priced_from(&product("p2", "VPS Hosting", 500), 2),
        ];
        Order::pending(
            UserId::new("u-1"),
            items,
            address(),
            "card".into(),
            serde_json::json!({"last4": "4242"}),
        )
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        assert_eq!(order().total, Price::from_minor(6997));
    }

    #[test]
    fn test_settle_moves_both_statuses() {
        let mut order = order();
        order.settle(PaymentStatus::Completed).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.payment_status, PaymentStatus::Completed);

        assert!(order.settle(PaymentStatus::Failed).is_err());
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn test_settle_failed() {
        let mut order = order();
        order.settle(PaymentStatus::Failed).unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.payment_status, PaymentStatus::Failed);
    }

    #[test]
    fn test_request_accepts_cart_line_shape() {
        let body = serde_json::json!({
            "items": [
                {"id": "p1", "name": "Ignored", "price": 0.01, "quantity": 2, "image": "x"},
                {"productId": "p2", "quantity": 1}
            ],
            "shippingAddress": {
                "firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com",
                "phone": "1", "address": "a", "city": "c", "state": "s", "pincode": "p"
            },
            "paymentMethod": "upi",
            "paymentDetails": {"upiId": "ada@bank"}
        });
        let request: OrderRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.items[0].product_id, ProductId::new("p1"));
        assert_eq!(request.items[1].product_id, ProductId::new("p2"));
        assert_eq!(request.shipping_address.postal_code, "p");
    }

    #[test]
    fn test_order_wire_format_hides_internal_fields() {
        let json = serde_json::to_value(order()).unwrap();
        assert!(json["orderId"].as_str().unwrap().starts_with("ORD-"));
        assert_eq!(json["paymentStatus"], "pending");
        assert_eq!(json["shippingAddress"]["pincode"], "N1 9GU");
        assert!(json.get("paymentDetails").is_none());
        assert!(json.get("owner").is_none());
    }

    #[test]
    fn test_request_requires_payment_details_object() {
        let mut body = serde_json::json!({
            "items": [{"id": "p1", "quantity": 1}],
            "shippingAddress": {
                "firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com",
                "phone": "1", "address": "a", "city": "c", "state": "s", "pincode": "p"
            },
            "paymentMethod": "cod"
        });
        assert!(serde_json::from_value::<OrderRequest>(body.clone()).is_err());

        body["paymentDetails"] = serde_json::json!("card");
        assert!(serde_json::from_value::<OrderRequest>(body.clone()).is_err());

        body["paymentDetails"] = serde_json::json!({});
        let request: OrderRequest = serde_json::from_value(body).unwrap();
        assert!(request.payment_details.is_empty());
    }
}
