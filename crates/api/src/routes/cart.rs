//! Cart route handlers.
//!
//! Every route acts on the authenticated user's single cart, which is
//! created on first access.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use bazaar_core::ProductId;

use super::{ApiJson, Message};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::CartView;
use crate::state::AppState;

const fn default_quantity() -> i32 {
    1
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: i32,
}

/// The hydrated cart with its live total.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
) -> Result<Json<CartView>> {
    Ok(Json(state.carts().view(&user_id).await?))
}

/// Add a product, merging with an existing line.
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> Result<Json<Message>> {
    state
        .carts()
        .add_item(&user_id, &body.product_id, body.quantity)
        .await?;
    Ok(Json(Message::new("Item added to cart successfully")))
}

/// Set a line's quantity; zero or below removes it.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    Path(product_id): Path<String>,
    ApiJson(body): ApiJson<UpdateCartRequest>,
) -> Result<Json<Message>> {
    state
        .carts()
        .set_quantity(&user_id, &ProductId::new(product_id), body.quantity)
        .await?;
    Ok(Json(Message::new("Cart item updated successfully")))
}

/// Remove a line.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Json<Message>> {
    state
        .carts()
        .remove_item(&user_id, &ProductId::new(product_id))
        .await?;
    Ok(Json(Message::new("Item removed from cart successfully")))
}

/// Empty the cart.
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
) -> Result<Json<Message>> {
    state.carts().clear(&user_id).await?;
    Ok(Json(Message::new("Cart cleared successfully")))
}
