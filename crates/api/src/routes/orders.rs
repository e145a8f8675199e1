//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
};

use bazaar_core::OrderId;

use super::ApiJson;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderList, OrderRequest};
use crate::state::AppState;

/// Place an order. Prices come from the catalog, not the request.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    ApiJson(body): ApiJson<OrderRequest>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().place(&user_id, body).await?))
}

/// The user's orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
) -> Result<Json<OrderList>> {
    let orders = state.orders().list(&user_id).await?;
    Ok(Json(OrderList::from(orders)))
}

/// One of the user's orders. Other users' orders are reported as missing.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let order = state.orders().get(&user_id, &OrderId::new(id)).await?;
    Ok(Json(order))
}
