//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Readiness (store ping)
//!
//! # Auth
//! POST   /api/auth/register           - Create account, returns {user, token}
//! POST   /api/auth/login              - Password login, returns {user, token}
//! POST   /api/auth/logout             - Stateless logout (requires auth)
//! GET    /api/auth/me                 - Current user (requires auth)
//!
//! # Catalog
//! GET    /api/products                - Filtered, sorted, paginated listing
//! GET    /api/products/{id}           - Product detail
//! GET    /api/products/categories/all - Categories with live product counts
//! GET    /api/testimonials            - Active testimonials
//!
//! # Cart (requires auth)
//! GET    /api/cart                    - Hydrated cart with live total
//! POST   /api/cart/add                - Add or merge a line
//! PUT    /api/cart/update/{id}        - Set a line's quantity
//! DELETE /api/cart/remove/{id}        - Remove a line
//! DELETE /api/cart/clear              - Empty the cart
//!
//! # Orders (requires auth)
//! POST   /api/orders                  - Place an order
//! GET    /api/orders                  - Order history
//! GET    /api/orders/{id}             - One order
//! ```

pub mod auth;
pub mod cart;
pub mod health;
pub mod orders;
pub mod products;
pub mod testimonials;

use axum::{
    Router,
    extract::FromRequest,
    http::{HeaderValue, Method, header},
    middleware::from_fn,
    routing::{delete, get, post, put},
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, make_request_span, request_id_middleware};
use crate::state::AppState;

/// JSON request body whose rejections render as `{"detail": ...}` 400s.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `{"message": ...}` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

impl Message {
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Create the auth routes router.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me));

    if rate_limit {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/categories/all", get(products::categories))
        .route("/products/{id}", get(products::show))
        .route("/testimonials", get(testimonials::index))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show))
        .route("/cart/add", post(cart::add))
        .route("/cart/update/{id}", put(cart::update))
        .route("/cart/remove/{id}", delete(cart::remove))
        .route("/cart/clear", delete(cart::clear))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(orders::create).get(orders::index))
        .route("/orders/{id}", get(orders::show))
}

/// All `/api` routes.
pub fn api_routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .merge(auth_routes(rate_limit))
        .merge(catalog_routes())
        .merge(cart_routes())
        .merge(order_routes())
}

/// The complete application: API, health checks and the middleware stack.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let cors = cors_layer(&config.cors_origins);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes(config.rate_limit))
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the configured origins; any origin when none are configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
