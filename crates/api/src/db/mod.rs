//! Storage for the Bazaar API.
//!
//! Handlers and services never talk to a database directly; they go through
//! the per-collection traits below. Two backends implement all of them:
//!
//! - [`PgStore`] - `PostgreSQL`, used in production
//! - [`MemoryStore`] - process-local maps, used by tests and `BAZAAR_STORAGE=memory`
//!
//! ## Tables (schema `bazaar`)
//!
//! - `product`, `category` - the catalog, written only by seeding
//! - `account` - registered users
//! - `cart` - one row per owner, items as JSONB, optimistic `version`
//! - `customer_order` - orders with item snapshots as JSONB
//! - `testimonial`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;
pub mod seed;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use bazaar_core::{CartId, Email, OrderId, OrderStatus, PaymentStatus, ProductId, UserId};

use crate::models::{Cart, CartItem, Category, Order, Product, ProductQuery, Testimonial, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Read access to products and categories, plus idempotent seeding writes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// One page of products matching `query`, and the total match count.
    ///
    /// Results are ordered by `query.sort` with product id as tiebreaker.
    async fn list_products(
        &self,
        query: &ProductQuery,
    ) -> Result<(Vec<Product>, u64), RepositoryError>;

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch several products at once. Unknown ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// All categories, ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Number of products whose category equals `name`.
    async fn count_products_in_category(&self, name: &str) -> Result<u64, RepositoryError>;

    /// Insert `product` unless one with the same id exists. Returns whether it was inserted.
    async fn insert_product_if_absent(&self, product: &Product) -> Result<bool, RepositoryError>;

    /// Insert `category` unless one with the same id exists. Returns whether it was inserted.
    async fn insert_category_if_absent(&self, category: &Category)
    -> Result<bool, RepositoryError>;
}

/// Cart documents, at most one per owner.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Return the owner's cart, creating an empty one if none exists.
    ///
    /// Concurrent callers for the same owner observe the same cart.
    async fn find_or_create_cart(&self, owner: &UserId) -> Result<Cart, RepositoryError>;

    /// Replace a cart's items if its version still equals `expected_version`.
    ///
    /// On success the stored version is incremented. Returns `false` when the
    /// cart changed since it was read (or no longer exists).
    async fn replace_cart_items(
        &self,
        id: &CartId,
        expected_version: i64,
        items: &[CartItem],
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Empty the owner's cart regardless of its version, creating it if absent.
    ///
    /// The stored version is still incremented so in-flight conditional
    /// writes based on the old items fail and re-read.
    async fn clear_cart(
        &self,
        owner: &UserId,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// Placed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Persist settlement fields.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no order has this id.
    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// The owner's orders, newest first.
    async fn list_orders(&self, owner: &UserId) -> Result<Vec<Order>, RepositoryError>;

    /// A single order, only if it belongs to `owner`.
    async fn get_order(
        &self,
        owner: &UserId,
        id: &OrderId,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Registered accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the email is already registered.
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError>;

    async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;
}

/// Storefront testimonials.
#[async_trait]
pub trait TestimonialStore: Send + Sync {
    /// Active testimonials, newest first.
    async fn list_active_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError>;

    async fn insert_testimonial_if_absent(
        &self,
        testimonial: &Testimonial,
    ) -> Result<bool, RepositoryError>;
}

/// Every collection the API needs, behind one object.
#[async_trait]
pub trait Store: CatalogStore + CartStore + OrderStore + UserStore + TestimonialStore {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
