//! Business logic services for the Bazaar API.
//!
//! Each service borrows the shared [`Store`](crate::db::Store) for the length
//! of a request and is built from [`AppState`](crate::state::AppState):
//!
//! - [`catalog`] - product listing, lookup and category counts
//! - [`cart`] - per-user carts with versioned writes
//! - [`orders`] - checkout, payment settlement and order history
//! - [`auth`] - registration, login and bearer tokens

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use thiserror::Error;

use bazaar_core::TransitionError;

use crate::db::RepositoryError;

/// Errors from the catalog, cart and order services.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Referenced entity does not exist (or is not owned by the caller).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A new cart line or order line asked for fewer than one unit.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i32),

    /// The order request cannot be fulfilled as submitted.
    #[error("{0}")]
    InvalidOrder(String),

    /// The cart kept changing underneath us; the caller may retry.
    #[error("cart was modified concurrently, please retry")]
    Contention,

    /// Illegal order status change.
    #[error(transparent)]
    Status(#[from] TransitionError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
