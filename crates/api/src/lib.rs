//! Bazaar API library.
//!
//! The REST backend as a library: configuration, storage backends, the
//! catalog/cart/order/identity services and the axum router, so the binary
//! and the integration tests build the same application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
