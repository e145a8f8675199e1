//! Integration tests for Bazaar.
//!
//! The tests drive the real axum router in-process with
//! `tower::ServiceExt::oneshot`, backed by a seeded [`MemoryStore`]. No
//! database or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```

use std::sync::Arc;

use argon2::Params;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use bazaar_api::config::ApiConfig;
use bazaar_api::db::MemoryStore;
use bazaar_api::db::seed::SeedData;
use bazaar_api::services::auth::Argon2Hasher;
use bazaar_api::services::orders::{PaymentGateway, StubPaymentGateway};
use bazaar_api::{AppState, app};

/// Signing key used by every test app.
pub const TEST_TOKEN_KEY: &str = "integration-k3y-5d1c9a7e3b2f40618e";

/// A response with its body parsed as JSON (`Value::Null` if it is not JSON).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `detail` of an error body.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(Value::as_str)
    }
}

/// An in-process application with a seeded in-memory store.
pub struct TestApp {
    /// The backing store, for arranging state the API cannot (price changes).
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl TestApp {
    /// App with the always-approving payment stub.
    pub async fn new() -> Self {
        Self::with_gateway(Arc::new(StubPaymentGateway)).await
    }

    /// App with a custom payment gateway.
    ///
    /// # Panics
    ///
    /// Panics if the bundled catalog cannot be seeded.
    pub async fn with_gateway(payments: Arc<dyn PaymentGateway>) -> Self {
        let store = Arc::new(MemoryStore::new());
        SeedData::bundled()
            .expect("bundled catalog parses")
            .apply(store.as_ref())
            .await
            .expect("bundled catalog seeds");

        let config = ApiConfig::in_memory(SecretString::from(TEST_TOKEN_KEY));
        let hasher = Argon2Hasher::with_params(
            Params::new(8, 1, 1, None).expect("cheap argon2 params are valid"),
        );
        let state = AppState::new(config, store.clone())
            .with_password_hasher(Arc::new(hasher))
            .with_payment_gateway(payments);

        Self {
            store,
            router: app(state),
        }
    }

    /// Send a request and collect the response.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register an account and return its bearer token.
    ///
    /// # Panics
    ///
    /// Panics if registration does not succeed.
    pub async fn register(&self, name: &str, email: &str) -> String {
        let response = self
            .post(
                "/api/auth/register",
                None,
                serde_json::json!({"name": name, "email": email, "password": "secret1"}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response
            .body
            .get("token")
            .and_then(Value::as_str)
            .expect("token in register response")
            .to_owned()
    }
}
