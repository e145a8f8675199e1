//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Store;
use crate::services::auth::{Argon2Hasher, AuthService, HmacTokenIssuer, PasswordHasher, TokenIssuer};
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::orders::{OrderService, PaymentGateway, StubPaymentGateway};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store, the injected capabilities and configuration. Services are
/// borrowed views built per call.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Create application state with the default capabilities: Argon2id
    /// passwords, HMAC tokens signed with `config.token_secret`, and the
    /// always-approving payment stub.
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn Store>) -> Self {
        let tokens = HmacTokenIssuer::new(config.token_secret.clone(), config.token_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                hasher: Arc::new(Argon2Hasher::default()),
                tokens: Arc::new(tokens),
                payments: Arc::new(StubPaymentGateway),
            }),
        }
    }

    /// Replace the password hasher.
    #[must_use]
    pub fn with_password_hasher(self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.rebuild(|inner| inner.hasher = hasher)
    }

    /// Replace the payment gateway.
    #[must_use]
    pub fn with_payment_gateway(self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.rebuild(|inner| inner.payments = payments)
    }

    fn rebuild(self, apply: impl FnOnce(&mut AppStateInner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => AppStateInner {
                config: shared.config.clone(),
                store: Arc::clone(&shared.store),
                hasher: Arc::clone(&shared.hasher),
                tokens: Arc::clone(&shared.tokens),
                payments: Arc::clone(&shared.payments),
            },
        };
        apply(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.store())
    }

    #[must_use]
    pub fn carts(&self) -> CartService<'_> {
        CartService::new(self.store())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store(), self.inner.payments.as_ref())
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.store(),
            self.inner.hasher.as_ref(),
            self.inner.tokens.as_ref(),
        )
    }
}
