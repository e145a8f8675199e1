//! Cart operations.
//!
//! Every mutation reads the cart, applies the change in memory and writes the
//! whole item list back guarded by the version it read. A version mismatch
//! means another request won the race; the mutation is re-applied to a fresh
//! read, up to [`MAX_ATTEMPTS`] times. Clearing is the exception: it is a
//! blind write that always wins.

use std::collections::HashMap;

use chrono::Utc;
use tracing::instrument;

use bazaar_core::{ProductId, UserId};

use super::CommerceError;
use crate::db::Store;
use crate::models::cart::{AddOutcome, InvalidQuantity};
use crate::models::{Cart, CartView, Product};

/// Write attempts before giving up with [`CommerceError::Contention`].
pub const MAX_ATTEMPTS: usize = 5;

/// Per-user cart operations.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The owner's cart, creating an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    pub async fn get_or_create(&self, owner: &UserId) -> Result<Cart, CommerceError> {
        Ok(self.store.find_or_create_cart(owner).await?)
    }

    /// The owner's cart hydrated with live product data.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    #[instrument(skip(self, owner), fields(user_id = %owner))]
    pub async fn view(&self, owner: &UserId) -> Result<CartView, CommerceError> {
        let cart = self.get_or_create(owner).await?;
        let ids: Vec<ProductId> = cart.items.iter().map(|i| i.product_id.clone()).collect();
        let products: HashMap<ProductId, Product> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Ok(CartView::hydrate(&cart.items, &products))
    }

    /// Add `quantity` of a catalog product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` for an unknown product,
    /// `CommerceError::InvalidQuantity` when a new line would have fewer than
    /// one unit, and `CommerceError::Contention` if every write attempt lost.
    #[instrument(skip(self, owner), fields(user_id = %owner))]
    pub async fn add_item(
        &self,
        owner: &UserId,
        product_id: &ProductId,
        quantity: i32,
    ) -> Result<AddOutcome, CommerceError> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(CommerceError::NotFound("Product"))?;

        self.mutate(owner, |cart| {
            cart.add_item(&product, quantity)
                .map_err(|InvalidQuantity(q)| CommerceError::InvalidQuantity(q))
        })
        .await
    }

    /// Set a line's quantity exactly; zero or below removes it.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if `quantity > 0` and the product is
    /// not in the cart.
    #[instrument(skip(self, owner), fields(user_id = %owner))]
    pub async fn set_quantity(
        &self,
        owner: &UserId,
        product_id: &ProductId,
        quantity: i32,
    ) -> Result<(), CommerceError> {
        self.mutate(owner, |cart| {
            if cart.set_quantity(product_id, quantity) {
                Ok(())
            } else {
                Err(CommerceError::NotFound("Cart item"))
            }
        })
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product is not in the cart.
    #[instrument(skip(self, owner), fields(user_id = %owner))]
    pub async fn remove_item(
        &self,
        owner: &UserId,
        product_id: &ProductId,
    ) -> Result<(), CommerceError> {
        self.mutate(owner, |cart| {
            if cart.remove_item(product_id) {
                Ok(())
            } else {
                Err(CommerceError::NotFound("Cart item"))
            }
        })
        .await
    }

    /// Empty the cart. Unconditional: never contends with other writers.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    #[instrument(skip(self, owner), fields(user_id = %owner))]
    pub async fn clear(&self, owner: &UserId) -> Result<(), CommerceError> {
        Ok(self.store.clear_cart(owner, Utc::now()).await?)
    }

    /// Read, apply `change`, and write back if nobody else wrote in between.
    ///
    /// `change` may run more than once and must only touch the cart it is given.
    /// An error from `change` aborts without writing.
    async fn mutate<T, F>(&self, owner: &UserId, mut change: F) -> Result<T, CommerceError>
    where
        F: FnMut(&mut Cart) -> Result<T, CommerceError> + Send,
        T: Send,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let mut cart = self.store.find_or_create_cart(owner).await?;
            let read_version = cart.version;
            let outcome = change(&mut cart)?;
            cart.touch();

            if self
                .store
                .replace_cart_items(&cart.id, read_version, &cart.items, cart.updated_at)
                .await?
            {
                return Ok(outcome);
            }
            tracing::debug!(attempt, cart_id = %cart.id, "Cart version conflict, retrying");
        }

        tracing::warn!(user_id = %owner, "Cart write abandoned after repeated conflicts");
        Err(CommerceError::Contention)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use bazaar_core::{CartId, Email, OrderId, OrderStatus, PaymentStatus, Price};

    use super::*;
    use crate::db::{
        CartStore, CatalogStore, MemoryStore, OrderStore, RepositoryError, TestimonialStore,
        UserStore,
    };
    use crate::models::product::tests::product;
    use crate::models::{CartItem, Category, Order, ProductQuery, Testimonial, User};

    async fn store_with_products() -> MemoryStore {
        let store = MemoryStore::new();
        store.upsert_product(product("p1", "Office Suite", 1000)).await;
        store.upsert_product(product("p2", "VPS Hosting", 250)).await;
        store
    }

    fn owner() -> UserId {
        UserId::new("u-1")
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_cart() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);

        let first = carts.get_or_create(&owner()).await.unwrap();
        let second = carts.get_or_create(&owner()).await.unwrap();
        assert!(first.items.is_empty());
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_add_twice_merges_into_one_line() {
        let store = store_with_products().await;
        let carts = CartService::new(&store);
        let p1 = ProductId::new("p1");

        carts.add_item(&owner(), &p1, 2).await.unwrap();
        carts.add_item(&owner(), &p1, 3).await.unwrap();

        let cart = carts.get_or_create(&owner()).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let store = store_with_products().await;
        let err = CartService::new(&store)
            .add_item(&owner(), &ProductId::new("nope"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::NotFound("Product")));
    }

    #[tokio::test]
    async fn test_view_total_uses_live_price() {
        let store = store_with_products().await;
        let carts = CartService::new(&store);
        carts.add_item(&owner(), &ProductId::new("p1"), 2).await.unwrap();
        carts.add_item(&owner(), &ProductId::new("p2"), 1).await.unwrap();

        store.upsert_product(product("p1", "Office Suite", 1500)).await;

        let view = carts.view(&owner()).await.unwrap();
        assert_eq!(view.total, Price::from_minor(3250));
    }

    #[tokio::test]
    async fn test_view_drops_deleted_products_but_keeps_them_stored() {
        let store = store_with_products().await;
        let carts = CartService::new(&store);
        carts.add_item(&owner(), &ProductId::new("p1"), 1).await.unwrap();
        carts.add_item(&owner(), &ProductId::new("p2"), 1).await.unwrap();

        store.remove_product(&ProductId::new("p2")).await;

        let view = carts.view(&owner()).await.unwrap();
        assert_eq!(view.cart_items.len(), 1);
        assert_eq!(view.total, Price::from_minor(1000));
        assert_eq!(carts.get_or_create(&owner()).await.unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn test_set_quantity_absent_leaves_cart_unchanged() {
        let store = store_with_products().await;
        let carts = CartService::new(&store);
        carts.add_item(&owner(), &ProductId::new("p1"), 1).await.unwrap();
        let before = carts.get_or_create(&owner()).await.unwrap();

        let err = carts
            .set_quantity(&owner(), &ProductId::new("p2"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::NotFound("Cart item")));

        let after = carts.get_or_create(&owner()).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes() {
        let store = store_with_products().await;
        let carts = CartService::new(&store);
        carts.add_item(&owner(), &ProductId::new("p1"), 4).await.unwrap();

        carts.set_quantity(&owner(), &ProductId::new("p1"), 0).await.unwrap();
        assert!(carts.get_or_create(&owner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_is_not_found_and_clear_always_succeeds() {
        let store = store_with_products().await;
        let carts = CartService::new(&store);

        assert!(carts.remove_item(&owner(), &ProductId::new("p1")).await.is_err());
        carts.clear(&owner()).await.unwrap();
        carts.add_item(&owner(), &ProductId::new("p1"), 1).await.unwrap();
        carts.clear(&owner()).await.unwrap();
        assert!(carts.get_or_create(&owner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = Arc::new(store_with_products().await);
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    CartService::new(store.as_ref())
                        .add_item(&owner(), &ProductId::new("p1"), 1)
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        let cart = CartService::new(store.as_ref())
            .get_or_create(&owner())
            .await
            .unwrap();
        assert_eq!(cart.items[0].quantity, succeeded);
    }

    /// Delegates to a [`MemoryStore`] but fails the first `conflicts` cart writes.
    struct ConflictingStore {
        inner: MemoryStore,
        conflicts: AtomicUsize,
    }

    #[async_trait]
    impl CatalogStore for ConflictingStore {
        async fn list_products(
            &self,
            query: &ProductQuery,
        ) -> Result<(Vec<Product>, u64), RepositoryError> {
            self.inner.list_products(query).await
        }
        async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
            self.inner.get_product(id).await
        }
        async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
            self.inner.get_products(ids).await
        }
        async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
            self.inner.list_categories().await
        }
        async fn count_products_in_category(&self, name: &str) -> Result<u64, RepositoryError> {
            self.inner.count_products_in_category(name).await
        }
        async fn insert_product_if_absent(&self, p: &Product) -> Result<bool, RepositoryError> {
            self.inner.insert_product_if_absent(p).await
        }
        async fn insert_category_if_absent(&self, c: &Category) -> Result<bool, RepositoryError> {
            self.inner.insert_category_if_absent(c).await
        }
    }

    #[async_trait]
    impl CartStore for ConflictingStore {
        async fn find_or_create_cart(&self, owner: &UserId) -> Result<Cart, RepositoryError> {
            self.inner.find_or_create_cart(owner).await
        }
        async fn replace_cart_items(
            &self,
            id: &CartId,
            expected_version: i64,
            items: &[CartItem],
            updated_at: DateTime<Utc>,
        ) -> Result<bool, RepositoryError> {
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                return Ok(false);
            }
            self.inner
                .replace_cart_items(id, expected_version, items, updated_at)
                .await
        }
        async fn clear_cart(
            &self,
            owner: &UserId,
            updated_at: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            self.inner.clear_cart(owner, updated_at).await
        }
    }

    #[async_trait]
    impl OrderStore for ConflictingStore {
        async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
            self.inner.insert_order(order).await
        }
        async fn update_order_status(
            &self,
            id: &OrderId,
            status: OrderStatus,
            payment_status: PaymentStatus,
            updated_at: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            self.inner
                .update_order_status(id, status, payment_status, updated_at)
                .await
        }
        async fn list_orders(&self, owner: &UserId) -> Result<Vec<Order>, RepositoryError> {
            self.inner.list_orders(owner).await
        }
        async fn get_order(
            &self,
            owner: &UserId,
            id: &OrderId,
        ) -> Result<Option<Order>, RepositoryError> {
            self.inner.get_order(owner, id).await
        }
    }

    #[async_trait]
    impl UserStore for ConflictingStore {
        async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
            self.inner.insert_user(user).await
        }
        async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
            self.inner.get_user_by_id(id).await
        }
        async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
            self.inner.get_user_by_email(email).await
        }
    }

    #[async_trait]
    impl TestimonialStore for ConflictingStore {
        async fn list_active_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError> {
            self.inner.list_active_testimonials().await
        }
        async fn insert_testimonial_if_absent(
            &self,
            t: &Testimonial,
        ) -> Result<bool, RepositoryError> {
            self.inner.insert_testimonial_if_absent(t).await
        }
    }

    #[async_trait]
    impl Store for ConflictingStore {
        async fn ping(&self) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    async fn conflicting(conflicts: usize) -> ConflictingStore {
        ConflictingStore {
            inner: store_with_products().await,
            conflicts: AtomicUsize::new(conflicts),
        }
    }

    #[tokio::test]
    async fn test_retries_after_version_conflict() {
        let store = conflicting(MAX_ATTEMPTS - 1).await;
        let carts = CartService::new(&store);

        carts.add_item(&owner(), &ProductId::new("p1"), 2).await.unwrap();
        assert_eq!(carts.get_or_create(&owner()).await.unwrap().items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let store = conflicting(MAX_ATTEMPTS).await;
        let carts = CartService::new(&store);

        let err = carts
            .add_item(&owner(), &ProductId::new("p1"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Contention));
        assert!(carts.get_or_create(&owner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_succeeds_while_conditional_writes_keep_losing() {
        let store = conflicting(usize::MAX).await;
        CartService::new(&store.inner)
            .add_item(&owner(), &ProductId::new("p1"), 2)
            .await
            .unwrap();
        let carts = CartService::new(&store);
        assert!(matches!(
            carts.add_item(&owner(), &ProductId::new("p2"), 1).await,
            Err(CommerceError::Contention)
        ));

        carts.clear(&owner()).await.unwrap();

        let cart = carts.get_or_create(&owner()).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.version, 2);
    }

    #[tokio::test]
    async fn test_approved_order_succeeds_while_cart_writes_keep_losing() {
        use crate::models::OrderRequest;
        use crate::models::order::tests::address;
        use crate::services::orders::{OrderService, StubPaymentGateway};

        let store = conflicting(usize::MAX).await;
        CartService::new(&store.inner)
            .add_item(&owner(), &ProductId::new("p2"), 3)
            .await
            .unwrap();
        let request = OrderRequest {
            items: vec![crate::models::OrderItemRequest {
                product_id: ProductId::new("p1"),
                quantity: 1,
            }],
            shipping_address: address(),
            payment_method: "card".to_owned(),
            payment_details: serde_json::Map::new(),
        };

        let order = OrderService::new(&store, &StubPaymentGateway)
            .place(&owner(), request)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(store.list_orders(&owner()).await.unwrap().len(), 1);
        assert!(CartService::new(&store).get_or_create(&owner()).await.unwrap().is_empty());
    }
}
