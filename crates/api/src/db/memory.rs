//! In-process store backed by `tokio` locks over ordinary maps.
//!
//! Used by the test suites and by `BAZAAR_STORAGE=memory` for local runs.
//! Semantics match [`PgStore`](super::PgStore), including cart versioning.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use bazaar_core::{
    CartId, CategoryId, Email, OrderId, OrderStatus, PaymentStatus, ProductId, UserId,
};

use super::{
    CartStore, CatalogStore, OrderStore, RepositoryError, Store, TestimonialStore, UserStore,
};
use crate::models::{
    Cart, CartItem, Category, Order, Product, ProductQuery, ProductSort, Testimonial, User,
};

#[derive(Default)]
struct Carts {
    by_id: HashMap<CartId, Cart>,
    by_owner: HashMap<UserId, CartId>,
}

#[derive(Default)]
struct Users {
    by_id: HashMap<UserId, User>,
    by_email: HashMap<Email, UserId>,
}

/// Store holding everything in memory. Cheap to create; nothing persists.
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<BTreeMap<ProductId, Product>>,
    categories: RwLock<BTreeMap<CategoryId, Category>>,
    carts: RwLock<Carts>,
    orders: RwLock<Vec<Order>>,
    users: RwLock<Users>,
    testimonials: RwLock<Vec<Testimonial>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a product, whether or not it exists.
    pub async fn upsert_product(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    /// Delete a product from the catalog.
    pub async fn remove_product(&self, id: &ProductId) -> Option<Product> {
        self.products.write().await.remove(id)
    }
}

fn compare(sort: ProductSort, a: &Product, b: &Product) -> Ordering {
    let primary = match sort {
        ProductSort::Name => a.name.cmp(&b.name),
        ProductSort::PriceLow => a.price.cmp(&b.price),
        ProductSort::PriceHigh => b.price.cmp(&a.price),
        ProductSort::Rating => b.rating.total_cmp(&a.rating),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(
        &self,
        query: &ProductQuery,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        let products = self.products.read().await;
        let mut matched: Vec<&Product> = products.values().filter(|p| query.matches(p)).collect();
        matched.sort_by(|a, b| compare(query.sort, a, b));

        let total = matched.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let page = matched
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories: Vec<Category> =
            self.categories.read().await.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn count_products_in_category(&self, name: &str) -> Result<u64, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().filter(|p| p.category == name).count() as u64)
    }

    async fn insert_product_if_absent(&self, product: &Product) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Ok(false);
        }
        products.insert(product.id.clone(), product.clone());
        Ok(true)
    }

    async fn insert_category_if_absent(
        &self,
        category: &Category,
    ) -> Result<bool, RepositoryError> {
        let mut categories = self.categories.write().await;
        if categories.contains_key(&category.id) {
            return Ok(false);
        }
        categories.insert(category.id.clone(), category.clone());
        Ok(true)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_or_create_cart(&self, owner: &UserId) -> Result<Cart, RepositoryError> {
        let mut carts = self.carts.write().await;
        if let Some(cart) = carts
            .by_owner
            .get(owner)
            .and_then(|id| carts.by_id.get(id))
        {
            return Ok(cart.clone());
        }

        let cart = Cart::new(owner.clone());
        carts.by_owner.insert(owner.clone(), cart.id.clone());
        carts.by_id.insert(cart.id.clone(), cart.clone());
        Ok(cart)
    }

    async fn replace_cart_items(
        &self,
        id: &CartId,
        expected_version: i64,
        items: &[CartItem],
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut carts = self.carts.write().await;
        match carts.by_id.get_mut(id) {
            Some(cart) if cart.version == expected_version => {
                cart.items = items.to_vec();
                cart.version += 1;
                cart.updated_at = updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_cart(
        &self,
        owner: &UserId,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        let existing = carts.by_owner.get(owner).cloned();
        match existing.and_then(|id| carts.by_id.get_mut(&id)) {
            Some(cart) => {
                cart.items.clear();
                cart.version += 1;
                cart.updated_at = updated_at;
            }
            None => {
                let cart = Cart::new(owner.clone());
                carts.by_owner.insert(owner.clone(), cart.id.clone());
                carts.by_id.insert(cart.id.clone(), cart);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.iter().any(|o| o.id == order.id || o.code == order.code) {
            return Err(RepositoryError::Conflict("order already exists".to_owned()));
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = status;
        order.payment_status = payment_status;
        order.updated_at = updated_at;
        Ok(())
    }

    async fn list_orders(&self, owner: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        // Insertion order breaks ties between equal timestamps.
        let mut owned: Vec<Order> = orders
            .iter()
            .rev()
            .filter(|o| &o.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn get_order(
        &self,
        owner: &UserId,
        id: &OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .find(|o| &o.id == id && &o.owner == owner)
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        if users.by_email.contains_key(&user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        users.by_email.insert(user.email.clone(), user.id.clone());
        users.by_id.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.by_id.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }
}

#[async_trait]
impl TestimonialStore for MemoryStore {
    async fn list_active_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError> {
        let testimonials = self.testimonials.read().await;
        let mut active: Vec<Testimonial> = testimonials
            .iter()
            .rev()
            .filter(|t| t.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn insert_testimonial_if_absent(
        &self,
        testimonial: &Testimonial,
    ) -> Result<bool, RepositoryError> {
        let mut testimonials = self.testimonials.write().await;
        if testimonials.iter().any(|t| t.id == testimonial.id) {
            return Ok(false);
        }
        testimonials.push(testimonial.clone());
        Ok(true)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
