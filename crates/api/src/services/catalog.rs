//! Catalog reads.

use tracing::instrument;

use bazaar_core::ProductId;

use super::CommerceError;
use crate::db::Store;
use crate::models::{CategoryWithCount, Product, ProductPage, ProductQuery};

/// Read-only access to products and categories.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// One page of products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    #[instrument(skip(self, query), fields(page = query.page, limit = query.limit))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, CommerceError> {
        let (products, total) = self.store.list_products(query).await?;
        Ok(ProductPage::new(products, total, query))
    }

    /// A single product by id.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if no product has this id.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, CommerceError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(CommerceError::NotFound("Product"))
    }

    /// Every category with a live count of the products filed under it.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryWithCount>, CommerceError> {
        let categories = self.store.list_categories().await?;
        let mut counted = Vec::with_capacity(categories.len());
        for category in categories {
            let count = self.store.count_products_in_category(&category.name).await?;
            counted.push(CategoryWithCount { category, count });
        }
        Ok(counted)
    }
}
