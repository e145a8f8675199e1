//! Products and categories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};

use bazaar_core::{CategoryId, Price, ProductId};

use super::PgStore;
use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Category, Product, ProductQuery, ProductSort};

const PRODUCT_COLUMNS: &str = "id, name, category, price, original_price, description, features, \
     image, in_stock, rating, reviews, is_monthly, created_at, updated_at";

#[derive(FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: String,
    price: Price,
    original_price: Option<Price>,
    description: String,
    features: Json<Vec<String>>,
    image: String,
    in_stock: bool,
    rating: f64,
    reviews: i32,
    is_monthly: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            category: row.category,
            price: row.price,
            original_price: row.original_price,
            description: row.description,
            features: row.features.0,
            image: row.image,
            in_stock: row.in_stock,
            rating: row.rating,
            reviews: row.reviews,
            is_monthly: row.is_monthly,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: String,
    name: String,
    description: String,
    icon: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            description: row.description,
            icon: row.icon,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a ProductQuery) {
    builder.push(" WHERE TRUE");
    if let Some(category) = &query.category {
        builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

// Text keys sort bytewise (`COLLATE "C"`) so results match `MemoryStore`
// whatever the database's default collation is.
const fn order_clause(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Name => r#" ORDER BY name COLLATE "C" ASC, id COLLATE "C" ASC"#,
        ProductSort::PriceLow => r#" ORDER BY price ASC, id COLLATE "C" ASC"#,
        ProductSort::PriceHigh => r#" ORDER BY price DESC, id COLLATE "C" ASC"#,
        ProductSort::Rating => r#" ORDER BY rating DESC, id COLLATE "C" ASC"#,
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(
        &self,
        query: &ProductQuery,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM bazaar.product");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM bazaar.product"));
        push_filters(&mut select, query);
        select
            .push(order_clause(query.sort))
            .push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok((
            rows.into_iter().map(Product::from).collect(),
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, icon, created_at, updated_at
            FROM bazaar.category
            ORDER BY name COLLATE "C"
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn count_products_in_category(&self, name: &str) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bazaar.product WHERE category = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn insert_product_if_absent(&self, product: &Product) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO bazaar.product
                (id, name, category, price, original_price, description, features,
                 image, in_stock, rating, reviews, is_monthly, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.original_price)
        .bind(&product.description)
        .bind(Json(&product.features))
        .bind(&product.image)
        .bind(product.in_stock)
        .bind(product.rating)
        .bind(product.reviews)
        .bind(product.is_monthly)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_category_if_absent(
        &self,
        category: &Category,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO bazaar.category (id, name, description, icon, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(category.id.as_str())
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.icon)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
