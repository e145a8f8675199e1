//! Catalog types: products, categories and listing queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{CategoryId, Price, ProductId};

/// Largest page size a listing may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A catalog product.
///
/// Read-only from the cart and order side; only seeding writes products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Price,
    #[serde(default)]
    pub original_price: Option<Price>,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    pub image: String,
    #[serde(default = "in_stock_default")]
    pub in_stock: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: i32,
    /// Billed monthly (hosting plans) rather than once.
    #[serde(default)]
    pub is_monthly: bool,
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(skip, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

const fn in_stock_default() -> bool {
    true
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    /// Icon name understood by the frontend (e.g. `Monitor`).
    pub icon: String,
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(skip, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// A category together with the live number of products filed under it.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub count: u64,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    /// Name, ascending.
    #[default]
    Name,
    /// Price, ascending.
    PriceLow,
    /// Price, descending.
    PriceHigh,
    /// Rating, descending.
    Rating,
}

impl ProductSort {
    /// Parse a client-supplied sort key. Unknown keys fall back to [`Self::Name`].
    #[must_use]
    pub fn from_param(value: &str) -> Self {
        match value {
            "price-low" => Self::PriceLow,
            "price-high" => Self::PriceHigh,
            "rating" => Self::Rating,
            _ => Self::Name,
        }
    }
}

/// A filtered, sorted and paginated product query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    /// Exact category name to filter on.
    pub category: Option<String>,
    /// Case-insensitive substring matched against name or description.
    pub search: Option<String>,
    pub sort: ProductSort,
    /// 1-based page number.
    pub page: u32,
    /// Page size, 1..=[`MAX_PAGE_SIZE`].
    pub limit: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            sort: ProductSort::Name,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductQuery {
    /// Number of matches skipped before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Whether a product satisfies the category and search filters.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && &product.category != category
        {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            return product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle);
        }
        true
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Number of products matching the filters, across all pages.
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

impl ProductPage {
    /// Assemble a page, computing `total_pages = ceil(total / limit)`.
    #[must_use]
    pub fn new(products: Vec<Product>, total: u64, query: &ProductQuery) -> Self {
        let limit = u64::from(query.limit.max(1));
        Self {
            products,
            total,
            page: query.page,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Build a product for tests with the given id, category and price in minor units.
    pub(crate) fn product(id: &str, category: &str, price_minor: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            category: category.to_owned(),
            price: Price::from_minor(price_minor),
            original_price: None,
            description: format!("Description of {id}"),
            features: vec![],
            image: format!("https://img.example.com/{id}.png"),
            in_stock: true,
            rating: 4.0,
            reviews: 0,
            is_monthly: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sort_param_fallback() {
        assert_eq!(ProductSort::from_param("price-high"), ProductSort::PriceHigh);
        assert_eq!(ProductSort::from_param("rating"), ProductSort::Rating);
        assert_eq!(ProductSort::from_param("newest"), ProductSort::Name);
    }

    #[test]
    fn test_offset() {
        let query = ProductQuery {
            page: 3,
            limit: 10,
            ..ProductQuery::default()
        };
        assert_eq!(query.offset(), 20);
        assert_eq!(ProductQuery::default().offset(), 0);
    }

    #[test]
    fn test_search_matches_name_or_description_case_insensitively() {
        let mut p = product("win-11", "Operating System", 7500);
        p.name = "Windows 11 Home".into();
        p.description = "Enhanced SECURITY features".into();

        let by_name = ProductQuery {
            search: Some("windows".into()),
            ..ProductQuery::default()
        };
        let by_description = ProductQuery {
            search: Some("security".into()),
            ..ProductQuery::default()
        };
        let miss = ProductQuery {
            search: Some("office".into()),
            ..ProductQuery::default()
        };
        assert!(by_name.matches(&p));
        assert!(by_description.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn test_category_filter_is_exact() {
        let p = product("vps", "VPS Hosting", 1200);
        let hit = ProductQuery {
            category: Some("VPS Hosting".into()),
            ..ProductQuery::default()
        };
        let miss = ProductQuery {
            category: Some("vps hosting".into()),
            ..ProductQuery::default()
        };
        assert!(hit.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let query = ProductQuery {
            limit: 10,
            ..ProductQuery::default()
        };
        assert_eq!(ProductPage::new(vec![], 21, &query).total_pages, 3);
        assert_eq!(ProductPage::new(vec![], 20, &query).total_pages, 2);
        assert_eq!(ProductPage::new(vec![], 0, &query).total_pages, 0);
    }

    #[test]
    fn test_product_wire_format() {
        let json = serde_json::to_value(product("p1", "Office Suite", 4200)).unwrap();
        assert_eq!(json["originalPrice"], serde_json::Value::Null);
        assert_eq!(json["inStock"], true);
        assert_eq!(json["isMonthly"], false);
        assert!(json.get("created_at").is_none());
    }
}
