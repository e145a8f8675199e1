//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use serde::Deserialize;

use bazaar_core::ProductId;

use crate::error::{AppError, Result};
use crate::models::product::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::models::{CategoryWithCount, Product, ProductPage, ProductQuery, ProductSort};
use crate::state::AppState;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TryFrom<ListParams> for ProductQuery {
    type Error = AppError;

    fn try_from(params: ListParams) -> Result<Self> {
        let page = params.page.unwrap_or(1);
        let page = u32::try_from(page)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| AppError::BadRequest("page must be at least 1".to_owned()))?;

        let limit = params.limit.unwrap_or(i64::from(DEFAULT_PAGE_SIZE));
        let limit = u32::try_from(limit)
            .ok()
            .filter(|l| (1..=MAX_PAGE_SIZE).contains(l))
            .ok_or_else(|| {
                AppError::BadRequest(format!("limit must be between 1 and {MAX_PAGE_SIZE}"))
            })?;

        Ok(Self {
            category: non_blank(params.category),
            search: non_blank(params.search),
            sort: params
                .sort
                .as_deref()
                .map_or(ProductSort::Name, ProductSort::from_param),
            page,
            limit,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Product listing.
pub async fn index(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ProductPage>> {
    let Query(params) = params?;
    let query = ProductQuery::try_from(params)?;
    Ok(Json(state.catalog().list_products(&query).await?))
}

/// Product detail.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let product = state.catalog().get_product(&ProductId::new(id)).await?;
    Ok(Json(product))
}

/// Categories with their live product counts.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryWithCount>>> {
    Ok(Json(state.catalog().list_categories().await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let query = ProductQuery::try_from(ListParams::default()).unwrap();
        assert_eq!(query, ProductQuery::default());
    }

    #[test]
    fn test_page_and_limit_bounds() {
        for (page, limit) in [(0, 10), (-1, 10), (1, 0), (1, 101)] {
            let params = ListParams {
                page: Some(page),
                limit: Some(limit),
                ..ListParams::default()
            };
            assert!(
                matches!(ProductQuery::try_from(params), Err(AppError::BadRequest(_))),
                "page={page} limit={limit} accepted"
            );
        }

        let params = ListParams {
            page: Some(2),
            limit: Some(100),
            ..ListParams::default()
        };
        let query = ProductQuery::try_from(params).unwrap();
        assert_eq!((query.page, query.limit), (2, 100));
    }

    #[test]
    fn test_blank_filters_are_ignored_and_sort_is_parsed() {
        let params = ListParams {
            category: Some(String::new()),
            search: Some("  ".to_owned()),
            sort: Some("price-high".to_owned()),
            ..ListParams::default()
        };
        let query = ProductQuery::try_from(params).unwrap();
        assert_eq!(query.category, None);
        assert_eq!(query.search, None);
        assert_eq!(query.sort, ProductSort::PriceHigh);
    }
}
