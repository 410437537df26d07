//! Public catalog route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::Value;

use procura_core::{CategoryId, ShopId};

use super::success;
use crate::error::Result;
use crate::models::ProductInfoFilter;
use crate::services::{CatalogService, FieldError};
use crate::state::AppState;

/// `GET /products` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub shop_id: Option<String>,
    pub category_id: Option<String>,
}

impl ProductQuery {
    /// Parse the raw query values; empty values count as unset.
    fn filter(self) -> std::result::Result<ProductInfoFilter, FieldError> {
        Ok(ProductInfoFilter {
            shop_id: parse_optional::<ShopId>("shop_id", self.shop_id)?,
            category_id: parse_optional::<CategoryId>("category_id", self.category_id)?,
        })
    }
}

fn parse_optional<T: std::str::FromStr>(
    field: &str,
    raw: Option<String>,
) -> std::result::Result<Option<T>, FieldError> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| FieldError::new(field, raw, "must be a positive integer id")),
        _ => Ok(None),
    }
}

/// Product infos of shops that accept orders.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Value>> {
    let filter = query.filter()?;
    let products = CatalogService::new(state.pool(), state.catalog_cache())
        .list_product_infos(filter)
        .await?;
    Ok(success("results", products))
}

/// All shops.
pub async fn list_shops(State(state): State<AppState>) -> Result<Json<Value>> {
    let shops = CatalogService::new(state.pool(), state.catalog_cache())
        .list_shops()
        .await?;
    Ok(success("results", shops.as_slice()))
}

/// All categories.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Value>> {
    let categories = CatalogService::new(state.pool(), state.catalog_cache())
        .list_categories()
        .await?;
    Ok(success("results", categories.as_slice()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        let filter = ProductQuery {
            shop_id: Some("3".to_owned()),
            category_id: Some(String::new()),
        }
        .filter()
        .unwrap();
        assert_eq!(filter.shop_id, Some(ShopId::new(3)));
        assert_eq!(filter.category_id, None);

        assert_eq!(ProductQuery::default().filter().unwrap(), ProductInfoFilter::default());
    }

    #[test]
    fn test_bad_filter_rejected() {
        let err = ProductQuery {
            shop_id: None,
            category_id: Some("phones".to_owned()),
        }
        .filter()
        .unwrap_err();
        assert_eq!(err.field, "category_id");
        assert_eq!(err.value, "phones");
    }
}
