//! Catalog read models: shops, categories and shop listings.

use rust_decimal::Decimal;
use serde::Serialize;

use procura_core::{CategoryId, ProductId, ProductInfoId, ShopId};

/// A shop (supplier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    pub url: Option<String>,
    /// Whether the shop currently accepts orders.
    pub state: bool,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Conjunctive filters for [`ProductInfoView`] listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductInfoFilter {
    pub shop_id: Option<ShopId>,
    pub category_id: Option<CategoryId>,
}

/// One named parameter of a product info (e.g. "Color: black").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductParameterView {
    #[serde(skip)]
    pub product_info_id: ProductInfoId,
    pub parameter: String,
    pub value: String,
}

/// A product as offered by one shop, with product and category names joined in.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductInfoView {
    pub id: ProductInfoId,
    pub model: String,
    pub external_id: i32,
    pub product_id: ProductId,
    pub product_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub shop_id: ShopId,
    pub shop_name: String,
    /// Units available.
    pub quantity: i32,
    pub price: Decimal,
    pub price_rrc: Decimal,
    #[sqlx(skip)]
    pub parameters: Vec<ProductParameterView>,
}
