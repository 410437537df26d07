//! Catalog queries: shops, categories and product listings.

use std::collections::HashMap;

use sqlx::PgPool;

use procura_core::{ProductInfoId, ShopId, UserId};

use super::RepositoryError;
use crate::models::{Category, ProductInfoFilter, ProductInfoView, ProductParameterView, Shop};

/// Repository for catalog reads and partner shop updates.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all shops by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_shops(&self) -> Result<Vec<Shop>, RepositoryError> {
        let shops = sqlx::query_as::<_, Shop>(
            "SELECT id, name, url, state FROM shop ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(shops)
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM category ORDER BY name, id")
                .fetch_all(self.pool)
                .await?;
        Ok(categories)
    }

    /// List product infos of shops that accept orders, with their parameters.
    ///
    /// Filters are conjunctive; an unset filter matches everything.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_product_infos(
        &self,
        filter: ProductInfoFilter,
    ) -> Result<Vec<ProductInfoView>, RepositoryError> {
        let mut infos = sqlx::query_as::<_, ProductInfoView>(
            r"
            SELECT pi.id, pi.model, pi.external_id, pi.product_id,
                   p.name AS product_name, p.category_id, c.name AS category_name,
                   pi.shop_id, s.name AS shop_name,
                   pi.quantity, pi.price, pi.price_rrc
            FROM product_info pi
            JOIN product p ON p.id = pi.product_id
            JOIN category c ON c.id = p.category_id
            JOIN shop s ON s.id = pi.shop_id
            WHERE s.state
              AND ($1::int IS NULL OR pi.shop_id = $1)
              AND ($2::int IS NULL OR p.category_id = $2)
            ORDER BY pi.id
            ",
        )
        .bind(filter.shop_id)
        .bind(filter.category_id)
        .fetch_all(self.pool)
        .await?;

        if infos.is_empty() {
            return Ok(infos);
        }

        let ids: Vec<ProductInfoId> = infos.iter().map(|info| info.id).collect();
        let parameters = sqlx::query_as::<_, ProductParameterView>(
            r"
            SELECT pp.product_info_id, pa.name AS parameter, pp.value
            FROM product_parameter pp
            JOIN parameter pa ON pa.id = pp.parameter_id
            WHERE pp.product_info_id = ANY($1)
            ORDER BY pa.name
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_info: HashMap<ProductInfoId, Vec<ProductParameterView>> = HashMap::new();
        for parameter in parameters {
            by_info
                .entry(parameter.product_info_id)
                .or_default()
                .push(parameter);
        }
        for info in &mut infos {
            info.parameters = by_info.remove(&info.id).unwrap_or_default();
        }

        Ok(infos)
    }

    /// Get the shop owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn shop_for_user(&self, user_id: UserId) -> Result<Option<Shop>, RepositoryError> {
        let shop = sqlx::query_as::<_, Shop>(
            "SELECT id, name, url, state FROM shop WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(shop)
    }

    /// Set whether a shop accepts orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_shop_state(&self, id: ShopId, state: bool) -> Result<Shop, RepositoryError> {
        sqlx::query_as::<_, Shop>(
            "UPDATE shop SET state = $2 WHERE id = $1 RETURNING id, name, url, state",
        )
        .bind(id)
        .bind(state)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Create a shop, optionally owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already owns a shop.
    /// Returns `RepositoryError::Database` for other failures.
    pub async fn create_shop(
        &self,
        name: &str,
        url: Option<&str>,
        owner: Option<UserId>,
    ) -> Result<Shop, RepositoryError> {
        sqlx::query_as::<_, Shop>(
            r"
            INSERT INTO shop (name, url, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, url, state
            ",
        )
        .bind(name)
        .bind(url)
        .bind(owner)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "shop for this user"))
    }
}
