//! Catalog reads and partner shop state.
//!
//! Shop and category lists change rarely and are served from a `moka` cache
//! (TTL from `PROCURA_CATALOG_CACHE_TTL_SECS`). Product listings are always
//! read through, since price and availability matter at order time.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use super::ServiceError;
use crate::db::CatalogRepository;
use crate::models::{Category, ProductInfoFilter, ProductInfoView, Shop, User};

/// Cache key for catalog lists.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Shops,
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Shops(Arc<Vec<Shop>>),
    Categories(Arc<Vec<Category>>),
}

/// Shared cache of shop and category lists.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogCache {
    /// Create an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();
        Self { cache }
    }

    /// Drop the cached shop list.
    pub async fn invalidate_shops(&self) {
        self.cache.invalidate(&CacheKey::Shops).await;
    }
}

/// Catalog operations.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
    cache: &'a CatalogCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self { pool, cache }
    }

    /// All shops.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_shops(&self) -> Result<Arc<Vec<Shop>>, ServiceError> {
        if let Some(CacheValue::Shops(shops)) = self.cache.cache.get(&CacheKey::Shops).await {
            debug!("Cache hit for shops");
            return Ok(shops);
        }

        let shops = Arc::new(CatalogRepository::new(self.pool).list_shops().await?);
        self.cache
            .cache
            .insert(CacheKey::Shops, CacheValue::Shops(Arc::clone(&shops)))
            .await;
        Ok(shops)
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_categories(&self) -> Result<Arc<Vec<Category>>, ServiceError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(CatalogRepository::new(self.pool).list_categories().await?);
        self.cache
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Product infos of shops accepting orders, filtered conjunctively.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn list_product_infos(
        &self,
        filter: ProductInfoFilter,
    ) -> Result<Vec<ProductInfoView>, ServiceError> {
        Ok(CatalogRepository::new(self.pool)
            .list_product_infos(filter)
            .await?)
    }

    /// The caller's shop.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Forbidden` if the caller is not a shop partner
    /// - `ServiceError::NotFound` if the partner has no shop
    pub async fn partner_shop(&self, user: &User) -> Result<Shop, ServiceError> {
        if !user.is_shop() {
            return Err(ServiceError::Forbidden("only shops have a partner state".to_owned()));
        }
        CatalogRepository::new(self.pool)
            .shop_for_user(user.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("shop".to_owned()))
    }

    /// Set whether the caller's shop accepts orders.
    ///
    /// # Errors
    ///
    /// Same as [`Self::partner_shop`].
    pub async fn set_partner_state(&self, user: &User, state: bool) -> Result<Shop, ServiceError> {
        let shop = self.partner_shop(user).await?;
        let shop = CatalogRepository::new(self.pool)
            .set_shop_state(shop.id, state)
            .await?;
        self.cache.invalidate_shops().await;

        tracing::info!(shop_id = %shop.id, state, "Partner state changed");
        Ok(shop)
    }
}
