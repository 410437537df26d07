//! Basket operations.
//!
//! Every batch runs in one transaction that first locks the basket row.
//! Entries are processed in request order and the first bad entry aborts the
//! whole batch: the transaction is dropped without commit, so nothing from the
//! batch (including a freshly created basket) survives.

use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use procura_core::{ContactId, OrderId, OrderItemId, ProductInfoId, Quantity, UserId};

use super::{FieldError, ServiceError, id_from_json};
use crate::db::orders;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::{Order, OrderSummary};

/// Attempts at finding or creating a basket when a concurrent checkout keeps
/// moving the row out of `basket`.
const BASKET_ATTEMPTS: usize = 3;

/// One parsed entry of an add batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewItem {
    pub product_info: ProductInfoId,
    pub quantity: Quantity,
}

/// One parsed entry of an update batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemUpdate {
    pub id: OrderItemId,
    pub quantity: Quantity,
}

/// Result of an add batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    pub order_id: OrderId,
    pub created: usize,
}

/// Result of a remove batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed: u64,
    /// The last item went and the basket order was deleted with it.
    pub basket_deleted: bool,
}

/// Basket manager.
pub struct BasketService<'a> {
    pool: &'a PgPool,
}

impl<'a> BasketService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the user's basket, creating it bound to `contact_id` if absent.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the contact is not the user's.
    #[instrument(skip_all, fields(user_id = %user_id, contact_id = %contact_id))]
    pub async fn get_or_create_basket(
        &self,
        user_id: UserId,
        contact_id: ContactId,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let basket = ensure_basket(&mut *tx, user_id, contact_id).await?;
        tx.commit().await?;
        Ok(basket)
    }

    /// Add a batch of `{product_info, quantity}` entries to the basket.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for the first bad entry (with its
    /// index) and `ServiceError::NotFound` if the contact is not the user's.
    #[instrument(skip_all, fields(user_id = %user_id, count = items.len()))]
    pub async fn add_items(
        &self,
        user_id: UserId,
        contact_id: ContactId,
        items: &[Value],
    ) -> Result<AddOutcome, ServiceError> {
        if items.is_empty() {
            return Err(
                FieldError::new("items", Value::Array(Vec::new()), "no items supplied").into(),
            );
        }

        let mut tx = self.pool.begin().await?;
        let basket = ensure_basket(&mut *tx, user_id, contact_id).await?;

        for (index, raw) in items.iter().enumerate() {
            let item = parse_new_item(index, raw)?;
            let product_info = item.product_info.as_i32();

            match orders::product_info_orderable(&mut *tx, item.product_info).await? {
                None => {
                    return Err(FieldError::new(
                        "product_info",
                        product_info,
                        "product info does not exist",
                    )
                    .at(index)
                    .into());
                }
                Some(false) => {
                    return Err(FieldError::new(
                        "product_info",
                        product_info,
                        "shop is not accepting orders",
                    )
                    .at(index)
                    .into());
                }
                Some(true) => {}
            }

            let inserted =
                orders::insert_item(&mut *tx, basket.id, item.product_info, item.quantity).await?;
            if inserted.is_none() {
                return Err(FieldError::new(
                    "product_info",
                    product_info,
                    "product info is already in the basket",
                )
                .at(index)
                .into());
            }
        }

        tx.commit().await?;
        tracing::info!(order_id = %basket.id, "Basket items added");

        Ok(AddOutcome {
            order_id: basket.id,
            created: items.len(),
        })
    }

    /// Update quantities of existing basket items.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a malformed entry and
    /// `ServiceError::NotFound` if there is no basket or an item id is not in
    /// it.
    #[instrument(skip_all, fields(user_id = %user_id, count = items.len()))]
    pub async fn update_items(
        &self,
        user_id: UserId,
        items: &[Value],
    ) -> Result<usize, ServiceError> {
        if items.is_empty() {
            return Err(
                FieldError::new("items", Value::Array(Vec::new()), "no items supplied").into(),
            );
        }

        let mut tx = self.pool.begin().await?;
        let basket = orders::lock_basket(&mut *tx, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("basket".to_owned()))?;

        for (index, raw) in items.iter().enumerate() {
            let update = parse_item_update(index, raw)?;
            let updated =
                orders::update_item_quantity(&mut *tx, basket.id, update.id, update.quantity)
                    .await?;
            if !updated {
                return Err(ServiceError::NotFound(format!("basket item {}", update.id)));
            }
        }

        tx.commit().await?;
        Ok(items.len())
    }

    /// Remove basket items by id; deletes the basket when it ends up empty.
    ///
    /// `ids` is either a comma-separated string (`"1,2,3"`) or a JSON array.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `ids` is malformed or matches no
    /// item of the user's basket.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn remove_items(
        &self,
        user_id: UserId,
        ids: &Value,
    ) -> Result<RemoveOutcome, ServiceError> {
        let parsed = parse_ids(ids)?;
        let no_match = || FieldError::new("ids", ids.clone(), "no items matched");

        let mut tx = self.pool.begin().await?;
        let Some(basket) = orders::lock_basket(&mut *tx, user_id).await? else {
            return Err(no_match().into());
        };

        let removed = orders::delete_items(&mut *tx, basket.id, &parsed).await?;
        if removed == 0 {
            return Err(no_match().into());
        }

        let basket_deleted = orders::count_items(&mut *tx, basket.id).await? == 0;
        if basket_deleted {
            orders::delete_order(&mut *tx, basket.id).await?;
        }

        tx.commit().await?;
        tracing::info!(order_id = %basket.id, removed, basket_deleted, "Basket items removed");

        Ok(RemoveOutcome {
            removed,
            basket_deleted,
        })
    }

    /// The user's basket with items and total, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn get_basket(&self, user_id: UserId) -> Result<Option<OrderSummary>, ServiceError> {
        Ok(OrderRepository::new(self.pool).basket_for_user(user_id).await?)
    }
}

/// Lock the user's basket, creating it if absent.
async fn ensure_basket(
    conn: &mut PgConnection,
    user_id: UserId,
    contact_id: ContactId,
) -> Result<Order, ServiceError> {
    if !orders::contact_owned_by(conn, contact_id, user_id).await? {
        return Err(ServiceError::NotFound(format!("contact {contact_id}")));
    }

    for _ in 0..BASKET_ATTEMPTS {
        if let Some(basket) = orders::lock_basket(conn, user_id).await? {
            return Ok(basket);
        }
        orders::insert_basket_if_absent(conn, user_id, contact_id).await?;
    }

    Err(RepositoryError::Conflict(format!("basket for user {user_id} kept changing state")).into())
}

// =============================================================================
// Payload parsing
// =============================================================================

fn required<'v>(index: usize, entry: &'v Value, field: &str) -> Result<&'v Value, FieldError> {
    entry
        .get(field)
        .ok_or_else(|| FieldError::new(field, Value::Null, "field is required").at(index))
}

fn entry_object(index: usize, entry: &Value) -> Result<(), FieldError> {
    if entry.is_object() {
        Ok(())
    } else {
        Err(FieldError::new("items", entry.clone(), "item must be an object").at(index))
    }
}

fn quantity_at(index: usize, entry: &Value) -> Result<Quantity, FieldError> {
    let raw = required(index, entry, "quantity")?;
    Quantity::from_json(raw)
        .map_err(|e| FieldError::new("quantity", raw.clone(), e.to_string()).at(index))
}

/// Parse one `{product_info, quantity}` entry of an add batch.
///
/// # Errors
///
/// Returns a [`FieldError`] carrying `index` and the offending value.
pub fn parse_new_item(index: usize, entry: &Value) -> Result<NewItem, FieldError> {
    entry_object(index, entry)?;
    let raw = required(index, entry, "product_info")?;
    let product_info = id_from_json(raw).ok_or_else(|| {
        FieldError::new("product_info", raw.clone(), "must be a positive integer id").at(index)
    })?;
    let quantity = quantity_at(index, entry)?;
    Ok(NewItem {
        product_info,
        quantity,
    })
}

/// Parse one `{id, quantity}` entry of an update batch.
///
/// # Errors
///
/// Returns a [`FieldError`] carrying `index` and the offending value.
pub fn parse_item_update(index: usize, entry: &Value) -> Result<ItemUpdate, FieldError> {
    entry_object(index, entry)?;
    let raw = required(index, entry, "id")?;
    let id = id_from_json(raw).ok_or_else(|| {
        FieldError::new("id", raw.clone(), "must be a positive integer id").at(index)
    })?;
    let quantity = quantity_at(index, entry)?;
    Ok(ItemUpdate { id, quantity })
}

/// Parse item ids given as `"1,2,3"`, `[1, 2, 3]` or a single id.
///
/// # Errors
///
/// Returns a [`FieldError`] on field `ids` if any id is malformed or none is
/// given.
pub fn parse_ids(raw: &Value) -> Result<Vec<OrderItemId>, FieldError> {
    let invalid = || FieldError::new("ids", raw.clone(), "ids must be positive integers");

    let ids: Vec<OrderItemId> = match raw {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<OrderItemId>().map_err(|_| invalid()))
            .collect::<Result<_, _>>()?,
        Value::Array(values) => values
            .iter()
            .map(|value| id_from_json(value).ok_or_else(invalid))
            .collect::<Result<_, _>>()?,
        Value::Number(_) => vec![id_from_json(raw).ok_or_else(invalid)?],
        _ => return Err(invalid()),
    };

    if ids.is_empty() {
        return Err(FieldError::new("ids", raw.clone(), "no ids supplied"));
    }
    Ok(ids)
}
