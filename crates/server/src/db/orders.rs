//! Database operations for baskets, orders and order items.
//!
//! Mutations take a `&mut PgConnection` so the service layer can run several
//! of them in one transaction. Locking reads use `SELECT ... FOR UPDATE` on the
//! order row; every basket mutation and every state change takes that lock
//! first, so a checkout and a concurrent item change serialize.

use sqlx::{PgConnection, PgPool};

use procura_core::{
    ContactId, OrderId, OrderItemId, OrderState, ProductInfoId, Quantity, ShopId, UserId,
};

use super::RepositoryError;
use crate::models::{Order, OrderItemView, OrderSummary};

const ORDER_COLUMNS: &str = "id, user_id, state, contact_id, created_at, updated_at";

// =============================================================================
// Locking and existence checks
// =============================================================================

/// Create a basket for the user unless one already exists.
///
/// Relies on the partial unique index `orders_one_basket_per_user`, so two
/// concurrent first-adds converge on one row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_basket_if_absent(
    conn: &mut PgConnection,
    user_id: UserId,
    contact_id: ContactId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO orders (user_id, contact_id, state)
        VALUES ($1, $2, 'basket')
        ON CONFLICT (user_id) WHERE state = 'basket' DO NOTHING
        ",
    )
    .bind(user_id)
    .bind(contact_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lock and return the user's basket, if any.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_basket(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND state = 'basket' FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Lock and return one of the user's orders, in any state.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_order(
    conn: &mut PgConnection,
    order_id: OrderId,
    user_id: UserId,
) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE"
    ))
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Whether the contact exists and belongs to the user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn contact_owned_by(
    conn: &mut PgConnection,
    contact_id: ContactId,
    user_id: UserId,
) -> Result<bool, RepositoryError> {
    let owned = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM contact WHERE id = $1 AND user_id = $2)",
    )
    .bind(contact_id)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(owned)
}

/// Look up whether a product info's shop accepts orders.
///
/// Returns `None` if the product info does not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn product_info_orderable(
    conn: &mut PgConnection,
    product_info_id: ProductInfoId,
) -> Result<Option<bool>, RepositoryError> {
    let state = sqlx::query_scalar::<_, bool>(
        r"
        SELECT s.state
        FROM product_info pi
        JOIN shop s ON s.id = pi.shop_id
        WHERE pi.id = $1
        ",
    )
    .bind(product_info_id)
    .fetch_optional(conn)
    .await?;
    Ok(state)
}

// =============================================================================
// Item mutations
// =============================================================================

/// Insert an item into an order.
///
/// Returns `None` when the order already has a line for this product info;
/// the existing quantity is left untouched.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    product_info_id: ProductInfoId,
    quantity: Quantity,
) -> Result<Option<OrderItemId>, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderItemId>(
        r"
        INSERT INTO order_item (order_id, product_info_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT ON CONSTRAINT unique_order_item DO NOTHING
        RETURNING id
        ",
    )
    .bind(order_id)
    .bind(product_info_id)
    .bind(quantity)
    .fetch_optional(conn)
    .await?;
    Ok(id)
}

/// Set the quantity of one item in an order. Returns whether the item exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn update_item_quantity(
    conn: &mut PgConnection,
    order_id: OrderId,
    item_id: OrderItemId,
    quantity: Quantity,
) -> Result<bool, RepositoryError> {
    let result =
        sqlx::query("UPDATE order_item SET quantity = $3 WHERE id = $2 AND order_id = $1")
            .bind(order_id)
            .bind(item_id)
            .bind(quantity)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() == 1)
}

/// Delete the listed items of an order. Returns the number deleted.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    ids: &[OrderItemId],
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM order_item WHERE order_id = $1 AND id = ANY($2)")
        .bind(order_id)
        .bind(ids)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Count the items of an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_items(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<i64, RepositoryError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_item WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Delete an order and, by cascade, its items.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_order(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Write a new state, optionally rebinding the contact, and bump `updated_at`.
///
/// The caller must hold the row lock and have checked the current state.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order vanished.
/// Returns `RepositoryError::Database` if the query fails.
pub async fn set_state(
    conn: &mut PgConnection,
    order_id: OrderId,
    state: OrderState,
    contact_id: Option<ContactId>,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(&format!(
        r"
        UPDATE orders
        SET state = $2, contact_id = COALESCE($3, contact_id), updated_at = NOW()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order_id)
    .bind(state)
    .bind(contact_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

// =============================================================================
// Read side
// =============================================================================

/// Repository for order reads outside of a transaction.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's basket with items and total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn basket_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<OrderSummary>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND state = 'basket'"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };
        let items = self.load_items(&[order.id], None).await?;
        Ok(Some(OrderSummary::new(order, items)))
    }

    /// List the user's orders past the basket stage, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = $1 AND state <> 'basket'
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.summarize(orders, None).await
    }

    /// List orders past the basket stage that contain items sold by a shop.
    ///
    /// Items and totals are restricted to that shop's product infos.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_shop(
        &self,
        shop_id: ShopId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT o.id, o.user_id, o.state, o.contact_id, o.created_at, o.updated_at
            FROM orders o
            WHERE o.state <> 'basket'
              AND EXISTS (
                  SELECT 1
                  FROM order_item oi
                  JOIN product_info pi ON pi.id = oi.product_info_id
                  WHERE oi.order_id = o.id AND pi.shop_id = $1
              )
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;

        self.summarize(orders, Some(shop_id)).await
    }

    async fn summarize(
        &self,
        orders: Vec<Order>,
        shop_id: Option<ShopId>,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<OrderId> = orders.iter().map(|order| order.id).collect();
        let items = self.load_items(&ids, shop_id).await?;
        Ok(OrderSummary::group(orders, items))
    }

    async fn load_items(
        &self,
        order_ids: &[OrderId],
        shop_id: Option<ShopId>,
    ) -> Result<Vec<OrderItemView>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItemView>(
            r"
            SELECT oi.id, oi.order_id, oi.product_info_id,
                   p.name AS product_name, pi.model,
                   pi.shop_id, s.name AS shop_name,
                   oi.quantity, pi.price
            FROM order_item oi
            JOIN product_info pi ON pi.id = oi.product_info_id
            JOIN product p ON p.id = pi.product_id
            JOIN shop s ON s.id = pi.shop_id
            WHERE oi.order_id = ANY($1)
              AND ($2::int IS NULL OR pi.shop_id = $2)
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(order_ids)
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }
}
