//! Order state machine.
//!
//! Each transition runs in one transaction: lock the order row, compare its
//! state with the caller's expectation, write the new state, commit. The
//! outbound [`OrderEvent`] is enqueued only after the commit succeeds.
//!
//! A missing order (or one owned by someone else) is `NotFound`; an order in
//! the wrong state is `StateConflict`. Repeating a transition that already
//! happened is therefore a `StateConflict`, not a silent success.

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use procura_core::{ContactId, Email, OrderEvent, OrderId, OrderState, Transition, UserId};

use super::{ConfirmationTokens, FieldError, NotificationQueue, ServiceError};
use crate::db::orders;
use crate::db::{CatalogRepository, OrderRepository};
use crate::models::{Order, OrderSummary, User};

/// Body of an order confirmation.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub email: Email,
    pub token: String,
    pub order_id: OrderId,
    pub contact_id: ContactId,
}

/// Order lifecycle operations.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    notifications: &'a NotificationQueue,
    tokens: &'a ConfirmationTokens,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        notifications: &'a NotificationQueue,
        tokens: &'a ConfirmationTokens,
    ) -> Self {
        Self {
            pool,
            notifications,
            tokens,
        }
    }

    /// Move an order from `expected` to `new_state`.
    ///
    /// Covers the fulfillment edges (assemble, send, deliver, cancel).
    /// Checkout and confirmation carry extra inputs and go through
    /// [`Self::checkout`] and [`Self::confirm`].
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` if `(expected, new_state)` is not an edge
    /// - `ServiceError::NotFound` if the user has no such order
    /// - `ServiceError::StateConflict` if the order is not in `expected`
    #[instrument(skip_all, fields(order_id = %order_id, user_id = %user_id, to = %new_state))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        user_id: UserId,
        expected: OrderState,
        new_state: OrderState,
    ) -> Result<Order, ServiceError> {
        let transition = expected
            .transition_to(new_state)
            .map_err(|e| FieldError::new("state", new_state.as_str(), e.to_string()))?;

        match transition {
            Transition::Checkout => {
                return Err(FieldError::new(
                    "state",
                    new_state.as_str(),
                    "checkout requires a contact",
                )
                .into());
            }
            Transition::Confirm => {
                return Err(FieldError::new(
                    "state",
                    new_state.as_str(),
                    "confirmation requires a token",
                )
                .into());
            }
            Transition::Assemble | Transition::Ship | Transition::Deliver | Transition::Cancel => {}
        }

        let mut tx = self.pool.begin().await?;
        let order = apply(&mut *tx, order_id, user_id, transition).await?;
        tx.commit().await?;

        self.publish(OrderEvent::new(order_id, user_id, transition));
        Ok(order)
    }

    /// Turn the user's basket into a `new` order bound to `contact_id`.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if the order or the contact is not the user's
    /// - `ServiceError::StateConflict` if the order is no longer a basket
    /// - `ServiceError::Validation` if the basket has no items
    #[instrument(skip_all, fields(order_id = %order_id, user_id = %user.id))]
    pub async fn checkout(
        &self,
        user: &User,
        order_id: OrderId,
        contact_id: ContactId,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;

        lock_in_state(&mut *tx, order_id, user.id, OrderState::Basket).await?;
        if !orders::contact_owned_by(&mut *tx, contact_id, user.id).await? {
            return Err(ServiceError::NotFound(format!("contact {contact_id}")));
        }
        if orders::count_items(&mut *tx, order_id).await? == 0 {
            return Err(FieldError::new("id", order_id.as_i32(), "basket is empty").into());
        }
        let order =
            orders::set_state(&mut *tx, order_id, OrderState::New, Some(contact_id)).await?;

        tx.commit().await?;

        let token = self.tokens.issue(order_id, user.id, &user.email);
        self.publish(
            OrderEvent::new(order_id, user.id, Transition::Checkout).with_confirmation_token(token),
        );
        Ok(order)
    }

    /// Confirm a `new` order with the token issued at checkout.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` if the email is not the caller's or the
    ///   token does not verify
    /// - `ServiceError::NotFound` if the order or the contact is not the user's
    /// - `ServiceError::StateConflict` if the order is not `new`
    #[instrument(skip_all, fields(order_id = %confirmation.order_id, user_id = %user.id))]
    pub async fn confirm(
        &self,
        user: &User,
        confirmation: &Confirmation,
    ) -> Result<Order, ServiceError> {
        let Confirmation {
            email,
            token,
            order_id,
            contact_id,
        } = confirmation;

        if email != &user.email {
            return Err(FieldError::new(
                "email",
                email.as_str(),
                "email does not match the account",
            )
            .into());
        }
        if !self.tokens.verify(*order_id, user.id, email, token) {
            return Err(FieldError::new(
                "token",
                token.as_str(),
                "invalid confirmation token",
            )
            .into());
        }

        let mut tx = self.pool.begin().await?;

        lock_in_state(&mut *tx, *order_id, user.id, OrderState::New).await?;
        if !orders::contact_owned_by(&mut *tx, *contact_id, user.id).await? {
            return Err(ServiceError::NotFound(format!("contact {contact_id}")));
        }
        let order =
            orders::set_state(&mut *tx, *order_id, OrderState::Confirmed, Some(*contact_id))
                .await?;

        tx.commit().await?;

        self.publish(OrderEvent::new(*order_id, user.id, Transition::Confirm));
        Ok(order)
    }

    /// The user's orders past the basket stage, with totals.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderSummary>, ServiceError> {
        Ok(OrderRepository::new(self.pool).list_for_user(user_id).await?)
    }

    /// Orders containing items of the caller's shop, restricted to those items.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Forbidden` if the caller is not a shop partner
    /// - `ServiceError::NotFound` if the partner has no shop
    pub async fn partner_orders(&self, user: &User) -> Result<Vec<OrderSummary>, ServiceError> {
        if !user.is_shop() {
            return Err(ServiceError::Forbidden("only shops can list partner orders".to_owned()));
        }
        let shop = CatalogRepository::new(self.pool)
            .shop_for_user(user.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("shop".to_owned()))?;

        Ok(OrderRepository::new(self.pool).list_for_shop(shop.id).await?)
    }

    fn publish(&self, event: OrderEvent) {
        tracing::info!(
            order_id = %event.order_id,
            state = %event.state,
            "Order transitioned"
        );
        self.notifications.enqueue(event);
    }
}

/// Lock the order and require it to be in `expected`.
async fn lock_in_state(
    conn: &mut PgConnection,
    order_id: OrderId,
    user_id: UserId,
    expected: OrderState,
) -> Result<Order, ServiceError> {
    let order = orders::lock_order(conn, order_id, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))?;

    if order.state != expected {
        return Err(ServiceError::StateConflict {
            order_id,
            expected,
            current: order.state,
        });
    }
    Ok(order)
}

/// Compare-and-set along one edge of the state machine.
async fn apply(
    conn: &mut PgConnection,
    order_id: OrderId,
    user_id: UserId,
    transition: Transition,
) -> Result<Order, ServiceError> {
    lock_in_state(conn, order_id, user_id, transition.from()).await?;
    Ok(orders::set_state(conn, order_id, transition.to(), None).await?)
}
