//! Order state machine: checkout, confirmation and fulfillment transitions.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use sqlx::PgPool;

use procura_core::{ContactId, OrderId, OrderState, Transition, UserType};
use procura_integration_tests::{
    TestUser, create_contact, create_user, seed_catalog, test_state,
};
use procura_server::services::orders::Confirmation;
use procura_server::services::{BasketService, OrderService, ServiceError};

async fn current_state(pool: &PgPool, order_id: OrderId) -> OrderState {
    sqlx::query_scalar("SELECT state FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn filled_basket(pool: &PgPool, buyer: &TestUser, contact: ContactId) -> OrderId {
    let catalog = seed_catalog(pool, None).await;
    BasketService::new(pool)
        .add_items(
            buyer.user.id,
            contact,
            &[json!({"product_info": catalog.listings[0].as_i32(), "quantity": 2})],
        )
        .await
        .unwrap()
        .order_id
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_empty_basket_fails(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let basket = BasketService::new(&pool)
        .get_or_create_basket(buyer.user.id, contact)
        .await
        .unwrap();

    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens());
    let err = orders
        .checkout(&buyer.user, basket.id, contact)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Validation(ref f) if f.field == "id"));
    assert_eq!(current_state(&pool, basket.id).await, OrderState::Basket);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_full_lifecycle_emits_events(pool: PgPool) {
    let (state, mut events) = test_state(pool.clone());
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let order_id = filled_basket(&pool, &buyer, contact).await;
    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens());

    let order = orders
        .checkout(&buyer.user, order_id, contact)
        .await
        .unwrap();
    assert_eq!(order.state, OrderState::New);

    let checkout_event = events.recv().await.unwrap();
    assert_eq!(checkout_event.transition, Transition::Checkout);
    let token = checkout_event.confirmation_token.unwrap();

    let confirmation = Confirmation {
        email: buyer.user.email.clone(),
        token,
        order_id,
        contact_id: contact,
    };
    let order = orders.confirm(&buyer.user, &confirmation).await.unwrap();
    assert_eq!(order.state, OrderState::Confirmed);
    assert_eq!(events.recv().await.unwrap().transition, Transition::Confirm);

    for (from, to, transition) in [
        (OrderState::Confirmed, OrderState::Assembled, Transition::Assemble),
        (OrderState::Assembled, OrderState::Sent, Transition::Ship),
        (OrderState::Sent, OrderState::Delivered, Transition::Deliver),
    ] {
        let order = orders
            .transition(order_id, buyer.user.id, from, to)
            .await
            .unwrap();
        assert_eq!(order.state, to);

        let event = events.recv().await.unwrap();
        assert_eq!(event.transition, transition);
        assert_eq!(event.state, to);
        assert_eq!(event.order_id, order_id);
    }

    let listed = orders.list_orders(buyer.user.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].order.state, OrderState::Delivered);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_stale_expected_state_does_not_mutate(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let order_id = filled_basket(&pool, &buyer, contact).await;
    sqlx::query("UPDATE orders SET state = 'sent' WHERE id = $1")
        .bind(order_id)
        .execute(&pool)
        .await
        .unwrap();

    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens());
    let err = orders
        .transition(
            order_id,
            buyer.user.id,
            OrderState::Confirmed,
            OrderState::Assembled,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::StateConflict {
            current: OrderState::Sent,
            ..
        }
    ));
    assert_eq!(current_state(&pool, order_id).await, OrderState::Sent);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_repeated_transition_conflicts(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let order_id = filled_basket(&pool, &buyer, contact).await;
    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens());

    orders
        .checkout(&buyer.user, order_id, contact)
        .await
        .unwrap();
    orders
        .transition(order_id, buyer.user.id, OrderState::New, OrderState::Canceled)
        .await
        .unwrap();

    let err = orders
        .transition(order_id, buyer.user.id, OrderState::New, OrderState::Canceled)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::StateConflict {
            expected: OrderState::New,
            current: OrderState::Canceled,
            ..
        }
    ));

    let err = orders
        .checkout(&buyer.user, order_id, contact)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::StateConflict { .. }));
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_cancels_have_one_winner(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens());

    for round in 0..5 {
        let email = format!("buyer{round}@example.com");
        let buyer = create_user(&pool, &email, UserType::Buyer).await;
        let contact = create_contact(&pool, &buyer.user, &format!("+7900123456{round}")).await;
        let order_id = filled_basket(&pool, &buyer, contact).await;
        orders
            .checkout(&buyer.user, order_id, contact)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            orders.transition(order_id, buyer.user.id, OrderState::New, OrderState::Canceled),
            orders.transition(order_id, buyer.user.id, OrderState::New, OrderState::Canceled),
        );

        let results = [a, b];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(ServiceError::StateConflict {
                        expected: OrderState::New,
                        current: OrderState::Canceled,
                        ..
                    })
                )
            })
            .count();
        assert_eq!((winners, conflicts), (1, 1), "round {round}");
        assert_eq!(current_state(&pool, order_id).await, OrderState::Canceled);
    }
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_racing_add_keeps_one_basket(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens());
    let catalog = seed_catalog(&pool, None).await;
    let baskets = BasketService::new(&pool);

    for round in 0..5 {
        let email = format!("buyer{round}@example.com");
        let buyer = create_user(&pool, &email, UserType::Buyer).await;
        let contact = create_contact(&pool, &buyer.user, &format!("+7900123456{round}")).await;
        let order_id = baskets
            .add_items(
                buyer.user.id,
                contact,
                &[json!({"product_info": catalog.listings[0].as_i32(), "quantity": 1})],
            )
            .await
            .unwrap()
            .order_id;

        let extra = [json!({"product_info": catalog.listings[1].as_i32(), "quantity": 3})];
        let (checkout, _added) = tokio::join!(
            orders.checkout(&buyer.user, order_id, contact),
            baskets.add_items(buyer.user.id, contact, &extra),
        );

        assert_eq!(checkout.unwrap().state, OrderState::New, "round {round}");
        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND state = 'basket'",
        )
        .bind(buyer.user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(open <= 1, "round {round}: {open} baskets");
    }
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_confirm_rejects_bad_token(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let order_id = filled_basket(&pool, &buyer, contact).await;
    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens());
    orders
        .checkout(&buyer.user, order_id, contact)
        .await
        .unwrap();

    let confirmation = Confirmation {
        email: buyer.user.email.clone(),
        token: "00".repeat(32),
        order_id,
        contact_id: contact,
    };
    let err = orders.confirm(&buyer.user, &confirmation).await.unwrap_err();

    assert!(matches!(err, ServiceError::Validation(ref f) if f.field == "token"));
    assert_eq!(current_state(&pool, order_id).await, OrderState::New);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_other_users_order_not_found(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let intruder = create_user(&pool, "intruder@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let order_id = filled_basket(&pool, &buyer, contact).await;
    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens());

    let err = orders
        .transition(order_id, intruder.user.id, OrderState::New, OrderState::Canceled)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_partner_sees_only_own_items(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let partner = create_user(&pool, "partner@example.com", UserType::Shop).await;
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let own = seed_catalog(&pool, Some(&partner.user)).await;
    let foreign = seed_catalog(&pool, None).await;

    let order_id = BasketService::new(&pool)
        .add_items(
            buyer.user.id,
            contact,
            &[
                json!({"product_info": own.listings[0].as_i32(), "quantity": 1}),
                json!({"product_info": foreign.listings[1].as_i32(), "quantity": 3}),
            ],
        )
        .await
        .unwrap()
        .order_id;
    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens());
    orders
        .checkout(&buyer.user, order_id, contact)
        .await
        .unwrap();

    let seen = orders.partner_orders(&partner.user).await.unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].items.len(), 1);
    assert_eq!(seen[0].items[0].shop_id, own.shop);

    let err = orders.partner_orders(&buyer.user).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}
