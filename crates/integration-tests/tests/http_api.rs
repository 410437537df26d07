//! HTTP routes through the real router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use procura_core::UserType;
use procura_integration_tests::{
    create_contact, create_user, empty_request, json_request, seed_catalog, send, test_state,
};
use procura_server::app;

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_health_endpoints(pool: PgPool) {
    let (state, _events) = test_state(pool);
    let router = app(state);

    let (status, headers, body) = send(router.clone(), empty_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    assert!(headers.contains_key("x-request-id"));

    let (status, _, _) = send(router, empty_request("GET", "/health/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_basket_requires_token(pool: PgPool) {
    let (state, _events) = test_state(pool);
    let router = app(state);

    let (status, _, body) =
        send(router.clone(), empty_request("GET", "/api/v1/basket", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], false);

    let (status, _, _) = send(
        router,
        empty_request("GET", "/api/v1/basket", Some("Token not-a-real-key")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_basket_round_trip(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let router = app(state);
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let catalog = seed_catalog(&pool, None).await;
    let auth = buyer.auth();

    let (status, _, body) = send(
        router.clone(),
        empty_request("GET", "/api/v1/basket", Some(&auth)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["basket"], serde_json::Value::Null);

    let (status, _, body) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/v1/basket",
            Some(&auth),
            &json!({
                "contact_id": contact.as_i32(),
                "items": [
                    {"product_info": catalog.listings[0].as_i32(), "quantity": 2},
                    {"product_info": catalog.listings[1].as_i32(), "quantity": "1"},
                ],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], true);
    assert_eq!(body["created"], 2);

    let (status, _, body) = send(
        router.clone(),
        empty_request("GET", "/api/v1/basket", Some(&auth)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["basket"]["state"], "basket");
    assert_eq!(body["basket"]["total_sum"], "25.00");
    let items = body["basket"]["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 2);

    let first = items[0]["id"].as_i64().unwrap();
    let (status, headers, body) = send(
        router.clone(),
        empty_request(
            "DELETE",
            &format!("/api/v1/basket?ids={first}"),
            Some(&auth),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers["x-removed-count"], "1");
    assert_eq!(body, serde_json::Value::Null);

    let second = items[1]["id"].as_i64().unwrap();
    let (status, headers, _) = send(
        router.clone(),
        json_request(
            "DELETE",
            "/api/v1/basket",
            Some(&auth),
            &json!({"ids": [second]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers["x-removed-count"], "1");

    let (_, _, body) = send(router, empty_request("GET", "/api/v1/basket", Some(&auth))).await;
    assert_eq!(body["basket"], serde_json::Value::Null);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_invalid_quantity_reports_index(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let router = app(state);
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let catalog = seed_catalog(&pool, None).await;

    let (status, _, body) = send(
        router,
        json_request(
            "POST",
            "/api/v1/basket",
            Some(&buyer.auth()),
            &json!({
                "contact_id": contact.as_i32(),
                "items": [
                    {"product_info": catalog.listings[0].as_i32(), "quantity": 1},
                    {"product_info": catalog.listings[1].as_i32(), "quantity": "abc"},
                ],
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["index"], 1);
    assert_eq!(body["errors"]["field"], "quantity");
    assert_eq!(body["errors"]["value"], "abc");
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_and_stale_transition(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let router = app(state);
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    let catalog = seed_catalog(&pool, None).await;
    let auth = buyer.auth();

    let (_, _, body) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/v1/basket",
            Some(&auth),
            &json!({
                "contact_id": contact.as_i32(),
                "items": [{"product_info": catalog.listings[0].as_i32(), "quantity": 1}],
            }),
        ),
    )
    .await;
    let order_id = body["order_id"].as_i64().unwrap();

    let (status, _, body) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/v1/order",
            Some(&auth),
            &json!({"id": order_id.to_string(), "contact": contact.as_i32()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["state"], "new");

    let (status, _, body) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/v1/order/assemble",
            Some(&auth),
            &json!({"order_id": order_id}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["current_state"], "new");
    assert_eq!(body["errors"]["expected_state"], "confirmed");

    let (status, _, body) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/v1/order/cancel",
            Some(&auth),
            &json!({"order_id": order_id}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["state"], "canceled");

    let (status, _, body) = send(router, empty_request("GET", "/api/v1/order", Some(&auth))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"][0]["state"], "canceled");
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_catalog_is_public_and_filtered(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let router = app(state);
    let open = seed_catalog(&pool, None).await;
    let closed = seed_catalog(&pool, None).await;
    sqlx::query("UPDATE shop SET state = FALSE WHERE id = $1")
        .bind(closed.shop)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO parameter (name) VALUES ('Color'), ('Memory')")
        .execute(&pool)
        .await
        .unwrap();
    for (listing, name, value) in [
        (open.listings[1], "Color", "black"),
        (open.listings[0], "Memory", "128 GB"),
        (open.listings[0], "Color", "white"),
    ] {
        sqlx::query(
            r"
            INSERT INTO product_parameter (product_info_id, parameter_id, value)
            SELECT $1, id, $3 FROM parameter WHERE name = $2
            ",
        )
        .bind(listing)
        .bind(name)
        .bind(value)
        .execute(&pool)
        .await
        .unwrap();
    }

    let (status, _, body) =
        send(router.clone(), empty_request("GET", "/api/v1/products", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["results"][0]["parameters"],
        json!([
            {"parameter": "Color", "value": "white"},
            {"parameter": "Memory", "value": "128 GB"},
        ])
    );
    assert_eq!(
        body["results"][1]["parameters"],
        json!([{"parameter": "Color", "value": "black"}])
    );
    let ids: Vec<i64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|listing| listing["id"].as_i64().unwrap())
        .collect();
    assert_eq!(
        ids,
        open.listings
            .iter()
            .map(|id| i64::from(id.as_i32()))
            .collect::<Vec<_>>()
    );

    let (_, _, body) = send(
        router.clone(),
        empty_request(
            "GET",
            &format!("/api/v1/products?shop_id={}", closed.shop),
            None,
        ),
    )
    .await;
    assert_eq!(body["results"].as_array().unwrap().len(), 0);

    let (status, _, body) = send(
        router.clone(),
        empty_request("GET", "/api/v1/products?category_id=abc", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["field"], "category_id");

    let (_, _, body) = send(router, empty_request("GET", "/api/v1/shops", None)).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_partner_state_toggle(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let router = app(state);
    let partner = create_user(&pool, "partner@example.com", UserType::Shop).await;
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    seed_catalog(&pool, Some(&partner.user)).await;

    let (status, _, body) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/v1/partner/state",
            Some(&partner.auth()),
            &json!({"state": "off"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shop"]["state"], false);

    let (_, _, body) = send(
        router.clone(),
        empty_request("GET", "/api/v1/partner/state", Some(&partner.auth())),
    )
    .await;
    assert_eq!(body["shop"]["state"], false);

    let (status, _, _) = send(
        router,
        empty_request("GET", "/api/v1/partner/state", Some(&buyer.auth())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_contact_in_use_cannot_be_deleted(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let router = app(state);
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let catalog = seed_catalog(&pool, None).await;
    let auth = buyer.auth();

    let (status, _, body) = send(
        router.clone(),
        json_request(
            "POST",
            "/api/v1/user/contact",
            Some(&auth),
            &json!({
                "city": "Moscow",
                "street": "Tverskaya",
                "house": "7",
                "phone": "+79001234567",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let contact_id = body["contact"]["id"].as_i64().unwrap();

    send(
        router.clone(),
        json_request(
            "POST",
            "/api/v1/basket",
            Some(&auth),
            &json!({
                "contact_id": contact_id,
                "items": [{"product_info": catalog.listings[0].as_i32(), "quantity": 1}],
            }),
        ),
    )
    .await;

    let (status, _, body) = send(
        router,
        empty_request(
            "DELETE",
            &format!("/api/v1/user/contact/{contact_id}"),
            Some(&auth),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["field"], "id");
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_contact_update(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let router = app(state);
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let other = create_user(&pool, "other@example.com", UserType::Buyer).await;
    let contact = create_contact(&pool, &buyer.user, "+79001234567").await;
    create_contact(&pool, &other.user, "+79007654321").await;
    let auth = buyer.auth();
    let uri = format!("/api/v1/user/contact/{contact}");

    let (status, _, body) = send(
        router.clone(),
        json_request("PATCH", &uri, Some(&auth), &json!({"street": "Arbat"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contact"]["street"], "Arbat");
    assert_eq!(body["contact"]["city"], "Moscow");
    assert_eq!(body["contact"]["house"], "7");

    // A full replace needs every required field.
    let (status, _, body) = send(
        router.clone(),
        json_request("PUT", &uri, Some(&auth), &json!({"street": "Arbat"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["field"], "city");

    let (status, _, body) = send(
        router.clone(),
        json_request(
            "PUT",
            &uri,
            Some(&auth),
            &json!({
                "city": "Kazan",
                "street": "Baumana",
                "house": "12",
                "phone": "+79001112233",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contact"]["city"], "Kazan");
    assert_eq!(body["contact"]["apartment"], "");

    let (status, _, body) = send(
        router.clone(),
        json_request("PATCH", &uri, Some(&auth), &json!({"phone": "+79007654321"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["field"], "phone");

    let (status, _, _) = send(
        router,
        json_request("PATCH", &uri, Some(&other.auth()), &json!({"street": "Arbat"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let stored: String = sqlx::query_scalar("SELECT city FROM contact WHERE id = $1")
        .bind(contact)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, "Kazan");
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_user_details(pool: PgPool) {
    let (state, _events) = test_state(pool.clone());
    let router = app(state);
    let buyer = create_user(&pool, "buyer@example.com", UserType::Buyer).await;
    let auth = buyer.auth();

    let (status, _, _) =
        send(router.clone(), empty_request("GET", "/api/v1/user/details", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(
        router.clone(),
        empty_request("GET", "/api/v1/user/details", Some(&auth)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "buyer@example.com");
    assert_eq!(body["user"]["type"], "buyer");

    // Keys outside the profile fields are ignored.
    let (status, _, body) = send(
        router.clone(),
        json_request(
            "PUT",
            "/api/v1/user/details",
            Some(&auth),
            &json!({
                "first_name": "Ivan",
                "company": "Svyaznoy",
                "email": "someone@example.com",
                "type": "shop",
                "is_active": false,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["first_name"], "Ivan");
    assert_eq!(body["user"]["company"], "Svyaznoy");
    assert_eq!(body["user"]["email"], "buyer@example.com");
    assert_eq!(body["user"]["type"], "buyer");
    assert_eq!(body["user"]["is_active"], true);

    let (status, _, body) = send(
        router.clone(),
        json_request(
            "PATCH",
            "/api/v1/user/details",
            Some(&auth),
            &json!({"position": "Buyer"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["position"], "Buyer");
    assert_eq!(body["user"]["first_name"], "Ivan");

    let (status, _, body) = send(
        router,
        json_request(
            "PATCH",
            "/api/v1/user/details",
            Some(&auth),
            &json!({"company": "x".repeat(41)}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["field"], "company");
}
