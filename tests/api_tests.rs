//! HTTP surface tests driven through the router with `oneshot`

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::World;
use game_rental_server::routes::api_router;

fn app(world: &World) -> Router {
    api_router(world.app_state())
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_and_root() {
    let world = World::new(1).await;

    let (status, body) = send(app(&world), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let response = app(&world)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_then_login() {
    let world = World::new(1).await;
    let credentials = json!({
        "email": "New.Player@Example.com",
        "password": "correct-horse",
        "full_name": "New Player"
    });

    let (status, body) = send(
        app(&world),
        Method::POST,
        "/auth/register",
        None,
        Some(credentials),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "new.player@example.com");
    assert_eq!(body["data"]["role"], "customer");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = send(
        app(&world),
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "new.player@example.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = send(app(&world), Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["full_name"], "New Player");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let world = World::new(1).await;

    let (status, _) = send(app(&world), Method::GET, "/api/bookings/my", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        app(&world),
        Method::GET,
        "/api/users/me",
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_gates() {
    let world = World::new(1).await;
    let renter_token = world.token_for(&world.renter);
    let owner_token = world.token_for(&world.owner);
    let admin_token = world.token_for(&world.admin);

    let (status, _) = send(
        app(&world),
        Method::GET,
        "/api/admin/users",
        Some(&renter_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        app(&world),
        Method::GET,
        "/api/partner/items",
        Some(&renter_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        app(&world),
        Method::GET,
        "/api/partner/items",
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = send(
        app(&world),
        Method::GET,
        "/api/admin/users",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
}

#[tokio::test]
async fn test_public_catalog() {
    let world = World::new(1).await;

    let (status, body) = send(app(&world), Method::GET, "/api/items", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let uri = format!("/api/items/{}", world.item.id);
    let (status, body) = send(app(&world), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available_stock"], 1);

    let uri = format!("/api/items/{}", uuid::Uuid::new_v4());
    let (status, _) = send(app(&world), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_and_payment_over_http() {
    let world = World::new(1).await;
    let token = world.token_for(&world.renter);
    let request = json!({
        "item_id": world.item.id,
        "start_date": "2025-11-10",
        "end_date": "2025-11-12"
    });

    let (status, body) = send(
        app(&world),
        Method::POST,
        "/api/bookings",
        Some(&token),
        Some(request.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending_payment");
    assert_eq!(body["data"]["total_amount"], 35_000);
    let booking_id = body["data"]["id"].as_str().unwrap().to_string();

    // Last unit is gone.
    let (status, _) = send(
        app(&world),
        Method::POST,
        "/api/bookings",
        Some(&token),
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/bookings/{}/payments", booking_id);
    let (status, body) = send(app(&world), Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["payment"]["status"], "pending");
    assert!(body["data"]["redirect_url"].is_string());

    let (status, body) = send(app(&world), Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], 35_000);
}

#[tokio::test]
async fn test_booking_in_the_past_is_rejected() {
    let world = World::new(1).await;
    let token = world.token_for(&world.renter);

    let (status, _) = send(
        app(&world),
        Method::POST,
        "/api/bookings",
        Some(&token),
        Some(json!({
            "item_id": world.item.id,
            "start_date": "2025-10-01",
            "end_date": "2025-10-03"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(world.available_stock().await, 1);
}

fn notification(order_id: &str, txn: &str, status: &str, signed: bool) -> Value {
    let mut body = json!({
        "order_id": order_id,
        "transaction_id": txn,
        "transaction_status": status,
        "status_code": "200",
        "gross_amount": "35000.00",
        "payment_type": "bank_transfer"
    });
    if signed {
        body["signature_key"] = json!("mock-signature");
    }
    body
}

#[tokio::test]
async fn test_webhook_confirms_booking() {
    let world = World::new(1).await;
    let token = world.token_for(&world.renter);

    let (_, body) = send(
        app(&world),
        Method::POST,
        "/api/bookings",
        Some(&token),
        Some(json!({
            "item_id": world.item.id,
            "start_date": "2025-11-10",
            "end_date": "2025-11-12"
        })),
    )
    .await;
    let booking_id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/bookings/{}/payments", booking_id);
    let (_, body) = send(app(&world), Method::POST, &uri, Some(&token), None).await;
    let txn = body["data"]["payment"]["provider_txn_id"]
        .as_str()
        .unwrap()
        .to_string();
    let order_id = format!("booking-{}", booking_id);

    let (status, body) = send(
        app(&world),
        Method::POST,
        "/webhooks/payments",
        None,
        Some(notification(&order_id, &txn, "settlement", true)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["result"], "applied");

    let (status, body) = send(
        app(&world),
        Method::POST,
        "/webhooks/payments",
        None,
        Some(notification(&order_id, &txn, "settlement", true)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "already_processed");

    let uri = format!("/api/bookings/{}", booking_id);
    let (_, body) = send(app(&world), Method::GET, &uri, Some(&token), None).await;
    assert_eq!(body["data"]["status"], "confirmed");
}

#[tokio::test]
async fn test_webhook_rejections() {
    let world = World::new(1).await;

    let (status, body) = send(
        app(&world),
        Method::POST,
        "/webhooks/payments",
        None,
        Some(notification("booking-x", "unknown-tx", "settlement", true)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");

    let (status, _) = send(
        app(&world),
        Method::POST,
        "/webhooks/payments",
        None,
        Some(notification("booking-x", "tx", "teleported", true)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app(&world),
        Method::POST,
        "/webhooks/payments",
        None,
        Some(notification("booking-x", "tx", "settlement", false)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app(&world)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/webhooks/payments")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
