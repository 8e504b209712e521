//! API Integration Tests

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    middleware,
};
use serde_json::Value;
use tavola::api::{
    self,
    routes::{
        AddCartItemRequest, CheckoutRequest, CreateMenuItemRequest, TrackCartAdditionRequest,
        UpdateOrderStatusRequest,
    },
};
use tavola::domain::MenuItemCategory;
use tower::util::ServiceExt;
use uuid::Uuid;

mod common;

async fn body_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_storefront_order_flow_e2e() {
    let pool = common::setup_test_db().await;
    let app = api::create_router()
        .layer(middleware::from_fn_with_state(
            pool.clone(),
            tavola::api::middleware::auth_middleware,
        ))
        .with_state(pool.clone());

    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    // 1. Admin creates two menu items
    let req = Request::builder()
        .method("POST")
        .uri("/menu")
        .header("content-type", "application/json")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::from(
            serde_json::to_string(&CreateMenuItemRequest {
                name: "Margherita".to_string(),
                description: "Tomato, mozzarella, basil".to_string(),
                price: "11.50".to_string(),
                category: MenuItemCategory::MainCourse,
                is_vegan: false,
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED, "Margherita creation failed");
    let margherita = body_json(response).await;
    assert_eq!(margherita["price"], "11.50");
    let margherita_id = margherita["id"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("POST")
        .uri("/menu")
        .header("content-type", "application/json")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::from(
            serde_json::to_string(&CreateMenuItemRequest {
                name: "Tiramisu".to_string(),
                description: String::new(),
                price: "6.00".to_string(),
                category: MenuItemCategory::Dessert,
                is_vegan: false,
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED, "Tiramisu creation failed");
    let tiramisu_id = body_json(response).await["id"].as_str().unwrap().to_string();

    // 2. Duplicate names are rejected
    let req = Request::builder()
        .method("POST")
        .uri("/menu")
        .header("content-type", "application/json")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::from(
            serde_json::to_string(&CreateMenuItemRequest {
                name: "Margherita".to_string(),
                description: String::new(),
                price: "12.00".to_string(),
                category: MenuItemCategory::MainCourse,
                is_vegan: false,
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error_code"], "duplicate_menu_item");

    // 3. Storefront keys cannot create menu items; the denial is
    //    recorded against the acting user
    let req = Request::builder()
        .method("POST")
        .uri("/menu")
        .header("content-type", "application/json")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::from(
            serde_json::to_string(&CreateMenuItemRequest {
                name: "Forbidden Special".to_string(),
                description: String::new(),
                price: "1.00".to_string(),
                category: MenuItemCategory::Starter,
                is_vegan: false,
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // 4. Category filter narrows the list
    let req = Request::builder()
        .method("GET")
        .uri("/menu?category=main_course")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["name"], "Margherita");

    // 5. Viewing item details records a cart addition signal
    let req = Request::builder()
        .method("GET")
        .uri(format!("/menu/{}", margherita_id))
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 6. User A fills the cart: 1x Tiramisu first, then 2x Margherita
    let req = Request::builder()
        .method("POST")
        .uri("/cart/items")
        .header("content-type", "application/json")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::from(
            serde_json::to_string(&AddCartItemRequest {
                menu_item_id: tiramisu_id.parse().unwrap(),
                quantity: 1,
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK, "Adding Tiramisu failed");
    assert_eq!(body_json(response).await["item_count"], 1);

    let req = Request::builder()
        .method("POST")
        .uri("/cart/items")
        .header("content-type", "application/json")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::from(
            serde_json::to_string(&AddCartItemRequest {
                menu_item_id: margherita_id.parse().unwrap(),
                quantity: 2,
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK, "Adding Margherita failed");
    assert_eq!(body_json(response).await["item_count"], 3);

    // 7. Cart is priced from the menu, lines in the order they were added
    let req = Request::builder()
        .method("GET")
        .uri("/cart")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert_eq!(json["items"][0]["name"], "Tiramisu");
    assert_eq!(json["items"][1]["name"], "Margherita");
    assert_eq!(json["total"], "29.00");

    // 8. Checkout turns the cart into an order
    let req = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::from(
            serde_json::to_string(&CheckoutRequest {
                comment: Some("ring twice".to_string()),
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED, "Checkout failed");
    let order = body_json(response).await;
    assert_eq!(order["status"], "received");
    assert_eq!(order["total_cost"], "29.00");
    let order_id = order["id"].as_str().unwrap().to_string();

    // 9. Cart is empty afterwards, and an empty cart cannot check out
    let req = Request::builder()
        .method("GET")
        .uri("/cart")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(body_json(response).await["item_count"], 0);

    let req = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::from(serde_json::to_string(&CheckoutRequest { comment: None }).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "empty_cart");

    // 10. Owner reads the order with its snapshotted lines
    let req = Request::builder()
        .method("GET")
        .uri(format!("/orders/{}", order_id))
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["comment"], "ring twice");
    // Snapshotted lines come back sorted by item name, not cart order
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert_eq!(json["items"][0]["name"], "Margherita");
    assert_eq!(json["items"][1]["name"], "Tiramisu");

    // 11. Another customer cannot read it
    let req = Request::builder()
        .method("GET")
        .uri(format!("/orders/{}", order_id))
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_b.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // 12. An admin key can
    let req = Request::builder()
        .method("GET")
        .uri(format!("/orders/{}", order_id))
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 13. Order history for user A has exactly this order
    let req = Request::builder()
        .method("GET")
        .uri("/orders")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", user_a.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["orders"][0]["id"].as_str().unwrap(), order_id);

    // 14. Status changes are admin-only
    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/admin/orders/{}", order_id))
        .header("content-type", "application/json")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .body(Body::from(
            serde_json::to_string(&UpdateOrderStatusRequest {
                status: "preparing".to_string(),
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/admin/orders/{}", order_id))
        .header("content-type", "application/json")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::from(
            serde_json::to_string(&UpdateOrderStatusRequest {
                status: "preparing".to_string(),
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK, "Status change failed");
    let json = body_json(response).await;
    assert_eq!(json["previous_status"], "received");
    assert_eq!(json["status"], "preparing");

    // 15. Unknown statuses and unknown orders are rejected
    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/admin/orders/{}", order_id))
        .header("content-type", "application/json")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::from(
            serde_json::to_string(&UpdateOrderStatusRequest {
                status: "burnt".to_string(),
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/admin/orders/{}", Uuid::new_v4()))
        .header("content-type", "application/json")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::from(
            serde_json::to_string(&UpdateOrderStatusRequest {
                status: "completed".to_string(),
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // 16. Admin order list sees the order
    let req = Request::builder()
        .method("GET")
        .uri("/admin/orders")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["total"], 1);

    // 17. Explicit tracking ingestion
    let req = Request::builder()
        .method("POST")
        .uri("/track/cart-additions")
        .header("content-type", "application/json")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Session-Id", "sess-e2e-1")
        .body(Body::from(
            serde_json::to_string(&TrackCartAdditionRequest {
                menu_item_id: margherita_id.parse().unwrap(),
                user_id: None,
                session_id: None,
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(body_json(response).await["event_id"].is_string());

    // 18. Dashboard: 2 purchased lines against 4 recorded additions
    //     (detail view + two cart adds + explicit track)
    let req = Request::builder()
        .method("GET")
        .uri("/admin/analytics")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total_cart_additions"], 4);
    assert_eq!(json["total_purchases"], 2);
    assert_eq!(json["last_month_order_count"], 1);
    assert_eq!(json["last_month_revenue"], "29.00");
    assert_eq!(json["avg_order_gap_formatted"], "no data");

    let req = Request::builder()
        .method("GET")
        .uri("/admin/analytics/conversion-rate")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total_cart_additions"], 4);
    assert_eq!(json["total_purchases"], 2);
    assert_eq!(json["conversion_rate_pct"].as_f64().unwrap(), 50.0);

    // 19. Deleting an unordered menu item, then reading it, is a 404
    let req = Request::builder()
        .method("POST")
        .uri("/menu")
        .header("content-type", "application/json")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::from(
            serde_json::to_string(&CreateMenuItemRequest {
                name: "Daily Special".to_string(),
                description: String::new(),
                price: "8.00".to_string(),
                category: MenuItemCategory::Starter,
                is_vegan: true,
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let special_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/menu/{}", special_id))
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let req = Request::builder()
        .method("GET")
        .uri(format!("/menu/{}", special_id))
        .header("X-API-Key", common::STOREFRONT_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // 20. Every admin mutation and denial above is in the audit log,
    //     and the hash chain still verifies
    let req = Request::builder()
        .method("GET")
        .uri("/admin/audit")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    // 3 creations, 1 deletion, 1 status change, 2 denied attempts
    assert_eq!(json["total"], 7);

    // Filtering by the acting user isolates the storefront denial
    let req = Request::builder()
        .method("GET")
        .uri(format!("/admin/audit?user_id={}", user_a))
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["entries"][0]["action"], "auth.permission_denied");
    assert_eq!(json["entries"][0]["request_user_id"], user_a.to_string());

    let req = Request::builder()
        .method("GET")
        .uri("/admin/audit/verify")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["is_valid"], true);
    assert_eq!(json["entries_checked"], 7);
}

#[tokio::test]
async fn test_request_validation() {
    let pool = common::connect_test_db().await;
    let app = api::create_router()
        .layer(middleware::from_fn_with_state(
            pool.clone(),
            tavola::api::middleware::auth_middleware,
        ))
        .with_state(pool.clone());

    // Missing API key
    let req = Request::builder()
        .method("GET")
        .uri("/menu")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown API key
    let req = Request::builder()
        .method("GET")
        .uri("/menu")
        .header("X-API-Key", "not_a_real_key")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Cart endpoints need the customer header
    let req = Request::builder()
        .method("GET")
        .uri("/cart")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_code"], "missing_header");

    // Malformed customer header is rejected before any handler runs
    let req = Request::builder()
        .method("GET")
        .uri("/cart")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .header("X-Request-User-Id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Tracking rejects the nil UUID
    let req = Request::builder()
        .method("POST")
        .uri("/track/cart-additions")
        .header("content-type", "application/json")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .body(Body::from(
            serde_json::to_string(&TrackCartAdditionRequest {
                menu_item_id: Uuid::nil(),
                user_id: None,
                session_id: None,
            })
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown menu filters are rejected
    let req = Request::builder()
        .method("GET")
        .uri("/menu?category=sushi")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("GET")
        .uri("/menu?is_vegan=maybe")
        .header("X-API-Key", common::STOREFRONT_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Malformed audit user filter is rejected
    let req = Request::builder()
        .method("GET")
        .uri("/admin/audit?user_id=not-a-uuid")
        .header("X-API-Key", common::ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
