//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::analytics::{AnalyticsReport, AnalyticsService, NewCartAddition};
use crate::audit::{
    AuditAction, AuditLogBuilder, AuditLogEntry, AuditLogService, ChainVerificationResult,
};
use crate::cart::{CartService, CartView};
use crate::domain::{price, DomainError, MenuItemCategory, OrderStatus, Price, RequestContext};
use crate::error::AppError;
use crate::menu::{MenuFilter, MenuItem, MenuService, NewMenuItem};
use crate::orders::{Order, OrderItem, OrderService};

use super::middleware::{AuthenticatedApiKey, RequestUser};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMenuItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    pub category: MenuItemCategory,
    #[serde(default)]
    pub is_vegan: bool,
}

#[derive(Debug, Serialize)]
pub struct MenuItemResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: MenuItemCategory,
    pub is_vegan: bool,
    pub created_at: DateTime<Utc>,
}

impl From<MenuItem> for MenuItemResponse {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            price: item.price,
            category: item.category,
            is_vegan: item.is_vegan,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MenuListResponse {
    pub items: Vec<MenuItemResponse>,
    pub total: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddCartItemRequest {
    pub menu_item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_cost: Decimal,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_cost: order.total_cost,
            comment: order.comment,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub menu_item_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        let line_total = price::line_total(item.unit_price, item.quantity);
        Self {
            menu_item_id: item.menu_item_id,
            name: item.name,
            unit_price: item.unit_price,
            quantity: item.quantity,
            line_total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_cost: Decimal,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrdersListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub order_id: Uuid,
    pub previous_status: OrderStatus,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackCartAdditionRequest {
    pub menu_item_id: Uuid,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackCartAdditionResponse {
    pub event_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ConversionRateResponse {
    pub total_cart_additions: i64,
    pub total_purchases: i64,
    pub conversion_rate_pct: f64,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Restrict to entries recorded against one customer
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub entries: Vec<AuditLogEntry>,
    pub total: i64,
}

fn default_limit() -> i64 {
    100
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<PgPool> {
    Router::new()
        // Menu endpoints
        .route("/menu", get(list_menu))
        .route("/menu", post(create_menu_item))
        .route("/menu/:menu_item_id", get(get_menu_item))
        .route("/menu/:menu_item_id", delete(delete_menu_item))
        // Cart endpoints
        .route("/cart", get(get_cart))
        .route("/cart", delete(clear_cart))
        .route("/cart/items", post(add_cart_item))
        .route("/cart/items/:menu_item_id", delete(remove_cart_item))
        // Order endpoints
        .route("/orders", post(checkout))
        .route("/orders", get(list_my_orders))
        .route("/orders/:order_id", get(get_order))
        // Tracking ingestion
        .route("/track/cart-additions", post(track_cart_addition))
        // Admin endpoints
        .route("/admin/orders", get(admin_list_orders))
        .route("/admin/orders/:order_id", patch(admin_set_order_status))
        .route("/admin/analytics", get(admin_analytics))
        .route("/admin/analytics/conversion-rate", get(admin_conversion_rate))
        .route("/admin/audit", get(admin_audit_log))
        .route("/admin/audit/verify", get(admin_audit_verify))
}

// =========================================================================
// Shared handler helpers
// =========================================================================

/// Customer ID from the X-Request-User-Id header, required for cart and
/// order endpoints
fn require_user(request_user: Option<Extension<RequestUser>>) -> Result<Uuid, AppError> {
    request_user
        .map(|Extension(user)| user.user_id)
        .ok_or_else(|| AppError::MissingHeader("X-Request-User-Id".to_string()))
}

/// Check the admin permission, recording a denied attempt in the audit log
async fn require_admin(
    pool: &PgPool,
    api_key: &AuthenticatedApiKey,
    context: &RequestContext,
    action: &str,
) -> Result<(), AppError> {
    if api_key.has_permission("admin") {
        return Ok(());
    }

    let audit = AuditLogService::new(pool.clone());
    let entry = AuditLogBuilder::new(AuditAction::PermissionDenied).resource_type(action);
    if let Err(e) = audit.log(entry, context).await {
        tracing::warn!("Failed to audit permission denial for {}: {}", action, e);
    }

    Err(AppError::Forbidden("admin permission required".to_string()))
}

/// Build a tracking event attributed from the request context
fn tracking_event_from_context(menu_item_id: Uuid, context: &RequestContext) -> NewCartAddition {
    let mut event = NewCartAddition::for_menu_item(menu_item_id);

    if let Some(user_id) = context.request_user_id {
        event = event.with_user(user_id.to_string());
    }
    if let Some(session_id) = &context.session_id {
        event = event.with_session(session_id.clone());
    }
    if let Some(ip) = context.client_ip_string() {
        event = event.with_ip(ip);
    }

    event
}

/// Record a purchase-intent signal without failing the surrounding request
async fn track_best_effort(pool: &PgPool, event: NewCartAddition) {
    let analytics = AnalyticsService::new(pool.clone());
    let menu_item_id = event.menu_item_id;

    if let Err(e) = analytics.record_cart_addition(event).await {
        tracing::warn!(
            "Failed to record cart addition for menu item {}: {}",
            menu_item_id,
            e
        );
    }
}

// =========================================================================
// GET /menu
// =========================================================================

/// List the menu, optionally narrowed by repeated `category` params and
/// an `is_vegan` flag
async fn list_menu(
    State(pool): State<PgPool>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<MenuListResponse>, AppError> {
    let filter = parse_menu_filter(&params)?;

    let service = MenuService::new(pool);
    let items = service.list(&filter).await?;

    let total = items.len() as i64;
    Ok(Json(MenuListResponse {
        items: items.into_iter().map(MenuItemResponse::from).collect(),
        total,
    }))
}

fn parse_menu_filter(params: &[(String, String)]) -> Result<MenuFilter, AppError> {
    let mut filter = MenuFilter::default();

    for (key, value) in params {
        match key.as_str() {
            "category" => filter.categories.push(value.parse::<MenuItemCategory>()?),
            "is_vegan" => {
                let is_vegan = value.parse::<bool>().map_err(|_| {
                    AppError::InvalidRequest(format!(
                        "is_vegan must be true or false, got '{}'",
                        value
                    ))
                })?;
                filter.is_vegan = Some(is_vegan);
            }
            _ => {}
        }
    }

    Ok(filter)
}

// =========================================================================
// GET /menu/:menu_item_id
// =========================================================================

/// Menu item details.
///
/// Opening a detail view is a purchase-intent signal, so a cart addition
/// event is recorded for the item. Tracking failures never fail the read.
async fn get_menu_item(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Path(menu_item_id): Path<Uuid>,
) -> Result<Json<MenuItemResponse>, AppError> {
    let service = MenuService::new(pool.clone());
    let item = service.get(menu_item_id).await?;

    track_best_effort(&pool, tracking_event_from_context(item.id, &context)).await;

    Ok(Json(MenuItemResponse::from(item)))
}

// =========================================================================
// POST /menu
// =========================================================================

/// Create a menu item (admin only)
async fn create_menu_item(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Json(request): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItemResponse>), AppError> {
    require_admin(&pool, &api_key, &context, "menu_item.create").await?;

    let price: Price = request
        .price
        .parse()
        .map_err(|e: crate::domain::PriceError| DomainError::InvalidPrice(e.to_string()))?;

    let service = MenuService::new(pool.clone());
    let created = service
        .create(NewMenuItem {
            name: request.name,
            description: request.description,
            price,
            category: request.category,
            is_vegan: request.is_vegan,
        })
        .await?;

    let response = MenuItemResponse::from(created);

    let audit = AuditLogService::new(pool);
    let entry = AuditLogBuilder::new(AuditAction::MenuItemCreated)
        .resource_type("MenuItem")
        .resource_id(response.id)
        .after_state(&response);
    if let Err(e) = audit.log(entry, &context).await {
        tracing::warn!("Failed to audit menu item creation: {}", e);
    }

    Ok((StatusCode::CREATED, Json(response)))
}

// =========================================================================
// DELETE /menu/:menu_item_id
// =========================================================================

/// Delete a menu item (admin only)
async fn delete_menu_item(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(menu_item_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&pool, &api_key, &context, "menu_item.delete").await?;

    let service = MenuService::new(pool.clone());
    let item = service.get(menu_item_id).await?;
    service.delete(menu_item_id).await?;

    let audit = AuditLogService::new(pool);
    let entry = AuditLogBuilder::new(AuditAction::MenuItemDeleted)
        .resource_type("MenuItem")
        .resource_id(menu_item_id)
        .before_state(&MenuItemResponse::from(item));
    if let Err(e) = audit.log(entry, &context).await {
        tracing::warn!("Failed to audit menu item deletion: {}", e);
    }

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// GET /cart
// =========================================================================

/// The caller's cart, priced from the current menu
async fn get_cart(
    State(pool): State<PgPool>,
    request_user: Option<Extension<RequestUser>>,
) -> Result<Json<CartView>, AppError> {
    let user_id = require_user(request_user)?;

    let service = CartService::new(pool);
    let view = service.view(user_id).await?;

    Ok(Json(view))
}

// =========================================================================
// POST /cart/items
// =========================================================================

/// Add an item to the caller's cart and return the updated cart.
///
/// Records a cart addition event for the conversion metric, best effort.
async fn add_cart_item(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    request_user: Option<Extension<RequestUser>>,
    Json(request): Json<AddCartItemRequest>,
) -> Result<Json<CartView>, AppError> {
    let user_id = require_user(request_user)?;

    let service = CartService::new(pool.clone());
    service
        .add_item(user_id, request.menu_item_id, request.quantity)
        .await?;

    track_best_effort(
        &pool,
        tracking_event_from_context(request.menu_item_id, &context),
    )
    .await;

    let view = service.view(user_id).await?;
    Ok(Json(view))
}

// =========================================================================
// DELETE /cart/items/:menu_item_id
// =========================================================================

/// Remove one line from the caller's cart
async fn remove_cart_item(
    State(pool): State<PgPool>,
    request_user: Option<Extension<RequestUser>>,
    Path(menu_item_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user_id = require_user(request_user)?;

    let service = CartService::new(pool);
    service.remove_item(user_id, menu_item_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// DELETE /cart
// =========================================================================

/// Empty the caller's cart
async fn clear_cart(
    State(pool): State<PgPool>,
    request_user: Option<Extension<RequestUser>>,
) -> Result<StatusCode, AppError> {
    let user_id = require_user(request_user)?;

    let service = CartService::new(pool);
    service.clear(user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// POST /orders
// =========================================================================

/// Checkout: turn the caller's cart into an order
async fn checkout(
    State(pool): State<PgPool>,
    request_user: Option<Extension<RequestUser>>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let user_id = require_user(request_user)?;

    let service = OrderService::new(pool);
    let order = service.checkout(user_id, request.comment.as_deref()).await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

// =========================================================================
// GET /orders
// =========================================================================

/// The caller's order history, newest first
async fn list_my_orders(
    State(pool): State<PgPool>,
    request_user: Option<Extension<RequestUser>>,
) -> Result<Json<OrdersListResponse>, AppError> {
    let user_id = require_user(request_user)?;

    let service = OrderService::new(pool);
    let orders = service.list_for_user(user_id).await?;

    let total = orders.len() as i64;
    Ok(Json(OrdersListResponse {
        orders: orders.into_iter().map(OrderResponse::from).collect(),
        total,
    }))
}

// =========================================================================
// GET /orders/:order_id
// =========================================================================

/// One order with its line items. Customers may only read their own
/// orders; admin keys may read any.
async fn get_order(
    State(pool): State<PgPool>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    request_user: Option<Extension<RequestUser>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetailResponse>, AppError> {
    let service = OrderService::new(pool);
    let (order, items) = service.get(order_id).await?;

    let is_owner = request_user
        .map(|Extension(user)| user.user_id == order.user_id)
        .unwrap_or(false);

    if !is_owner && !api_key.has_permission("admin") {
        return Err(DomainError::Unauthorized(
            "orders may only be read by their owner".to_string(),
        )
        .into());
    }

    Ok(Json(OrderDetailResponse {
        id: order.id,
        user_id: order.user_id,
        status: order.status,
        total_cost: order.total_cost,
        comment: order.comment,
        created_at: order.created_at,
        items: items.into_iter().map(OrderItemResponse::from).collect(),
    }))
}

// =========================================================================
// GET /admin/orders
// =========================================================================

/// All orders, newest first (admin only)
async fn admin_list_orders(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Query(query): Query<AdminOrdersQuery>,
) -> Result<Json<OrdersListResponse>, AppError> {
    require_admin(&pool, &api_key, &context, "order.list").await?;

    let limit = query.limit.clamp(1, 1000);

    let service = OrderService::new(pool);
    let orders = service.list_all(limit).await?;

    let total = orders.len() as i64;
    Ok(Json(OrdersListResponse {
        orders: orders.into_iter().map(OrderResponse::from).collect(),
        total,
    }))
}

// =========================================================================
// PATCH /admin/orders/:order_id
// =========================================================================

/// Set an order's status (admin only)
async fn admin_set_order_status(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<StatusChangeResponse>, AppError> {
    require_admin(&pool, &api_key, &context, "order.status_change").await?;

    let status: OrderStatus = request.status.parse()?;

    let service = OrderService::new(pool.clone());
    let change = service.set_status(order_id, status).await?;

    let audit = AuditLogService::new(pool);
    let entry = AuditLogBuilder::new(AuditAction::OrderStatusChanged)
        .resource_type("Order")
        .resource_id(order_id)
        .before_state(&json!({ "status": change.previous.as_str() }))
        .after_state(&json!({ "status": change.current.as_str() }))
        .changed_fields(vec!["status".to_string()]);
    if let Err(e) = audit.log(entry, &context).await {
        tracing::warn!("Failed to audit order status change: {}", e);
    }

    Ok(Json(StatusChangeResponse {
        order_id: change.order_id,
        previous_status: change.previous,
        status: change.current,
    }))
}

// =========================================================================
// POST /track/cart-additions
// =========================================================================

/// Record a cart addition event.
///
/// The storefront reports both signed-in customers and anonymous
/// sessions through this endpoint; identifiers in the body win over the
/// ones derived from request headers.
async fn track_cart_addition(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Json(request): Json<TrackCartAdditionRequest>,
) -> Result<(StatusCode, Json<TrackCartAdditionResponse>), AppError> {
    let mut event = tracking_event_from_context(request.menu_item_id, &context);

    if let Some(user_id) = request.user_id {
        event = event.with_user(user_id);
    }
    if let Some(session_id) = request.session_id {
        event = event.with_session(session_id);
    }

    let analytics = AnalyticsService::new(pool);
    let event_id = analytics.record_cart_addition(event).await?;

    Ok((
        StatusCode::CREATED,
        Json(TrackCartAdditionResponse { event_id }),
    ))
}

// =========================================================================
// GET /admin/analytics
// =========================================================================

/// Full analytics report (admin only)
async fn admin_analytics(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
) -> Result<Json<AnalyticsReport>, AppError> {
    require_admin(&pool, &api_key, &context, "analytics.report").await?;

    let analytics = AnalyticsService::new(pool);
    let report = analytics.report().await?;

    Ok(Json(report))
}

// =========================================================================
// GET /admin/analytics/conversion-rate
// =========================================================================

/// Conversion totals with the rate rounded for display (admin only)
async fn admin_conversion_rate(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
) -> Result<Json<ConversionRateResponse>, AppError> {
    require_admin(&pool, &api_key, &context, "analytics.conversion_rate").await?;

    let analytics = AnalyticsService::new(pool);
    let stats = analytics.conversion_stats().await?;

    Ok(Json(ConversionRateResponse {
        total_cart_additions: stats.total_cart_additions,
        total_purchases: stats.total_purchases,
        conversion_rate_pct: round_to_2dp(stats.conversion_rate_pct),
    }))
}

/// Round to two decimal places for the dashboard
fn round_to_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =========================================================================
// GET /admin/audit
// =========================================================================

/// Recent audit log entries, newest first, optionally filtered to one
/// customer (admin only)
async fn admin_audit_log(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditListResponse>, AppError> {
    require_admin(&pool, &api_key, &context, "audit.read").await?;

    let limit = query.limit.clamp(1, 1000);

    let audit = AuditLogService::new(pool);
    let entries = match query.user_id {
        Some(user_id) => audit.get_by_user(user_id, limit).await,
        None => audit.get_recent(limit).await,
    }
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let total = entries.len() as i64;
    Ok(Json(AuditListResponse { entries, total }))
}

// =========================================================================
// GET /admin/audit/verify
// =========================================================================

/// Re-compute the audit hash chain and report the first divergence
async fn admin_audit_verify(
    State(pool): State<PgPool>,
    Extension(context): Extension<RequestContext>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
) -> Result<Json<ChainVerificationResult>, AppError> {
    require_admin(&pool, &api_key, &context, "audit.verify").await?;

    let audit = AuditLogService::new(pool);
    let result = audit
        .verify_hash_chain(None)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(result))
}
