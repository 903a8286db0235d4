//! Order workflow routes
//!
//! Customers create cash orders and checkout sessions for their carts;
//! staff flip paid/delivered flags. Listing is scoped to the logged
//! user unless they are staff.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    handler::Handler,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, require_roles, CurrentUser};
use crate::models::{OrderResource, Role, ShippingAddress};
use crate::state::AppState;

const STAFF: &[Role] = &[Role::Admin, Role::Manager];
const CUSTOMER: &[Role] = &[Role::User];

/// Signature header checked by the gateway on webhook delivery.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "webhook-signature";

pub fn router(state: AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, auth_middleware);
    let staff = middleware::from_fn(|req, next| require_roles(STAFF, req, next));
    let customer = middleware::from_fn(|req, next| require_roles(CUSTOMER, req, next));

    Router::new()
        .route("/", get(list_orders.layer(auth.clone())))
        .route(
            "/:id",
            get(get_order.layer(auth.clone()))
                .post(create_cash_order.layer(customer.clone()).layer(auth.clone())),
        )
        .route(
            "/checkout-session/:id",
            get(checkout_session.layer(customer).layer(auth.clone())),
        )
        .route("/:id/pay", put(mark_paid.layer(staff.clone()).layer(auth.clone())))
        .route("/:id/deliver", put(mark_delivered.layer(staff).layer(auth)))
}

#[derive(Debug, Default, Deserialize)]
struct CreateOrderRequest {
    #[serde(default)]
    shipping_address: Option<ShippingAddress>,
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .crud::<OrderResource>()
        .list(params, current.scope_filter())
        .await?;
    Ok(Json(page))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let doc = state.crud::<OrderResource>().get_one(id).await?;
    current.ensure_owned(&doc, id)?;
    Ok(Json(json!({ "data": doc })))
}

async fn create_cash_order(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(cart_id): Path<Uuid>,
    payload: Option<Json<CreateOrderRequest>>,
) -> ApiResult<impl IntoResponse> {
    let shipping = payload.and_then(|Json(p)| p.shipping_address);
    let order = state
        .orders
        .create_cash_order(&current.0, cart_id, shipping)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": order }))))
}

async fn checkout_session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(cart_id): Path<Uuid>,
    payload: Option<Json<CreateOrderRequest>>,
) -> ApiResult<impl IntoResponse> {
    let shipping = payload.and_then(|Json(p)| p.shipping_address);
    let session = state
        .orders
        .checkout_session(&current.0, cart_id, shipping)
        .await?;
    Ok(Json(json!({ "status": "success", "session": session })))
}

async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let order = state.orders.mark_paid(id).await?;
    Ok(Json(json!({ "data": order })))
}

async fn mark_delivered(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let order = state.orders.mark_delivered(id).await?;
    Ok(Json(json!({ "data": order })))
}

pub async fn webhook_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing webhook signature".to_string()))?;

    let event = state
        .gateway
        .verify_webhook(&body, signature)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.orders.handle_webhook_event(event).await?;
    Ok(Json(json!({ "received": true })))
}
