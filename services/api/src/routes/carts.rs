//! Cart routes
//!
//! Carts are owner-bound: customers only ever see and mutate their own
//! cart documents, and every created cart is stamped with the logged
//! user regardless of the payload. Staff can read across users.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    handler::Handler,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use common::store::Document;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::middleware::{auth_middleware, require_roles, CurrentUser};
use crate::models::{CartResource, Role};
use crate::state::AppState;

const CUSTOMER: &[Role] = &[Role::User];

pub fn router(state: AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, auth_middleware);
    let customer = middleware::from_fn(|req, next| require_roles(CUSTOMER, req, next));

    Router::new()
        .route(
            "/",
            get(list_carts.layer(auth.clone()))
                .post(create_cart.layer(customer.clone()).layer(auth.clone())),
        )
        .route(
            "/:id",
            get(get_cart.layer(auth.clone()))
                .put(update_cart.layer(customer.clone()).layer(auth.clone()))
                .delete(delete_cart.layer(customer).layer(auth)),
        )
}

async fn list_carts(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .crud::<CartResource>()
        .list(params, current.scope_filter())
        .await?;
    Ok(Json(page))
}

async fn get_cart(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let doc = state.crud::<CartResource>().get_one(id).await?;
    current.ensure_owned(&doc, id)?;
    Ok(Json(json!({ "data": doc })))
}

async fn create_cart(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(mut payload): Json<Document>,
) -> ApiResult<impl IntoResponse> {
    payload.insert("user".into(), Value::String(current.0.id.to_string()));
    let doc = state.crud::<CartResource>().create_one(payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": doc }))))
}

async fn update_cart(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(mut patch): Json<Document>,
) -> ApiResult<impl IntoResponse> {
    let existing = state.crud::<CartResource>().get_one(id).await?;
    current.ensure_owned(&existing, id)?;
    // Ownership is fixed at creation.
    patch.remove("user");
    let doc = state.crud::<CartResource>().update_one(id, patch).await?;
    Ok(Json(json!({ "data": doc })))
}

async fn delete_cart(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existing = state.crud::<CartResource>().get_one(id).await?;
    current.ensure_owned(&existing, id)?;
    state.crud::<CartResource>().delete_one(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
