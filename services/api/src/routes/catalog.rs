//! Generic resource router
//!
//! One router shape serves every catalog collection: public reads,
//! writes behind the Protect gate plus a role check. Subcategories
//! additionally hang off their parent category route, scoped by the
//! `category` field.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    handler::Handler,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use common::store::{Document, Filter};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::crud::{ListResult, Resource};
use crate::error::ApiResult;
use crate::middleware::{auth_middleware, require_roles};
use crate::models::{Role, SubCategoryResource};
use crate::state::AppState;

pub fn resource_router<R: Resource>(
    state: AppState,
    write_roles: &'static [Role],
) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, auth_middleware);
    let guard = middleware::from_fn(move |req, next| require_roles(write_roles, req, next));

    Router::new()
        .route(
            "/",
            get(list::<R>).post(create::<R>.layer(guard.clone()).layer(auth.clone())),
        )
        .route(
            "/:id",
            get(get_one::<R>)
                .put(update::<R>.layer(guard.clone()).layer(auth.clone()))
                .delete(delete_one::<R>.layer(guard).layer(auth)),
        )
}

/// Subcategory routes nested under a category: listing is scoped to
/// the parent, creation stamps it.
pub fn nested_subcategory_routes(
    state: AppState,
    write_roles: &'static [Role],
) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, auth_middleware);
    let guard = middleware::from_fn(move |req, next| require_roles(write_roles, req, next));

    Router::new().route(
        "/:id/subcategories",
        get(list_category_subcategories)
            .post(create_category_subcategory.layer(guard).layer(auth)),
    )
}

async fn list_category_subcategories(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListResult>> {
    let base = Filter::new().eq("category", category_id.to_string());
    let page = state.crud::<SubCategoryResource>().list(params, base).await?;
    Ok(Json(page))
}

async fn create_category_subcategory(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(mut payload): Json<Document>,
) -> ApiResult<impl IntoResponse> {
    payload.insert(
        "category".into(),
        Value::String(category_id.to_string()),
    );
    let doc = state
        .crud::<SubCategoryResource>()
        .create_one(payload)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": doc }))))
}

async fn list<R: Resource>(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListResult>> {
    let page = state.crud::<R>().list(params, Filter::new()).await?;
    Ok(Json(page))
}

async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let doc = state.crud::<R>().get_one(id).await?;
    Ok(Json(json!({ "data": doc })))
}

async fn create<R: Resource>(
    State(state): State<AppState>,
    Json(payload): Json<Document>,
) -> ApiResult<impl IntoResponse> {
    let doc = state.crud::<R>().create_one(payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": doc }))))
}

async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<Document>,
) -> ApiResult<impl IntoResponse> {
    let doc = state.crud::<R>().update_one(id, patch).await?;
    Ok(Json(json!({ "data": doc })))
}

async fn delete_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.crud::<R>().delete_one(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
