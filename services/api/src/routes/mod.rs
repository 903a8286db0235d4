//! HTTP surface
//!
//! Auth lifecycle under `/api/v1/auth`, generic resource routers for
//! the catalog collections, the order workflow and the payment
//! webhook. Mutating catalog routes sit behind the Protect gate plus a
//! role check.

pub mod auth;
pub mod carts;
pub mod catalog;
pub mod orders;
pub mod users;

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::models::{
    BrandResource, CategoryResource, ProductResource, ReviewResource, Role, SubCategoryResource,
};
use crate::state::AppState;

/// Roles allowed to mutate catalog collections.
const STAFF: &[Role] = &[Role::Admin, Role::Manager];
/// Customers own carts and reviews.
const CUSTOMER: &[Role] = &[Role::User];

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/auth", auth::router(state.clone()))
        .nest("/api/v1/users", users::router(state.clone()))
        .nest(
            "/api/v1/products",
            catalog::resource_router::<ProductResource>(state.clone(), STAFF),
        )
        .nest(
            "/api/v1/categories",
            catalog::resource_router::<CategoryResource>(state.clone(), STAFF)
                .merge(catalog::nested_subcategory_routes(state.clone(), STAFF)),
        )
        .nest(
            "/api/v1/subcategories",
            catalog::resource_router::<SubCategoryResource>(state.clone(), STAFF),
        )
        .nest(
            "/api/v1/brands",
            catalog::resource_router::<BrandResource>(state.clone(), STAFF),
        )
        .nest(
            "/api/v1/reviews",
            catalog::resource_router::<ReviewResource>(state.clone(), CUSTOMER),
        )
        .nest("/api/v1/carts", carts::router(state.clone()))
        .nest("/api/v1/orders", orders::router(state.clone()))
        .route("/webhook-checkout", post(orders::webhook_checkout))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "souq-api"
    }))
}
