//! User routes
//!
//! Logged-user endpoints (`/me`, password change) plus admin-only user
//! management. Raw user documents are sanitized before they leave the
//! API; `UserResponse` covers the typed paths.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    handler::Handler,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use common::store::{Document, Filter};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, require_roles, CurrentUser};
use crate::models::{sanitize_user_doc, slugify, NewUser, Role, UserResource, UserResponse};
use crate::security;
use crate::state::AppState;
use crate::validation;

const ADMIN: &[Role] = &[Role::Admin];

pub fn router(state: AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, auth_middleware);
    let admin = middleware::from_fn(|req, next| require_roles(ADMIN, req, next));

    Router::new()
        .route(
            "/me",
            get(get_me.layer(auth.clone())).delete(delete_me.layer(auth.clone())),
        )
        .route(
            "/changemypassword",
            put(change_my_password.layer(auth.clone())),
        )
        .route(
            "/",
            get(list_users.layer(admin.clone()).layer(auth.clone()))
                .post(create_user.layer(admin.clone()).layer(auth.clone())),
        )
        .route(
            "/:id",
            get(get_user.layer(admin.clone()).layer(auth.clone()))
                .put(update_user.layer(admin.clone()).layer(auth.clone()))
                .delete(delete_user.layer(admin).layer(auth)),
        )
}

async fn get_me(Extension(current): Extension<CurrentUser>) -> ApiResult<impl IntoResponse> {
    Ok(Json(json!({ "data": UserResponse::from(current.0) })))
}

/// Soft delete: the account is deactivated, not removed.
async fn delete_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    state.users.deactivate(current.0.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    password: String,
}

async fn change_my_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let tokens = state
        .auth_service
        .change_password(&current.0, &payload.current_password, &payload.password)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
    })))
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let mut page = state
        .crud::<UserResource>()
        .list(params, Filter::new())
        .await?;
    for doc in &mut page.data {
        sanitize_user_doc(doc);
    }
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct AdminCreateUserRequest {
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    role: Option<Role>,
}

async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_name(&payload.name).map_err(ApiError::BadRequest)?;
    validation::validate_email(&payload.email).map_err(ApiError::BadRequest)?;
    validation::validate_password(&payload.password).map_err(ApiError::BadRequest)?;

    let password_hash = security::hash_password(&payload.password)?;
    let user = state
        .users
        .create(
            &NewUser {
                name: payload.name,
                email: payload.email,
                password: String::new(),
            },
            password_hash,
            payload.role.unwrap_or(Role::User),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": UserResponse::from(user) })),
    ))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut doc = state.crud::<UserResource>().get_one(id).await?;
    sanitize_user_doc(&mut doc);
    Ok(Json(json!({ "data": doc })))
}

#[derive(Debug, Deserialize)]
struct AdminUpdateUserRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    active: Option<bool>,
}

/// Admin profile update; passwords go through the reset or
/// change-password flows, never through here.
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut patch = Document::new();
    if let Some(name) = payload.name {
        validation::validate_name(&name).map_err(ApiError::BadRequest)?;
        patch.insert("slug".into(), Value::String(slugify(&name)));
        patch.insert("name".into(), Value::String(name));
    }
    if let Some(email) = payload.email {
        validation::validate_email(&email).map_err(ApiError::BadRequest)?;
        patch.insert("email".into(), Value::String(email.to_lowercase()));
    }
    if let Some(role) = payload.role {
        patch.insert(
            "role".into(),
            serde_json::to_value(role).map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
        );
    }
    if let Some(active) = payload.active {
        patch.insert("active".into(), Value::Bool(active));
    }
    if patch.is_empty() {
        return Err(ApiError::BadRequest("nothing to update".to_string()));
    }

    let mut doc = state.crud::<UserResource>().update_one(id, patch).await?;
    sanitize_user_doc(&mut doc);
    Ok(Json(json!({ "data": doc })))
}

/// Soft delete, same as self-service deactivation.
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.users.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
