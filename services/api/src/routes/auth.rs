//! Auth lifecycle routes

use axum::{
    extract::{Path, State},
    handler::Handler,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::middleware::{auth_middleware, CurrentUser};
use crate::models::{NewUser, UserResponse};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, auth_middleware);

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forgotpassword", post(forgot_password))
        .route("/resetpassword/:token", post(reset_password))
        .route("/refreshtoken", post(refresh_token))
        .route("/logout", post(logout.layer(auth)))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshTokenRequest {
    refresh_token: String,
}

async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let (user, tokens) = state.auth_service.signup(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "access_token": tokens.access_token,
            "refresh_token": tokens.refresh_token,
            "data": UserResponse::from(user),
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, tokens) = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "data": UserResponse::from(user),
    })))
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    state.auth_service.forgot_password(&payload.email).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "reset token sent to email",
    })))
}

async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let tokens = state
        .auth_service
        .reset_password(&token, &payload.password)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
    })))
}

async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let access_token = state
        .auth_service
        .refresh_access_token(&payload.refresh_token)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "access_token": access_token,
    })))
}

async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    state.auth_service.logout(current.0.id).await?;
    Ok(Json(json!({ "status": "success" })))
}
