//! Authentication and authorization middleware

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use common::store::{Document, Filter};
use serde_json::Value;
use uuid::Uuid;

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::models::{Role, User};
use crate::state::AppState;

/// The resolved user attached to a request after the Protect gate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn allowed_to(&self, roles: &[Role]) -> ApiResult<()> {
        auth::allowed_to(&self.0, roles)
    }

    /// Read scope for owner-bound collections (carts, orders):
    /// customers only see documents whose `user` field is theirs, staff
    /// see everything.
    pub fn scope_filter(&self) -> Filter {
        if self.0.role == Role::User {
            Filter::new().eq("user", self.0.id.to_string())
        } else {
            Filter::new()
        }
    }

    /// Ownership check on a fetched document. A customer asking for
    /// another user's document gets the same `NotFound` as for an
    /// absent id, so ids are not enumerable.
    pub fn ensure_owned(&self, doc: &Document, id: Uuid) -> ApiResult<()> {
        if self.0.role != Role::User {
            return Ok(());
        }
        let owner = doc.get("user").and_then(Value::as_str);
        if owner == Some(self.0.id.to_string().as_str()) {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("no document for this id {id}")))
        }
    }
}

/// The Protect gate: extract the bearer token, verify it, resolve the
/// user and attach it to the request for downstream handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            ApiError::Unauthorized("you are not logged in, please login to get access".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized("you are not logged in, please login to get access".to_string())
    })?;

    let user = state.auth_service.authenticate(token).await?;
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Role-check middleware, layered after `auth_middleware`.
pub async fn require_roles(
    roles: &'static [Role],
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let current = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::Unauthorized("not authenticated".to_string()))?;
    current.allowed_to(roles)?;
    Ok(next.run(req).await)
}
