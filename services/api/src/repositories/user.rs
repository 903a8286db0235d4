//! User repository
//!
//! All user lookups exclude soft-deleted accounts (`active == false`);
//! deactivation never hard-deletes the document.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::store::{Collection, Document, DocumentStore, Filter};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{slugify, NewUser, Role, User};

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    users: Arc<dyn Collection>,
}

fn active_filter() -> Filter {
    Filter::new().eq("active", true)
}

fn parse_user(doc: Document) -> ApiResult<User> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("malformed user document: {e}")))
}

impl UserRepository {
    pub fn new(store: &dyn DocumentStore) -> Self {
        Self {
            users: store.collection("users"),
        }
    }

    /// Create a new user with an already-hashed password. Duplicate
    /// emails surface as `Conflict` via the store's unique constraint.
    pub async fn create(
        &self,
        new_user: &NewUser,
        password_hash: String,
        role: Role,
    ) -> ApiResult<User> {
        info!("creating new user: {}", new_user.email);

        let mut doc = Document::new();
        doc.insert("name".into(), Value::String(new_user.name.clone()));
        doc.insert("slug".into(), Value::String(slugify(&new_user.name)));
        doc.insert(
            "email".into(),
            Value::String(new_user.email.to_lowercase()),
        );
        doc.insert("password_hash".into(), Value::String(password_hash));
        doc.insert(
            "role".into(),
            serde_json::to_value(role).map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
        );
        doc.insert("active".into(), Value::Bool(true));

        let stored = self.users.insert(doc).await?;
        parse_user(stored)
    }

    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let filter = active_filter().eq("email", email.to_lowercase());
        match self.users.find_one(&filter).await? {
            Some(doc) => Ok(Some(parse_user(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
        let filter = active_filter().eq("id", id.to_string());
        match self.users.find_one(&filter).await? {
            Some(doc) => Ok(Some(parse_user(doc)?)),
            None => Ok(None),
        }
    }

    /// Find the user a presented refresh token belongs to: the id comes
    /// from the token's claims, the digest must match what is persisted.
    pub async fn find_by_id_and_refresh_digest(
        &self,
        id: Uuid,
        digest: &str,
    ) -> ApiResult<Option<User>> {
        let filter = active_filter()
            .eq("id", id.to_string())
            .eq("refresh_token", digest);
        match self.users.find_one(&filter).await? {
            Some(doc) => Ok(Some(parse_user(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_reset_digest(&self, digest: &str) -> ApiResult<Option<User>> {
        let filter = active_filter().eq("password_reset_token", digest);
        match self.users.find_one(&filter).await? {
            Some(doc) => Ok(Some(parse_user(doc)?)),
            None => Ok(None),
        }
    }

    /// Replace (or clear) the persisted refresh token digest. Replacing
    /// it invalidates every previously issued refresh token.
    pub async fn set_refresh_digest(&self, id: Uuid, digest: Option<String>) -> ApiResult<()> {
        let mut patch = Document::new();
        patch.insert(
            "refresh_token".into(),
            digest.map(Value::String).unwrap_or(Value::Null),
        );
        self.users
            .update_by_id(id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
        Ok(())
    }

    /// Persist (or clear, on rollback) the password-reset digest and
    /// its absolute expiry.
    pub async fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<(String, DateTime<Utc>)>,
    ) -> ApiResult<()> {
        let mut patch = Document::new();
        match token {
            Some((digest, expires)) => {
                patch.insert("password_reset_token".into(), Value::String(digest));
                patch.insert(
                    "password_reset_expires".into(),
                    serde_json::to_value(expires)
                        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
                );
            }
            None => {
                patch.insert("password_reset_token".into(), Value::Null);
                patch.insert("password_reset_expires".into(), Value::Null);
            }
        }
        self.users
            .update_by_id(id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
        Ok(())
    }

    /// Apply a successful password reset in one write: new password
    /// hash, cleared reset fields, bumped `password_changed_at` and the
    /// digest of the freshly issued refresh token.
    ///
    /// `password_changed_at` is backdated by one second so a token
    /// minted immediately after the reset survives the whole-second
    /// issued-at comparison.
    pub async fn complete_password_reset(
        &self,
        id: Uuid,
        password_hash: String,
        refresh_digest: String,
    ) -> ApiResult<()> {
        info!("completing password reset for user {id}");

        let changed_at = Utc::now() - Duration::seconds(1);
        let mut patch = Document::new();
        patch.insert("password_hash".into(), Value::String(password_hash));
        patch.insert(
            "password_changed_at".into(),
            serde_json::to_value(changed_at).map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
        );
        patch.insert("password_reset_token".into(), Value::Null);
        patch.insert("password_reset_expires".into(), Value::Null);
        patch.insert("refresh_token".into(), Value::String(refresh_digest));

        self.users
            .update_by_id(id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
        Ok(())
    }

    /// Soft-delete: the account stays persisted but disappears from
    /// every lookup.
    pub async fn deactivate(&self, id: Uuid) -> ApiResult<()> {
        info!("deactivating user {id}");

        let mut patch = Document::new();
        patch.insert("active".into(), Value::Bool(false));
        patch.insert("refresh_token".into(), Value::Null);
        self.users
            .update_by_id(id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
        Ok(())
    }

    /// Overwrite the `password_changed_at` marker the auth gate
    /// compares token issued-at against.
    pub async fn set_password_changed_at(
        &self,
        id: Uuid,
        changed_at: DateTime<Utc>,
    ) -> ApiResult<()> {
        let mut patch = Document::new();
        patch.insert(
            "password_changed_at".into(),
            serde_json::to_value(changed_at).map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
        );
        self.users
            .update_by_id(id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
        Ok(())
    }
}
