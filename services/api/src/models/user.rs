//! User model and related payloads

use chrono::{DateTime, Utc};
use common::query::SearchTarget;
use common::store::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::crud::Resource;
use crate::models::slugify;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Admin,
}

/// User entity as persisted in the `users` collection.
///
/// `refresh_token`, `password_reset_token` and `password_reset_expires`
/// hold digests/expiries only — never plaintext tokens. Exactly one
/// refresh digest is valid per user at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password_reset_token: Option<String>,
    #[serde(default)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signup payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// User representation returned by the API — credential and token
/// fields stripped.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            slug: user.slug,
            email: user.email,
            role: user.role,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Users as a listable resource for admin management. Route handlers
/// must pass returned documents through [`sanitize_user_doc`].
pub struct UserResource;

impl Resource for UserResource {
    const COLLECTION: &'static str = "users";
    const SEARCH: SearchTarget = SearchTarget::Name;

    fn normalize(doc: &mut Document) {
        if let Some(name) = doc.get("name").and_then(Value::as_str) {
            let slug = slugify(name);
            doc.insert("slug".into(), Value::String(slug));
        }
        if let Some(email) = doc.get("email").and_then(Value::as_str) {
            let lowered = email.to_lowercase();
            doc.insert("email".into(), Value::String(lowered));
        }
    }
}

/// Strip credential and token fields from a raw user document before
/// it leaves the API.
pub fn sanitize_user_doc(doc: &mut Document) {
    doc.remove("password_hash");
    doc.remove("password_reset_token");
    doc.remove("password_reset_expires");
    doc.remove("refresh_token");
}
