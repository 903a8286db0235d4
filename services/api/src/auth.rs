//! Auth/session lifecycle
//!
//! Signup, login, the request authorization gate, password reset and
//! refresh-token handling. A user has exactly one valid refresh token
//! at a time: its digest lives on the user document, is replaced on
//! login and password reset, and is nulled on logout. The gate rejects
//! access tokens issued before the last password change and — through
//! the digest-presence check — any access token outliving a logout.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::email::Mailer;
use crate::error::{ApiError, ApiResult};
use crate::jwt::JwtService;
use crate::models::{NewUser, Role, User};
use crate::repositories::UserRepository;
use crate::security;
use crate::validation;

/// Login failures never reveal whether the email exists.
const BAD_CREDENTIALS: &str = "incorrect email or password";

const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Token pair returned by signup, login and password reset.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Authentication service orchestrating the user repository, the JWT
/// service and the outbound mailer.
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    jwt: JwtService,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        jwt: JwtService,
        mailer: Arc<dyn Mailer>,
        frontend_url: String,
    ) -> Self {
        Self {
            users,
            jwt,
            mailer,
            frontend_url,
        }
    }

    /// Issue a fresh token pair and persist the refresh digest,
    /// replacing any prior session for the user.
    async fn issue_session(&self, user_id: Uuid) -> ApiResult<AuthTokens> {
        let access_token = self.jwt.generate_access_token(user_id)?;
        let refresh_token = self.jwt.generate_refresh_token(user_id)?;
        self.users
            .set_refresh_digest(user_id, Some(security::hash_token(&refresh_token)))
            .await?;
        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }

    /// Register a new user and open a session for it.
    pub async fn signup(&self, new_user: NewUser) -> ApiResult<(User, AuthTokens)> {
        validation::validate_name(&new_user.name).map_err(ApiError::BadRequest)?;
        validation::validate_email(&new_user.email).map_err(ApiError::BadRequest)?;
        validation::validate_password(&new_user.password).map_err(ApiError::BadRequest)?;

        if self.users.find_by_email(&new_user.email).await?.is_some() {
            return Err(ApiError::Conflict("email already registered".to_string()));
        }

        let password_hash = security::hash_password(&new_user.password)?;
        let user = self.users.create(&new_user, password_hash, Role::User).await?;
        info!("user {} signed up", user.id);

        let tokens = self.issue_session(user.id).await?;
        Ok((user, tokens))
    }

    /// Authenticate with email + password.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(User, AuthTokens)> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

        if !security::verify_password(password, &user.password_hash)? {
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        info!("user {} logged in", user.id);
        let tokens = self.issue_session(user.id).await?;
        Ok((user, tokens))
    }

    /// The Protect gate: verify a bearer access token and resolve the
    /// user it belongs to. Runs before every protected operation.
    pub async fn authenticate(&self, access_token: &str) -> ApiResult<User> {
        let claims = self
            .jwt
            .verify_access_token(access_token)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))?;

        let user = self.users.find_by_id(claims.sub).await?.ok_or_else(|| {
            ApiError::Unauthorized(
                "the user belonging to this token no longer exists".to_string(),
            )
        })?;

        if let Some(changed_at) = user.password_changed_at {
            if changed_at.timestamp() > claims.iat as i64 {
                return Err(ApiError::Unauthorized(
                    "password changed, please re-login".to_string(),
                ));
            }
        }

        // A nulled refresh digest means the user logged out; access
        // tokens from that session die with it.
        if user.refresh_token.is_none() {
            return Err(ApiError::Unauthorized(
                "logged out, please re-login".to_string(),
            ));
        }

        Ok(user)
    }

    /// Start the password-reset flow: persist a digest + expiry of a
    /// fresh random token and mail the plaintext to the user. If the
    /// email cannot be sent, the persisted fields are cleared — a reset
    /// token must never outlive a failed notification.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::NotFound("no user with that email address".to_string()))?;

        let reset_token = security::generate_reset_token();
        let digest = security::hash_token(&reset_token);
        let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .set_reset_token(user.id, Some((digest, expires)))
            .await?;

        let reset_url = format!("{}/reset-password/{}", self.frontend_url, reset_token);
        let body = format!(
            "Forgot your password? Submit a request with your new password to: {reset_url}.\n\
             If you didn't forget your password, please ignore this email!"
        );

        if let Err(err) = self
            .mailer
            .send(
                &user.email,
                "Your password reset token (valid for 10 min)",
                &body,
            )
            .await
        {
            warn!("reset email to user {} failed: {err:#}", user.id);
            self.users.set_reset_token(user.id, None).await?;
            return Err(ApiError::Internal(anyhow::anyhow!(
                "there was an error sending the email, try again later"
            )));
        }

        info!("password reset token issued for user {}", user.id);
        Ok(())
    }

    /// Consume a reset token: set the new password, clear the reset
    /// fields, bump `password_changed_at` and open a fresh session.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<AuthTokens> {
        validation::validate_password(new_password).map_err(ApiError::BadRequest)?;

        let digest = security::hash_token(token);
        let user = self
            .users
            .find_by_reset_digest(&digest)
            .await?
            .filter(|user| {
                user.password_reset_expires
                    .is_some_and(|expires| expires > Utc::now())
            })
            .ok_or_else(|| ApiError::BadRequest("token is invalid or has expired".to_string()))?;

        let password_hash = security::hash_password(new_password)?;
        let access_token = self.jwt.generate_access_token(user.id)?;
        let refresh_token = self.jwt.generate_refresh_token(user.id)?;
        self.users
            .complete_password_reset(
                user.id,
                password_hash,
                security::hash_token(&refresh_token),
            )
            .await?;

        info!("password reset completed for user {}", user.id);
        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }

    /// Change the password of a logged-in user. Requires the current
    /// password; bumps `password_changed_at` and opens a fresh session,
    /// so tokens from before the change stop working.
    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> ApiResult<AuthTokens> {
        validation::validate_password(new_password).map_err(ApiError::BadRequest)?;

        if !security::verify_password(current_password, &user.password_hash)? {
            return Err(ApiError::Unauthorized(
                "current password is incorrect".to_string(),
            ));
        }

        let password_hash = security::hash_password(new_password)?;
        let access_token = self.jwt.generate_access_token(user.id)?;
        let refresh_token = self.jwt.generate_refresh_token(user.id)?;
        self.users
            .complete_password_reset(
                user.id,
                password_hash,
                security::hash_token(&refresh_token),
            )
            .await?;

        info!("user {} changed their password", user.id);
        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }

    /// Mint a new access token from a valid refresh token. The refresh
    /// token itself is not rotated on this path; a digest mismatch
    /// means the token was superseded by a newer login or a logout.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> ApiResult<String> {
        if refresh_token.trim().is_empty() {
            return Err(ApiError::BadRequest("refresh token is required".to_string()));
        }

        let claims = self.jwt.verify_refresh_token(refresh_token).map_err(|_| {
            ApiError::Unauthorized("invalid or expired refresh token".to_string())
        })?;

        let digest = security::hash_token(refresh_token);
        let user = self
            .users
            .find_by_id_and_refresh_digest(claims.sub, &digest)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("invalid refresh token".to_string()))?;

        Ok(self.jwt.generate_access_token(user.id)?)
    }

    /// Terminate the user's session. Outstanding access tokens are not
    /// blacklisted; the gate's digest-presence check retires them.
    pub async fn logout(&self, user_id: Uuid) -> ApiResult<()> {
        info!("user {user_id} logged out");
        self.users.set_refresh_digest(user_id, None).await
    }
}

/// Role gate: pure function of already-resolved identity.
pub fn allowed_to(user: &User, roles: &[Role]) -> ApiResult<()> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "you are not allowed to access this route".to_string(),
        ))
    }
}
