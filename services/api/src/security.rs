//! Password hashing and token digest utilities
//!
//! Passwords use argon2 (adaptive, at least as strong as the bcrypt
//! cost-12 setting this replaces). Refresh and password-reset tokens
//! are persisted only as SHA-256 hex digests of the plaintext.

use anyhow::Result;
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Hash a plaintext password with argon2 and a fresh salt.
pub fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let digest = argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?
        .to_string();
    Ok(digest)
}

/// Verify a plaintext password against a stored argon2 digest.
pub fn verify_password(plaintext: &str, digest: &str) -> Result<bool> {
    let parsed = PasswordHash::new(digest)
        .map_err(|e| anyhow::anyhow!("failed to parse password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok())
}

/// SHA-256 hash of a raw token, hex-encoded. This is the only form in
/// which refresh and reset tokens are persisted.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a high-entropy random token (32 bytes, hex-encoded) for
/// the password-reset flow.
pub fn generate_reset_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}
