//! Magic-link token models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single-use login token bound to an email address.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MagicLink {
    pub id: String,
    pub email: String,
    pub token: String,
    pub expires_at: String,
    pub used: bool,
    pub created_at: String,
}

impl MagicLink {
    /// Check if the token is past its expiry instant
    pub fn is_expired(&self) -> bool {
        if let Ok(expires) = chrono::DateTime::parse_from_rfc3339(&self.expires_at) {
            expires < chrono::Utc::now()
        } else {
            true // Treat parse errors as expired
        }
    }
}

/// Request to send a magic link to an email address
#[derive(Debug, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
}

/// Request to verify a magic-link token
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}
