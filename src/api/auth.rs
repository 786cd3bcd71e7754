//! Magic-link authentication endpoints.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::{MagicLinkRequest, UserResponse, VerifyRequest};
use crate::notifications::render_magic_link_email;
use crate::AppState;

use super::error::ApiError;

/// Request a magic link for an email address
///
/// POST /api/auth/magic-link
///
/// Always answers 202 for well-formed requests so the endpoint does not
/// reveal whether an account exists.
pub async fn request_magic_link(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MagicLinkRequest>,
) -> Result<StatusCode, ApiError> {
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }

    let token = state.magic_links().issue(email).await?;

    let ttl_hours = state.config.auth.magic_link_ttl_hours;
    let login_url = format!(
        "{}/auth/verify?token={}",
        state.config.server.public_url, token
    );
    let (subject, text, html) = render_magic_link_email(&login_url, ttl_hours);

    // Delivery failure is logged but does not change the response;
    // the token is already issued and the caller learns nothing extra.
    if let Err(e) = state.mailer.send(email, &subject, &text, &html).await {
        tracing::error!(error = %e, "Failed to send magic-link email");
    }

    Ok(StatusCode::ACCEPTED)
}

/// Verify a magic-link token and return the authenticated user
///
/// POST /api/auth/verify
pub async fn verify_magic_link(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    match state.magic_links().verify(&req.token).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::unauthorized("Invalid or expired login link")),
    }
}
