//! HTTP surface: route assembly and admin-token authentication.

pub mod auth;
pub mod error;
pub mod invitations;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Manager/administrative operations sit behind the admin token
    let admin_routes = Router::new()
        .route("/api/invitations", post(invitations::create_invitation))
        .route(
            "/api/invitations/manager/:manager_id",
            get(invitations::list_by_manager),
        )
        .route(
            "/api/invitations/email/:email",
            get(invitations::list_by_email),
        )
        .route(
            "/api/invitations/:id/status",
            put(invitations::update_status),
        )
        .route("/api/invitations/:id", delete(invitations::delete_invitation))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/api/auth/magic-link", post(auth::request_magic_link))
        .route("/api/auth/verify", post(auth::verify_magic_link))
        .route(
            "/api/invitations/token/:token",
            get(invitations::get_by_token),
        )
        .route(
            "/api/invitations/:id/accept",
            post(invitations::accept_invitation),
        )
        .route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Middleware guarding administrative routes with the configured admin
/// token. Constant-time comparison to prevent timing attacks.
async fn admin_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = if let Some(header) = auth_header {
        if let Some(bearer) = header.strip_prefix("Bearer ") {
            bearer.to_string()
        } else {
            header.to_string()
        }
    } else if let Some(api_key) = request
        .headers()
        .get("X-API-Key")
        .and_then(|h| h.to_str().ok())
    {
        api_key.to_string()
    } else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let admin_token = state.config.auth.admin_token.as_bytes();
    let provided = token.as_bytes();

    // Only compare if lengths match (constant-time check)
    if admin_token.len() == provided.len() && admin_token.ct_eq(provided).into() {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
