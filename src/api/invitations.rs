//! Invitation endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{
    AcceptInvitationRequest, AcceptInvitationResponse, CreateInvitationRequest, Invitation,
    InvitationStatus, UpdateInvitationStatusRequest,
};
use crate::invitations::AcceptOutcome;
use crate::notifications::render_invitation_email;
use crate::AppState;

use super::error::ApiError;

fn validate_create_request(req: &CreateInvitationRequest) -> Result<(), ApiError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(ApiError::bad_request("First and last name are required"));
    }
    for (field, value) in [
        ("manager_id", &req.manager_id),
        ("template_id", &req.template_id),
        ("period_id", &req.period_id),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::bad_request(format!("{} is required", field)));
        }
    }
    Ok(())
}

/// Create a new invitation and email it to the recipient
///
/// POST /api/invitations
pub async fn create_invitation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<Invitation>), ApiError> {
    validate_create_request(&req)?;

    let ttl_days = state.config.auth.invitation_ttl_days;
    let invitation = state.invitations().create(&req, ttl_days).await?;

    let accept_url = format!(
        "{}/invitations/accept?token={}",
        state.config.server.public_url, invitation.token
    );
    let (subject, text, html) =
        render_invitation_email(&invitation.first_name, &accept_url, ttl_days);

    if let Err(e) = state
        .mailer
        .send(&invitation.email, &subject, &text, &html)
        .await
    {
        tracing::error!(error = %e, "Failed to send invitation email");
    }

    Ok((StatusCode::CREATED, Json(invitation)))
}

/// Accept an invitation, provisioning the new account
///
/// POST /api/invitations/:id/accept
pub async fn accept_invitation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AcceptInvitationRequest>,
) -> Result<Json<AcceptInvitationResponse>, ApiError> {
    match state.invitations().accept(&id, &req).await? {
        AcceptOutcome::Accepted {
            user_id,
            assessment_instance_id,
        } => Ok(Json(AcceptInvitationResponse {
            user_id,
            assessment_instance_id,
        })),
        AcceptOutcome::NotFound => Err(ApiError::not_found("Invitation not found")),
        AcceptOutcome::AlreadyUsedOrExpired => {
            Err(ApiError::gone("Invitation already used or expired"))
        }
        AcceptOutcome::EmailMismatch => {
            Err(ApiError::bad_request("Email does not match invitation"))
        }
        AcceptOutcome::UserExists => {
            Err(ApiError::conflict("A user with this email already exists"))
        }
    }
}

/// Look up an invitation by its token (used by the accept page)
///
/// GET /api/invitations/token/:token
pub async fn get_by_token(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<Invitation>, ApiError> {
    state
        .invitations()
        .get_by_token(&token)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Invitation not found"))
}

/// List invitations issued by a manager
///
/// GET /api/invitations/manager/:manager_id
pub async fn list_by_manager(
    State(state): State<Arc<AppState>>,
    Path(manager_id): Path<String>,
) -> Result<Json<Vec<Invitation>>, ApiError> {
    let invitations = state.invitations().list_by_manager(&manager_id).await?;
    Ok(Json(invitations))
}

/// List invitations addressed to an email
///
/// GET /api/invitations/email/:email
pub async fn list_by_email(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Invitation>>, ApiError> {
    let invitations = state.invitations().list_by_email(&email).await?;
    Ok(Json(invitations))
}

/// Administratively overwrite an invitation's status
///
/// PUT /api/invitations/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateInvitationStatusRequest>,
) -> Result<Json<Invitation>, ApiError> {
    let status: InvitationStatus = req
        .status
        .parse()
        .map_err(|e: String| ApiError::bad_request(e))?;

    let invitation = state.invitations().update_status(&id, status).await?;
    Ok(Json(invitation))
}

/// Delete an invitation. Deleting a missing id is still 204.
///
/// DELETE /api/invitations/:id
pub async fn delete_invitation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.invitations().delete(&id).await?;
    if deleted {
        tracing::info!(invitation = %id, "Deleted invitation");
    }
    Ok(StatusCode::NO_CONTENT)
}
