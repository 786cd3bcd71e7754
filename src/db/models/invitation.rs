//! Invitation models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Invitation lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Waiting for the recipient to accept
    Pending,
    /// Accepted exactly once; terminal
    Accepted,
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationStatus::Pending => write!(f, "pending"),
            InvitationStatus::Accepted => write!(f, "accepted"),
        }
    }
}

impl std::str::FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            _ => Err(format!("Unknown invitation status: {}", s)),
        }
    }
}

/// A manager-issued offer that provisions a subordinate account on acceptance
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: String,
    pub manager_id: String,
    pub template_id: String,
    pub period_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub status: String,
    pub token: String,
    pub invited_at: String,
    pub accepted_at: Option<String>,
    pub expires_at: String,
    pub reminder_count: i64,
    pub last_reminder_sent: Option<String>,
}

impl Invitation {
    /// Check if the invitation has expired
    pub fn is_expired(&self) -> bool {
        if let Ok(expires) = chrono::DateTime::parse_from_rfc3339(&self.expires_at) {
            expires < chrono::Utc::now()
        } else {
            true // Treat parse errors as expired
        }
    }

    /// Check if the invitation is still waiting for acceptance
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending.to_string()
    }
}

/// Request to create a new invitation
#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub manager_id: String,
    pub template_id: String,
    pub period_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Payload the recipient submits when accepting an invitation.
///
/// The password is accepted for wire compatibility but credential
/// issuance is delegated to an external store; it is never persisted here.
#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub password: String,
}

/// Ids of the records provisioned by a successful acceptance
#[derive(Debug, Serialize)]
pub struct AcceptInvitationResponse {
    pub user_id: String,
    pub assessment_instance_id: String,
}

/// Request to administratively overwrite an invitation's status
#[derive(Debug, Deserialize)]
pub struct UpdateInvitationStatusRequest {
    pub status: String,
}
