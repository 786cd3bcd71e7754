//! Invitation lifecycle and acceptance.
//!
//! Acceptance is the one multi-entity write in the system: within a
//! single transaction the invitation flips to `accepted` via a
//! conditional update on `status = 'pending'`, then a user, an
//! assessment instance, and a manager relationship are created. Of two
//! racing acceptance attempts exactly one commits; the loser sees none
//! of the winner's side effects.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::generate_token;
use crate::db::{
    AcceptInvitationRequest, CreateInvitationRequest, DbPool, InstanceStatus, Invitation,
    InvitationStatus, User,
};

/// Outcome of an acceptance attempt. Expected business failures are
/// variants, not errors; only storage failures surface as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accepted {
        user_id: String,
        assessment_instance_id: String,
    },
    /// No invitation with the given id
    NotFound,
    /// Invitation is not pending, or its expiry has passed
    AlreadyUsedOrExpired,
    /// Supplied email does not match the invitation's email
    EmailMismatch,
    /// An account with this email already exists
    UserExists,
}

#[derive(Clone)]
pub struct InvitationService {
    db: DbPool,
}

impl InvitationService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Create a pending invitation with a fresh token and TTL
    pub async fn create(
        &self,
        req: &CreateInvitationRequest,
        ttl_days: i64,
    ) -> Result<Invitation, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let token = generate_token();
        let now = Utc::now();
        let expires_at = (now + Duration::days(ttl_days)).to_rfc3339();

        sqlx::query(
            "INSERT INTO invitations \
             (id, manager_id, template_id, period_id, email, first_name, last_name, \
              status, token, invited_at, expires_at, reminder_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(&id)
        .bind(&req.manager_id)
        .bind(&req.template_id)
        .bind(&req.period_id)
        .bind(req.email.trim().to_lowercase())
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(InvitationStatus::Pending.to_string())
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(&expires_at)
        .execute(&self.db)
        .await?;

        let invitation = sqlx::query_as("SELECT * FROM invitations WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.db)
            .await?;

        tracing::info!(invitation = %id, manager = %req.manager_id, "Created invitation");

        Ok(invitation)
    }

    /// Accept an invitation, provisioning the subordinate account.
    ///
    /// Checks run in order and short-circuit: existence, pending and
    /// unexpired, email match, no existing account. The four writes
    /// (user, assessment instance, manager relationship, status flip)
    /// commit or roll back as one unit.
    pub async fn accept(
        &self,
        invitation_id: &str,
        req: &AcceptInvitationRequest,
    ) -> Result<AcceptOutcome, sqlx::Error> {
        // Malformed ids resolve to not-found, not an error
        if invitation_id.is_empty() {
            return Ok(AcceptOutcome::NotFound);
        }

        let invitation: Option<Invitation> = sqlx::query_as("SELECT * FROM invitations WHERE id = ?")
            .bind(invitation_id)
            .fetch_optional(&self.db)
            .await?;

        let Some(invitation) = invitation else {
            return Ok(AcceptOutcome::NotFound);
        };

        if !invitation.is_pending() || invitation.is_expired() {
            return Ok(AcceptOutcome::AlreadyUsedOrExpired);
        }

        let email = req.email.trim().to_lowercase();
        if invitation.email.to_lowercase() != email {
            return Ok(AcceptOutcome::EmailMismatch);
        }

        let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.db)
            .await?;
        if existing.is_some() {
            return Ok(AcceptOutcome::UserExists);
        }

        let user_id = Uuid::new_v4().to_string();
        let instance_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.db.begin().await?;

        // Conditional flip first: it is the race gate. If another
        // acceptance committed since the read above, zero rows match and
        // the transaction carries no writes to roll back.
        let flipped = sqlx::query(
            "UPDATE invitations SET status = ?, accepted_at = ? WHERE id = ? AND status = ?",
        )
        .bind(InvitationStatus::Accepted.to_string())
        .bind(&now)
        .bind(invitation_id)
        .bind(InvitationStatus::Pending.to_string())
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(AcceptOutcome::AlreadyUsedOrExpired);
        }

        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, role, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 'user', 1, ?, ?)",
        )
        .bind(&user_id)
        .bind(&email)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO assessment_instances (id, user_id, period_id, template_id, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&instance_id)
        .bind(&user_id)
        .bind(&invitation.period_id)
        .bind(&invitation.template_id)
        .bind(InstanceStatus::Pending.to_string())
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO manager_relationships (id, manager_id, subordinate_id, period_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&invitation.manager_id)
        .bind(&user_id)
        .bind(&invitation.period_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            invitation = %invitation_id,
            user = %user_id,
            manager = %invitation.manager_id,
            "Invitation accepted"
        );

        Ok(AcceptOutcome::Accepted {
            user_id,
            assessment_instance_id: instance_id,
        })
    }

    /// Look up an invitation by its token
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM invitations WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.db)
            .await
    }

    /// List invitations issued by a manager, newest first
    pub async fn list_by_manager(&self, manager_id: &str) -> Result<Vec<Invitation>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM invitations WHERE manager_id = ? ORDER BY invited_at DESC")
            .bind(manager_id)
            .fetch_all(&self.db)
            .await
    }

    /// List invitations addressed to an email, newest first
    pub async fn list_by_email(&self, email: &str) -> Result<Vec<Invitation>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM invitations WHERE email = ? ORDER BY invited_at DESC",
        )
        .bind(email.trim().to_lowercase())
        .fetch_all(&self.db)
        .await
    }

    /// Administrative status overwrite for paths other than acceptance
    /// (e.g. manual revocation). Errors if the invitation does not exist.
    pub async fn update_status(
        &self,
        id: &str,
        status: InvitationStatus,
    ) -> Result<Invitation, sqlx::Error> {
        let result = sqlx::query("UPDATE invitations SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        sqlx::query_as("SELECT * FROM invitations WHERE id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await
    }

    /// Delete an invitation. Idempotent: a missing id is a no-op.
    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invitations WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record that a reminder email went out for a pending invitation
    pub async fn mark_reminder_sent(&self, id: &str) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invitations SET reminder_count = reminder_count + 1, last_reminder_sent = ? \
             WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }
}
