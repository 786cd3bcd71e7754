//! Assessment instance and manager relationship models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Assessment instance lifecycle states. Only `pending` is set by this
/// service; the rest are driven by the assessment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Pending,
    InProgress,
    Completed,
    Archived,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceStatus::Pending => "pending",
            InstanceStatus::InProgress => "in_progress",
            InstanceStatus::Completed => "completed",
            InstanceStatus::Archived => "archived",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for InstanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InstanceStatus::Pending),
            "in_progress" => Ok(InstanceStatus::InProgress),
            "completed" => Ok(InstanceStatus::Completed),
            "archived" => Ok(InstanceStatus::Archived),
            _ => Err(format!("Unknown instance status: {}", s)),
        }
    }
}

/// One user's assessment for a given period and template
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssessmentInstance {
    pub id: String,
    pub user_id: String,
    pub period_id: String,
    pub template_id: String,
    pub status: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub due_date: Option<String>,
    pub created_at: String,
}

/// Directed manager → subordinate edge scoped to an assessment period
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManagerRelationship {
    pub id: String,
    pub manager_id: String,
    pub subordinate_id: String,
    pub period_id: String,
    pub created_at: String,
}
