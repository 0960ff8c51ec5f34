//! Invitation model - a pending offer of membership or ownership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role an invitation grants once accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvitationRole {
    Member,
    Owner,
}

impl InvitationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationRole::Member => "member",
            InvitationRole::Owner => "owner",
        }
    }

    /// Parse the `{role}` path segment.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "member" => Some(InvitationRole::Member),
            "owner" => Some(InvitationRole::Owner),
            _ => None,
        }
    }
}

/// Invitation state codes. Everything but `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
            InvitationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

/// Invitation entity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinOrganizationInvitation {
    /// Global id of the target organization
    pub organization: String,
    pub user: String,
    pub role: InvitationRole,
    pub status: InvitationStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
}

impl JoinOrganizationInvitation {
    /// Create a new pending invitation.
    pub fn new(organization: String, user: String, role: InvitationRole) -> Self {
        Self {
            organization,
            user,
            role,
            status: InvitationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_invitation_is_pending() {
        let inv = JoinOrganizationInvitation::new(
            "acme".to_string(),
            "alice".to_string(),
            InvitationRole::Owner,
        );
        assert!(inv.is_pending());
        assert!(!inv.status.is_terminal());
    }

    #[test]
    fn test_role_round_trips_through_path_segment() {
        assert_eq!(InvitationRole::parse("member"), Some(InvitationRole::Member));
        assert_eq!(InvitationRole::parse("owner"), Some(InvitationRole::Owner));
        assert_eq!(InvitationRole::parse("Owner"), None);
        assert_eq!(
            InvitationRole::parse(InvitationRole::Owner.as_str()),
            Some(InvitationRole::Owner)
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(InvitationStatus::Cancelled).unwrap();
        assert_eq!(json, "cancelled");
        assert!(InvitationStatus::Rejected.is_terminal());
    }
}
