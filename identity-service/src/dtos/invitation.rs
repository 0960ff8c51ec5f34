use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{InvitationRole, InvitationStatus, JoinOrganizationInvitation};

/// Body of the member and owner invitation endpoints.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MemberRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    #[schema(example = "alice")]
    pub username: String,
}

/// Entry of the pending-invitation listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct PendingInvitationResponse {
    pub role: InvitationRole,
    pub user: String,
}

impl From<JoinOrganizationInvitation> for PendingInvitationResponse {
    fn from(inv: JoinOrganizationInvitation) -> Self {
        Self {
            role: inv.role,
            user: inv.user,
        }
    }
}

/// Invitation as returned by the invite and accept endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationResponse {
    #[schema(example = "acme")]
    pub organization: String,
    #[schema(example = "alice")]
    pub user: String,
    pub role: InvitationRole,
    pub status: InvitationStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<JoinOrganizationInvitation> for InvitationResponse {
    fn from(inv: JoinOrganizationInvitation) -> Self {
        Self {
            organization: inv.organization,
            user: inv.user,
            role: inv.role,
            status: inv.status,
            created_at: inv.created_at,
        }
    }
}
