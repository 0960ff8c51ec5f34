//! Store adapters consumed by the identity engine.
//!
//! Every trait is implemented by [`MongoDb`](super::database::MongoDb) and by
//! the in-memory [`MockStore`](super::memory::MockStore).

use async_trait::async_trait;

use super::error::StoreError;
use crate::models::{
    AccessToken, Authorization, GlobalConfig, InvitationRole, InvitationStatus,
    JoinOrganizationInvitation, Organization,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn get(&self, global_id: &str) -> StoreResult<Option<Organization>>;

    /// Organizations whose global id is in `global_ids`, in no particular order.
    async fn get_many(&self, global_ids: &[String]) -> StoreResult<Vec<Organization>>;

    /// Organizations that have `global_id` as a strict dot-prefix.
    async fn get_descendants(&self, global_id: &str) -> StoreResult<Vec<Organization>>;

    /// Insert a new organization; `StoreError::Duplicate` if the id is taken.
    async fn create(&self, organization: &Organization) -> StoreResult<()>;

    /// Full-document replace. Returns false when nothing matched.
    async fn save(&self, organization: &Organization) -> StoreResult<bool>;

    async fn is_member(&self, global_id: &str, username: &str) -> StoreResult<bool>;

    async fn is_owner(&self, global_id: &str, username: &str) -> StoreResult<bool>;

    async fn add_member(&self, global_id: &str, username: &str) -> StoreResult<bool>;

    /// Add to `owners` and pull from `members` in one update.
    async fn add_owner(&self, global_id: &str, username: &str) -> StoreResult<bool>;

    async fn remove_member(&self, global_id: &str, username: &str) -> StoreResult<bool>;

    async fn remove_owner(&self, global_id: &str, username: &str) -> StoreResult<bool>;
}

/// Resolves opaque bearer strings. Expired tokens resolve to `None`.
#[async_trait]
pub trait AccessTokenResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> StoreResult<Option<AccessToken>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, username: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Persist a new invitation; `StoreError::Duplicate` if an identical one is pending.
    async fn save(&self, invitation: &JoinOrganizationInvitation) -> StoreResult<()>;

    async fn pending_by_organization(
        &self,
        global_id: &str,
    ) -> StoreResult<Vec<JoinOrganizationInvitation>>;

    async fn find_pending(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
    ) -> StoreResult<Option<JoinOrganizationInvitation>>;

    /// Move a pending invitation to `status`. Returns the updated invitation,
    /// or `None` if no matching invitation was pending.
    async fn update_status(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
        status: InvitationStatus,
    ) -> StoreResult<Option<JoinOrganizationInvitation>>;

    /// Return the most recently accepted invitation to `Pending`.
    async fn reopen(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
    ) -> StoreResult<()>;

    /// Cancel every pending invitation for `username`. Returns how many changed.
    async fn cancel_pending(&self, global_id: &str, username: &str) -> StoreResult<u64>;
}

#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    async fn get_authorization(
        &self,
        username: &str,
        granted_to: &str,
    ) -> StoreResult<Option<Authorization>>;
}

#[async_trait]
pub trait GlobalConfigStore: Send + Sync {
    async fn get_by_key(&self, key: &str) -> StoreResult<Option<GlobalConfig>>;

    /// `StoreError::Duplicate` if the key already exists.
    async fn insert(&self, config: &GlobalConfig) -> StoreResult<()>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}
