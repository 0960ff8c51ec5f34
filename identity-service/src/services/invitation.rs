//! Invitation workflow: `Pending` moves to exactly one of `Accepted`,
//! `Rejected` or `Cancelled`.

use std::sync::Arc;

use super::error::{ServiceError, StoreError};
use super::store::{InvitationStore, OrganizationStore, UserDirectory};
use crate::models::{InvitationRole, InvitationStatus, JoinOrganizationInvitation};

#[derive(Clone)]
pub struct InvitationService {
    organizations: Arc<dyn OrganizationStore>,
    users: Arc<dyn UserDirectory>,
    invitations: Arc<dyn InvitationStore>,
}

impl InvitationService {
    pub fn new(
        organizations: Arc<dyn OrganizationStore>,
        users: Arc<dyn UserDirectory>,
        invitations: Arc<dyn InvitationStore>,
    ) -> Self {
        Self {
            organizations,
            users,
            invitations,
        }
    }

    /// Create a pending invitation. Preconditions are checked in order and the
    /// first failure wins: organization exists, user exists, user does not
    /// already hold the role.
    #[tracing::instrument(skip(self))]
    pub async fn invite(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
    ) -> Result<JoinOrganizationInvitation, ServiceError> {
        let organization = self
            .organizations
            .get(global_id)
            .await?
            .ok_or_else(|| ServiceError::OrganizationNotFound(global_id.to_string()))?;

        if !self.users.exists(username).await? {
            return Err(ServiceError::UserNotFound(username.to_string()));
        }

        if organization.is_owner(username) {
            return Err(ServiceError::AlreadyOwner {
                organization: global_id.to_string(),
                user: username.to_string(),
            });
        }
        if role == InvitationRole::Member && organization.is_member(username) {
            return Err(ServiceError::AlreadyMember {
                organization: global_id.to_string(),
                user: username.to_string(),
            });
        }

        let invitation =
            JoinOrganizationInvitation::new(global_id.to_string(), username.to_string(), role);
        match self.invitations.save(&invitation).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => {
                return Err(ServiceError::InvitationPending {
                    organization: global_id.to_string(),
                    user: username.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(globalid = %global_id, user = %username, role = role.as_str(), "Invitation created");
        Ok(invitation)
    }

    pub async fn pending_for_organization(
        &self,
        global_id: &str,
    ) -> Result<Vec<JoinOrganizationInvitation>, ServiceError> {
        Ok(self.invitations.pending_by_organization(global_id).await?)
    }

    /// Owner revokes every pending invitation for `username`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, global_id: &str, username: &str) -> Result<(), ServiceError> {
        let cancelled = self.invitations.cancel_pending(global_id, username).await?;
        if cancelled == 0 {
            return Err(ServiceError::InvitationNotFound {
                organization: global_id.to_string(),
                user: username.to_string(),
            });
        }
        tracing::info!(globalid = %global_id, user = %username, cancelled, "Invitations cancelled");
        Ok(())
    }

    /// Invitee accepts. The pending invitation is claimed first, so a
    /// concurrent cancel or reject wins and membership is left untouched. A
    /// failed membership write returns the invitation to `Pending`.
    #[tracing::instrument(skip(self))]
    pub async fn accept(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
    ) -> Result<JoinOrganizationInvitation, ServiceError> {
        if self
            .invitations
            .find_pending(global_id, username, role)
            .await?
            .is_none()
        {
            return Err(self.not_found(global_id, username));
        }

        if role == InvitationRole::Member
            && self.organizations.is_owner(global_id, username).await?
        {
            return Err(ServiceError::AlreadyOwner {
                organization: global_id.to_string(),
                user: username.to_string(),
            });
        }

        let invitation = self
            .invitations
            .update_status(global_id, username, role, InvitationStatus::Accepted)
            .await?
            .ok_or_else(|| self.not_found(global_id, username))?;

        let applied = match role {
            InvitationRole::Member => self.organizations.add_member(global_id, username).await,
            InvitationRole::Owner => self.organizations.add_owner(global_id, username).await,
        };
        let failure = match applied {
            Ok(true) => None,
            Ok(false) => Some(ServiceError::OrganizationNotFound(global_id.to_string())),
            Err(e) => Some(ServiceError::from(e)),
        };
        if let Some(err) = failure {
            tracing::warn!(globalid = %global_id, user = %username, error = %err, "Membership change failed, reopening invitation");
            self.invitations.reopen(global_id, username, role).await?;
            return Err(err);
        }

        tracing::info!(globalid = %global_id, user = %username, role = role.as_str(), "Invitation accepted");
        Ok(invitation)
    }

    /// Invitee declines; membership is untouched.
    #[tracing::instrument(skip(self))]
    pub async fn reject(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
    ) -> Result<(), ServiceError> {
        self.invitations
            .update_status(global_id, username, role, InvitationStatus::Rejected)
            .await?
            .ok_or_else(|| self.not_found(global_id, username))?;

        tracing::info!(globalid = %global_id, user = %username, role = role.as_str(), "Invitation rejected");
        Ok(())
    }

    fn not_found(&self, global_id: &str, username: &str) -> ServiceError {
        ServiceError::InvitationNotFound {
            organization: global_id.to_string(),
            user: username.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Organization;
    use crate::services::memory::MockStore;

    fn setup() -> (Arc<MockStore>, InvitationService) {
        let store = Arc::new(MockStore::new());
        let mut org = Organization::new("acme");
        org.owners.push("olivia".to_string());
        org.members.push("mike".to_string());
        store.insert_organization(org).unwrap();
        for user in ["olivia", "mike", "newbie"] {
            store.insert_user(user).unwrap();
        }
        let svc = InvitationService::new(store.clone(), store.clone(), store.clone());
        (store, svc)
    }

    #[tokio::test]
    async fn test_invite_checks_organization_before_user() {
        let (_, svc) = setup();
        let err = svc
            .invite("missing", "ghost", InvitationRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::OrganizationNotFound(_)));

        let err = svc
            .invite("acme", "ghost", InvitationRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_invite_owner_as_member_conflicts() {
        let (_, svc) = setup();
        let err = svc
            .invite("acme", "olivia", InvitationRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyOwner { .. }));

        let err = svc
            .invite("acme", "mike", InvitationRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyMember { .. }));
    }

    #[tokio::test]
    async fn test_member_may_be_invited_to_ownership() {
        let (store, svc) = setup();
        svc.invite("acme", "mike", InvitationRole::Owner).await.unwrap();

        let accepted = svc
            .accept("acme", "mike", InvitationRole::Owner)
            .await
            .unwrap();
        assert_eq!(accepted.status, InvitationStatus::Accepted);

        let org = store.organization("acme").unwrap();
        assert!(org.is_owner("mike"));
        assert!(!org.is_member("mike"));
    }

    #[tokio::test]
    async fn test_duplicate_pending_invitation_conflicts() {
        let (_, svc) = setup();
        svc.invite("acme", "newbie", InvitationRole::Member)
            .await
            .unwrap();
        let err = svc
            .invite("acme", "newbie", InvitationRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvitationPending { .. }));
    }

    #[tokio::test]
    async fn test_accept_without_pending_invitation() {
        let (_, svc) = setup();
        let err = svc
            .accept("acme", "newbie", InvitationRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvitationNotFound { .. }));
    }

    /// Owner cancels right after the invitee's lookup saw the invitation pending.
    struct CancelAfterLookup(Arc<MockStore>);

    #[async_trait::async_trait]
    impl InvitationStore for CancelAfterLookup {
        async fn save(&self, invitation: &JoinOrganizationInvitation) -> Result<(), StoreError> {
            InvitationStore::save(self.0.as_ref(), invitation).await
        }

        async fn pending_by_organization(
            &self,
            global_id: &str,
        ) -> Result<Vec<JoinOrganizationInvitation>, StoreError> {
            self.0.pending_by_organization(global_id).await
        }

        async fn find_pending(
            &self,
            global_id: &str,
            username: &str,
            role: InvitationRole,
        ) -> Result<Option<JoinOrganizationInvitation>, StoreError> {
            let found = self.0.find_pending(global_id, username, role).await?;
            self.0.cancel_pending(global_id, username).await?;
            Ok(found)
        }

        async fn update_status(
            &self,
            global_id: &str,
            username: &str,
            role: InvitationRole,
            status: InvitationStatus,
        ) -> Result<Option<JoinOrganizationInvitation>, StoreError> {
            self.0.update_status(global_id, username, role, status).await
        }

        async fn reopen(
            &self,
            global_id: &str,
            username: &str,
            role: InvitationRole,
        ) -> Result<(), StoreError> {
            self.0.reopen(global_id, username, role).await
        }

        async fn cancel_pending(&self, global_id: &str, username: &str) -> Result<u64, StoreError> {
            self.0.cancel_pending(global_id, username).await
        }
    }

    #[tokio::test]
    async fn test_cancel_racing_accept_leaves_membership_untouched() {
        let (store, svc) = setup();
        svc.invite("acme", "newbie", InvitationRole::Member)
            .await
            .unwrap();

        let racing = InvitationService::new(
            store.clone(),
            store.clone(),
            Arc::new(CancelAfterLookup(store.clone())),
        );
        let err = racing
            .accept("acme", "newbie", InvitationRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvitationNotFound { .. }));

        assert!(!store.organization("acme").unwrap().is_member("newbie"));
        assert_eq!(
            store.invitations_for("acme")[0].status,
            InvitationStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_failed_membership_write_reopens_invitation() {
        let (store, svc) = setup();
        svc.invite("acme", "newbie", InvitationRole::Owner)
            .await
            .unwrap();
        store.organizations.lock().unwrap().remove("acme");

        let err = svc
            .accept("acme", "newbie", InvitationRole::Owner)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::OrganizationNotFound(_)));
        assert_eq!(
            store.invitations_for("acme")[0].status,
            InvitationStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_reject_leaves_membership_untouched() {
        let (store, svc) = setup();
        svc.invite("acme", "newbie", InvitationRole::Member)
            .await
            .unwrap();
        svc.reject("acme", "newbie", InvitationRole::Member)
            .await
            .unwrap();

        let org = store.organization("acme").unwrap();
        assert!(!org.is_member("newbie"));
        let all = store.invitations_for("acme");
        assert_eq!(all[0].status, InvitationStatus::Rejected);

        // terminal: a second reject finds nothing pending
        assert!(svc
            .reject("acme", "newbie", InvitationRole::Member)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_cancel_requires_pending_invitation() {
        let (store, svc) = setup();
        assert!(matches!(
            svc.cancel("acme", "newbie").await.unwrap_err(),
            ServiceError::InvitationNotFound { .. }
        ));

        svc.invite("acme", "newbie", InvitationRole::Owner)
            .await
            .unwrap();
        svc.cancel("acme", "newbie").await.unwrap();
        assert_eq!(
            store.invitations_for("acme")[0].status,
            InvitationStatus::Cancelled
        );
        assert!(svc.pending_for_organization("acme").await.unwrap().is_empty());
    }
}
