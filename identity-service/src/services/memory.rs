use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::error::StoreError;
use super::store::{
    AccessTokenResolver, AuthorizationStore, GlobalConfigStore, HealthCheck, InvitationStore,
    OrganizationStore, StoreResult, UserDirectory,
};
use crate::models::{
    AccessToken, Authorization, GlobalConfig, InvitationRole, InvitationStatus,
    JoinOrganizationInvitation, Organization,
};

/// In-memory implementation of every store trait, used by tests.
///
/// Organizations live in a `BTreeMap` so descendant lookups are the same
/// ordered range scan the Mongo adapter performs.
pub struct MockStore {
    pub organizations: Mutex<BTreeMap<String, Organization>>,
    pub tokens: Mutex<HashMap<String, AccessToken>>,
    pub users: Mutex<HashSet<String>>,
    pub invitations: Mutex<Vec<JoinOrganizationInvitation>>,
    pub authorizations: Mutex<HashMap<(String, String), Authorization>>,
    pub global_config: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> StoreResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|e| StoreError::Internal(anyhow::anyhow!("Mock {} mutex poisoned: {}", name, e)))
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            organizations: Mutex::new(BTreeMap::new()),
            tokens: Mutex::new(HashMap::new()),
            users: Mutex::new(HashSet::new()),
            invitations: Mutex::new(Vec::new()),
            authorizations: Mutex::new(HashMap::new()),
            global_config: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail as if the backing store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Internal(anyhow::anyhow!("store unavailable")));
        }
        Ok(())
    }

    pub fn insert_organization(&self, organization: Organization) -> StoreResult<()> {
        lock(&self.organizations, "organizations")?
            .insert(organization.global_id.clone(), organization);
        Ok(())
    }

    pub fn insert_token(&self, token: AccessToken) -> StoreResult<()> {
        lock(&self.tokens, "tokens")?.insert(token.access_token.clone(), token);
        Ok(())
    }

    pub fn insert_user(&self, username: &str) -> StoreResult<()> {
        lock(&self.users, "users")?.insert(username.to_string());
        Ok(())
    }

    pub fn insert_authorization(&self, authorization: Authorization) -> StoreResult<()> {
        lock(&self.authorizations, "authorizations")?.insert(
            (
                authorization.username.clone(),
                authorization.granted_to.clone(),
            ),
            authorization,
        );
        Ok(())
    }

    pub fn organization(&self, global_id: &str) -> Option<Organization> {
        self.organizations
            .lock()
            .ok()
            .and_then(|orgs| orgs.get(global_id).cloned())
    }

    pub fn invitations_for(&self, global_id: &str) -> Vec<JoinOrganizationInvitation> {
        self.invitations
            .lock()
            .map(|all| {
                all.iter()
                    .filter(|inv| inv.organization == global_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn update_organization<F>(&self, global_id: &str, mutate: F) -> StoreResult<bool>
    where
        F: FnOnce(&mut Organization),
    {
        self.check_available()?;
        let mut orgs = lock(&self.organizations, "organizations")?;
        match orgs.get_mut(global_id) {
            Some(org) => {
                mutate(org);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn add_unique(list: &mut Vec<String>, username: &str) {
    if !list.iter().any(|u| u == username) {
        list.push(username.to_string());
    }
}

fn matches_pending(
    inv: &JoinOrganizationInvitation,
    global_id: &str,
    username: &str,
    role: InvitationRole,
) -> bool {
    inv.is_pending() && inv.organization == global_id && inv.user == username && inv.role == role
}

#[async_trait]
impl OrganizationStore for MockStore {
    async fn get(&self, global_id: &str) -> StoreResult<Option<Organization>> {
        self.check_available()?;
        Ok(lock(&self.organizations, "organizations")?
            .get(global_id)
            .cloned())
    }

    async fn get_many(&self, global_ids: &[String]) -> StoreResult<Vec<Organization>> {
        self.check_available()?;
        let orgs = lock(&self.organizations, "organizations")?;
        Ok(global_ids
            .iter()
            .filter_map(|id| orgs.get(id).cloned())
            .collect())
    }

    async fn get_descendants(&self, global_id: &str) -> StoreResult<Vec<Organization>> {
        self.check_available()?;
        let orgs = lock(&self.organizations, "organizations")?;
        let lower = format!("{}.", global_id);
        let upper = format!("{}/", global_id);
        Ok(orgs
            .range(lower..upper)
            .map(|(_, org)| org.clone())
            .collect())
    }

    async fn create(&self, organization: &Organization) -> StoreResult<()> {
        self.check_available()?;
        let mut orgs = lock(&self.organizations, "organizations")?;
        if orgs.contains_key(&organization.global_id) {
            return Err(StoreError::Duplicate);
        }
        orgs.insert(organization.global_id.clone(), organization.clone());
        Ok(())
    }

    async fn save(&self, organization: &Organization) -> StoreResult<bool> {
        let replacement = organization.clone();
        self.update_organization(&organization.global_id, move |org| *org = replacement)
    }

    async fn is_member(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        self.check_available()?;
        Ok(lock(&self.organizations, "organizations")?
            .get(global_id)
            .map(|org| org.is_member(username))
            .unwrap_or(false))
    }

    async fn is_owner(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        self.check_available()?;
        Ok(lock(&self.organizations, "organizations")?
            .get(global_id)
            .map(|org| org.is_owner(username))
            .unwrap_or(false))
    }

    async fn add_member(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        self.update_organization(global_id, |org| add_unique(&mut org.members, username))
    }

    async fn add_owner(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        self.update_organization(global_id, |org| {
            add_unique(&mut org.owners, username);
            org.members.retain(|m| m != username);
        })
    }

    async fn remove_member(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        self.update_organization(global_id, |org| org.members.retain(|m| m != username))
    }

    async fn remove_owner(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        self.update_organization(global_id, |org| org.owners.retain(|o| o != username))
    }
}

#[async_trait]
impl AccessTokenResolver for MockStore {
    async fn resolve(&self, token: &str) -> StoreResult<Option<AccessToken>> {
        self.check_available()?;
        let now = Utc::now();
        Ok(lock(&self.tokens, "tokens")?
            .get(token)
            .filter(|t| !t.is_expired(now))
            .cloned())
    }
}

#[async_trait]
impl UserDirectory for MockStore {
    async fn exists(&self, username: &str) -> StoreResult<bool> {
        self.check_available()?;
        Ok(lock(&self.users, "users")?.contains(username))
    }
}

#[async_trait]
impl InvitationStore for MockStore {
    async fn save(&self, invitation: &JoinOrganizationInvitation) -> StoreResult<()> {
        self.check_available()?;
        let mut all = lock(&self.invitations, "invitations")?;
        if invitation.is_pending()
            && all.iter().any(|inv| {
                matches_pending(inv, &invitation.organization, &invitation.user, invitation.role)
            })
        {
            return Err(StoreError::Duplicate);
        }
        all.push(invitation.clone());
        Ok(())
    }

    async fn pending_by_organization(
        &self,
        global_id: &str,
    ) -> StoreResult<Vec<JoinOrganizationInvitation>> {
        self.check_available()?;
        Ok(lock(&self.invitations, "invitations")?
            .iter()
            .filter(|inv| inv.is_pending() && inv.organization == global_id)
            .cloned()
            .collect())
    }

    async fn find_pending(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
    ) -> StoreResult<Option<JoinOrganizationInvitation>> {
        self.check_available()?;
        Ok(lock(&self.invitations, "invitations")?
            .iter()
            .find(|inv| matches_pending(inv, global_id, username, role))
            .cloned())
    }

    async fn update_status(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
        status: InvitationStatus,
    ) -> StoreResult<Option<JoinOrganizationInvitation>> {
        self.check_available()?;
        let mut all = lock(&self.invitations, "invitations")?;
        Ok(all
            .iter_mut()
            .find(|inv| matches_pending(inv, global_id, username, role))
            .map(|inv| {
                inv.status = status;
                inv.clone()
            }))
    }

    async fn reopen(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
    ) -> StoreResult<()> {
        self.check_available()?;
        if let Some(inv) = lock(&self.invitations, "invitations")?
            .iter_mut()
            .rev()
            .find(|inv| {
                inv.status == InvitationStatus::Accepted
                    && inv.organization == global_id
                    && inv.user == username
                    && inv.role == role
            })
        {
            inv.status = InvitationStatus::Pending;
        }
        Ok(())
    }

    async fn cancel_pending(&self, global_id: &str, username: &str) -> StoreResult<u64> {
        self.check_available()?;
        let mut cancelled = 0;
        for inv in lock(&self.invitations, "invitations")?.iter_mut() {
            if inv.is_pending() && inv.organization == global_id && inv.user == username {
                inv.status = InvitationStatus::Cancelled;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }
}

#[async_trait]
impl AuthorizationStore for MockStore {
    async fn get_authorization(
        &self,
        username: &str,
        granted_to: &str,
    ) -> StoreResult<Option<Authorization>> {
        self.check_available()?;
        Ok(lock(&self.authorizations, "authorizations")?
            .get(&(username.to_string(), granted_to.to_string()))
            .cloned())
    }
}

#[async_trait]
impl GlobalConfigStore for MockStore {
    async fn get_by_key(&self, key: &str) -> StoreResult<Option<GlobalConfig>> {
        self.check_available()?;
        Ok(lock(&self.global_config, "global config")?
            .get(key)
            .map(|value| GlobalConfig {
                key: key.to_string(),
                value: value.clone(),
            }))
    }

    async fn insert(&self, config: &GlobalConfig) -> StoreResult<()> {
        self.check_available()?;
        let mut values = lock(&self.global_config, "global config")?;
        if values.contains_key(&config.key) {
            return Err(StoreError::Duplicate);
        }
        values.insert(config.key.clone(), config.value.clone());
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for MockStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_descendant_range_excludes_lookalike_prefixes() {
        let store = MockStore::new();
        for id in ["acme", "acme.a", "acme.a.x", "acme-corp", "acmex", "acme.b"] {
            store.insert_organization(Organization::new(id)).unwrap();
        }

        let ids: Vec<String> = store
            .get_descendants("acme")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.global_id)
            .collect();
        assert_eq!(ids, vec!["acme.a", "acme.a.x", "acme.b"]);
    }

    #[tokio::test]
    async fn test_add_owner_pulls_from_members() {
        let store = MockStore::new();
        let mut org = Organization::new("acme");
        org.members.push("alice".to_string());
        store.insert_organization(org).unwrap();

        assert!(store.add_owner("acme", "alice").await.unwrap());
        let org = store.organization("acme").unwrap();
        assert!(org.is_owner("alice"));
        assert!(!org.is_member("alice"));

        assert!(!store.add_owner("missing", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_invitation_is_unique_per_role() {
        let store = MockStore::new();
        let inv = JoinOrganizationInvitation::new(
            "acme".to_string(),
            "bob".to_string(),
            InvitationRole::Member,
        );
        InvitationStore::save(&store, &inv).await.unwrap();
        assert!(matches!(
            InvitationStore::save(&store, &inv).await,
            Err(StoreError::Duplicate)
        ));

        let owner_inv = JoinOrganizationInvitation::new(
            "acme".to_string(),
            "bob".to_string(),
            InvitationRole::Owner,
        );
        InvitationStore::save(&store, &owner_inv).await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MockStore::new();
        store.set_unavailable(true);
        assert!(store.resolve("abc").await.is_err());
        assert!(store.ping().await.is_err());
    }
}
