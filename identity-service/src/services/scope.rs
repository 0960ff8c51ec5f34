//! Scope authorization engine.
//!
//! [`delegated_scopes`] and [`EffectiveScopes`] are pure and carry the whole
//! middleware decision. [`ScopeService`] adds the two store-backed filters used
//! when a client asks for scopes on behalf of a user.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::error::ServiceError;
use super::store::{AuthorizationStore, OrganizationStore};
use crate::models::scope::{ORGANIZATION_MEMBER, ORGANIZATION_OWNER};
use crate::models::{AccessToken, Scope};

/// Relationship between the token's principal and the protected organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipRole {
    Owner,
    Member,
    None,
}

/// Scope set computed per request; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveScopes(BTreeSet<String>);

impl EffectiveScopes {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(scope: impl Into<String>) -> Self {
        Self(BTreeSet::from([scope.into()]))
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// An empty requirement always passes; otherwise one overlap is enough.
    pub fn allows(&self, required: &[&str]) -> bool {
        required.is_empty() || required.iter().any(|scope| self.0.contains(*scope))
    }
}

/// Organization scopes the platform's administrative client may act with on
/// behalf of an owner or member of the protected organization.
pub fn delegated_scopes(
    token: &AccessToken,
    role: MembershipRole,
    admin_client_id: &str,
) -> EffectiveScopes {
    if !token.is_platform_admin(admin_client_id) {
        return EffectiveScopes::empty();
    }
    match role {
        MembershipRole::Owner => EffectiveScopes::single(ORGANIZATION_OWNER),
        MembershipRole::Member => EffectiveScopes::single(ORGANIZATION_MEMBER),
        MembershipRole::None => EffectiveScopes::empty(),
    }
}

#[derive(Clone)]
pub struct ScopeService {
    organizations: Arc<dyn OrganizationStore>,
    authorizations: Arc<dyn AuthorizationStore>,
}

impl ScopeService {
    pub fn new(
        organizations: Arc<dyn OrganizationStore>,
        authorizations: Arc<dyn AuthorizationStore>,
    ) -> Self {
        Self {
            organizations,
            authorizations,
        }
    }

    /// Requested scopes already granted by `username` to `granted_to`.
    ///
    /// `None` when no grant exists at all, which callers must not confuse with
    /// a grant that covers none of the requested scopes.
    pub async fn filter_authorized_scopes(
        &self,
        username: &str,
        granted_to: &str,
        requested: &[String],
    ) -> Result<Option<Vec<String>>, ServiceError> {
        let authorization = self
            .authorizations
            .get_authorization(username, granted_to)
            .await?;

        Ok(authorization.map(|grant| grant.filter_authorized_scopes(requested)))
    }

    /// Requested scopes `username` could currently be granted, in request order.
    #[tracing::instrument(skip(self, requested))]
    pub async fn filter_possible_scopes(
        &self,
        username: &str,
        client_id: &str,
        requested: &[Scope],
    ) -> Result<Vec<Scope>, ServiceError> {
        let mut possible = Vec::with_capacity(requested.len());

        for scope in requested {
            match scope {
                Scope::Direct(_) => possible.push(scope.clone()),
                Scope::MemberOf(global_id) => {
                    if self.is_member_or_owner(global_id, username).await? {
                        possible.push(scope.clone());
                    } else {
                        tracing::debug!(globalid = %global_id, "Dropping memberof scope");
                    }
                }
            }
        }

        Ok(possible)
    }

    async fn is_member_or_owner(
        &self,
        global_id: &str,
        username: &str,
    ) -> Result<bool, ServiceError> {
        if self.organizations.is_member(global_id, username).await? {
            return Ok(true);
        }
        Ok(self.organizations.is_owner(global_id, username).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Authorization, Organization};
    use crate::services::memory::MockStore;
    use chrono::{Duration, Utc};

    fn token(client_id: &str, scope: &str) -> AccessToken {
        AccessToken {
            access_token: "t".to_string(),
            username: "alice".to_string(),
            client_id: client_id.to_string(),
            scope: scope.to_string(),
            global_id: None,
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn test_empty_requirement_always_allows() {
        assert!(EffectiveScopes::empty().allows(&[]));
        assert!(EffectiveScopes::single("read").allows(&[]));
    }

    #[test]
    fn test_requirement_needs_overlap() {
        let scopes = EffectiveScopes::single(ORGANIZATION_MEMBER);
        assert!(scopes.allows(&[ORGANIZATION_OWNER, ORGANIZATION_MEMBER]));
        assert!(!scopes.allows(&[ORGANIZATION_OWNER]));
    }

    #[test]
    fn test_delegation_requires_admin_client_and_scope() {
        let admin = token("itsyouonline", "admin");
        assert_eq!(
            delegated_scopes(&admin, MembershipRole::Owner, "itsyouonline"),
            EffectiveScopes::single(ORGANIZATION_OWNER)
        );
        assert_eq!(
            delegated_scopes(&admin, MembershipRole::Member, "itsyouonline"),
            EffectiveScopes::single(ORGANIZATION_MEMBER)
        );
        assert!(delegated_scopes(&admin, MembershipRole::None, "itsyouonline").is_empty());

        let third_party = token("otherapp", "admin");
        assert!(delegated_scopes(&third_party, MembershipRole::Owner, "itsyouonline").is_empty());

        let narrow = token("itsyouonline", "user:name");
        assert!(delegated_scopes(&narrow, MembershipRole::Owner, "itsyouonline").is_empty());
    }

    fn service(store: Arc<MockStore>) -> ScopeService {
        ScopeService::new(store.clone(), store)
    }

    #[tokio::test]
    async fn test_filter_authorized_scopes_without_grant_is_none() {
        let store = Arc::new(MockStore::new());
        let svc = service(store);

        let result = svc
            .filter_authorized_scopes("alice", "app", &["user:name".to_string()])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_filter_authorized_scopes_intersects_grant() {
        let store = Arc::new(MockStore::new());
        store
            .insert_authorization(Authorization {
                username: "alice".to_string(),
                granted_to: "app".to_string(),
                scopes: vec!["user:name".to_string()],
            })
            .unwrap();
        let svc = service(store);

        let result = svc
            .filter_authorized_scopes(
                "alice",
                "app",
                &["user:email".to_string(), "user:name".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(result, Some(vec!["user:name".to_string()]));
    }

    #[tokio::test]
    async fn test_filter_possible_scopes_keeps_order_and_drops_impossible() {
        let store = Arc::new(MockStore::new());
        let mut acme = Organization::new("acme");
        acme.members.push("alice".to_string());
        store.insert_organization(acme).unwrap();
        let mut globex = Organization::new("globex");
        globex.owners.push("alice".to_string());
        store.insert_organization(globex).unwrap();
        store.insert_organization(Organization::new("initech")).unwrap();
        let svc = service(store);

        let requested = Scope::parse_all(&[
            "user:memberof:initech",
            "user:name",
            "user:memberof:globex",
            "user:memberof:acme",
            "user:memberof:missing",
        ]);
        let possible = svc
            .filter_possible_scopes("alice", "app", &requested)
            .await
            .unwrap();

        let rendered: Vec<String> = possible.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["user:name", "user:memberof:globex", "user:memberof:acme"]
        );
    }

    #[tokio::test]
    async fn test_filter_possible_scopes_returns_input_strings_verbatim() {
        let svc = service(Arc::new(MockStore::new()));

        let raw = [" admin ", "user:name\t", "organization:owner"];
        let possible = svc
            .filter_possible_scopes("alice", "app", &Scope::parse_all(&raw))
            .await
            .unwrap();

        let rendered: Vec<String> = possible.iter().map(|s| s.to_string()).collect();
        assert_eq!(rendered, raw);
    }

    #[tokio::test]
    async fn test_filter_possible_scopes_surfaces_store_failure() {
        let store = Arc::new(MockStore::new());
        store.set_unavailable(true);
        let svc = service(store);

        let requested = Scope::parse_all(&["user:memberof:acme"]);
        assert!(svc
            .filter_possible_scopes("alice", "app", &requested)
            .await
            .is_err());
    }
}
