use std::sync::Arc;

use super::error::{ServiceError, StoreError};
use super::store::OrganizationStore;
use crate::models::organization::GLOBAL_ID_SEPARATOR;
use crate::models::Organization;
use crate::utils::validation::{validate_dns_names, validate_global_id};

/// Organization creation, reads and direct membership removal.
#[derive(Clone)]
pub struct OrganizationService {
    organizations: Arc<dyn OrganizationStore>,
    /// Global id reserved for the platform itself
    reserved_global_id: String,
}

fn validation_error(err: validator::ValidationError) -> ServiceError {
    ServiceError::Validation(
        err.message
            .map(|m| m.to_string())
            .unwrap_or_else(|| err.code.to_string()),
    )
}

impl OrganizationService {
    pub fn new(organizations: Arc<dyn OrganizationStore>, reserved_global_id: String) -> Self {
        Self {
            organizations,
            reserved_global_id,
        }
    }

    pub async fn get(&self, global_id: &str) -> Result<Organization, ServiceError> {
        self.organizations
            .get(global_id)
            .await?
            .ok_or_else(|| ServiceError::OrganizationNotFound(global_id.to_string()))
    }

    /// Create a top-level organization.
    #[tracing::instrument(skip(self, organization), fields(globalid = %organization.global_id))]
    pub async fn create_root(&self, organization: Organization) -> Result<Organization, ServiceError> {
        if organization.global_id.contains(GLOBAL_ID_SEPARATOR) {
            return Err(ServiceError::Validation(
                "root organization id must not contain '.'".to_string(),
            ));
        }
        if organization.global_id.trim() == self.reserved_global_id {
            return Err(ServiceError::DuplicateOrganization(organization.global_id));
        }
        self.insert(organization).await
    }

    /// Create `organization` under `parent_global_id`, which must exist.
    #[tracing::instrument(skip(self, organization), fields(globalid = %organization.global_id))]
    pub async fn create_sub(
        &self,
        parent_global_id: &str,
        organization: Organization,
    ) -> Result<Organization, ServiceError> {
        let prefix = format!("{}{}", parent_global_id, GLOBAL_ID_SEPARATOR);
        let local_id = organization
            .global_id
            .strip_prefix(&prefix)
            .ok_or_else(|| {
                ServiceError::Validation(format!(
                    "sub organization id must start with '{}'",
                    prefix
                ))
            })?;
        if local_id.is_empty() || local_id.contains(GLOBAL_ID_SEPARATOR) {
            return Err(ServiceError::Validation(
                "sub organization local id must be a single non-empty segment".to_string(),
            ));
        }

        if self.organizations.get(parent_global_id).await?.is_none() {
            return Err(ServiceError::OrganizationNotFound(
                parent_global_id.to_string(),
            ));
        }
        self.insert(organization).await
    }

    async fn insert(&self, organization: Organization) -> Result<Organization, ServiceError> {
        validate_global_id(&organization.global_id).map_err(validation_error)?;
        validate_dns_names(&organization.dns).map_err(validation_error)?;

        match self.organizations.create(&organization).await {
            Ok(()) => {
                tracing::info!(globalid = %organization.global_id, "Organization created");
                Ok(organization)
            }
            Err(StoreError::Duplicate) => {
                Err(ServiceError::DuplicateOrganization(organization.global_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace `publicKeys` and `dns`; everything else is kept. Last writer wins.
    /// The body must repeat the path's global id; a missing one counts as a change.
    #[tracing::instrument(skip(self, public_keys, dns))]
    pub async fn update(
        &self,
        global_id: &str,
        new_global_id: Option<&str>,
        public_keys: Vec<String>,
        dns: Vec<String>,
    ) -> Result<Organization, ServiceError> {
        if new_global_id != Some(global_id) {
            return Err(ServiceError::GlobalIdChanged);
        }
        validate_dns_names(&dns).map_err(validation_error)?;

        let mut organization = self.get(global_id).await?;
        organization.public_keys = public_keys;
        organization.dns = dns;

        if !self.organizations.save(&organization).await? {
            return Err(ServiceError::OrganizationNotFound(global_id.to_string()));
        }
        Ok(organization)
    }

    /// Removing the last owner is allowed; organizations may end up ownerless.
    /// Removing a user who is not an owner is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn remove_owner(&self, global_id: &str, username: &str) -> Result<(), ServiceError> {
        if !self.organizations.remove_owner(global_id, username).await? {
            return Err(ServiceError::OrganizationNotFound(global_id.to_string()));
        }
        tracing::info!(globalid = %global_id, user = %username, "Owner removed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_member(&self, global_id: &str, username: &str) -> Result<(), ServiceError> {
        if !self.organizations.remove_member(global_id, username).await? {
            return Err(ServiceError::OrganizationNotFound(global_id.to_string()));
        }
        tracing::info!(globalid = %global_id, user = %username, "Member removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::MockStore;

    fn setup() -> (Arc<MockStore>, OrganizationService) {
        let store = Arc::new(MockStore::new());
        let svc = OrganizationService::new(store.clone(), "itsyouonline".to_string());
        (store, svc)
    }

    #[tokio::test]
    async fn test_create_root_rules() {
        let (_, svc) = setup();

        assert!(matches!(
            svc.create_root(Organization::new("acme.sales")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.create_root(Organization::new("itsyouonline")).await,
            Err(ServiceError::DuplicateOrganization(_))
        ));
        assert!(matches!(
            svc.create_root(Organization::new("ac")).await,
            Err(ServiceError::Validation(_))
        ));

        svc.create_root(Organization::new("acme")).await.unwrap();
        assert!(matches!(
            svc.create_root(Organization::new("acme")).await,
            Err(ServiceError::DuplicateOrganization(_))
        ));
    }

    #[tokio::test]
    async fn test_create_sub_rules() {
        let (_, svc) = setup();

        assert!(matches!(
            svc.create_sub("acme", Organization::new("acme.sales")).await,
            Err(ServiceError::OrganizationNotFound(_))
        ));

        svc.create_root(Organization::new("acme")).await.unwrap();
        assert!(matches!(
            svc.create_sub("acme", Organization::new("globex.sales")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.create_sub("acme", Organization::new("acme.sales.eu")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.create_sub("acme", Organization::new("acme.")).await,
            Err(ServiceError::Validation(_))
        ));

        svc.create_sub("acme", Organization::new("acme.sales"))
            .await
            .unwrap();
        svc.create_sub("acme.sales", Organization::new("acme.sales.eu"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_only_touches_keys_and_dns() {
        let (store, svc) = setup();
        let mut org = Organization::new("acme");
        org.owners.push("olivia".to_string());
        store.insert_organization(org).unwrap();

        assert!(matches!(
            svc.update("acme", Some("globex"), vec![], vec![]).await,
            Err(ServiceError::GlobalIdChanged)
        ));
        assert!(matches!(
            svc.update("acme", None, vec![], vec![]).await,
            Err(ServiceError::GlobalIdChanged)
        ));
        assert!(matches!(
            svc.update("acme", Some("acme"), vec![], vec!["x".to_string()]).await,
            Err(ServiceError::Validation(_))
        ));

        let updated = svc
            .update(
                "acme",
                Some("acme"),
                vec!["key".to_string()],
                vec!["acme.com".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(updated.owners, vec!["olivia".to_string()]);
        assert_eq!(store.organization("acme").unwrap().dns, vec!["acme.com"]);
    }

    #[tokio::test]
    async fn test_removing_last_owner_is_allowed() {
        let (store, svc) = setup();
        let mut org = Organization::new("acme");
        org.owners.push("olivia".to_string());
        store.insert_organization(org).unwrap();

        svc.remove_owner("acme", "olivia").await.unwrap();
        assert!(store.organization("acme").unwrap().owners.is_empty());

        // not an owner any more: still succeeds
        svc.remove_owner("acme", "olivia").await.unwrap();
        svc.remove_member("acme", "nobody").await.unwrap();

        assert!(matches!(
            svc.remove_owner("ghost", "olivia").await,
            Err(ServiceError::OrganizationNotFound(_))
        ));
        assert!(matches!(
            svc.remove_member("ghost", "olivia").await,
            Err(ServiceError::OrganizationNotFound(_))
        ));
    }
}
