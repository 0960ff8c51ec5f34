use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use super::store::{
    AccessTokenResolver, AuthorizationStore, GlobalConfigStore, HealthCheck, InvitationStore,
    OrganizationStore, StoreResult, UserDirectory,
};
use crate::models::{
    AccessToken, Authorization, GlobalConfig, InvitationRole, InvitationStatus,
    JoinOrganizationInvitation, Organization,
};

const ORGANIZATIONS: &str = "organizations";
const ACCESS_TOKENS: &str = "access_tokens";
const USERS: &str = "users";
const INVITATIONS: &str = "join_organization_invitations";
const AUTHORIZATIONS: &str = "authorizations";
const GLOBAL_CONFIG: &str = "globalconfig";

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for identity-service");

        self.create_index(
            ORGANIZATIONS,
            doc! { "globalid": 1 },
            IndexOptions::builder()
                .name("globalid_idx".to_string())
                .unique(true)
                .build(),
        )
        .await?;

        self.create_index(
            ACCESS_TOKENS,
            doc! { "access_token": 1 },
            IndexOptions::builder()
                .name("access_token_idx".to_string())
                .unique(true)
                .build(),
        )
        .await?;

        self.create_index(
            USERS,
            doc! { "username": 1 },
            IndexOptions::builder()
                .name("username_idx".to_string())
                .unique(true)
                .build(),
        )
        .await?;

        self.create_index(
            INVITATIONS,
            doc! { "organization": 1, "status": 1 },
            IndexOptions::builder()
                .name("organization_status_idx".to_string())
                .build(),
        )
        .await?;

        // At most one pending invitation per (organization, user, role)
        self.create_index(
            INVITATIONS,
            doc! { "organization": 1, "user": 1, "role": 1 },
            IndexOptions::builder()
                .name("pending_invitation_idx".to_string())
                .unique(true)
                .partial_filter_expression(doc! { "status": InvitationStatus::Pending.as_str() })
                .build(),
        )
        .await?;

        self.create_index(
            AUTHORIZATIONS,
            doc! { "username": 1, "grantedTo": 1 },
            IndexOptions::builder()
                .name("username_granted_to_idx".to_string())
                .unique(true)
                .build(),
        )
        .await?;

        self.create_index(
            GLOBAL_CONFIG,
            doc! { "key": 1 },
            IndexOptions::builder()
                .name("key_idx".to_string())
                .unique(true)
                .build(),
        )
        .await?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        options: IndexOptions,
    ) -> Result<(), AppError> {
        let name = options.name.clone().unwrap_or_default();
        let index = IndexModel::builder().keys(keys).options(options).build();

        self.db
            .collection::<Document>(collection)
            .create_index(index, None)
            .await
            .map_err(|e| {
                tracing::error!(collection = %collection, index = %name, "Failed to create index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    pub fn organizations(&self) -> Collection<Organization> {
        self.db.collection(ORGANIZATIONS)
    }

    pub fn access_tokens(&self) -> Collection<AccessToken> {
        self.db.collection(ACCESS_TOKENS)
    }

    pub fn users(&self) -> Collection<Document> {
        self.db.collection(USERS)
    }

    pub fn invitations(&self) -> Collection<JoinOrganizationInvitation> {
        self.db.collection(INVITATIONS)
    }

    pub fn authorizations(&self) -> Collection<Authorization> {
        self.db.collection(AUTHORIZATIONS)
    }

    pub fn global_config(&self) -> Collection<GlobalConfig> {
        self.db.collection(GLOBAL_CONFIG)
    }
}

#[async_trait]
impl OrganizationStore for MongoDb {
    async fn get(&self, global_id: &str) -> StoreResult<Option<Organization>> {
        Ok(self
            .organizations()
            .find_one(doc! { "globalid": global_id }, None)
            .await?)
    }

    async fn get_many(&self, global_ids: &[String]) -> StoreResult<Vec<Organization>> {
        let cursor = self
            .organizations()
            .find(doc! { "globalid": { "$in": global_ids } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_descendants(&self, global_id: &str) -> StoreResult<Vec<Organization>> {
        // '/' is the byte after '.', so this range is exactly the "<id>." prefix
        let filter = doc! {
            "globalid": {
                "$gte": format!("{}.", global_id),
                "$lt": format!("{}/", global_id),
            }
        };
        let cursor = self.organizations().find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn create(&self, organization: &Organization) -> StoreResult<()> {
        self.organizations().insert_one(organization, None).await?;
        Ok(())
    }

    async fn save(&self, organization: &Organization) -> StoreResult<bool> {
        let result = self
            .organizations()
            .replace_one(doc! { "globalid": &organization.global_id }, organization, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn is_member(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        let count = self
            .organizations()
            .count_documents(doc! { "globalid": global_id, "members": username }, None)
            .await?;
        Ok(count > 0)
    }

    async fn is_owner(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        let count = self
            .organizations()
            .count_documents(doc! { "globalid": global_id, "owners": username }, None)
            .await?;
        Ok(count > 0)
    }

    async fn add_member(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        let result = self
            .organizations()
            .update_one(
                doc! { "globalid": global_id },
                doc! { "$addToSet": { "members": username } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn add_owner(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        let result = self
            .organizations()
            .update_one(
                doc! { "globalid": global_id },
                doc! {
                    "$addToSet": { "owners": username },
                    "$pull": { "members": username },
                },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn remove_member(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        let result = self
            .organizations()
            .update_one(
                doc! { "globalid": global_id },
                doc! { "$pull": { "members": username } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn remove_owner(&self, global_id: &str, username: &str) -> StoreResult<bool> {
        let result = self
            .organizations()
            .update_one(
                doc! { "globalid": global_id },
                doc! { "$pull": { "owners": username } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[async_trait]
impl AccessTokenResolver for MongoDb {
    async fn resolve(&self, token: &str) -> StoreResult<Option<AccessToken>> {
        Ok(self
            .access_tokens()
            .find_one(
                doc! {
                    "access_token": token,
                    "expires_at": { "$gt": BsonDateTime::now() },
                },
                None,
            )
            .await?)
    }
}

#[async_trait]
impl UserDirectory for MongoDb {
    async fn exists(&self, username: &str) -> StoreResult<bool> {
        let count = self
            .users()
            .count_documents(doc! { "username": username }, None)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl InvitationStore for MongoDb {
    async fn save(&self, invitation: &JoinOrganizationInvitation) -> StoreResult<()> {
        self.invitations().insert_one(invitation, None).await?;
        Ok(())
    }

    async fn pending_by_organization(
        &self,
        global_id: &str,
    ) -> StoreResult<Vec<JoinOrganizationInvitation>> {
        let cursor = self
            .invitations()
            .find(
                doc! {
                    "organization": global_id,
                    "status": InvitationStatus::Pending.as_str(),
                },
                None,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_pending(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
    ) -> StoreResult<Option<JoinOrganizationInvitation>> {
        Ok(self
            .invitations()
            .find_one(
                doc! {
                    "organization": global_id,
                    "user": username,
                    "role": role.as_str(),
                    "status": InvitationStatus::Pending.as_str(),
                },
                None,
            )
            .await?)
    }

    async fn update_status(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
        status: InvitationStatus,
    ) -> StoreResult<Option<JoinOrganizationInvitation>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .invitations()
            .find_one_and_update(
                doc! {
                    "organization": global_id,
                    "user": username,
                    "role": role.as_str(),
                    "status": InvitationStatus::Pending.as_str(),
                },
                doc! { "$set": { "status": status.as_str() } },
                options,
            )
            .await?)
    }

    async fn reopen(
        &self,
        global_id: &str,
        username: &str,
        role: InvitationRole,
    ) -> StoreResult<()> {
        let options = FindOneAndUpdateOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        self.invitations()
            .find_one_and_update(
                doc! {
                    "organization": global_id,
                    "user": username,
                    "role": role.as_str(),
                    "status": InvitationStatus::Accepted.as_str(),
                },
                doc! { "$set": { "status": InvitationStatus::Pending.as_str() } },
                options,
            )
            .await?;
        Ok(())
    }

    async fn cancel_pending(&self, global_id: &str, username: &str) -> StoreResult<u64> {
        let result = self
            .invitations()
            .update_many(
                doc! {
                    "organization": global_id,
                    "user": username,
                    "status": InvitationStatus::Pending.as_str(),
                },
                doc! { "$set": { "status": InvitationStatus::Cancelled.as_str() } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }
}

#[async_trait]
impl AuthorizationStore for MongoDb {
    async fn get_authorization(
        &self,
        username: &str,
        granted_to: &str,
    ) -> StoreResult<Option<Authorization>> {
        Ok(self
            .authorizations()
            .find_one(doc! { "username": username, "grantedTo": granted_to }, None)
            .await?)
    }
}

#[async_trait]
impl GlobalConfigStore for MongoDb {
    async fn get_by_key(&self, key: &str) -> StoreResult<Option<GlobalConfig>> {
        Ok(self
            .global_config()
            .find_one(doc! { "key": key }, None)
            .await?)
    }

    async fn insert(&self, config: &GlobalConfig) -> StoreResult<()> {
        self.global_config().insert_one(config, None).await?;
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for MongoDb {
    async fn ping(&self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }
}
