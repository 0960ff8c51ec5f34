pub mod database;
pub mod error;
pub mod hierarchy;
pub mod invitation;
pub mod memory;
pub mod metrics;
pub mod organization;
pub mod scope;
pub mod secrets;
pub mod store;

pub use database::MongoDb;
pub use error::{ServiceError, StoreError};
pub use hierarchy::{HierarchyResolver, OrganizationTreeNode};
pub use invitation::InvitationService;
pub use memory::MockStore;
pub use organization::OrganizationService;
pub use scope::{EffectiveScopes, MembershipRole, ScopeService};
pub use secrets::SecretProvisioner;
pub use store::{
    AccessTokenResolver, AuthorizationStore, GlobalConfigStore, HealthCheck, InvitationStore,
    OrganizationStore, UserDirectory,
};
