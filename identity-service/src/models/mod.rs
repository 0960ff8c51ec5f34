pub mod access_token;
pub mod authorization;
pub mod global_config;
pub mod invitation;
pub mod organization;
pub mod scope;

pub use access_token::AccessToken;
pub use authorization::Authorization;
pub use global_config::GlobalConfig;
pub use invitation::{InvitationRole, InvitationStatus, JoinOrganizationInvitation};
pub use organization::Organization;
pub use scope::Scope;
