pub mod invitation;
pub mod organization;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Organization not found: acme")]
    pub error: String,
}
