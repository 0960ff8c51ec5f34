use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Organization;
use crate::utils::validation::{validate_dns_names, validate_global_id};

/// Body of both root and sub-organization creation.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrganizationRequest {
    #[validate(custom(function = "validate_global_id"))]
    #[schema(example = "acme")]
    pub globalid: String,

    #[serde(default)]
    pub owners: Vec<String>,

    #[serde(default)]
    pub members: Vec<String>,

    #[serde(default, rename = "publicKeys")]
    pub public_keys: Vec<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_dns_names"))]
    pub dns: Vec<String>,

    #[serde(default)]
    pub info: Vec<String>,
}

impl From<CreateOrganizationRequest> for Organization {
    fn from(req: CreateOrganizationRequest) -> Self {
        Organization {
            global_id: req.globalid,
            members: req.members,
            owners: req.owners,
            public_keys: req.public_keys,
            dns: req.dns,
            info: req.info,
        }
    }
}

/// Only `publicKeys` and `dns` are applied; a missing or different `globalid` is refused.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrganizationRequest {
    pub globalid: Option<String>,

    #[serde(default, rename = "publicKeys")]
    pub public_keys: Vec<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_dns_names"))]
    pub dns: Vec<String>,
}
