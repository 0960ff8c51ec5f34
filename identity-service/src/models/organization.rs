//! Organization model - a node of the dotted global-id namespace.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Separator between the local names of a global id (`a.b.c`).
pub const GLOBAL_ID_SEPARATOR: char = '.';

/// An organization in the dotted namespace.
///
/// A username is expected to appear in at most one of `members` and `owners`;
/// this is enforced when an invitation is accepted, not on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    /// Dot-delimited hierarchical identifier
    #[serde(rename = "globalid")]
    #[schema(example = "acme.engineering")]
    pub global_id: String,

    #[serde(default)]
    #[schema(example = json!(["alice"]))]
    pub members: Vec<String>,

    #[serde(default)]
    #[schema(example = json!(["bob"]))]
    pub owners: Vec<String>,

    #[serde(default, rename = "publicKeys")]
    pub public_keys: Vec<String>,

    #[serde(default)]
    #[schema(example = json!(["engineering.acme.com"]))]
    pub dns: Vec<String>,

    #[serde(default)]
    pub info: Vec<String>,
}

impl Organization {
    pub fn new(global_id: impl Into<String>) -> Self {
        Self {
            global_id: global_id.into(),
            members: Vec::new(),
            owners: Vec::new(),
            public_keys: Vec::new(),
            dns: Vec::new(),
            info: Vec::new(),
        }
    }

    pub fn is_member(&self, username: &str) -> bool {
        self.members.iter().any(|m| m == username)
    }

    pub fn is_owner(&self, username: &str) -> bool {
        self.owners.iter().any(|o| o == username)
    }

    /// Global id of the direct parent, `None` for a root organization.
    pub fn parent_global_id(&self) -> Option<&str> {
        parent_global_id(&self.global_id)
    }
}

/// Strip the last local name: `a.b.c` -> `a.b`.
pub fn parent_global_id(global_id: &str) -> Option<&str> {
    global_id
        .rsplit_once(GLOBAL_ID_SEPARATOR)
        .map(|(parent, _)| parent)
}
