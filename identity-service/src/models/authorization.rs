//! Authorization grant - scopes a user has already granted to a client.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    pub username: String,

    /// Client id the grant was given to
    #[serde(rename = "grantedTo")]
    pub granted_to: String,

    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Authorization {
    /// Requested scopes covered by this grant, in request order.
    pub fn filter_authorized_scopes(&self, requested: &[String]) -> Vec<String> {
        requested
            .iter()
            .filter(|scope| self.scopes.iter().any(|granted| granted == *scope))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_preserves_request_order() {
        let grant = Authorization {
            username: "alice".to_string(),
            granted_to: "app".to_string(),
            scopes: vec!["user:email".to_string(), "user:name".to_string()],
        };

        let requested = vec![
            "user:name".to_string(),
            "user:phone".to_string(),
            "user:email".to_string(),
        ];
        assert_eq!(
            grant.filter_authorized_scopes(&requested),
            vec!["user:name".to_string(), "user:email".to_string()]
        );
    }
}
