//! Access token model - claims resolved from an opaque bearer string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scope::ADMIN_SCOPE;

/// A resolved bearer token. Owned and expired by the token store; never
/// mutated by this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,

    /// Principal the token was issued to
    pub username: String,

    /// Application presenting the token
    pub client_id: String,

    /// Single granted scope, e.g. `admin`
    pub scope: String,

    /// Organization the token was issued under, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_id: Option<String>,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the token was issued directly against `global_id`.
    pub fn is_issued_for(&self, global_id: &str) -> bool {
        self.global_id.as_deref() == Some(global_id)
    }

    /// Token of the platform's own administrative client carrying the `admin` scope.
    pub fn is_platform_admin(&self, admin_client_id: &str) -> bool {
        self.client_id == admin_client_id && self.scope == ADMIN_SCOPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(client_id: &str, scope: &str) -> AccessToken {
        let now = Utc::now();
        AccessToken {
            access_token: "abc".to_string(),
            username: "alice".to_string(),
            client_id: client_id.to_string(),
            scope: scope.to_string(),
            global_id: Some("acme".to_string()),
            created_at: now,
            expires_at: now + Duration::hours(1),
        }
    }

    #[test]
    fn test_platform_admin_requires_client_and_scope() {
        assert!(token("itsyouonline", "admin").is_platform_admin("itsyouonline"));
        assert!(!token("itsyouonline", "read").is_platform_admin("itsyouonline"));
        assert!(!token("thirdparty", "admin").is_platform_admin("itsyouonline"));
    }

    #[test]
    fn test_expiry() {
        let t = token("c", "s");
        assert!(!t.is_expired(Utc::now()));
        assert!(t.is_expired(t.expires_at));
    }

    #[test]
    fn test_issued_for() {
        let t = token("c", "s");
        assert!(t.is_issued_for("acme"));
        assert!(!t.is_issued_for("acme.sales"));
    }
}
