use serde::{Deserialize, Serialize};

/// Process-wide shared value, keyed by name (e.g. `cookieSecret`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub key: String,
    pub value: String,
}
