//! Shared secrets that every instance of the fleet must agree on.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};

use super::error::{ServiceError, StoreError};
use super::store::GlobalConfigStore;
use crate::models::GlobalConfig;

pub const COOKIE_SECRET_KEY: &str = "cookieSecret";
pub const COOKIE_SECRET_BYTES: usize = 32;

fn generate_random_encoded_bytes(size: usize) -> Result<String, ServiceError> {
    let mut bytes = vec![0u8; size];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("random generation failed: {}", e)))?;
    Ok(URL_SAFE.encode(bytes))
}

#[derive(Clone)]
pub struct SecretProvisioner {
    store: Arc<dyn GlobalConfigStore>,
}

impl SecretProvisioner {
    pub fn new(store: Arc<dyn GlobalConfigStore>) -> Self {
        Self { store }
    }

    /// Read `key`, or generate and store it if absent.
    ///
    /// Concurrent starters race on the insert; the loser sees a duplicate key
    /// and re-reads the winner's value exactly once.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, key: &str, size: usize) -> Result<SecretString, ServiceError> {
        if let Some(existing) = self.store.get_by_key(key).await? {
            return Ok(SecretString::new(existing.value));
        }

        let candidate = GlobalConfig {
            key: key.to_string(),
            value: generate_random_encoded_bytes(size)?,
        };

        match self.store.insert(&candidate).await {
            Ok(()) => {
                tracing::info!(key = %key, "Generated shared secret");
                Ok(SecretString::new(candidate.value))
            }
            Err(StoreError::Duplicate) => {
                tracing::debug!(key = %key, "Lost secret provisioning race, re-reading");
                let winner = self.store.get_by_key(key).await?.ok_or_else(|| {
                    ServiceError::Inconsistent(format!(
                        "secret {} vanished after duplicate insert",
                        key
                    ))
                })?;
                Ok(SecretString::new(winner.value))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn cookie_secret(&self) -> Result<SecretString, ServiceError> {
        self.get_or_create(COOKIE_SECRET_KEY, COOKIE_SECRET_BYTES).await
    }

    /// Secret the named service authenticates with. Never generated here.
    pub async fn oauth_client_secret(&self, service: &str) -> Result<SecretString, ServiceError> {
        self.read_required(&format!("{}-secret", service)).await
    }

    pub async fn oauth_client_id(&self, service: &str) -> Result<String, ServiceError> {
        let id = self
            .read_required(&format!("{}-clientid", service))
            .await?;
        Ok(id.expose_secret().to_string())
    }

    async fn read_required(&self, key: &str) -> Result<SecretString, ServiceError> {
        match self.store.get_by_key(key).await? {
            Some(config) => Ok(SecretString::new(config.value)),
            None => {
                tracing::error!(key = %key, "Shared secret is not configured");
                Err(ServiceError::MissingSecret(key.to_string()))
            }
        }
    }
}
