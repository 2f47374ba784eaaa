//! Environment and file backed secret providers.

use async_trait::async_trait;
use kiln_core::Result;
use kiln_core::ports::{Credential, SecretProvider};
use std::collections::HashMap;

/// Reads a secret from the environment variable of the same name.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvProvider;

#[async_trait]
impl SecretProvider for EnvProvider {
    async fn get(&self, name: &str) -> Result<Credential> {
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => Ok(Credential::new(value)),
            _ => Err(kiln_core::Error::SecretNotFound(name.to_string())),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(std::env::var(name).is_ok_and(|v| !v.is_empty()))
    }

    fn name(&self) -> &str {
        "env"
    }
}

/// JSON-file secret provider (`{"NAME": "value"}`), for local runs.
pub struct FileProvider {
    secrets: HashMap<String, String>,
}

impl FileProvider {
    pub fn from_map(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }

    pub async fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            kiln_core::Error::Internal(format!("Failed to read secrets file: {}", e))
        })?;

        let secrets: HashMap<String, String> = serde_json::from_str(&content)?;

        Ok(Self { secrets })
    }
}

#[async_trait]
impl SecretProvider for FileProvider {
    async fn get(&self, name: &str) -> Result<Credential> {
        self.secrets
            .get(name)
            .map(Credential::new)
            .ok_or_else(|| kiln_core::Error::SecretNotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.secrets.contains_key(name))
    }

    fn name(&self) -> &str {
        "file"
    }
}
