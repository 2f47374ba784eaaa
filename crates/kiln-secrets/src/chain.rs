//! Ordered fallback across several providers.

use async_trait::async_trait;
use kiln_core::Result;
use kiln_core::ports::{Credential, SecretProvider};
use std::sync::Arc;
use tracing::debug;

/// Asks each provider in turn; the first hit wins.
#[derive(Default)]
pub struct ChainProvider {
    providers: Vec<Arc<dyn SecretProvider>>,
}

impl ChainProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn SecretProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

#[async_trait]
impl SecretProvider for ChainProvider {
    async fn get(&self, name: &str) -> Result<Credential> {
        for provider in &self.providers {
            if provider.exists(name).await? {
                debug!(secret = %name, provider = provider.name(), "Secret resolved");
                return provider.get(name).await;
            }
        }
        Err(kiln_core::Error::SecretNotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        for provider in &self.providers {
            if provider.exists(name).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn name(&self) -> &str {
        "chain"
    }
}
