//! Live provider instances.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use netserva_provider::DnsProvider;

/// Provider instances indexed by provider account id.
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    async fn register(&self, account_id: String, provider: Arc<dyn DnsProvider>);

    async fn unregister(&self, account_id: &str);

    async fn get(&self, account_id: &str) -> Option<Arc<dyn DnsProvider>>;

    async fn list_account_ids(&self) -> Vec<String>;
}

#[derive(Clone, Default)]
pub struct InMemoryProviderRegistry {
    providers: Arc<RwLock<HashMap<String, Arc<dyn DnsProvider>>>>,
}

impl InMemoryProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderRegistry for InMemoryProviderRegistry {
    async fn register(&self, account_id: String, provider: Arc<dyn DnsProvider>) {
        self.providers.write().await.insert(account_id, provider);
    }

    async fn unregister(&self, account_id: &str) {
        self.providers.write().await.remove(account_id);
    }

    async fn get(&self, account_id: &str) -> Option<Arc<dyn DnsProvider>> {
        self.providers.read().await.get(account_id).cloned()
    }

    async fn list_account_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
