use crate::advanced::calldata::{ContractCall, Felt};
use crate::core::connection::StarkConnection;
use async_trait::async_trait;
use log::trace;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const TARGET: &str = "esusu_sdk::cache";

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Read-through cache in front of a connection.
///
/// `call` answers from the cache while an entry is younger than the TTL.
/// `call_fresh` always goes to the node and refreshes the entry. Writes pass
/// through; `invalidate`/`invalidate_all` evict.
pub struct CachingConnection<C> {
    inner: C,
    ttl: Duration,
    entries: RwLock<HashMap<ContractCall, CacheEntry>>,
}

impl<C: StarkConnection> CachingConnection<C> {
    pub fn new(inner: C, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// True when a fresh entry exists for `call`.
    pub async fn contains(&self, call: &ContractCall) -> bool {
        self.entries
            .read()
            .await
            .get(call)
            .is_some_and(|entry| entry.stored_at.elapsed() < self.ttl)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn store(&self, call: &ContractCall, value: &Value) {
        self.entries.write().await.insert(
            call.clone(),
            CacheEntry {
                value: value.clone(),
                stored_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl<C: StarkConnection> StarkConnection for CachingConnection<C> {
    async fn call(&self, call: &ContractCall) -> Result<Value, Box<dyn Error + Send + Sync>> {
        if let Some(entry) = self.entries.read().await.get(call) {
            if entry.stored_at.elapsed() < self.ttl {
                trace!(target: TARGET, "hit {}", call.entrypoint);
                return Ok(entry.value.clone());
            }
        }
        self.call_fresh(call).await
    }

    async fn call_fresh(
        &self,
        call: &ContractCall,
    ) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let value = self.inner.call_fresh(call).await?;
        self.store(call, &value).await;
        Ok(value)
    }

    async fn execute(
        &self,
        account: &Felt,
        calls: &[ContractCall],
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.inner.execute(account, calls).await
    }

    async fn wait_for_transaction(
        &self,
        transaction_hash: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.inner.wait_for_transaction(transaction_hash).await
    }

    async fn invalidate(&self, call: &ContractCall) {
        if self.entries.write().await.remove(call).is_some() {
            trace!(target: TARGET, "evicted {}", call.entrypoint);
        }
    }

    async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        trace!(target: TARGET, "evicting {} entries", entries.len());
        entries.clear();
    }
}
