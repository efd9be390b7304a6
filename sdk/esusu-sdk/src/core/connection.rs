use crate::advanced::calldata::{ContractCall, Felt};
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;

/// Wallet and contract client the SDK drives.
///
/// Read results come back undecoded; the SDK normalizes them. Errors may carry a
/// [`crate::error::ProviderError`] so they classify precisely.
#[async_trait]
pub trait StarkConnection: Send + Sync {
    /// Read-only contract call. May be served from a client-side cache.
    async fn call(&self, call: &ContractCall) -> Result<Value, Box<dyn Error + Send + Sync>>;

    /// Read-only contract call that must reach the node.
    async fn call_fresh(
        &self,
        call: &ContractCall,
    ) -> Result<Value, Box<dyn Error + Send + Sync>> {
        self.call(call).await
    }

    /// Sign and submit `calls` from `account` as one transaction. Returns the
    /// transaction hash as soon as the node accepts it.
    async fn execute(
        &self,
        account: &Felt,
        calls: &[ContractCall],
    ) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Resolve once the transaction is final, or fail if it reverted.
    async fn wait_for_transaction(
        &self,
        transaction_hash: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Forget any cached answer to `call`. No-op without a cache.
    async fn invalidate(&self, _call: &ContractCall) {}

    /// Forget every cached read, e.g. after a confirmed write.
    async fn invalidate_all(&self) {}
}

#[async_trait]
impl<T: StarkConnection + ?Sized> StarkConnection for Arc<T> {
    async fn call(&self, call: &ContractCall) -> Result<Value, Box<dyn Error + Send + Sync>> {
        (**self).call(call).await
    }

    async fn call_fresh(
        &self,
        call: &ContractCall,
    ) -> Result<Value, Box<dyn Error + Send + Sync>> {
        (**self).call_fresh(call).await
    }

    async fn execute(
        &self,
        account: &Felt,
        calls: &[ContractCall],
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        (**self).execute(account, calls).await
    }

    async fn wait_for_transaction(
        &self,
        transaction_hash: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        (**self).wait_for_transaction(transaction_hash).await
    }

    async fn invalidate(&self, call: &ContractCall) {
        (**self).invalidate(call).await
    }

    async fn invalidate_all(&self) {
        (**self).invalidate_all().await
    }
}
