use crate::advanced::calldata::ContractCall;
use crate::core::connection::StarkConnection;
use crate::core::session::WalletSession;
use crate::error::{EsusuSdkError, Result};
use crate::types::TransactionResult;
use log::{debug, info};
use std::sync::Arc;

const TARGET: &str = "esusu_sdk::adapter";

/// Submits contract calls through the connected wallet.
///
/// Exactly one `execute` per successful submission. Nothing is retried.
pub struct ContractCallAdapter<C> {
    connection: Arc<C>,
    session: Arc<WalletSession>,
}

impl<C> Clone for ContractCallAdapter<C> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            session: Arc::clone(&self.session),
        }
    }
}

impl<C: StarkConnection> ContractCallAdapter<C> {
    pub fn new(connection: Arc<C>, session: Arc<WalletSession>) -> Self {
        Self {
            connection,
            session,
        }
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    /// Fails with `WalletNotConnected` before touching the network when no account is active.
    pub fn ensure_connected(&self) -> Result<()> {
        self.session
            .address()
            .map(|_| ())
            .ok_or(EsusuSdkError::WalletNotConnected)
    }

    /// Submit `call` and return as soon as the node accepts it.
    pub async fn submit(&self, call: &ContractCall) -> Result<TransactionResult> {
        let account = self
            .session
            .address()
            .ok_or(EsusuSdkError::WalletNotConnected)?;

        debug!(
            target: TARGET,
            "submitting {} ({} words) from {}",
            call.entrypoint,
            call.calldata.len(),
            account
        );

        let transaction_hash = self
            .connection
            .execute(&account, std::slice::from_ref(call))
            .await
            .map_err(EsusuSdkError::classify)?;

        debug!(target: TARGET, "{} submitted: {}", call.entrypoint, transaction_hash);
        Ok(TransactionResult { transaction_hash })
    }

    /// Submit `call`, wait until the transaction is final, then drop cached reads.
    pub async fn submit_and_confirm(&self, call: &ContractCall) -> Result<TransactionResult> {
        let result = self.submit(call).await?;

        self.connection
            .wait_for_transaction(&result.transaction_hash)
            .await
            .map_err(EsusuSdkError::classify)?;
        // cached reads predate this transaction
        self.connection.invalidate_all().await;

        info!(
            target: TARGET,
            "{} confirmed: {}", call.entrypoint, result.transaction_hash
        );
        Ok(result)
    }
}
