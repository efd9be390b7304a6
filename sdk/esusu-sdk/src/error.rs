use std::error::Error;
use thiserror::Error;

/// SDK-specific error types for Esusu operations
#[derive(Debug, Error)]
pub enum EsusuSdkError {
    /// No active account in the wallet session. Detected locally, never reaches the network.
    #[error("Wallet not connected")]
    WalletNotConnected,

    /// The wallet declined to sign
    #[error("{0}")]
    UserRejected(String),

    /// Node unreachable, timeout or any other transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Contract revert, message as extracted by the client library
    #[error("{0}")]
    ContractReverted(String),

    /// Local amount validation failed, nothing was submitted
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The same action is still waiting for its previous submission
    #[error("Action already in progress")]
    ActionInFlight,

    /// Read response had an unexpected shape
    #[error("Unexpected contract response: {0}")]
    Decode(String),

    /// Missing or malformed configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, EsusuSdkError>;

/// Typed failure a connection implementation may return inside its boxed error.
/// Anything else is classified from the error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Rpc(String),

    #[error("{0}")]
    Reverted(String),
}

const REJECTION_MARKERS: &[&str] = &["reject", "declin", "denied", "cancelled by user"];
const REVERT_MARKERS: &[&str] = &["revert", "execution", "entrypoint", "assert", "panicked"];

impl EsusuSdkError {
    /// Map a connection failure onto the SDK error taxonomy.
    pub fn classify(err: Box<dyn Error + Send + Sync>) -> Self {
        if let Some(provider) = err.downcast_ref::<ProviderError>() {
            return match provider {
                ProviderError::Rejected(msg) => EsusuSdkError::UserRejected(msg.clone()),
                ProviderError::Rpc(msg) => EsusuSdkError::Network(msg.clone()),
                ProviderError::Reverted(msg) => EsusuSdkError::ContractReverted(msg.clone()),
            };
        }

        let message = err.to_string();
        let lower = message.to_lowercase();
        if REJECTION_MARKERS.iter().any(|m| lower.contains(m)) {
            EsusuSdkError::UserRejected(message)
        } else if REVERT_MARKERS.iter().any(|m| lower.contains(m)) {
            EsusuSdkError::ContractReverted(message)
        } else {
            EsusuSdkError::Network(message)
        }
    }

    /// True for failures detected before anything was sent to the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            EsusuSdkError::WalletNotConnected
                | EsusuSdkError::InvalidAmount(_)
                | EsusuSdkError::ActionInFlight
                | EsusuSdkError::InvalidConfig(_)
        )
    }
}
