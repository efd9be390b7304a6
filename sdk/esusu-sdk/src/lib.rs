pub mod advanced;
pub mod basic;
pub mod core;
pub mod error;
pub mod types;
pub mod utils;

pub use crate::advanced::calldata::{ContractCall, Felt};
pub use crate::basic::actions::{ActionHook, ActionKind, ActionRequest, SequencedAction};
pub use crate::basic::client::EsusuClient;
pub use crate::basic::preloader::{PreloadReport, Preloader};
pub use crate::basic::queries::{QueryHook, ReadQuery, RefreshMode, UserScope};
pub use crate::core::cache::CachingConnection;
pub use crate::core::config::SdkConfig;
pub use crate::core::connection::StarkConnection;
pub use crate::core::session::{SessionState, WalletSession};
pub use crate::error::{EsusuSdkError, ProviderError, Result};
pub use crate::types::{
    ActionStatus, DisplayAmount, GroupAnalytics, GroupId, GroupInfo, PayoutSlot, PayoutStatus,
    PendingActionState, ReadQueryResult, TimeRemaining, TransactionResult, UserProfile,
};
pub use crate::utils::{format_amount, format_time_remaining, parse_amount};
