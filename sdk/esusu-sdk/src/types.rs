use crate::advanced::calldata::{u256_words, Felt};
use crate::error::EsusuSdkError;
use crate::utils;
use alloy_primitives::U256;
use std::fmt;
use std::str::FromStr;

/// Identifier of a savings circle. Always sent to the contract as two words, low first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub U256);

impl GroupId {
    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_words(&self) -> [Felt; 2] {
        u256_words(self.0)
    }
}

impl From<u64> for GroupId {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupId {
    type Err = EsusuSdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Felt::from_str(s).map(|f| GroupId(f.value()))
    }
}

/// Hash of a submitted transaction. Says nothing about finality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    pub transaction_hash: String,
}

//=============================================================================
// Action lifecycle
//=============================================================================

/// Lifecycle of a single action: idle, in flight, then resolved one way or the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActionStatus {
    #[default]
    Idle,
    InFlight,
    Succeeded(TransactionResult),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEvent {
    /// Submission is about to start
    Invoke,
    /// Local failure, nothing was submitted
    Reject(String),
    /// Submission and confirmation finished
    Settle(std::result::Result<TransactionResult, String>),
    ClearError,
    Reset,
}

impl ActionStatus {
    /// Next state for `event`, or `None` when the event is not accepted in this state.
    /// A second `Invoke` while in flight and a `Settle` outside of flight are the two
    /// rejections that matter.
    pub fn transition(&self, event: ActionEvent) -> Option<ActionStatus> {
        use ActionStatus::*;

        match (self, event) {
            (InFlight, ActionEvent::Invoke) => None,
            (_, ActionEvent::Invoke) => Some(InFlight),

            (InFlight, ActionEvent::Reject(_)) => None,
            (_, ActionEvent::Reject(msg)) => Some(Failed(msg)),

            (InFlight, ActionEvent::Settle(Ok(result))) => Some(Succeeded(result)),
            (InFlight, ActionEvent::Settle(Err(msg))) => Some(Failed(msg)),
            (_, ActionEvent::Settle(_)) => None,

            (Failed(_), ActionEvent::ClearError) => Some(Idle),
            (_, ActionEvent::ClearError) => Some(self.clone()),

            (InFlight, ActionEvent::Reset) => None,
            (_, ActionEvent::Reset) => Some(Idle),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, ActionStatus::InFlight)
    }
}

/// Observable state of an action hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingActionState {
    pub is_in_flight: bool,
    pub error: Option<String>,
    pub last_result: Option<TransactionResult>,
}

impl From<&ActionStatus> for PendingActionState {
    fn from(status: &ActionStatus) -> Self {
        match status {
            ActionStatus::Idle => Self::default(),
            ActionStatus::InFlight => Self {
                is_in_flight: true,
                ..Self::default()
            },
            ActionStatus::Succeeded(result) => Self {
                last_result: Some(result.clone()),
                ..Self::default()
            },
            ActionStatus::Failed(msg) => Self {
                error: Some(msg.clone()),
                ..Self::default()
            },
        }
    }
}

//=============================================================================
// Read models
//=============================================================================

/// Observable state of a query hook.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadQueryResult<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<T> Default for ReadQueryResult<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

/// Decimal scaling applied to amounts of one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountFormat {
    pub decimals: u8,
    pub fraction_digits: usize,
}

/// Token amount in smallest units plus its display string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayAmount {
    pub raw: U256,
    pub decimals: u8,
    pub formatted: String,
}

impl DisplayAmount {
    pub fn new(raw: U256, format: AmountFormat) -> Self {
        Self {
            raw,
            decimals: format.decimals,
            formatted: utils::format_amount(raw, format.decimals, format.fraction_digits),
        }
    }
}

/// Lifecycle of a group as reported by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Forming,
    Active,
    Completed,
    Disputed,
    Paused,
}

impl GroupState {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(GroupState::Forming),
            1 => Some(GroupState::Active),
            2 => Some(GroupState::Completed),
            3 => Some(GroupState::Disputed),
            4 => Some(GroupState::Paused),
            _ => None,
        }
    }
}

/// Normalized `get_group_info` response
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    pub id: GroupId,
    pub creator: Felt,
    pub member_limit: u32,
    pub num_members: u32,
    pub contribution_amount: DisplayAmount,
    /// Cycle length in seconds
    pub cycle_duration: u64,
    pub current_cycle: u32,
    pub state: GroupState,
    pub created_at: u64,
    pub created_at_display: String,
}

impl GroupInfo {
    /// The contract answers lookups of unknown ids with a zeroed record.
    pub fn is_nonexistent(&self) -> bool {
        self.id.is_zero() || self.creator.is_zero()
    }
}

/// Contribution deadline in absolute and relative form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineView {
    pub deadline: u64,
    pub date: String,
    pub remaining: TimeRemaining,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupAnalytics {
    pub info: GroupInfo,
    pub total_locked: DisplayAmount,
    pub total_pot: DisplayAmount,
    /// Members over member limit, in whole percent
    pub fill_percent: u8,
    pub deadline: Option<DeadlineView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutStatus {
    Current,
    Pending,
    Completed,
}

/// One entry in the payout rotation. `position` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutSlot {
    pub position: u32,
    pub address: Felt,
    pub status: PayoutStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub address: Felt,
    pub reputation_score: u64,
    pub total_contributions: DisplayAmount,
    pub groups_joined: u32,
    pub groups_completed: u32,
    pub missed_contributions: u32,
}

/// Relative time until a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRemaining {
    Overdue,
    Remaining { days: u64, hours: u64, minutes: u64 },
}

impl TimeRemaining {
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds <= 0 {
            return TimeRemaining::Overdue;
        }
        let seconds = seconds as u64;
        TimeRemaining::Remaining {
            days: seconds / 86_400,
            hours: (seconds % 86_400) / 3_600,
            minutes: (seconds % 3_600) / 60,
        }
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TimeRemaining::Overdue => write!(f, "Overdue"),
            TimeRemaining::Remaining {
                days,
                hours,
                minutes,
            } => {
                if days > 0 {
                    write!(f, "{days}d {hours}h {minutes}m")
                } else if hours > 0 {
                    write!(f, "{hours}h {minutes}m")
                } else {
                    write!(f, "{minutes}m")
                }
            },
        }
    }
}
