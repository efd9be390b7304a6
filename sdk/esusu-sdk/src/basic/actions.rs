use crate::advanced::calldata::{ContractCall, Felt};
use crate::advanced::calls;
use crate::basic::adapter::ContractCallAdapter;
use crate::core::connection::StarkConnection;
use crate::core::constants::entrypoints;
use crate::core::config::SdkConfig;
use crate::error::{EsusuSdkError, Result};
use crate::types::{ActionEvent, ActionStatus, GroupId, PendingActionState, TransactionResult};
use crate::utils;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

const TARGET: &str = "esusu_sdk::actions";

/// User-initiated operations, one contract entry point each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Contribute,
    JoinGroup,
    ActivateGroup,
    LockLiquidity,
    WithdrawLocked,
    ClaimPayout,
    DistributePayout,
}

impl ActionKind {
    pub fn entrypoint(&self) -> &'static str {
        match self {
            ActionKind::Contribute => entrypoints::CONTRIBUTE,
            ActionKind::JoinGroup => entrypoints::JOIN_GROUP,
            ActionKind::ActivateGroup => entrypoints::ACTIVATE_GROUP,
            ActionKind::LockLiquidity => entrypoints::LOCK_LIQUIDITY,
            ActionKind::WithdrawLocked => entrypoints::WITHDRAW_LOCKED,
            ActionKind::ClaimPayout => entrypoints::CLAIM_PAYOUT,
            ActionKind::DistributePayout => entrypoints::DISTRIBUTE_PAYOUT,
        }
    }

    pub fn takes_amount(&self) -> bool {
        matches!(self, ActionKind::Contribute | ActionKind::LockLiquidity)
    }
}

/// Arguments of one invocation. `amount` is the user's decimal input, e.g. "12.5".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub group_id: GroupId,
    pub amount: Option<String>,
}

impl ActionRequest {
    pub fn new(group_id: impl Into<GroupId>) -> Self {
        Self {
            group_id: group_id.into(),
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }
}

//=============================================================================
// Action state
//=============================================================================

/// Status shared between a hook and its in-flight invocation.
#[derive(Clone)]
struct ActionCell {
    status: Arc<Mutex<ActionStatus>>,
    mounted: Arc<AtomicBool>,
}

impl ActionCell {
    fn new() -> Self {
        Self {
            status: Arc::new(Mutex::new(ActionStatus::Idle)),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    fn snapshot(&self) -> ActionStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `event`; refused transitions leave the status unchanged.
    fn apply(&self, event: ActionEvent) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        match status.transition(event) {
            Some(next) => {
                *status = next;
                true
            },
            None => false,
        }
    }

    /// Enter flight, or refuse. `prepare` runs under the status lock.
    fn begin<T>(&self, prepare: impl FnOnce() -> Result<T>) -> Result<T> {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if status.is_in_flight() {
            return Err(EsusuSdkError::ActionInFlight);
        }

        match prepare() {
            Ok(value) => {
                if let Some(next) = status.transition(ActionEvent::Invoke) {
                    *status = next;
                }
                Ok(value)
            },
            Err(err) => {
                if let Some(next) = status.transition(ActionEvent::Reject(err.to_string())) {
                    *status = next;
                }
                Err(err)
            },
        }
    }

    fn settle(&self, outcome: std::result::Result<TransactionResult, String>) {
        if !self.mounted.load(Ordering::Acquire) {
            debug!(target: TARGET, "dropping result for unmounted action: {:?}", outcome);
            return;
        }
        self.apply(ActionEvent::Settle(outcome));
    }

    fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

/// Settles the cell as failed if the invoking future is dropped mid-flight.
struct FlightGuard<'a> {
    cell: &'a ActionCell,
    armed: bool,
}

impl<'a> FlightGuard<'a> {
    fn new(cell: &'a ActionCell) -> Self {
        Self { cell, armed: true }
    }

    fn settle(mut self, outcome: &Result<TransactionResult>) {
        self.armed = false;
        self.cell.settle(match outcome {
            Ok(result) => Ok(result.clone()),
            Err(err) => Err(err.to_string()),
        });
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cell
                .settle(Err("Action dropped before completion".to_string()));
        }
    }
}

//=============================================================================
// Action hooks
//=============================================================================

/// One user action bound to one entry point, with its pending state.
///
/// A second `invoke` while the first is in flight returns
/// [`EsusuSdkError::ActionInFlight`] and submits nothing.
pub struct ActionHook<C> {
    kind: ActionKind,
    adapter: ContractCallAdapter<C>,
    contract: Felt,
    token: Felt,
    decimals: u8,
    cell: ActionCell,
}

impl<C: StarkConnection> ActionHook<C> {
    pub fn new(kind: ActionKind, adapter: ContractCallAdapter<C>, config: &SdkConfig) -> Self {
        Self {
            kind,
            adapter,
            contract: config.contract_address,
            token: config.stable_token,
            decimals: config.stable_decimals,
            cell: ActionCell::new(),
        }
    }

    /// Token the amount is denominated in. Only `LockLiquidity` sends it on-chain.
    pub fn with_token(mut self, token: Felt, decimals: u8) -> Self {
        self.token = token;
        self.decimals = decimals;
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Validate `request` and build the call without submitting anything.
    pub fn prepare(&self, request: &ActionRequest) -> Result<ContractCall> {
        let group_id = request.group_id;
        let amount = if self.kind.takes_amount() {
            let input = request
                .amount
                .as_deref()
                .ok_or_else(|| EsusuSdkError::InvalidAmount("amount is required".into()))?;
            Some(utils::parse_amount(input, self.decimals)?)
        } else {
            None
        };

        let call = match (self.kind, amount) {
            (ActionKind::Contribute, Some(amount)) => {
                calls::contribute(self.contract, group_id, amount)
            },
            (ActionKind::LockLiquidity, Some(amount)) => {
                calls::lock_liquidity(self.contract, self.token, amount, group_id)
            },
            (ActionKind::JoinGroup, _) => calls::join_group(self.contract, group_id),
            (ActionKind::ActivateGroup, _) => calls::activate_group(self.contract, group_id),
            (ActionKind::WithdrawLocked, _) => calls::withdraw_locked(self.contract, group_id),
            (ActionKind::ClaimPayout, _) => calls::claim_payout(self.contract, group_id),
            (ActionKind::DistributePayout, _) => {
                calls::distribute_payout(self.contract, group_id)
            },
            (ActionKind::Contribute | ActionKind::LockLiquidity, None) => {
                return Err(EsusuSdkError::InvalidAmount("amount is required".into()))
            },
        };
        Ok(call)
    }

    /// Submit and wait for confirmation. Local failures (no wallet, bad amount)
    /// never reach the connection.
    pub async fn invoke(&self, request: ActionRequest) -> Result<TransactionResult> {
        let call = self.cell.begin(|| {
            self.adapter.ensure_connected()?;
            self.prepare(&request)
        });
        let call = match call {
            Ok(call) => call,
            Err(err) => {
                debug!(target: TARGET, "{} refused: {}", self.kind.entrypoint(), err);
                return Err(err);
            },
        };

        let guard = FlightGuard::new(&self.cell);
        let outcome = self.adapter.submit_and_confirm(&call).await;
        if let Err(err) = &outcome {
            warn!(target: TARGET, "{} failed: {}", self.kind.entrypoint(), err);
        }
        guard.settle(&outcome);
        outcome
    }

    pub fn status(&self) -> ActionStatus {
        self.cell.snapshot()
    }

    pub fn state(&self) -> PendingActionState {
        PendingActionState::from(&self.cell.snapshot())
    }

    pub fn is_in_flight(&self) -> bool {
        self.cell.snapshot().is_in_flight()
    }

    pub fn clear_error(&self) {
        self.cell.apply(ActionEvent::ClearError);
    }

    /// Back to idle. Ignored while in flight.
    pub fn clear(&self) -> bool {
        self.cell.apply(ActionEvent::Reset)
    }

    /// Later resolutions of a pending invocation are discarded.
    pub fn unmount(&self) {
        self.cell.unmount();
    }
}

impl<C> Drop for ActionHook<C> {
    fn drop(&mut self) {
        self.cell.unmount();
    }
}

//=============================================================================
// Sequenced actions
//=============================================================================

/// Two calls submitted one after the other, e.g. a swap followed by a lock.
///
/// The second call is only submitted once the first is confirmed; a failure of
/// the first is terminal.
pub struct SequencedAction<C> {
    adapter: ContractCallAdapter<C>,
    cell: ActionCell,
}

impl<C: StarkConnection> SequencedAction<C> {
    pub fn new(adapter: ContractCallAdapter<C>) -> Self {
        Self {
            adapter,
            cell: ActionCell::new(),
        }
    }

    /// Returns the second transaction on success.
    pub async fn invoke(
        &self,
        first: ContractCall,
        second: ContractCall,
    ) -> Result<TransactionResult> {
        self.cell.begin(|| self.adapter.ensure_connected())?;
        let guard = FlightGuard::new(&self.cell);

        let outcome = match self.adapter.submit_and_confirm(&first).await {
            Ok(_) => self.adapter.submit_and_confirm(&second).await,
            Err(err) => {
                warn!(
                    target: TARGET,
                    "{} failed, {} not submitted: {}", first.entrypoint, second.entrypoint, err
                );
                Err(err)
            },
        };
        guard.settle(&outcome);
        outcome
    }

    pub fn state(&self) -> PendingActionState {
        PendingActionState::from(&self.cell.snapshot())
    }

    pub fn clear_error(&self) {
        self.cell.apply(ActionEvent::ClearError);
    }

    pub fn clear(&self) -> bool {
        self.cell.apply(ActionEvent::Reset)
    }

    pub fn unmount(&self) {
        self.cell.unmount();
    }
}

impl<C> Drop for SequencedAction<C> {
    fn drop(&mut self) {
        self.cell.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_refuses_while_in_flight() {
        let cell = ActionCell::new();
        cell.begin(|| Ok(())).unwrap();
        let second = cell.begin(|| Ok(()));
        assert!(matches!(second, Err(EsusuSdkError::ActionInFlight)));
        assert!(cell.snapshot().is_in_flight());
    }

    #[test]
    fn local_failure_does_not_enter_flight() {
        let cell = ActionCell::new();
        let res: Result<()> = cell.begin(|| Err(EsusuSdkError::WalletNotConnected));
        assert!(res.is_err());
        assert_eq!(
            cell.snapshot(),
            ActionStatus::Failed("Wallet not connected".into())
        );
    }

    #[test]
    fn settle_after_unmount_is_dropped() {
        let cell = ActionCell::new();
        cell.begin(|| Ok(())).unwrap();
        cell.unmount();
        cell.settle(Err("late".into()));
        assert!(cell.snapshot().is_in_flight());
    }

    #[test]
    fn dropped_guard_fails_the_action() {
        let cell = ActionCell::new();
        cell.begin(|| Ok(())).unwrap();
        drop(FlightGuard::new(&cell));
        assert_eq!(
            cell.snapshot(),
            ActionStatus::Failed("Action dropped before completion".into())
        );
    }

    #[test]
    fn only_amount_actions_take_amounts() {
        assert!(ActionKind::Contribute.takes_amount());
        assert!(ActionKind::LockLiquidity.takes_amount());
        assert!(!ActionKind::ClaimPayout.takes_amount());
        assert_eq!(ActionKind::DistributePayout.entrypoint(), "distribute_payout");
    }
}
