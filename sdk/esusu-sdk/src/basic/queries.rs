use crate::advanced::calldata::{ContractCall, Felt};
use crate::advanced::calls;
use crate::core::connection::StarkConnection;
use crate::core::session::WalletSession;
use crate::error::{EsusuSdkError, Result};
use crate::types::{
    AmountFormat, DeadlineView, DisplayAmount, GroupAnalytics, GroupId, PayoutSlot,
    ReadQueryResult, UserProfile,
};
use crate::utils;
use alloy_primitives::U256;
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const TARGET: &str = "esusu_sdk::queries";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Fetch on demand only
    Once,
    /// Re-read from the node on this period while watched
    Watch(Duration),
}

/// Read access handed to a query. `fresh` readers bypass the client cache.
pub struct Reader<'a> {
    connection: &'a dyn StarkConnection,
    fresh: bool,
}

impl<'a> Reader<'a> {
    pub fn new(connection: &'a dyn StarkConnection, fresh: bool) -> Self {
        Self { connection, fresh }
    }

    pub async fn read(&self, call: &ContractCall) -> Result<Value> {
        let response = if self.fresh {
            self.connection.call_fresh(call).await
        } else {
            self.connection.call(call).await
        };
        response.map_err(EsusuSdkError::classify)
    }
}

/// A read-only view over one or more contract reads.
///
/// `fetch` returns `Ok(None)` when the response could not be decoded; that is
/// "no data", not an error.
#[async_trait]
pub trait ReadQuery: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    const NAME: &'static str;

    /// False while a required parameter is missing. Disabled queries never touch the network.
    fn is_enabled(&self) -> bool;

    fn refresh_mode(&self) -> RefreshMode {
        RefreshMode::Once
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<Self::Output>>;
}

//=============================================================================
// Query hook
//=============================================================================

/// Observable state of one hook plus the bookkeeping that keeps late answers out of it.
struct HookState<T> {
    result: Mutex<ReadQueryResult<T>>,
    /// Only changed while `result` is locked
    generation: AtomicU64,
    mounted: AtomicBool,
}

impl<T> HookState<T> {
    fn new() -> Self {
        Self {
            result: Mutex::new(ReadQueryResult::default()),
            generation: AtomicU64::new(0),
            mounted: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReadQueryResult<T>> {
        self.result.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Clear everything and orphan any load still in flight.
    fn reset(&self) {
        let mut result = self.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        *result = ReadQueryResult::default();
    }
}

/// One load against a [`HookState`]. Its outcome lands only if no newer load
/// or reset started in the meantime. Dropping an unsettled load clears
/// `is_loading` on the same terms.
struct Load<'a, T> {
    state: &'a HookState<T>,
    generation: u64,
    name: &'static str,
    settled: bool,
}

impl<'a, T> Load<'a, T> {
    fn begin(state: &'a HookState<T>, name: &'static str) -> Self {
        let generation = {
            let mut result = state.lock();
            result.is_loading = true;
            state.generation.fetch_add(1, Ordering::AcqRel) + 1
        };
        Self {
            state,
            generation,
            name,
            settled: false,
        }
    }

    fn settle(mut self, f: impl FnOnce(&mut ReadQueryResult<T>)) {
        self.settled = true;
        self.apply(f);
    }

    fn apply(&self, f: impl FnOnce(&mut ReadQueryResult<T>)) {
        if !self.state.is_mounted() {
            debug!(target: TARGET, "{} unmounted, dropping update", self.name);
            return;
        }
        let mut result = self.state.lock();
        if self.state.generation.load(Ordering::Acquire) != self.generation {
            debug!(
                target: TARGET,
                "{} load {} superseded, dropping response", self.name, self.generation
            );
            return;
        }
        f(&mut result);
        result.is_loading = false;
    }
}

impl<T> Drop for Load<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            self.apply(|_| {});
        }
    }
}

/// Owns the observable state of one query.
///
/// Overlapping loads (a manual `refetch` racing the watcher, say) resolve to
/// the most recently started one; older answers are discarded.
pub struct QueryHook<C, Q: ReadQuery> {
    connection: Arc<C>,
    query: Arc<Q>,
    state: Arc<HookState<Q::Output>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl<C: StarkConnection + 'static, Q: ReadQuery> QueryHook<C, Q> {
    pub fn new(connection: Arc<C>, query: Q) -> Self {
        Self {
            connection,
            query: Arc::new(query),
            state: Arc::new(HookState::new()),
            watcher: Mutex::new(None),
        }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn is_enabled(&self) -> bool {
        self.query.is_enabled()
    }

    pub fn state(&self) -> ReadQueryResult<Q::Output> {
        self.state.lock().clone()
    }

    pub fn data(&self) -> Option<Q::Output> {
        self.state().data
    }

    /// Load through the client cache.
    pub async fn fetch(&self) -> ReadQueryResult<Q::Output> {
        refresh(&*self.connection, &*self.query, &self.state, false).await;
        self.state()
    }

    /// Load from the node, bypassing the client cache.
    pub async fn refetch(&self) -> ReadQueryResult<Q::Output> {
        refresh(&*self.connection, &*self.query, &self.state, true).await;
        self.state()
    }

    /// Start periodic refreshes for `Watch` queries. The first refresh runs
    /// immediately. Returns false for `Once` queries, disabled queries, hooks
    /// that are already watching, and when called outside a Tokio runtime.
    pub fn watch(&self) -> bool {
        let RefreshMode::Watch(period) = self.query.refresh_mode() else {
            return false;
        };
        if !self.query.is_enabled() || !self.state.is_mounted() {
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!(target: TARGET, "cannot watch {} outside a Tokio runtime", Q::NAME);
            return false;
        };

        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if watcher.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let connection = Arc::clone(&self.connection);
        let query = Arc::clone(&self.query);
        let state = Arc::clone(&self.state);

        debug!(target: TARGET, "watching {} every {:?}", Q::NAME, period);
        *watcher = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !state.is_mounted() {
                    break;
                }
                refresh(&*connection, &*query, &state, true).await;
            }
        }));
        true
    }

    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop watching and discard any response still in flight.
    pub fn unmount(&self) {
        self.state.mounted.store(false, Ordering::Release);
        self.stop_watch();
    }

    fn stop_watch(&self) {
        if let Some(handle) = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl<C, Q: ReadQuery> Drop for QueryHook<C, Q> {
    fn drop(&mut self) {
        self.state.mounted.store(false, Ordering::Release);
        if let Some(handle) = self
            .watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// One load cycle. Errors end up in the state, never in the caller.
async fn refresh<Q: ReadQuery>(
    connection: &dyn StarkConnection,
    query: &Q,
    state: &HookState<Q::Output>,
    fresh: bool,
) {
    if !state.is_mounted() {
        debug!(target: TARGET, "{} unmounted, not loading", Q::NAME);
        return;
    }
    if !query.is_enabled() {
        state.reset();
        return;
    }

    let load = Load::begin(state, Q::NAME);
    match query.fetch(&Reader::new(connection, fresh)).await {
        Ok(data) => load.settle(|s| {
            s.data = data;
            s.error = None;
        }),
        Err(err) => {
            warn!(target: TARGET, "{} failed: {}", Q::NAME, err);
            load.settle(|s| s.error = Some(err.to_string()));
        },
    }
}

//=============================================================================
// Queries
//=============================================================================

/// Whose data a user-scoped query reads.
///
/// `Session` resolves the connected account on every load, so a connect,
/// switch or disconnect takes effect on the next refresh.
#[derive(Debug, Clone)]
pub enum UserScope {
    Session(Arc<WalletSession>),
    Fixed(Felt),
}

impl UserScope {
    pub fn address(&self) -> Option<Felt> {
        match self {
            UserScope::Session(session) => session.address(),
            UserScope::Fixed(address) => Some(*address),
        }
    }
}

fn decoded<T>(value: Option<T>, name: &str) -> Result<Option<T>> {
    if value.is_none() {
        debug!(target: TARGET, "{} returned no usable data", name);
    }
    Ok(value)
}

/// Group record, locked funds and deadline in one view.
#[derive(Debug, Clone)]
pub struct GroupAnalyticsQuery {
    pub contract: Felt,
    pub group_id: Option<GroupId>,
    pub format: AmountFormat,
    pub interval: Duration,
}

#[async_trait]
impl ReadQuery for GroupAnalyticsQuery {
    type Output = GroupAnalytics;

    const NAME: &'static str = "group_analytics";

    fn is_enabled(&self) -> bool {
        self.group_id.is_some()
    }

    fn refresh_mode(&self) -> RefreshMode {
        RefreshMode::Watch(self.interval)
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<GroupAnalytics>> {
        let Some(group_id) = self.group_id else {
            return Ok(None);
        };

        let info_call = calls::get_group_info(self.contract, group_id);
        let locked_call = calls::get_group_locked_funds(self.contract, group_id);
        let deadline_call = calls::get_contribution_deadline(self.contract, group_id);
        let (info, locked, deadline) = tokio::join!(
            reader.read(&info_call),
            reader.read(&locked_call),
            reader.read(&deadline_call),
        );
        let (info, locked) = (info?, locked?);

        let Some(info) = utils::normalize_group_info(&info, self.format) else {
            return Ok(None);
        };
        if info.is_nonexistent() {
            return Ok(None);
        }
        let Some(total_locked) = utils::normalize_amount(&locked, self.format) else {
            return Ok(None);
        };

        let deadline = match deadline {
            Ok(value) => utils::normalize_deadline(&value, None, utils::now_unix()),
            Err(err) => {
                warn!(target: TARGET, "deadline for group {} unavailable: {}", group_id, err);
                None
            },
        };

        let total_pot = info
            .contribution_amount
            .raw
            .saturating_mul(U256::from(info.num_members));
        let fill_percent = if info.member_limit == 0 {
            0
        } else {
            (u64::from(info.num_members) * 100 / u64::from(info.member_limit)).min(100) as u8
        };

        Ok(Some(GroupAnalytics {
            total_pot: DisplayAmount::new(total_pot, self.format),
            total_locked,
            fill_percent,
            deadline,
            info,
        }))
    }
}

/// Caller's locked balance in a group. Static enough to fetch once.
#[derive(Debug, Clone)]
pub struct LockedFundsQuery {
    pub contract: Felt,
    pub user: UserScope,
    pub group_id: Option<GroupId>,
    pub format: AmountFormat,
}

#[async_trait]
impl ReadQuery for LockedFundsQuery {
    type Output = DisplayAmount;

    const NAME: &'static str = "locked_funds";

    fn is_enabled(&self) -> bool {
        self.user.address().is_some() && self.group_id.is_some()
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<DisplayAmount>> {
        let (Some(user), Some(group_id)) = (self.user.address(), self.group_id) else {
            return Ok(None);
        };
        let raw = reader
            .read(&calls::get_locked_balance(self.contract, user, group_id))
            .await?;
        decoded(utils::normalize_amount(&raw, self.format), Self::NAME)
    }
}

#[derive(Debug, Clone)]
pub struct HeldPayoutsQuery {
    pub contract: Felt,
    pub group_id: Option<GroupId>,
    pub interval: Duration,
}

#[async_trait]
impl ReadQuery for HeldPayoutsQuery {
    type Output = u64;

    const NAME: &'static str = "held_payouts";

    fn is_enabled(&self) -> bool {
        self.group_id.is_some()
    }

    fn refresh_mode(&self) -> RefreshMode {
        RefreshMode::Watch(self.interval)
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<u64>> {
        let Some(group_id) = self.group_id else {
            return Ok(None);
        };
        let raw = reader
            .read(&calls::get_held_payouts(self.contract, group_id))
            .await?;
        decoded(utils::normalize_count(&raw), Self::NAME)
    }
}

#[derive(Debug, Clone)]
pub struct InsurancePoolQuery {
    pub contract: Felt,
    pub group_id: Option<GroupId>,
    pub format: AmountFormat,
}

#[async_trait]
impl ReadQuery for InsurancePoolQuery {
    type Output = DisplayAmount;

    const NAME: &'static str = "insurance_pool";

    fn is_enabled(&self) -> bool {
        self.group_id.is_some()
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<DisplayAmount>> {
        let Some(group_id) = self.group_id else {
            return Ok(None);
        };
        let raw = reader
            .read(&calls::get_insurance_pool_balance(self.contract, group_id))
            .await?;
        decoded(utils::normalize_amount(&raw, self.format), Self::NAME)
    }
}

#[derive(Debug, Clone)]
pub struct PayoutOrderQuery {
    pub contract: Felt,
    pub group_id: Option<GroupId>,
}

#[async_trait]
impl ReadQuery for PayoutOrderQuery {
    type Output = Vec<PayoutSlot>;

    const NAME: &'static str = "payout_order";

    fn is_enabled(&self) -> bool {
        self.group_id.is_some()
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<Vec<PayoutSlot>>> {
        let Some(group_id) = self.group_id else {
            return Ok(None);
        };
        let raw = reader
            .read(&calls::get_payout_order(self.contract, group_id))
            .await?;
        decoded(utils::normalize_payout_order(&raw), Self::NAME)
    }
}

#[derive(Debug, Clone)]
pub struct NextRecipientQuery {
    pub contract: Felt,
    pub group_id: Option<GroupId>,
}

#[async_trait]
impl ReadQuery for NextRecipientQuery {
    type Output = Felt;

    const NAME: &'static str = "next_payout_recipient";

    fn is_enabled(&self) -> bool {
        self.group_id.is_some()
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<Felt>> {
        let Some(group_id) = self.group_id else {
            return Ok(None);
        };
        let raw = reader
            .read(&calls::get_next_payout_recipient(self.contract, group_id))
            .await?;
        decoded(utils::normalize_address(&raw), Self::NAME)
    }
}

/// Contribution deadline. The relative part prefers the contract's own
/// countdown and falls back to the local clock.
#[derive(Debug, Clone)]
pub struct DeadlineQuery {
    pub contract: Felt,
    pub group_id: Option<GroupId>,
    pub interval: Duration,
}

#[async_trait]
impl ReadQuery for DeadlineQuery {
    type Output = DeadlineView;

    const NAME: &'static str = "contribution_deadline";

    fn is_enabled(&self) -> bool {
        self.group_id.is_some()
    }

    fn refresh_mode(&self) -> RefreshMode {
        RefreshMode::Watch(self.interval)
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<DeadlineView>> {
        let Some(group_id) = self.group_id else {
            return Ok(None);
        };
        let deadline_call = calls::get_contribution_deadline(self.contract, group_id);
        let remaining_call = calls::get_time_until_deadline(self.contract, group_id);
        let (deadline, remaining) =
            tokio::join!(reader.read(&deadline_call), reader.read(&remaining_call));

        let deadline = deadline?;
        let remaining = remaining.ok();
        decoded(
            utils::normalize_deadline(&deadline, remaining.as_ref(), utils::now_unix()),
            Self::NAME,
        )
    }
}

#[derive(Debug, Clone)]
pub struct PendingPayoutQuery {
    pub contract: Felt,
    pub user: UserScope,
    pub group_id: Option<GroupId>,
    pub format: AmountFormat,
}

#[async_trait]
impl ReadQuery for PendingPayoutQuery {
    type Output = DisplayAmount;

    const NAME: &'static str = "pending_payout";

    fn is_enabled(&self) -> bool {
        self.user.address().is_some() && self.group_id.is_some()
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<DisplayAmount>> {
        let (Some(user), Some(group_id)) = (self.user.address(), self.group_id) else {
            return Ok(None);
        };
        let raw = reader
            .read(&calls::get_pending_payout(self.contract, user, group_id))
            .await?;
        decoded(utils::normalize_amount(&raw, self.format), Self::NAME)
    }
}

#[derive(Debug, Clone)]
pub struct UserProfileQuery {
    pub contract: Felt,
    pub user: UserScope,
    pub format: AmountFormat,
}

#[async_trait]
impl ReadQuery for UserProfileQuery {
    type Output = UserProfile;

    const NAME: &'static str = "user_profile";

    fn is_enabled(&self) -> bool {
        self.user.address().is_some()
    }

    async fn fetch(&self, reader: &Reader<'_>) -> Result<Option<UserProfile>> {
        let Some(user) = self.user.address() else {
            return Ok(None);
        };
        let raw = reader
            .read(&calls::get_user_profile(self.contract, user))
            .await?;
        decoded(utils::normalize_user_profile(&raw, user, self.format), Self::NAME)
    }
}
