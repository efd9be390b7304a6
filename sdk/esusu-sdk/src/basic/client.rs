use crate::advanced::calldata::{ContractCall, Felt};
use crate::advanced::calls;
use crate::basic::actions::{ActionHook, ActionKind, SequencedAction};
use crate::basic::adapter::ContractCallAdapter;
use crate::basic::preloader::Preloader;
use crate::basic::queries::{
    DeadlineQuery, GroupAnalyticsQuery, HeldPayoutsQuery, InsurancePoolQuery, LockedFundsQuery,
    NextRecipientQuery, PayoutOrderQuery, PendingPayoutQuery, QueryHook, UserProfileQuery,
    UserScope,
};
use crate::core::cache::CachingConnection;
use crate::core::config::SdkConfig;
use crate::core::connection::StarkConnection;
use crate::core::session::WalletSession;
use crate::error::Result;
use crate::types::GroupId;
use crate::utils;
use std::sync::Arc;

/// Entry point of the SDK: hands out action hooks, query hooks and the preloader,
/// all sharing one connection, one wallet session and one config.
pub struct EsusuClient<C> {
    connection: Arc<C>,
    session: Arc<WalletSession>,
    config: Arc<SdkConfig>,
}

impl<C> Clone for EsusuClient<C> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            session: Arc::clone(&self.session),
            config: Arc::clone(&self.config),
        }
    }
}

impl<C: StarkConnection + 'static> EsusuClient<CachingConnection<C>> {
    /// Wrap `connection` in a read cache using the configured TTL.
    pub fn with_cache(connection: C, session: Arc<WalletSession>, config: SdkConfig) -> Self {
        let cached = CachingConnection::new(connection, config.cache_ttl());
        Self::new(Arc::new(cached), session, config)
    }
}

impl<C: StarkConnection + 'static> EsusuClient<C> {
    pub fn new(connection: Arc<C>, session: Arc<WalletSession>, config: SdkConfig) -> Self {
        Self {
            connection,
            session,
            config: Arc::new(config),
        }
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn adapter(&self) -> ContractCallAdapter<C> {
        ContractCallAdapter::new(Arc::clone(&self.connection), Arc::clone(&self.session))
    }

    //=========================================================================
    // Actions
    //=========================================================================

    pub fn action(&self, kind: ActionKind) -> ActionHook<C> {
        ActionHook::new(kind, self.adapter(), &self.config)
    }

    pub fn contribute(&self) -> ActionHook<C> {
        self.action(ActionKind::Contribute)
    }

    pub fn join_group(&self) -> ActionHook<C> {
        self.action(ActionKind::JoinGroup)
    }

    pub fn activate_group(&self) -> ActionHook<C> {
        self.action(ActionKind::ActivateGroup)
    }

    /// Lock liquidity denominated in `token`; decimals follow the config.
    pub fn lock_liquidity(&self, token: Felt) -> ActionHook<C> {
        let decimals = self.config.token_decimals(&token);
        self.action(ActionKind::LockLiquidity)
            .with_token(token, decimals)
    }

    pub fn withdraw_locked(&self) -> ActionHook<C> {
        self.action(ActionKind::WithdrawLocked)
    }

    pub fn claim_payout(&self) -> ActionHook<C> {
        self.action(ActionKind::ClaimPayout)
    }

    pub fn distribute_payout(&self) -> ActionHook<C> {
        self.action(ActionKind::DistributePayout)
    }

    pub fn sequence(&self) -> SequencedAction<C> {
        SequencedAction::new(self.adapter())
    }

    /// Validated `lock_liquidity` call, for use as the second step of a sequence.
    pub fn lock_liquidity_call(
        &self,
        token: Felt,
        amount: &str,
        group_id: GroupId,
    ) -> Result<ContractCall> {
        let raw = utils::parse_amount(amount, self.config.token_decimals(&token))?;
        Ok(calls::lock_liquidity(
            self.config.contract_address,
            token,
            raw,
            group_id,
        ))
    }

    //=========================================================================
    // Queries
    //=========================================================================

    fn query<Q: crate::basic::queries::ReadQuery>(&self, query: Q) -> QueryHook<C, Q> {
        QueryHook::new(Arc::clone(&self.connection), query)
    }

    pub fn group_analytics(
        &self,
        group_id: Option<GroupId>,
    ) -> QueryHook<C, GroupAnalyticsQuery> {
        self.query(GroupAnalyticsQuery {
            contract: self.config.contract_address,
            group_id,
            format: self.config.stable_format(),
            interval: self.config.watch_interval(),
        })
    }

    /// Locked balance of the connected account.
    pub fn locked_funds(&self, group_id: Option<GroupId>) -> QueryHook<C, LockedFundsQuery> {
        self.query(LockedFundsQuery {
            contract: self.config.contract_address,
            user: UserScope::Session(Arc::clone(&self.session)),
            group_id,
            format: self.config.stable_format(),
        })
    }

    pub fn held_payouts(&self, group_id: Option<GroupId>) -> QueryHook<C, HeldPayoutsQuery> {
        self.query(HeldPayoutsQuery {
            contract: self.config.contract_address,
            group_id,
            interval: self.config.watch_interval(),
        })
    }

    pub fn insurance_pool(&self, group_id: Option<GroupId>) -> QueryHook<C, InsurancePoolQuery> {
        self.query(InsurancePoolQuery {
            contract: self.config.contract_address,
            group_id,
            format: self.config.stable_format(),
        })
    }

    pub fn payout_order(&self, group_id: Option<GroupId>) -> QueryHook<C, PayoutOrderQuery> {
        self.query(PayoutOrderQuery {
            contract: self.config.contract_address,
            group_id,
        })
    }

    pub fn next_recipient(&self, group_id: Option<GroupId>) -> QueryHook<C, NextRecipientQuery> {
        self.query(NextRecipientQuery {
            contract: self.config.contract_address,
            group_id,
        })
    }

    pub fn deadline(&self, group_id: Option<GroupId>) -> QueryHook<C, DeadlineQuery> {
        self.query(DeadlineQuery {
            contract: self.config.contract_address,
            group_id,
            interval: self.config.watch_interval(),
        })
    }

    /// Pending payout of the connected account.
    pub fn pending_payout(&self, group_id: Option<GroupId>) -> QueryHook<C, PendingPayoutQuery> {
        self.query(PendingPayoutQuery {
            contract: self.config.contract_address,
            user: UserScope::Session(Arc::clone(&self.session)),
            group_id,
            format: self.config.stable_format(),
        })
    }

    /// Profile of `user`, or of whichever account is connected when `None`.
    pub fn user_profile(&self, user: Option<Felt>) -> QueryHook<C, UserProfileQuery> {
        let user = match user {
            Some(address) => UserScope::Fixed(address),
            None => UserScope::Session(Arc::clone(&self.session)),
        };
        self.query(UserProfileQuery {
            contract: self.config.contract_address,
            user,
            format: self.config.stable_format(),
        })
    }

    //=========================================================================
    // Preloading
    //=========================================================================

    pub fn preloader(&self) -> Preloader<C> {
        Preloader::new(
            Arc::clone(&self.connection),
            self.config.contract_address,
            self.config.preload.count,
            self.config.preload_delay(),
            self.config.stable_format(),
        )
    }
}
