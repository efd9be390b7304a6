/// Contract entry point names.
pub mod entrypoints {
    pub const CONTRIBUTE: &str = "contribute";
    pub const JOIN_GROUP: &str = "join_group";
    pub const ACTIVATE_GROUP: &str = "activate_group";
    pub const LOCK_LIQUIDITY: &str = "lock_liquidity";
    pub const WITHDRAW_LOCKED: &str = "withdraw_locked";
    pub const CLAIM_PAYOUT: &str = "claim_payout";
    pub const DISTRIBUTE_PAYOUT: &str = "distribute_payout";

    pub const GET_GROUP_INFO: &str = "get_group_info";
    pub const GET_GROUP_LOCKED_FUNDS: &str = "get_group_locked_funds";
    pub const GET_CONTRIBUTION_DEADLINE: &str = "get_contribution_deadline";
    pub const GET_TIME_UNTIL_DEADLINE: &str = "get_time_until_deadline";
    pub const GET_HELD_PAYOUTS: &str = "get_held_payouts";
    pub const GET_INSURANCE_POOL_BALANCE: &str = "get_insurance_pool_balance";
    pub const GET_LOCKED_BALANCE: &str = "get_locked_balance";
    pub const GET_NEXT_PAYOUT_RECIPIENT: &str = "get_next_payout_recipient";
    pub const GET_PAYOUT_ORDER: &str = "get_payout_order";
    pub const GET_PENDING_PAYOUT: &str = "get_pending_payout";
    pub const GET_USER_PROFILE: &str = "get_user_profile";
}

pub const STABLE_TOKEN_DECIMALS: u8 = 6;
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;
pub const DISPLAY_FRACTION_DIGITS: usize = 2;
/// Matches the largest token decimals a U256 amount can carry.
pub const MAX_FRACTION_DIGITS: usize = 77;

pub const DEFAULT_CACHE_TTL_MS: u64 = 30_000;
pub const DEFAULT_WATCH_INTERVAL_MS: u64 = 10_000;

pub const DEFAULT_PRELOAD_COUNT: u64 = 10;
pub const DEFAULT_PRELOAD_DELAY_MS: u64 = 1_000;
