//! One builder per contract entry point. Every U256 argument goes out low word first.

use crate::advanced::calldata::{ContractCall, Felt};
use crate::core::constants::entrypoints;
use crate::types::GroupId;
use alloy_primitives::U256;

fn group_call(contract: Felt, entrypoint: &str, group_id: GroupId) -> ContractCall {
    ContractCall::new(contract, entrypoint).with_u256(group_id.0)
}

fn user_group_call(contract: Felt, entrypoint: &str, user: Felt, group_id: GroupId) -> ContractCall {
    ContractCall::new(contract, entrypoint)
        .with_word(user)
        .with_u256(group_id.0)
}

//=============================================================================
// Writes
//=============================================================================

pub fn contribute(contract: Felt, group_id: GroupId, amount: U256) -> ContractCall {
    group_call(contract, entrypoints::CONTRIBUTE, group_id).with_u256(amount)
}

pub fn join_group(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::JOIN_GROUP, group_id)
}

pub fn activate_group(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::ACTIVATE_GROUP, group_id)
}

pub fn lock_liquidity(contract: Felt, token: Felt, amount: U256, group_id: GroupId) -> ContractCall {
    ContractCall::new(contract, entrypoints::LOCK_LIQUIDITY)
        .with_word(token)
        .with_u256(amount)
        .with_u256(group_id.0)
}

pub fn withdraw_locked(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::WITHDRAW_LOCKED, group_id)
}

pub fn claim_payout(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::CLAIM_PAYOUT, group_id)
}

pub fn distribute_payout(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::DISTRIBUTE_PAYOUT, group_id)
}

//=============================================================================
// Reads
//=============================================================================

pub fn get_group_info(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::GET_GROUP_INFO, group_id)
}

pub fn get_group_locked_funds(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::GET_GROUP_LOCKED_FUNDS, group_id)
}

pub fn get_contribution_deadline(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::GET_CONTRIBUTION_DEADLINE, group_id)
}

pub fn get_time_until_deadline(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::GET_TIME_UNTIL_DEADLINE, group_id)
}

pub fn get_held_payouts(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::GET_HELD_PAYOUTS, group_id)
}

pub fn get_insurance_pool_balance(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::GET_INSURANCE_POOL_BALANCE, group_id)
}

pub fn get_locked_balance(contract: Felt, user: Felt, group_id: GroupId) -> ContractCall {
    user_group_call(contract, entrypoints::GET_LOCKED_BALANCE, user, group_id)
}

pub fn get_next_payout_recipient(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::GET_NEXT_PAYOUT_RECIPIENT, group_id)
}

pub fn get_payout_order(contract: Felt, group_id: GroupId) -> ContractCall {
    group_call(contract, entrypoints::GET_PAYOUT_ORDER, group_id)
}

pub fn get_pending_payout(contract: Felt, user: Felt, group_id: GroupId) -> ContractCall {
    user_group_call(contract, entrypoints::GET_PENDING_PAYOUT, user, group_id)
}

pub fn get_user_profile(contract: Felt, user: Felt) -> ContractCall {
    ContractCall::new(contract, entrypoints::GET_USER_PROFILE).with_word(user)
}
