use crate::advanced::calldata::{join_u256, split_u256, Felt};
use crate::error::{EsusuSdkError, Result};
use crate::types::{
    AmountFormat, DeadlineView, DisplayAmount, GroupId, GroupInfo, GroupState, PayoutSlot,
    PayoutStatus, TimeRemaining, UserProfile,
};
use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use log::warn;
use serde_json::{Map, Value};
use std::str::FromStr;

const TARGET: &str = "esusu_sdk::normalize";

//=============================================================================
// Response Shapes
//=============================================================================

/// Shape of an untyped contract read response.
///
/// The binding layer may hand back the same logical value as a tuple, a keyed
/// record or a bare scalar. Decoders try them in that order and never index
/// into a shape they have not matched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawShape<'a> {
    Tuple(&'a [Value]),
    Record(&'a Map<String, Value>),
    Scalar(&'a Value),
    Unrecognized,
}

impl<'a> RawShape<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => RawShape::Tuple(items),
            Value::Object(map) => RawShape::Record(map),
            Value::Number(_) | Value::String(_) | Value::Bool(_) => RawShape::Scalar(value),
            Value::Null => RawShape::Unrecognized,
        }
    }
}

/// Positional (tuple) or named (record) field access over one compound response.
/// Records are also searched by stringified position.
struct Fields<'a> {
    shape: RawShape<'a>,
}

impl<'a> Fields<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        match RawShape::classify(unwrap_singleton(value)) {
            shape @ (RawShape::Tuple(_) | RawShape::Record(_)) => Some(Self { shape }),
            _ => None,
        }
    }

    fn get(&self, index: usize, key: &str) -> Option<&'a Value> {
        match self.shape {
            RawShape::Tuple(items) => items.get(index),
            RawShape::Record(map) => map.get(key).or_else(|| map.get(&index.to_string())),
            _ => None,
        }
    }
}

/// Peel `[x]` and `{"k": x}` wrappers around a single compound value.
fn unwrap_singleton(value: &Value) -> &Value {
    match value {
        Value::Array(items) if items.len() == 1 && (items[0].is_array() || items[0].is_object()) => {
            unwrap_singleton(&items[0])
        },
        Value::Object(map) if map.len() == 1 => match map.values().next() {
            Some(inner) if inner.is_array() || inner.is_object() => unwrap_singleton(inner),
            _ => value,
        },
        _ => value,
    }
}

fn or_warn<T>(decoded: Option<T>, what: &str, raw: &Value) -> Option<T> {
    if decoded.is_none() {
        warn!(target: TARGET, "unrecognized {} response: {}", what, raw);
    }
    decoded
}

//=============================================================================
// Scalar Decoding
//=============================================================================

fn decode_scalar(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => Felt::from_str(s).ok().map(|f| f.value()),
        Value::Bool(b) => Some(U256::from(*b as u8)),
        _ => None,
    }
}

/// Decode an unsigned integer of up to 256 bits.
///
/// Accepts a scalar (number, decimal or hex string), a `[low, high]` pair, a
/// `{low, high}` record, or any of those wrapped in a one-element container.
pub fn decode_u256(value: &Value) -> Option<U256> {
    match RawShape::classify(value) {
        RawShape::Tuple(items) => match items {
            [single] => decode_u256(single),
            [low, high] => Some(join_u256(
                narrow_u128(decode_scalar(low)?)?,
                narrow_u128(decode_scalar(high)?)?,
            )),
            _ => None,
        },
        RawShape::Record(map) => match (map.get("low"), map.get("high")) {
            (Some(low), Some(high)) => Some(join_u256(
                narrow_u128(decode_scalar(low)?)?,
                narrow_u128(decode_scalar(high)?)?,
            )),
            _ if map.len() == 1 => map.values().next().and_then(decode_u256),
            _ => None,
        },
        RawShape::Scalar(scalar) => decode_scalar(scalar),
        RawShape::Unrecognized => None,
    }
}

fn narrow_u128(value: U256) -> Option<u128> {
    let (low, high) = split_u256(value);
    (high == 0).then_some(low)
}

pub fn decode_u64(value: &Value) -> Option<u64> {
    decode_u256(value)
        .and_then(narrow_u128)
        .and_then(|v| u64::try_from(v).ok())
}

fn decode_u32(value: &Value) -> Option<u32> {
    decode_u64(value).and_then(|v| u32::try_from(v).ok())
}

pub fn decode_felt(value: &Value) -> Option<Felt> {
    decode_u256(value).map(Felt::new)
}

//=============================================================================
// Amounts
//=============================================================================

pub fn pow10(decimals: u8) -> U256 {
    (0..decimals).fold(U256::from(1u8), |acc, _| acc * U256::from(10u8))
}

/// Render a smallest-unit amount with exactly `fraction_digits` fractional digits.
/// Extra digits are truncated toward zero; missing ones are zero-padded.
pub fn format_amount(raw: U256, decimals: u8, fraction_digits: usize) -> String {
    let scale = pow10(decimals);
    let whole = raw / scale;
    if fraction_digits == 0 {
        return whole.to_string();
    }

    let mut fraction = if decimals == 0 {
        String::new()
    } else {
        format!(
            "{:0>width$}",
            (raw % scale).to_string(),
            width = decimals as usize
        )
    };
    fraction.truncate(fraction_digits);
    while fraction.len() < fraction_digits {
        fraction.push('0');
    }

    format!("{whole}.{fraction}")
}

/// Parse user input into smallest units. Integer arithmetic only.
///
/// Rejects empty, negative, non-numeric and zero input, and input with more
/// fractional digits than the token supports.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256> {
    let input = input.trim();
    if input.is_empty() {
        return Err(EsusuSdkError::InvalidAmount("amount is required".into()));
    }

    let (whole, fraction) = input.split_once('.').unwrap_or((input, ""));
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(EsusuSdkError::InvalidAmount(format!(
            "{input:?} is not a positive number"
        )));
    }
    if fraction.len() > decimals as usize {
        return Err(EsusuSdkError::InvalidAmount(format!(
            "at most {decimals} decimal places allowed"
        )));
    }

    let padding = decimals as usize - fraction.len();
    let digits = whole
        .bytes()
        .chain(fraction.bytes())
        .chain(std::iter::repeat(b'0').take(padding));

    let ten = U256::from(10u8);
    let mut raw = U256::ZERO;
    for digit in digits {
        raw = raw
            .checked_mul(ten)
            .and_then(|v| v.checked_add(U256::from(digit - b'0')))
            .ok_or_else(|| EsusuSdkError::InvalidAmount("amount is too large".into()))?;
    }

    if raw.is_zero() {
        return Err(EsusuSdkError::InvalidAmount(
            "amount must be greater than zero".into(),
        ));
    }
    Ok(raw)
}

//=============================================================================
// Time
//=============================================================================

pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Absolute UTC date for a unix timestamp in seconds.
pub fn format_timestamp(seconds: u64) -> Option<String> {
    let secs = i64::try_from(seconds).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format("%b %-d, %Y %H:%M UTC").to_string())
}

pub fn time_until(deadline: u64, now: i64) -> TimeRemaining {
    let deadline = i64::try_from(deadline).unwrap_or(i64::MAX);
    TimeRemaining::from_seconds(deadline.saturating_sub(now))
}

/// "Overdue", "Xm", "Xh Ym" or "Xd Yh Zm".
pub fn format_time_remaining(seconds: i64) -> String {
    TimeRemaining::from_seconds(seconds).to_string()
}

//=============================================================================
// Read Models
//=============================================================================

pub fn normalize_amount(value: &Value, format: AmountFormat) -> Option<DisplayAmount> {
    or_warn(decode_u256(value), "amount", value).map(|raw| DisplayAmount::new(raw, format))
}

pub fn normalize_count(value: &Value) -> Option<u64> {
    or_warn(decode_u64(value), "count", value)
}

pub fn normalize_address(value: &Value) -> Option<Felt> {
    or_warn(decode_felt(value), "address", value)
}

pub fn normalize_group_info(value: &Value, format: AmountFormat) -> Option<GroupInfo> {
    or_warn(decode_group_info(value, format), "group info", value)
}

fn decode_group_info(value: &Value, format: AmountFormat) -> Option<GroupInfo> {
    let fields = Fields::of(value)?;

    let id = GroupId(decode_u256(fields.get(0, "id")?)?);
    let creator = decode_felt(fields.get(1, "creator")?)?;
    let member_limit = decode_u32(fields.get(2, "member_limit")?)?;
    let num_members = decode_u32(fields.get(3, "num_members")?)?;
    let contribution = decode_u256(fields.get(4, "contribution_amount")?)?;
    let cycle_duration = decode_u64(fields.get(5, "cycle_duration")?)?;
    let current_cycle = decode_u32(fields.get(6, "current_cycle")?)?;
    let state = GroupState::from_code(decode_u64(fields.get(7, "state")?)?)?;
    let created_at = decode_u64(fields.get(8, "created_at")?)?;

    Some(GroupInfo {
        id,
        creator,
        member_limit,
        num_members,
        contribution_amount: DisplayAmount::new(contribution, format),
        cycle_duration,
        current_cycle,
        state,
        created_at,
        created_at_display: format_timestamp(created_at).unwrap_or_default(),
    })
}

/// Payout rotation as 1-based slots.
///
/// Entries are either bare addresses or `{address, status}` records. Without any
/// on-chain status the first slot is `Current` and the rest are `Pending`.
pub fn normalize_payout_order(value: &Value) -> Option<Vec<PayoutSlot>> {
    or_warn(decode_payout_order(value), "payout order", value)
}

fn decode_payout_order(value: &Value) -> Option<Vec<PayoutSlot>> {
    let entries: &[Value] = match RawShape::classify(unwrap_singleton(value)) {
        RawShape::Tuple(items) => items,
        RawShape::Record(map) => match ["order", "payout_order", "members"]
            .iter()
            .find_map(|key| map.get(*key))
        {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return None,
        },
        _ => return None,
    };

    let mut parsed = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::Object(map) => {
                let address = decode_felt(map.get("address")?)?;
                let status = map.get("status").and_then(decode_payout_status);
                parsed.push((address, status));
            },
            other => parsed.push((decode_felt(other)?, None)),
        }
    }

    let has_status = parsed.iter().any(|(_, status)| status.is_some());
    let slots = parsed
        .into_iter()
        .enumerate()
        .map(|(i, (address, status))| PayoutSlot {
            position: i as u32 + 1,
            address,
            status: match status {
                Some(status) => status,
                None if !has_status && i == 0 => PayoutStatus::Current,
                None => PayoutStatus::Pending,
            },
        })
        .collect();

    Some(slots)
}

fn decode_payout_status(value: &Value) -> Option<PayoutStatus> {
    match value {
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "current" => Some(PayoutStatus::Current),
            "pending" => Some(PayoutStatus::Pending),
            "completed" | "paid" => Some(PayoutStatus::Completed),
            _ => None,
        },
        other => match decode_u64(other)? {
            0 => Some(PayoutStatus::Pending),
            1 => Some(PayoutStatus::Current),
            2 => Some(PayoutStatus::Completed),
            _ => None,
        },
    }
}

/// `get_user_profile` response: reputation score, total contributions, groups
/// joined, groups completed, missed contributions.
pub fn normalize_user_profile(
    value: &Value,
    user: Felt,
    format: AmountFormat,
) -> Option<UserProfile> {
    or_warn(decode_user_profile(value, user, format), "user profile", value)
}

fn decode_user_profile(value: &Value, user: Felt, format: AmountFormat) -> Option<UserProfile> {
    let fields = Fields::of(value)?;

    Some(UserProfile {
        address: user,
        reputation_score: decode_u64(fields.get(0, "reputation_score")?)?,
        total_contributions: DisplayAmount::new(
            decode_u256(fields.get(1, "total_contributions")?)?,
            format,
        ),
        groups_joined: decode_u32(fields.get(2, "groups_joined")?)?,
        groups_completed: decode_u32(fields.get(3, "groups_completed")?)?,
        missed_contributions: decode_u32(fields.get(4, "missed_contributions")?)?,
    })
}

/// Deadline from `get_contribution_deadline`. The relative part comes from
/// `get_time_until_deadline` when available and is computed against `now` otherwise.
pub fn normalize_deadline(
    deadline: &Value,
    remaining: Option<&Value>,
    now: i64,
) -> Option<DeadlineView> {
    let deadline = or_warn(decode_u64(deadline), "contribution deadline", deadline)?;
    let remaining = match remaining.and_then(decode_u64) {
        Some(secs) => TimeRemaining::from_seconds(i64::try_from(secs).unwrap_or(i64::MAX)),
        None => time_until(deadline, now),
    };

    Some(DeadlineView {
        deadline,
        date: format_timestamp(deadline).unwrap_or_default(),
        remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USDC: AmountFormat = AmountFormat {
        decimals: 6,
        fraction_digits: 2,
    };

    #[test]
    fn u256_shapes() {
        assert_eq!(decode_u256(&json!(3)), Some(U256::from(3u8)));
        assert_eq!(decode_u256(&json!("0x10")), Some(U256::from(16u8)));
        assert_eq!(decode_u256(&json!("25")), Some(U256::from(25u8)));
        assert_eq!(decode_u256(&json!([7])), Some(U256::from(7u8)));
        assert_eq!(decode_u256(&json!([1, 1])), Some(join_u256(1, 1)));
        assert_eq!(
            decode_u256(&json!({"low": "0x2", "high": 0})),
            Some(U256::from(2u8))
        );
        assert_eq!(decode_u256(&json!({"balance": 9})), Some(U256::from(9u8)));
        assert_eq!(decode_u256(&json!(null)), None);
        assert_eq!(decode_u256(&json!([1, 2, 3])), None);
        assert_eq!(decode_u256(&json!(-1)), None);
    }

    #[test]
    fn format_amount_scales_and_truncates() {
        assert_eq!(format_amount(U256::from(1_234_567u64), 6, 2), "1.23");
        assert_eq!(format_amount(U256::from(5u8), 6, 2), "0.00");
        assert_eq!(format_amount(U256::from(10u64.pow(18)), 18, 2), "1.00");
        assert_eq!(format_amount(U256::from(1_500_000u64), 6, 0), "1");
        assert_eq!(format_amount(U256::from(15u8), 1, 3), "1.500");
    }

    #[test]
    fn parse_amount_validates_input() {
        assert_eq!(parse_amount("12.5", 6).unwrap(), U256::from(12_500_000u64));
        assert_eq!(parse_amount(" 3 ", 6).unwrap(), U256::from(3_000_000u64));
        assert_eq!(parse_amount(".5", 6).unwrap(), U256::from(500_000u64));
        for bad in ["", "0", "0.000", "-1", "abc", "1e3", "1.2.3", ".", "1.0000001"] {
            assert!(
                matches!(parse_amount(bad, 6), Err(EsusuSdkError::InvalidAmount(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_then_parse_reproduces_amount() {
        for (raw, decimals, digits) in [
            (1_230_000u64, 6u8, 2usize),
            (987_654_321, 6, 6),
            (1, 6, 6),
            (4_200_000_000_000_000_000, 18, 2),
        ] {
            let raw = U256::from(raw);
            let shown = format_amount(raw, decimals, digits);
            assert_eq!(parse_amount(&shown, decimals).unwrap(), raw, "{shown}");
        }
    }

    #[test]
    fn time_remaining_strings() {
        assert_eq!(format_time_remaining(0), "Overdue");
        assert_eq!(format_time_remaining(3661), "1h 1m");
        assert_eq!(format_time_remaining(90000), "1d 1h 0m");
        assert_eq!(time_until(100, 160), TimeRemaining::Overdue);
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(0).unwrap(), "Jan 1, 1970 00:00 UTC");
        assert_eq!(
            format_timestamp(1_700_000_000).unwrap(),
            "Nov 14, 2023 22:13 UTC"
        );
    }

    fn group_tuple() -> Value {
        json!([[42, 0], "0xabc", 5, 3, 10_000_000, 604800, 2, 1, 1_700_000_000])
    }

    #[test]
    fn group_info_from_tuple_and_record() {
        let from_tuple = normalize_group_info(&group_tuple(), USDC).unwrap();
        let from_record = normalize_group_info(
            &json!({
                "id": {"low": 42, "high": 0},
                "creator": "0xabc",
                "member_limit": 5,
                "num_members": 3,
                "contribution_amount": "10000000",
                "cycle_duration": 604800,
                "current_cycle": 2,
                "state": 1,
                "created_at": 1_700_000_000u64,
            }),
            USDC,
        )
        .unwrap();

        assert_eq!(from_tuple, from_record);
        assert_eq!(from_tuple.id, GroupId::from(42));
        assert_eq!(from_tuple.contribution_amount.formatted, "10.00");
        assert_eq!(from_tuple.state, GroupState::Active);
        assert!(!from_tuple.is_nonexistent());
    }

    #[test]
    fn group_info_wrapped_in_single_element_tuple() {
        let wrapped = json!([group_tuple()]);
        assert!(normalize_group_info(&wrapped, USDC).is_some());
    }

    #[test]
    fn malformed_group_info_is_none() {
        assert_eq!(normalize_group_info(&json!(7), USDC), None);
        assert_eq!(normalize_group_info(&json!([1, 2]), USDC), None);
        assert_eq!(normalize_group_info(&json!({"id": 1}), USDC), None);
    }

    #[test]
    fn payout_order_marks_first_slot_current() {
        let slots = normalize_payout_order(&json!(["0x1", "0x2", "0x3"])).unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].position, 1);
        assert_eq!(slots[0].status, PayoutStatus::Current);
        assert!(slots[1..].iter().all(|s| s.status == PayoutStatus::Pending));
        assert_eq!(slots[2].address, Felt::from(3u64));
    }

    #[test]
    fn payout_order_nested_and_keyed() {
        let nested = normalize_payout_order(&json!([["0x1", "0x2"]])).unwrap();
        let keyed = normalize_payout_order(&json!({"order": ["0x1", "0x2"], "round": 1})).unwrap();
        assert_eq!(nested, keyed);
        assert_eq!(normalize_payout_order(&json!([])).unwrap(), vec![]);
        assert_eq!(normalize_payout_order(&json!("0x1")), None);
    }

    #[test]
    fn payout_order_keeps_onchain_status() {
        let slots = normalize_payout_order(&json!([
            {"address": "0x1", "status": "completed"},
            {"address": "0x2", "status": 1},
            {"address": "0x3"},
        ]))
        .unwrap();
        assert_eq!(slots[0].status, PayoutStatus::Completed);
        assert_eq!(slots[1].status, PayoutStatus::Current);
        assert_eq!(slots[2].status, PayoutStatus::Pending);
    }

    #[test]
    fn deadline_prefers_contract_countdown() {
        let view = normalize_deadline(&json!(1_000), Some(&json!(3661)), 0).unwrap();
        assert_eq!(view.remaining.to_string(), "1h 1m");

        let computed = normalize_deadline(&json!(1_000), None, 2_000).unwrap();
        assert_eq!(computed.remaining, TimeRemaining::Overdue);
        assert_eq!(computed.date, "Jan 1, 1970 00:16 UTC");
    }

    #[test]
    fn user_profile_tuple() {
        let profile =
            normalize_user_profile(&json!([87, 50_000_000, 4, 2, 1]), Felt::from(9u64), USDC)
                .unwrap();
        assert_eq!(profile.reputation_score, 87);
        assert_eq!(profile.total_contributions.formatted, "50.00");
        assert_eq!(profile.missed_contributions, 1);
    }
}
