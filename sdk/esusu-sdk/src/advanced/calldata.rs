use crate::error::EsusuSdkError;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=============================================================================
// Words
//=============================================================================

/// A single calldata word. Contract and account addresses are words too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Felt(U256);

impl Felt {
    pub const ZERO: Felt = Felt(U256::ZERO);

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn value(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<u64> for Felt {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Felt {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for Felt {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for Felt {
    type Err = EsusuSdkError;

    /// Accepts `0x`-prefixed hex or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => (hex, 16),
            None => (s, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix as u32)) {
            return Err(EsusuSdkError::Decode(format!("not a field element: {s:?}")));
        }
        U256::from_str_radix(digits, radix)
            .map(Felt)
            .map_err(|e| EsusuSdkError::Decode(format!("not a field element: {s:?} ({e})")))
    }
}

impl TryFrom<String> for Felt {
    type Error = EsusuSdkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Felt> for String {
    fn from(value: Felt) -> Self {
        value.to_string()
    }
}

//=============================================================================
// U256 low/high split
//=============================================================================

/// Split a 256-bit value into its `(low, high)` 128-bit halves.
pub fn split_u256(value: U256) -> (u128, u128) {
    let limbs = value.as_limbs();
    let low = (limbs[1] as u128) << 64 | limbs[0] as u128;
    let high = (limbs[3] as u128) << 64 | limbs[2] as u128;
    (low, high)
}

/// Inverse of [`split_u256`]: `high << 128 | low`.
pub fn join_u256(low: u128, high: u128) -> U256 {
    U256::from_limbs([
        low as u64,
        (low >> 64) as u64,
        high as u64,
        (high >> 64) as u64,
    ])
}

/// Calldata words for a u256 argument, low word first.
pub fn u256_words(value: U256) -> [Felt; 2] {
    let (low, high) = split_u256(value);
    [Felt::from(low), Felt::from(high)]
}

//=============================================================================
// Calls
//=============================================================================

/// A single contract entry point invocation.
///
/// Word order and count must match the entry point signature exactly. A mismatch
/// is not detectable here; the contract reverts or misreads the arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractCall {
    pub entrypoint: String,
    pub contract_address: Felt,
    pub calldata: Vec<Felt>,
}

impl ContractCall {
    pub fn new(contract_address: Felt, entrypoint: impl Into<String>) -> Self {
        Self {
            entrypoint: entrypoint.into(),
            contract_address,
            calldata: Vec::new(),
        }
    }

    pub fn with_word(mut self, word: Felt) -> Self {
        self.calldata.push(word);
        self
    }

    pub fn with_u256(mut self, value: U256) -> Self {
        self.calldata.extend(u256_words(value));
        self
    }
}
