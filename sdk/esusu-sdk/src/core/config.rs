use crate::advanced::calldata::Felt;
use crate::core::constants::{
    DEFAULT_CACHE_TTL_MS, DEFAULT_PRELOAD_COUNT, DEFAULT_PRELOAD_DELAY_MS,
    DEFAULT_TOKEN_DECIMALS, DEFAULT_WATCH_INTERVAL_MS, DISPLAY_FRACTION_DIGITS,
    MAX_FRACTION_DIGITS, STABLE_TOKEN_DECIMALS,
};
use crate::error::{EsusuSdkError, Result};
use crate::types::AmountFormat;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// SDK settings.
///
/// ENV (see [`SdkConfig::from_env`]):
///   ESUSU_CONTRACT_ADDRESS      - savings circle contract (required)
///   ESUSU_STABLE_TOKEN          - stable token contract (required)
///   ESUSU_STABLE_DECIMALS       - default 6
///   ESUSU_DEFAULT_DECIMALS      - default 18
///   ESUSU_FRACTION_DIGITS       - display digits, default 2
///   ESUSU_CACHE_TTL_MS          - default 30000
///   ESUSU_WATCH_INTERVAL_MS     - default 10000
///   ESUSU_PRELOAD_COUNT         - default 10
///   ESUSU_PRELOAD_DELAY_MS      - default 1000
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SdkConfig {
    pub contract_address: Felt,
    pub stable_token: Felt,
    #[serde(default = "default_stable_decimals")]
    pub stable_decimals: u8,
    #[serde(default = "default_token_decimals")]
    pub default_decimals: u8,
    #[serde(default = "default_fraction_digits")]
    pub display_fraction_digits: usize,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
    #[serde(default)]
    pub preload: PreloadConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PreloadConfig {
    #[serde(default = "default_preload_count")]
    pub count: u64,
    #[serde(default = "default_preload_delay_ms")]
    pub delay_ms: u64,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_PRELOAD_COUNT,
            delay_ms: DEFAULT_PRELOAD_DELAY_MS,
        }
    }
}

fn default_stable_decimals() -> u8 {
    STABLE_TOKEN_DECIMALS
}

fn default_token_decimals() -> u8 {
    DEFAULT_TOKEN_DECIMALS
}

fn default_fraction_digits() -> usize {
    DISPLAY_FRACTION_DIGITS
}

fn default_cache_ttl_ms() -> u64 {
    DEFAULT_CACHE_TTL_MS
}

fn default_watch_interval_ms() -> u64 {
    DEFAULT_WATCH_INTERVAL_MS
}

fn default_preload_count() -> u64 {
    DEFAULT_PRELOAD_COUNT
}

fn default_preload_delay_ms() -> u64 {
    DEFAULT_PRELOAD_DELAY_MS
}

impl SdkConfig {
    /// Config with every optional field at its default.
    pub fn new(contract_address: Felt, stable_token: Felt) -> Self {
        Self {
            contract_address,
            stable_token,
            stable_decimals: STABLE_TOKEN_DECIMALS,
            default_decimals: DEFAULT_TOKEN_DECIMALS,
            display_fraction_digits: DISPLAY_FRACTION_DIGITS,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            watch_interval_ms: DEFAULT_WATCH_INTERVAL_MS,
            preload: PreloadConfig::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EsusuSdkError::InvalidConfig(e.to_string()))?;
        config.validate()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<Felt> {
            let raw = lookup(key)
                .ok_or_else(|| EsusuSdkError::InvalidConfig(format!("{key} not set")))?;
            Felt::from_str(&raw)
                .map_err(|_| EsusuSdkError::InvalidConfig(format!("{key} is not an address: {raw}")))
        };

        let mut config = Self::new(
            required("ESUSU_CONTRACT_ADDRESS")?,
            required("ESUSU_STABLE_TOKEN")?,
        );

        if let Some(v) = parse_optional(&lookup, "ESUSU_STABLE_DECIMALS")? {
            config.stable_decimals = v;
        }
        if let Some(v) = parse_optional(&lookup, "ESUSU_DEFAULT_DECIMALS")? {
            config.default_decimals = v;
        }
        if let Some(v) = parse_optional(&lookup, "ESUSU_FRACTION_DIGITS")? {
            config.display_fraction_digits = v;
        }
        if let Some(v) = parse_optional(&lookup, "ESUSU_CACHE_TTL_MS")? {
            config.cache_ttl_ms = v;
        }
        if let Some(v) = parse_optional(&lookup, "ESUSU_WATCH_INTERVAL_MS")? {
            config.watch_interval_ms = v;
        }
        if let Some(v) = parse_optional(&lookup, "ESUSU_PRELOAD_COUNT")? {
            config.preload.count = v;
        }
        if let Some(v) = parse_optional(&lookup, "ESUSU_PRELOAD_DELAY_MS")? {
            config.preload.delay_ms = v;
        }

        config.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.contract_address.is_zero() {
            return Err(EsusuSdkError::InvalidConfig(
                "contract_address must not be zero".into(),
            ));
        }
        // 10^77 is the largest power of ten below 2^256
        if self.stable_decimals > 77 || self.default_decimals > 77 {
            return Err(EsusuSdkError::InvalidConfig(
                "token decimals out of range".into(),
            ));
        }
        if self.display_fraction_digits > MAX_FRACTION_DIGITS {
            return Err(EsusuSdkError::InvalidConfig(format!(
                "display_fraction_digits must be at most {MAX_FRACTION_DIGITS}"
            )));
        }
        if self.watch_interval_ms == 0 {
            return Err(EsusuSdkError::InvalidConfig(
                "watch_interval_ms must be positive".into(),
            ));
        }
        Ok(self)
    }

    /// Decimals of `token`: the stable token has its own, everything else uses the default.
    pub fn token_decimals(&self, token: &Felt) -> u8 {
        if *token == self.stable_token {
            self.stable_decimals
        } else {
            self.default_decimals
        }
    }

    pub fn amount_format(&self, token: &Felt) -> AmountFormat {
        AmountFormat {
            decimals: self.token_decimals(token),
            fraction_digits: self.display_fraction_digits,
        }
    }

    pub fn stable_format(&self) -> AmountFormat {
        self.amount_format(&self.stable_token)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }

    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload.delay_ms)
    }
}

fn parse_optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EsusuSdkError::InvalidConfig(format!("{key} has invalid value {raw:?}"))),
    }
}
