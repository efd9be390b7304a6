#![allow(dead_code)]

use async_trait::async_trait;
use esusu_sdk::advanced::calldata::{ContractCall, Felt};
use esusu_sdk::core::connection::StarkConnection;
use esusu_sdk::core::constants::entrypoints;
use esusu_sdk::{EsusuClient, ProviderError, SdkConfig, WalletSession};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const CONTRACT: u64 = 0xe5e5;
pub const STABLE_TOKEN: u64 = 0x05dc;
pub const USER: u64 = 0xa11ce;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Default)]
struct MockState {
    reads: HashMap<String, Value>,
    scoped_reads: HashMap<ContractCall, Value>,
    delayed_reads: HashMap<String, VecDeque<(Duration, Value)>>,
    failing_reads: HashMap<String, String>,
    failing_groups: HashSet<u64>,
    read_log: Vec<ContractCall>,
    executed: Vec<Vec<ContractCall>>,
    execute_error: Option<ProviderError>,
    confirm_error: Option<String>,
    confirm_gate: Option<Arc<Notify>>,
}

/// In-memory stand-in for the wallet and contract client.
#[derive(Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every read of `entrypoint` with `value`.
    pub fn with_read(self, entrypoint: &str, value: Value) -> Self {
        self.state
            .lock()
            .unwrap()
            .reads
            .insert(entrypoint.to_string(), value);
        self
    }

    /// Answer exactly `call` with `value`; takes precedence over `with_read`.
    pub fn with_read_for(self, call: ContractCall, value: Value) -> Self {
        self.state.lock().unwrap().scoped_reads.insert(call, value);
        self
    }

    /// Queue a response that arrives after `delay`. Queued responses are
    /// consumed in order before any `with_read` answer.
    pub fn with_delayed_read(self, entrypoint: &str, delay: Duration, value: Value) -> Self {
        self.state
            .lock()
            .unwrap()
            .delayed_reads
            .entry(entrypoint.to_string())
            .or_default()
            .push_back((delay, value));
        self
    }

    pub fn fail_reads(self, entrypoint: &str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_reads
            .insert(entrypoint.to_string(), message.to_string());
        self
    }

    /// `get_group_info` for this id fails with an RPC error.
    pub fn fail_group(self, id: u64) -> Self {
        self.state.lock().unwrap().failing_groups.insert(id);
        self
    }

    pub fn fail_execute(self, error: ProviderError) -> Self {
        self.state.lock().unwrap().execute_error = Some(error);
        self
    }

    pub fn fail_confirmation(self, message: &str) -> Self {
        self.state.lock().unwrap().confirm_error = Some(message.to_string());
        self
    }

    /// Confirmations block until the returned handle is notified.
    pub fn gate_confirmations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().confirm_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn execute_count(&self) -> usize {
        self.state.lock().unwrap().executed.len()
    }

    pub fn executed_calls(&self) -> Vec<ContractCall> {
        self.state
            .lock()
            .unwrap()
            .executed
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn read_count(&self, entrypoint: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .read_log
            .iter()
            .filter(|call| call.entrypoint == entrypoint)
            .count()
    }

    pub fn total_reads(&self) -> usize {
        self.state.lock().unwrap().read_log.len()
    }
}

#[async_trait]
impl StarkConnection for MockConnection {
    async fn call(&self, call: &ContractCall) -> Result<Value, BoxError> {
        let delayed = {
            let mut state = self.state.lock().unwrap();
            state.read_log.push(call.clone());
            state
                .delayed_reads
                .get_mut(&call.entrypoint)
                .and_then(VecDeque::pop_front)
        };
        if let Some((delay, value)) = delayed {
            tokio::time::sleep(delay).await;
            return Ok(value);
        }

        let state = self.state.lock().unwrap();
        if call.entrypoint == entrypoints::GET_GROUP_INFO {
            let id = call.calldata.first().map(|w| w.value().to::<u64>());
            if id.is_some_and(|id| state.failing_groups.contains(&id)) {
                return Err(Box::new(ProviderError::Rpc("node timed out".into())));
            }
        }
        if let Some(message) = state.failing_reads.get(&call.entrypoint) {
            return Err(message.clone().into());
        }
        if let Some(value) = state.scoped_reads.get(call) {
            return Ok(value.clone());
        }
        state
            .reads
            .get(&call.entrypoint)
            .cloned()
            .ok_or_else(|| format!("no scripted response for {}", call.entrypoint).into())
    }

    async fn execute(
        &self,
        _account: &Felt,
        calls: &[ContractCall],
    ) -> Result<String, BoxError> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(calls.to_vec());
        if let Some(error) = state.execute_error.clone() {
            return Err(Box::new(error));
        }
        Ok(format!("0x{:x}", state.executed.len()))
    }

    async fn wait_for_transaction(&self, _transaction_hash: &str) -> Result<(), BoxError> {
        let (gate, error) = {
            let state = self.state.lock().unwrap();
            (state.confirm_gate.clone(), state.confirm_error.clone())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match error {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }
}

pub fn contract() -> Felt {
    Felt::from(CONTRACT)
}

pub fn user() -> Felt {
    Felt::from(USER)
}

pub fn test_config() -> SdkConfig {
    let mut config = SdkConfig::new(contract(), Felt::from(STABLE_TOKEN));
    config.preload.delay_ms = 0;
    config
}

pub fn connected_client(mock: &MockConnection) -> EsusuClient<MockConnection> {
    EsusuClient::new(
        Arc::new(mock.clone()),
        Arc::new(WalletSession::connected(user())),
        test_config(),
    )
}

pub fn disconnected_client(mock: &MockConnection) -> EsusuClient<MockConnection> {
    EsusuClient::new(
        Arc::new(mock.clone()),
        Arc::new(WalletSession::new()),
        test_config(),
    )
}

/// `get_group_info` tuple for an existing group.
pub fn group_record(id: u64, members: u64, limit: u64) -> Value {
    json!([id, "0xc0ffee", limit, members, 10_000_000u64, 604_800u64, 1, 1, 1_700_000_000u64])
}
