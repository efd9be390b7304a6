use crate::advanced::calldata::Felt;
use log::info;
use tokio::sync::watch;

const TARGET: &str = "esusu_sdk::session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Active { address: Felt },
}

/// Connected-account state shared by every hook.
///
/// Only the wallet connection flow calls `connect`/`disconnect`; hooks read it.
/// Lifecycle: disconnected -> active -> disconnected.
#[derive(Debug)]
pub struct WalletSession {
    state: watch::Sender<SessionState>,
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self { state }
    }

    /// Session that starts out connected as `address`.
    pub fn connected(address: Felt) -> Self {
        let session = Self::new();
        session.connect(address);
        session
    }

    pub fn connect(&self, address: Felt) {
        info!(target: TARGET, "wallet connected: {}", address);
        self.state.send_replace(SessionState::Active { address });
    }

    pub fn disconnect(&self) {
        if self.is_connected() {
            info!(target: TARGET, "wallet disconnected");
        }
        self.state.send_replace(SessionState::Disconnected);
    }

    pub fn address(&self) -> Option<Felt> {
        match &*self.state.borrow() {
            SessionState::Active { address } => Some(*address),
            SessionState::Disconnected => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.address().is_some()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every connect/disconnect.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
