// sal-core/src/connection.rs
use std::sync::{Arc, PoisonError, RwLock};

use sal_common::model::{ConnectionState, ConnectionStatus};
use sal_net::command::PROBE_TOKEN;
use sal_net::RemoteChannel;
use tracing::{debug, info, warn};

/// Cached reachability of the device.
///
/// `status()` is always answered from the cache; only `check_connection()` talks to the
/// device. Clones share the same state.
#[derive(Clone)]
pub struct ConnectionMonitor {
    channel: Arc<dyn RemoteChannel>,
    state: Arc<RwLock<ConnectionState>>,
}

impl ConnectionMonitor {
    pub fn new(channel: Arc<dyn RemoteChannel>, user: &str) -> Self {
        let state = ConnectionState::new(channel.host(), user);
        Self {
            channel,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Probes the device and caches the verdict.
    pub fn check_connection(&self) -> ConnectionStatus {
        let before = self.set_status(ConnectionStatus::Checking);
        let result = self.channel.probe();

        let status = if result.success && result.output.trim() == PROBE_TOKEN {
            ConnectionStatus::Connected
        } else {
            debug!(
                "Probe of {} failed (exit {}): {}",
                self.channel.host(),
                result.exit_code,
                result.output.trim()
            );
            ConnectionStatus::Disconnected
        };

        self.set_status(status);
        if before != status {
            match status {
                ConnectionStatus::Connected => info!("Device {} is now connected", self.channel.host()),
                _ => warn!("Device {} is not reachable", self.channel.host()),
            }
        }
        status
    }

    pub fn status(&self) -> ConnectionStatus {
        self.read().status
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.read().clone()
    }

    pub fn host(&self) -> String {
        self.read().host.clone()
    }

    pub fn user(&self) -> String {
        self.read().user.clone()
    }

    /// Forgets the last verdict.
    pub fn reset(&self) {
        self.set_status(ConnectionStatus::Unknown);
    }

    fn set_status(&self, status: ConnectionStatus) -> ConnectionStatus {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut state.status, status)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ConnectionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConnectionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMonitor")
            .field("state", &*self.read())
            .finish()
    }
}
