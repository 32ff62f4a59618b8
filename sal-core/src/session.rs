// sal-core/src/session.rs
//! The handle front-ends hold: one device, its inventory and the operation slot.
//!
//! Everything returned from here is a snapshot; nothing hands out references into shared
//! state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sal_common::config::Config;
use sal_common::error::Result;
use sal_common::model::{ArtifactRecord, ConnectionStatus, Inventory, OperationState};
use sal_net::{RemoteChannel, SshChannel};
use tracing::{debug, info};

use crate::connection::ConnectionMonitor;
use crate::deploy::{DeployRequest, Deployer, Rejection};
use crate::inventory::InventoryScanner;
use crate::worker::DeployWorker;

pub struct Session {
    config: Config,
    monitor: ConnectionMonitor,
    scanner: Arc<InventoryScanner>,
    deployer: Arc<Deployer>,
    worker: DeployWorker,
}

impl Session {
    pub fn init(config: Config, channel: Arc<dyn RemoteChannel>) -> Result<Self> {
        debug!(
            "Initializing session for {} (local plugins in {})",
            config.destination(),
            config.local_dir().display()
        );
        let monitor = ConnectionMonitor::new(Arc::clone(&channel), &config.user);
        let scanner = Arc::new(InventoryScanner::new(
            &config,
            Arc::clone(&channel),
            monitor.clone(),
        ));
        let deployer = Arc::new(Deployer::new(
            &config,
            channel,
            monitor.clone(),
            Arc::clone(&scanner),
        ));
        let worker = DeployWorker::start(Arc::clone(&deployer))?;

        Ok(Self {
            config,
            monitor,
            scanner,
            deployer,
            worker,
        })
    }

    /// Session talking to the device over ssh.
    pub fn init_ssh(config: Config) -> Result<Self> {
        let channel: Arc<dyn RemoteChannel> = Arc::new(SshChannel::new(&config));
        Self::init(config, channel)
    }

    /// Waits for a running background job, then forgets the connection verdict.
    pub fn shutdown(&self) {
        self.worker.shutdown();
        self.monitor.reset();
        info!("Session for {} shut down", self.config.host);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rescans both sides. Rejected while another operation runs.
    pub fn refresh(&self) -> bool {
        self.deployer.refresh()
    }

    pub fn inventory(&self) -> Inventory {
        self.scanner.inventory()
    }

    pub fn find_by_name(&self, name: &str) -> Option<ArtifactRecord> {
        self.scanner.find(name)
    }

    /// Blocks until the install finishes. See [`Session::operation_state`] for the reason on
    /// `false`.
    pub fn install(&self, name: &str) -> bool {
        self.deployer.install(name)
    }

    pub fn uninstall(&self, name: &str) -> bool {
        self.deployer.uninstall(name)
    }

    /// Hands the request to the background worker and returns immediately.
    pub fn submit(&self, request: DeployRequest) -> std::result::Result<(), Rejection> {
        self.worker.submit(request)
    }

    pub fn operation_state(&self) -> OperationState {
        self.deployer.operation_state()
    }

    pub fn is_busy(&self) -> bool {
        self.deployer.is_busy()
    }

    pub fn check_connection(&self) -> ConnectionStatus {
        self.monitor.check_connection()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.monitor.status()
    }

    pub fn host(&self) -> String {
        self.monitor.host()
    }

    pub fn user(&self) -> String {
        self.monitor.user()
    }

    pub fn set_local_dir(&self, dir: impl AsRef<Path>) {
        self.scanner.set_local_dir(dir);
    }

    pub fn local_dir(&self) -> PathBuf {
        self.scanner.local_dir()
    }

    pub fn worker(&self) -> &DeployWorker {
        &self.worker
    }
}
