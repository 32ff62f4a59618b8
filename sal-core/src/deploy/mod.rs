// sal-core/src/deploy/mod.rs
//! Install, uninstall and refresh as step sequences against the device.
//!
//! Every operation goes through two phases. `begin_*` checks preconditions and claims the
//! single operation slot atomically, handing back a [`Job`]; `run` executes the steps and
//! always releases the slot. Rejections never touch the device.

mod install;
pub mod state;
mod uninstall;

use std::path::PathBuf;
use std::sync::Arc;

use sal_common::config::Config;
use sal_common::model::{Inventory, OperationKind, OperationState};
use sal_net::{validate_name, RemoteChannel, RemoteCommand};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::connection::ConnectionMonitor;
use crate::inventory::InventoryScanner;
pub use state::OperationTracker;

/// Why an operation was refused before it started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Unknown plugin {0}")]
    UnknownArtifact(String),
    #[error("Plugin not found locally")]
    NotLocal(String),
    #[error("Plugin not installed on device")]
    NotOnDevice(String),
    #[error("Invalid plugin name: {0}")]
    InvalidName(String),
    #[error("Device not connected")]
    Disconnected,
    #[error("Another operation is in progress")]
    Busy,
}

/// What a caller may ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployRequest {
    Install(String),
    Uninstall(String),
    Refresh,
}

impl DeployRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            DeployRequest::Install(_) => OperationKind::Installing,
            DeployRequest::Uninstall(_) => OperationKind::Uninstalling,
            DeployRequest::Refresh => OperationKind::Refreshing,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            DeployRequest::Install(name) | DeployRequest::Uninstall(name) => name,
            DeployRequest::Refresh => "",
        }
    }
}

/// An accepted operation. Holding one means the operation slot is claimed; pass it to
/// [`Deployer::run`] to execute and release it.
#[derive(Debug)]
#[must_use = "an accepted job holds the operation slot until it is run"]
pub struct Job {
    step: JobStep,
}

#[derive(Debug)]
enum JobStep {
    Install {
        name: String,
        local_path: PathBuf,
        remote_path: String,
    },
    Uninstall {
        name: String,
        remote_path: String,
    },
    Refresh,
}

impl Job {
    pub fn kind(&self) -> OperationKind {
        match self.step {
            JobStep::Install { .. } => OperationKind::Installing,
            JobStep::Uninstall { .. } => OperationKind::Uninstalling,
            JobStep::Refresh => OperationKind::Refreshing,
        }
    }

    pub fn target(&self) -> &str {
        match &self.step {
            JobStep::Install { name, .. } | JobStep::Uninstall { name, .. } => name,
            JobStep::Refresh => "",
        }
    }
}

/// Outcome of a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub success: bool,
    pub message: String,
}

pub struct Deployer {
    channel: Arc<dyn RemoteChannel>,
    monitor: ConnectionMonitor,
    scanner: Arc<InventoryScanner>,
    tracker: OperationTracker,
    config: Config,
}

impl Deployer {
    pub fn new(
        config: &Config,
        channel: Arc<dyn RemoteChannel>,
        monitor: ConnectionMonitor,
        scanner: Arc<InventoryScanner>,
    ) -> Self {
        Self {
            channel,
            monitor,
            scanner,
            tracker: OperationTracker::new(),
            config: config.clone(),
        }
    }

    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    pub fn operation_state(&self) -> OperationState {
        self.tracker.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.tracker.is_busy()
    }

    pub fn begin(&self, request: &DeployRequest) -> Result<Job, Rejection> {
        match request {
            DeployRequest::Install(name) => self.begin_install(name),
            DeployRequest::Uninstall(name) => self.begin_uninstall(name),
            DeployRequest::Refresh => self.begin_refresh(),
        }
    }

    pub fn begin_install(&self, name: &str) -> Result<Job, Rejection> {
        let result = self.check_install(name).and_then(|(local_path, remote_path)| {
            self.claim(
                OperationKind::Installing,
                name,
                format!("Installing {name}..."),
                JobStep::Install {
                    name: name.to_string(),
                    local_path,
                    remote_path,
                },
            )
        });
        self.reject_on_err(result)
    }

    pub fn begin_uninstall(&self, name: &str) -> Result<Job, Rejection> {
        let result = self.check_uninstall(name).and_then(|remote_path| {
            self.claim(
                OperationKind::Uninstalling,
                name,
                format!("Uninstalling {name}..."),
                JobStep::Uninstall {
                    name: name.to_string(),
                    remote_path,
                },
            )
        });
        self.reject_on_err(result)
    }

    /// Refreshing works while disconnected; the remote half is simply skipped.
    pub fn begin_refresh(&self) -> Result<Job, Rejection> {
        let result = self.claim(
            OperationKind::Refreshing,
            "",
            "Refreshing...".to_string(),
            JobStep::Refresh,
        );
        self.reject_on_err(result)
    }

    /// Runs an accepted job to completion and releases the operation slot.
    #[instrument(skip(self, job), fields(kind = ?job.kind(), target = job.target()))]
    pub fn run(&self, job: Job) -> JobOutcome {
        let outcome = match job.step {
            JobStep::Install {
                name,
                local_path,
                remote_path,
            } => self.run_install(&name, &local_path, &remote_path),
            JobStep::Uninstall { name, remote_path } => self.run_uninstall(&name, &remote_path),
            JobStep::Refresh => self.run_refresh(),
        };
        self.tracker
            .finish(outcome.success, outcome.message.clone());
        outcome
    }

    /// Releases a claimed slot without running the job.
    pub fn abandon(&self, job: Job, reason: &str) -> JobOutcome {
        warn!("Abandoning {:?} of '{}': {}", job.kind(), job.target(), reason);
        let outcome = JobOutcome {
            success: false,
            message: reason.to_string(),
        };
        self.tracker.finish(false, outcome.message.clone());
        outcome
    }

    /// Blocking install. `false` on rejection or failure; the operation state says which.
    pub fn install(&self, name: &str) -> bool {
        match self.begin_install(name) {
            Ok(job) => self.run(job).success,
            Err(_) => false,
        }
    }

    pub fn uninstall(&self, name: &str) -> bool {
        match self.begin_uninstall(name) {
            Ok(job) => self.run(job).success,
            Err(_) => false,
        }
    }

    pub fn refresh(&self) -> bool {
        match self.begin_refresh() {
            Ok(job) => self.run(job).success,
            Err(_) => false,
        }
    }

    fn check_install(&self, name: &str) -> Result<(PathBuf, String), Rejection> {
        let record = self
            .scanner
            .find(name)
            .ok_or_else(|| Rejection::UnknownArtifact(name.to_string()))?;
        let local_path = record
            .local_path()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| Rejection::NotLocal(name.to_string()))?;
        validate_name(name).map_err(|_| Rejection::InvalidName(name.to_string()))?;
        if !self.monitor.is_connected() {
            return Err(Rejection::Disconnected);
        }
        Ok((local_path, self.config.remote_artifact_path(name)))
    }

    fn check_uninstall(&self, name: &str) -> Result<String, Rejection> {
        let record = self
            .scanner
            .find(name)
            .ok_or_else(|| Rejection::UnknownArtifact(name.to_string()))?;
        let remote_path = record
            .remote_path()
            .map(str::to_string)
            .ok_or_else(|| Rejection::NotOnDevice(name.to_string()))?;
        validate_name(name).map_err(|_| Rejection::InvalidName(name.to_string()))?;
        if !self.monitor.is_connected() {
            return Err(Rejection::Disconnected);
        }
        Ok(remote_path)
    }

    fn claim(
        &self,
        kind: OperationKind,
        target: &str,
        message: String,
        step: JobStep,
    ) -> Result<Job, Rejection> {
        if self.tracker.try_begin(kind, target, message) {
            debug!("Accepted {:?} of '{}'", kind, target);
            Ok(Job { step })
        } else {
            Err(Rejection::Busy)
        }
    }

    fn reject_on_err(&self, result: Result<Job, Rejection>) -> Result<Job, Rejection> {
        if let Err(rejection) = &result {
            info!("Rejected: {}", rejection);
            self.tracker.note_rejection(rejection.to_string());
        }
        result
    }

    fn run_refresh(&self) -> JobOutcome {
        let tracker = self.tracker.clone();
        let inventory: Inventory = self
            .scanner
            .refresh(&mut |fraction, message| tracker.update(fraction, message));
        JobOutcome {
            success: true,
            message: format!("Found {} plugins", inventory.len()),
        }
    }

    /// Runs a step whose failure is only worth a warning.
    fn best_effort(&self, what: &str, command: &RemoteCommand) -> bool {
        let result = self.channel.execute(command);
        if !result.success {
            warn!(
                "{} failed on {} (exit {}): {}",
                what,
                self.channel.host(),
                result.exit_code,
                result.output.trim()
            );
        }
        result.success
    }
}
