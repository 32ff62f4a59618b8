// sal-core/src/worker.rs
//! Runs accepted deployment jobs on a background thread so callers never block on the device.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use sal_common::error::{Result, SalError};
use sal_common::model::OperationKind;
use tracing::{debug, error, instrument};

use crate::deploy::{DeployRequest, Deployer, Job, Rejection};

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    Started {
        kind: OperationKind,
        target: String,
    },
    Finished {
        kind: OperationKind,
        target: String,
        success: bool,
        message: String,
    },
}

pub struct DeployWorker {
    deployer: Arc<Deployer>,
    job_tx: Mutex<Option<Sender<Job>>>,
    event_rx: Receiver<DeployEvent>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DeployWorker {
    pub fn start(deployer: Arc<Deployer>) -> Result<Self> {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (event_tx, event_rx) = bounded::<DeployEvent>(EVENT_BUFFER);

        let worker_deployer = Arc::clone(&deployer);
        let handle = thread::Builder::new()
            .name("sal-deploy".to_string())
            .spawn(move || worker_loop(worker_deployer, job_rx, event_tx))
            .map_err(|e| SalError::Generic(format!("failed to start deploy worker: {e}")))?;

        debug!("Deploy worker started.");
        Ok(Self {
            deployer,
            job_tx: Mutex::new(Some(job_tx)),
            event_rx,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Validates and claims the operation slot on the calling thread, then queues the job.
    ///
    /// A busy device rejects here; nothing is ever queued behind a running operation.
    pub fn submit(&self, request: DeployRequest) -> std::result::Result<(), Rejection> {
        let job = self.deployer.begin(&request)?;

        let guard = self.job_tx.lock().unwrap_or_else(PoisonError::into_inner);
        let unsent = match guard.as_ref() {
            Some(tx) => tx.send(job).err().map(|e| e.into_inner()),
            None => Some(job),
        };
        drop(guard);

        if let Some(job) = unsent {
            self.deployer.abandon(job, "Deploy worker is not running");
        }
        Ok(())
    }

    /// Events from the worker. Receivers share one stream; each event goes to one of them.
    pub fn events(&self) -> Receiver<DeployEvent> {
        self.event_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Lets a running job finish, then stops the thread.
    pub fn shutdown(&self) {
        self.job_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Deploy worker panicked");
            }
            debug!("Deploy worker stopped.");
        }
    }
}

impl Drop for DeployWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[instrument(skip_all, name = "deploy_worker")]
fn worker_loop(deployer: Arc<Deployer>, job_rx: Receiver<Job>, event_tx: Sender<DeployEvent>) {
    for job in job_rx {
        let kind = job.kind();
        let target = job.target().to_string();
        debug!("[{}] Running {:?}", target, kind);

        publish(
            &event_tx,
            DeployEvent::Started {
                kind,
                target: target.clone(),
            },
        );

        let outcome = deployer.run(job);

        publish(
            &event_tx,
            DeployEvent::Finished {
                kind,
                target,
                success: outcome.success,
                message: outcome.message,
            },
        );
    }
}

fn publish(event_tx: &Sender<DeployEvent>, event: DeployEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            debug!("Event buffer full, dropping {:?}", event);
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}
