// sal-core/src/lib.rs

pub mod connection;
pub mod deploy;
pub mod inventory;
pub mod session;
pub mod worker;

// Re-export key types for the CLI crate
pub use connection::ConnectionMonitor;
pub use deploy::{DeployRequest, Deployer, Job, JobOutcome, OperationTracker, Rejection};
pub use inventory::InventoryScanner;
pub use session::Session;
pub use worker::{DeployEvent, DeployWorker};
