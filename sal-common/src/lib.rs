// sal-common/src/lib.rs
pub mod config;
pub mod error;
pub mod format;
pub mod model;

// Re-export key types
pub use config::Config;
pub use error::{Result, SalError};
pub use model::{
    ArtifactRecord, Classification, ConnectionState, ConnectionStatus, Inventory, OperationKind,
    OperationState,
};
