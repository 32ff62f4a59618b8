// sal-common/src/model/mod.rs
pub mod artifact;
pub mod connection;
pub mod operation;

// Re-export
pub use artifact::{artifact_name, display_name, ArtifactRecord, ClassCounts, Classification, Inventory};
pub use connection::{ConnectionState, ConnectionStatus};
pub use operation::{OperationKind, OperationState};
