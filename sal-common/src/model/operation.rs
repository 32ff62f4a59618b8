// sal-common/src/model/operation.rs
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    #[default]
    None,
    Installing,
    Uninstalling,
    Refreshing,
}

impl OperationKind {
    pub fn is_active(&self) -> bool {
        !matches!(self, OperationKind::None)
    }
}

/// The single in-flight deployment operation, or the outcome of the last one.
///
/// `success` is only meaningful once `complete` is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OperationState {
    pub kind: OperationKind,
    pub target_name: String,
    pub progress: f32,
    pub status_message: String,
    pub complete: bool,
    pub success: bool,
}

impl OperationState {
    pub fn is_busy(&self) -> bool {
        self.kind.is_active()
    }
}
