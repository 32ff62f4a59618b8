// salamander/src/cli/progress.rs
use std::sync::Arc;
use std::time::Duration;

use sal_common::model::OperationState;
use sal_core::Session;
use tokio::time::{interval, MissedTickBehavior};

use crate::ui::{create_operation_bar, BAR_STEPS};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Renders the running operation until the worker releases the slot, then returns its
/// final state. Only reads snapshots, so it never waits on the device.
pub async fn follow(session: &Arc<Session>, label: &str) -> OperationState {
    let pb = create_operation_bar(label);
    let mut ticker = interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let state = session.operation_state();
        pb.set_position((state.progress.clamp(0.0, 1.0) * BAR_STEPS as f32) as u64);
        pb.set_message(state.status_message.clone());

        if !state.is_busy() {
            pb.finish_and_clear();
            return state;
        }
    }
}
