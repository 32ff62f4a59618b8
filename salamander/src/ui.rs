// salamander/src/ui.rs
//! Spinners and progress bars.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Resolution of the operation bar; progress arrives as a fraction.
pub const BAR_STEPS: u64 = 1000;

pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn create_operation_bar(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(BAR_STEPS);
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:30.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_prefix(prefix.to_string());
    pb
}
