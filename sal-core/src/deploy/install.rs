// sal-core/src/deploy/install.rs
use std::path::Path;

use sal_net::RemoteCommand;
use tracing::{error, info};

use super::{Deployer, JobOutcome};

// Share of the bar covered by the transfer itself.
const COPY_START: f32 = 0.10;
const COPY_END: f32 = 0.95;

impl Deployer {
    /// Writable root, plugin directory, transfer, sync. Only the transfer decides the outcome.
    pub(super) fn run_install(&self, name: &str, local_path: &Path, remote_path: &str) -> JobOutcome {
        info!("Installing {} -> {}:{}", local_path.display(), self.channel.host(), remote_path);

        self.tracker.update(0.05, "Preparing device...");
        self.best_effort("Remounting root read-write", &RemoteCommand::remount_rw());

        self.tracker.update(COPY_START, "Creating plugin directory...");
        self.best_effort(
            "Creating plugin directory",
            &RemoteCommand::mkdir_p(&self.config.remote_dir),
        );

        let tracker = self.tracker.clone();
        let mut last_message = String::new();
        let copied = self.channel.copy_to_device(local_path, remote_path, &mut |fraction, message| {
            let fraction = fraction.clamp(0.0, 1.0);
            tracker.update(COPY_START + fraction * (COPY_END - COPY_START), message);
            last_message = message.to_string();
        });

        self.tracker.update(0.97, "Syncing...");
        self.best_effort("Syncing filesystem", &RemoteCommand::sync());

        if copied {
            info!("Installed {}", name);
            JobOutcome {
                success: true,
                message: format!("Installed {name}"),
            }
        } else {
            let reason = if last_message.is_empty() {
                "transfer failed".to_string()
            } else {
                last_message
            };
            error!("Failed to install {}: {}", name, reason);
            JobOutcome {
                success: false,
                message: format!("Failed to install {name}: {reason}"),
            }
        }
    }
}
