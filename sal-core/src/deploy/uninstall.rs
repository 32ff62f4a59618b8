// sal-core/src/deploy/uninstall.rs
use sal_net::RemoteCommand;
use tracing::{debug, error, info, warn};

use super::{Deployer, JobOutcome};

impl Deployer {
    /// Stops the plugin host, removes the plugin and its leftovers, restarts the host, then
    /// checks that the file is really gone.
    pub(super) fn run_uninstall(&self, name: &str, remote_path: &str) -> JobOutcome {
        info!("Uninstalling {} from {}:{}", name, self.channel.host(), remote_path);
        let service = self.config.service.as_str();

        self.tracker.update(0.10, "Preparing device...");
        self.best_effort("Remounting root read-write", &RemoteCommand::remount_rw());

        self.tracker.update(0.25, &format!("Stopping {service}..."));
        if !self.best_effort("Stopping service", &RemoteCommand::service_stop(service)) {
            self.best_effort("Killing service", &RemoteCommand::kill_all(service));
        }

        self.tracker.update(0.45, &format!("Removing {name}..."));
        let deleted = self.channel.delete(remote_path);
        if !deleted {
            error!("Could not delete {} on {}", remote_path, self.channel.host());
        }

        self.tracker.update(0.60, "Cleaning up...");
        for path in self.config.cleanup_paths_for(name) {
            debug!("Removing leftover {}", path);
            self.best_effort("Cleaning up", &RemoteCommand::remove_tree(&path));
        }

        self.tracker.update(0.75, "Syncing...");
        self.best_effort("Syncing filesystem", &RemoteCommand::sync());

        self.tracker.update(0.85, &format!("Restarting {service}..."));
        self.best_effort("Restarting service", &RemoteCommand::service_start(service));

        self.tracker.update(0.95, "Verifying...");
        let check = self.channel.execute(&RemoteCommand::test_file(remote_path));
        // `test -f` exits 1 only when the file is absent; anything else leaves absence unconfirmed.
        let gone = check.exit_code == 1;
        if check.success {
            if deleted {
                warn!("{} still present on device after delete", remote_path);
            }
        } else if !gone {
            warn!(
                "Could not verify removal of {} (exit {}): {}",
                remote_path,
                check.exit_code,
                check.output.trim()
            );
        }

        if deleted && gone {
            info!("Uninstalled {}", name);
            JobOutcome {
                success: true,
                message: format!("Uninstalled {name}"),
            }
        } else {
            JobOutcome {
                success: false,
                message: format!("Failed to uninstall {name}"),
            }
        }
    }
}
