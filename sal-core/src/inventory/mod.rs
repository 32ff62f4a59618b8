// sal-core/src/inventory/mod.rs
//! Builds the merged local/device view of all known plugins.

mod local;
mod remote;

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use sal_common::config::Config;
use sal_common::model::{ArtifactRecord, Inventory};
use sal_net::RemoteChannel;
use tracing::{debug, info, instrument};

use crate::connection::ConnectionMonitor;

pub struct InventoryScanner {
    channel: Arc<dyn RemoteChannel>,
    monitor: ConnectionMonitor,
    remote_dir: String,
    extension: String,
    capacity: usize,
    local_dir: RwLock<PathBuf>,
    inventory: RwLock<Inventory>,
}

impl InventoryScanner {
    pub fn new(config: &Config, channel: Arc<dyn RemoteChannel>, monitor: ConnectionMonitor) -> Self {
        Self {
            channel,
            monitor,
            remote_dir: config.remote_dir.clone(),
            extension: config.extension.clone(),
            capacity: config.max_artifacts,
            local_dir: RwLock::new(config.local_dir().to_path_buf()),
            inventory: RwLock::new(Inventory::new(config.max_artifacts)),
        }
    }

    /// Rebuilds the inventory from scratch and returns a snapshot of it.
    ///
    /// The device is only listed if the monitor last saw it connected; no probe is issued.
    #[instrument(skip_all)]
    pub fn refresh(&self, on_progress: &mut dyn FnMut(f32, &str)) -> Inventory {
        let mut inventory = Inventory::new(self.capacity);

        on_progress(0.0, "Scanning local plugins...");
        let local_dir = self.local_dir();
        let local = local::scan_local(&local_dir, &self.extension, &mut inventory);

        on_progress(0.5, "Scanning device...");
        let remote = if self.monitor.is_connected() {
            remote::scan_remote(
                self.channel.as_ref(),
                &self.remote_dir,
                &self.extension,
                &mut inventory,
            )
        } else {
            debug!("Device not connected, skipping remote scan");
            0
        };

        info!(
            "Scan complete: {} plugins ({} local, {} on device)",
            inventory.len(),
            local,
            remote
        );

        let snapshot = inventory.clone();
        *self.inventory.write().unwrap_or_else(PoisonError::into_inner) = inventory;
        snapshot
    }

    /// Snapshot of the last scan.
    pub fn inventory(&self) -> Inventory {
        self.inventory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn find(&self, name: &str) -> Option<ArtifactRecord> {
        self.inventory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .find(name)
            .cloned()
    }

    /// Takes effect on the next refresh.
    pub fn set_local_dir(&self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref().to_path_buf();
        debug!("Local plugin directory set to {}", dir.display());
        *self.local_dir.write().unwrap_or_else(PoisonError::into_inner) = dir;
    }

    pub fn local_dir(&self) -> PathBuf {
        self.local_dir
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
