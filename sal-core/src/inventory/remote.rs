// sal-core/src/inventory/remote.rs
use sal_common::model::{artifact_name, Inventory};
use sal_net::{is_valid_name, RemoteChannel};
use tracing::debug;

/// Adds every `*.<extension>` file in `remote_dir` on the device to `inventory`, with a
/// size lookup per file.
///
/// A failed listing is treated as an empty directory.
pub(crate) fn scan_remote(
    channel: &dyn RemoteChannel,
    remote_dir: &str,
    extension: &str,
    inventory: &mut Inventory,
) -> usize {
    let listing = channel.list_directory(remote_dir, extension);
    if !listing.success {
        debug!(
            "Listing {} on {} returned nothing usable (exit {})",
            remote_dir,
            channel.host(),
            listing.exit_code
        );
        return 0;
    }

    let mut found = 0;
    for line in listing.lines() {
        let file_name = line.rsplit('/').next().unwrap_or(line);
        let Some(name) = artifact_name(file_name, extension) else {
            debug!("Skipping listing line: {}", line);
            continue;
        };
        if !is_valid_name(name) {
            debug!("Skipping remote plugin with unusable name: {}", line);
            continue;
        }
        if inventory.find(name).is_none() && inventory.is_full() {
            debug!("Inventory full, dropping remote plugin {}", name);
            continue;
        }

        let remote_path = format!("{remote_dir}/{file_name}");
        let size = channel.stat(&remote_path);
        if inventory.insert_remote(name, file_name, remote_path, size) {
            found += 1;
        }
    }

    debug!("Found {} plugins on {}", found, channel.host());
    found
}
