// sal-core/src/inventory/local.rs
use std::path::Path;

use sal_common::model::{artifact_name, Inventory};
use sal_net::is_valid_name;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Adds every `*.<extension>` file directly inside `dir` to `inventory`.
///
/// A missing or unreadable directory contributes nothing.
pub(crate) fn scan_local(dir: &Path, extension: &str, inventory: &mut Inventory) -> usize {
    if !dir.is_dir() {
        debug!("Local plugin directory {} does not exist", dir.display());
        return 0;
    }

    let mut found = 0;
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let Some(name) = artifact_name(&file_name, extension) else {
            continue;
        };
        if !is_valid_name(name) {
            warn!("Ignoring local plugin with unusable name: {}", file_name);
            continue;
        }

        let size = entry.metadata().ok().map(|m| m.len());
        if inventory.insert_local(name, &file_name, entry.path().to_path_buf(), size) {
            found += 1;
        } else {
            debug!("Inventory full, dropping local plugin {}", name);
        }
    }

    debug!("Found {} local plugins in {}", found, dir.display());
    found
}
