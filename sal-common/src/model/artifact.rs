// sal-common/src/model/artifact.rs
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Where a plugin currently lives. Derived from path presence, never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// On both the local machine and the device.
    Synced,
    /// Only on the device.
    DeviceOnly,
    /// Only on the local machine.
    LocalOnly,
}

impl Classification {
    /// `None` for the impossible "neither side" combination.
    pub fn from_presence(local: bool, remote: bool) -> Option<Self> {
        match (local, remote) {
            (true, true) => Some(Classification::Synced),
            (false, true) => Some(Classification::DeviceOnly),
            (true, false) => Some(Classification::LocalOnly),
            (false, false) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Synced => "synced",
            Classification::DeviceOnly => "device only",
            Classification::LocalOnly => "local only",
        }
    }

    pub const ALL: [Classification; 3] = [
        Classification::DeviceOnly,
        Classification::Synced,
        Classification::LocalOnly,
    ];
}

/// One plugin as seen by the last scan.
///
/// Records are only created through [`Inventory`], which guarantees that at least one of
/// `local_path`/`remote_path` is set and that `classification` agrees with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    name: String,
    display_name: String,
    local_path: Option<PathBuf>,
    remote_path: Option<String>,
    local_size: Option<u64>,
    remote_size: Option<u64>,
    classification: Classification,
}

impl ArtifactRecord {
    fn new_local(name: &str, file_name: &str, path: PathBuf, size: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name(file_name),
            local_path: Some(path),
            remote_path: None,
            local_size: size,
            remote_size: None,
            classification: Classification::LocalOnly,
        }
    }

    fn new_remote(name: &str, file_name: &str, path: String, size: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name(file_name),
            local_path: None,
            remote_path: Some(path),
            local_size: None,
            remote_size: size,
            classification: Classification::DeviceOnly,
        }
    }

    fn set_local(&mut self, path: PathBuf, size: Option<u64>) {
        self.local_path = Some(path);
        self.local_size = size;
        self.reclassify();
    }

    fn set_remote(&mut self, path: String, size: Option<u64>) {
        self.remote_path = Some(path);
        self.remote_size = size;
        self.reclassify();
    }

    fn reclassify(&mut self) {
        if let Some(class) =
            Classification::from_presence(self.local_path.is_some(), self.remote_path.is_some())
        {
            self.classification = class;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn remote_path(&self) -> Option<&str> {
        self.remote_path.as_deref()
    }

    pub fn local_size(&self) -> Option<u64> {
        self.local_size
    }

    pub fn remote_size(&self) -> Option<u64> {
        self.remote_size
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_local(&self) -> bool {
        self.local_path.is_some()
    }

    pub fn is_on_device(&self) -> bool {
        self.remote_path.is_some()
    }
}

/// Per-classification totals, in the order the presentation layer shows sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    pub device_only: usize,
    pub synced: usize,
    pub local_only: usize,
}

impl ClassCounts {
    pub fn get(&self, class: Classification) -> usize {
        match class {
            Classification::DeviceOnly => self.device_only,
            Classification::Synced => self.synced,
            Classification::LocalOnly => self.local_only,
        }
    }
}

/// The merged result of one scan, keyed by name and capped at a fixed size.
///
/// Insertion order is discovery order. Once full, new names are dropped; paths for names
/// already present are still merged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inventory {
    records: Vec<ArtifactRecord>,
    #[serde(skip)]
    capacity: usize,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }

    /// Records a local file. Returns `false` if the name is new and the inventory is full.
    pub fn insert_local(
        &mut self,
        name: &str,
        file_name: &str,
        path: PathBuf,
        size: Option<u64>,
    ) -> bool {
        if let Some(record) = self.find_mut(name) {
            record.set_local(path, size);
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.records
            .push(ArtifactRecord::new_local(name, file_name, path, size));
        true
    }

    /// Records a file on the device. Returns `false` if the name is new and the inventory is full.
    pub fn insert_remote(
        &mut self,
        name: &str,
        file_name: &str,
        path: String,
        size: Option<u64>,
    ) -> bool {
        if let Some(record) = self.find_mut(name) {
            record.set_remote(path, size);
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.records
            .push(ArtifactRecord::new_remote(name, file_name, path, size));
        true
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut ArtifactRecord> {
        self.records.iter_mut().find(|r| r.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&ArtifactRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&ArtifactRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.records.iter()
    }

    pub fn by_classification(
        &self,
        class: Classification,
    ) -> impl Iterator<Item = &ArtifactRecord> {
        self.records
            .iter()
            .filter(move |r| r.classification == class)
    }

    pub fn counts(&self) -> ClassCounts {
        let mut counts = ClassCounts::default();
        for record in &self.records {
            match record.classification {
                Classification::DeviceOnly => counts.device_only += 1,
                Classification::Synced => counts.synced += 1,
                Classification::LocalOnly => counts.local_only += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Key name for a file: its basename without the trailing `.<extension>`.
///
/// Returns `None` if the basename does not end in the extension or has nothing before it.
pub fn artifact_name<'a>(file_name: &'a str, extension: &str) -> Option<&'a str> {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    let stem = base.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

/// Human-readable name: drop the extension, `_` becomes a space and the first letter
/// of each underscore-separated part is upper-cased.
///
/// `now_playing.so` -> `Now Playing`
pub fn display_name(file_name: &str) -> String {
    let base = match file_name.rfind('.') {
        Some(dot) => &file_name[..dot],
        None => file_name,
    };

    let mut display = String::with_capacity(base.len());
    let mut capitalize_next = true;
    for c in base.chars() {
        if c == '_' {
            display.push(' ');
            capitalize_next = true;
        } else if capitalize_next && c.is_ascii_alphabetic() {
            display.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            display.push(c);
            capitalize_next = false;
        }
    }
    display
}
