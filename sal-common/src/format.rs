// sal-common/src/format.rs

const KB: u64 = 1024;
const MB: u64 = KB * 1024;

/// Human-readable byte count. `None` (size could not be determined) renders as `Unknown`.
pub fn format_size(size: Option<u64>) -> String {
    match size {
        None => "Unknown".to_string(),
        Some(bytes) if bytes < KB => format!("{bytes} B"),
        Some(bytes) if bytes < MB => format!("{:.1} KB", bytes as f64 / KB as f64),
        Some(bytes) => format!("{:.1} MB", bytes as f64 / MB as f64),
    }
}
