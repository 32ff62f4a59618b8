// sal-net/src/channel.rs
use std::path::Path;

use tracing::{debug, error};

use crate::command::RemoteCommand;

/// Outcome of one remote command.
///
/// A non-zero exit is an ordinary failure. A device that cannot be reached at all, or a
/// transport that gives up, shows up with `exit_code == -1` and the transport's diagnostic as
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub success: bool,
    pub output: String,
    pub exit_code: i32,
}

impl ExecResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code,
        }
    }

    pub fn transport_failure(reason: impl Into<String>) -> Self {
        Self::failed(-1, reason)
    }

    /// Non-empty output lines, whitespace-trimmed.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

/// Transfer progress: fraction in `[0, 1]` and a short message.
pub type ProgressFn<'a> = dyn FnMut(f32, &str) + 'a;

/// Command execution on the device. Every call blocks until the device answers or the
/// transport gives up.
pub trait RemoteChannel: Send + Sync {
    /// Host this channel talks to, for display.
    fn host(&self) -> &str;

    fn execute(&self, command: &RemoteCommand) -> ExecResult;

    /// Transfers `local_path` to `remote_path`. Progress fractions never decrease and end at
    /// `1.0` on success.
    fn copy_to_device(
        &self,
        local_path: &Path,
        remote_path: &str,
        on_progress: &mut ProgressFn<'_>,
    ) -> bool;

    /// Connectivity round trip. Implementations bound how long this may take.
    fn probe(&self) -> ExecResult {
        self.execute(&RemoteCommand::probe())
    }

    /// Newline-separated paths of `<dir>/*.<extension>`. A failed listing and an empty
    /// directory look the same to callers.
    fn list_directory(&self, dir: &str, extension: &str) -> ExecResult {
        match RemoteCommand::list(dir, extension) {
            Ok(command) => self.execute(&command),
            Err(e) => {
                error!("Refusing to list {}: {}", dir, e);
                ExecResult::failed(-1, e.to_string())
            }
        }
    }

    /// Size in bytes, `None` when the file is missing or the answer is not a number.
    fn stat(&self, remote_path: &str) -> Option<u64> {
        let result = self.execute(&RemoteCommand::stat_size(remote_path));
        if !result.success {
            debug!("stat failed for {}: {}", remote_path, result.output.trim());
            return None;
        }
        result.output.trim().parse::<u64>().ok()
    }

    fn exists(&self, remote_path: &str) -> bool {
        self.execute(&RemoteCommand::test_file(remote_path))
            .success
    }

    fn delete(&self, remote_path: &str) -> bool {
        self.execute(&RemoteCommand::remove_file(remote_path))
            .success
    }
}
