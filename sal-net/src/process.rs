// sal-net/src/process.rs
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

/// Output is capped at this many bytes per command.
pub const MAX_OUTPUT_BYTES: usize = 4096;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub struct CapturedOutput {
    /// `None` if the process was killed after the deadline.
    pub status: Option<ExitStatus>,
    /// stdout followed by stderr, truncated to [`MAX_OUTPUT_BYTES`].
    pub output: String,
}

impl CapturedOutput {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        self.status.and_then(|s| s.code()).unwrap_or(-1)
    }
}

/// Runs `cmd` with piped output, killing it if it outlives `timeout`.
pub fn run_captured(mut cmd: Command, timeout: Option<Duration>) -> io::Result<CapturedOutput> {
    debug!("Running command: {:?} (timeout: {:?})", cmd.get_program(), timeout);

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        error!("Failed to execute command {:?}: {}", cmd.get_program(), e);
        e
    })?;

    let readers = spawn_readers(&mut child);
    let status = match timeout {
        Some(limit) => wait_with_deadline(&mut child, limit)?,
        None => Some(child.wait()?),
    };
    // A killed child may leave grandchildren holding the pipes open; do not wait on them.
    let output = if status.is_some() {
        collect_readers(readers)
    } else {
        String::new()
    };

    match status {
        Some(s) if !s.success() => {
            debug!("Command failed with status: {}", s);
            if !output.trim().is_empty() {
                debug!("Output:\n{}", output.trim());
            }
        }
        Some(_) => debug!("Command finished successfully."),
        None => warn!("Command killed after exceeding {:?}", timeout),
    }

    Ok(CapturedOutput { status, output })
}

pub(crate) type OutputReaders = (
    Option<thread::JoinHandle<Vec<u8>>>,
    Option<thread::JoinHandle<Vec<u8>>>,
);

/// Drains stdout and stderr on their own threads so a chatty child cannot fill a pipe and stall.
pub(crate) fn spawn_readers(child: &mut Child) -> OutputReaders {
    let stdout = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = out.read_to_end(&mut buf);
            buf
        })
    });
    let stderr = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = err.read_to_end(&mut buf);
            buf
        })
    });
    (stdout, stderr)
}

pub(crate) fn collect_readers(readers: OutputReaders) -> String {
    let (stdout, stderr) = readers;
    let mut bytes = Vec::new();
    for handle in [stdout, stderr].into_iter().flatten() {
        if let Ok(buf) = handle.join() {
            bytes.extend_from_slice(&buf);
        }
    }
    truncate_output(String::from_utf8_lossy(&bytes).into_owned())
}

fn wait_with_deadline(child: &mut Child, limit: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            if let Err(e) = child.kill() {
                warn!("Failed to kill timed out command: {}", e);
            }
            // Reap the killed child.
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn truncate_output(mut output: String) -> String {
    if output.len() > MAX_OUTPUT_BYTES {
        let mut cut = MAX_OUTPUT_BYTES;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
    }
    output
}
