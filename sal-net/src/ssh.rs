// sal-net/src/ssh.rs
//! `RemoteChannel` over the system `ssh` client, authenticated through `sshpass`.
//!
//! The credential travels in the `SSHPASS` environment variable, never on a command line.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use sal_common::config::Config;
use tracing::{debug, error, instrument, warn};

use crate::channel::{ExecResult, ProgressFn, RemoteChannel};
use crate::command::RemoteCommand;
use crate::process::{collect_readers, run_captured, spawn_readers};

const CHUNK_SIZE: usize = 64 * 1024;

/// ssh reserves this exit status for its own failures (unreachable host, refused auth, ...).
const SSH_FAILURE_EXIT: i32 = 255;

#[derive(Debug, Clone)]
pub struct SshChannel {
    /// Program that authenticates and starts `ssh`, and its leading arguments.
    program: String,
    program_args: Vec<String>,
    host: String,
    destination: String,
    password: String,
    connect_timeout: Duration,
    probe_timeout: Duration,
}

impl SshChannel {
    pub fn new(config: &Config) -> Self {
        Self {
            program: "sshpass".to_string(),
            program_args: vec!["-e".to_string(), "ssh".to_string()],
            host: config.host.clone(),
            destination: config.destination(),
            password: config.password.clone(),
            connect_timeout: config.connect_timeout,
            probe_timeout: config.probe_timeout,
        }
    }

    /// `sshpass -e ssh <options> user@host`, ready for the remote command line.
    fn ssh_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.program_args);
        for option in self.ssh_options() {
            cmd.arg("-o").arg(option);
        }
        cmd.arg(&self.destination);
        cmd.env("SSHPASS", &self.password);
        cmd
    }

    fn ssh_options(&self) -> Vec<String> {
        vec![
            "StrictHostKeyChecking=no".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "LogLevel=ERROR".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "ServerAliveInterval=5".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]
    }

    fn run(&self, command: &RemoteCommand, timeout: Option<Duration>) -> ExecResult {
        let line = command.render();
        debug!("[{}] $ {}", self.host, line);

        let mut cmd = self.ssh_command();
        cmd.arg(&line);

        match run_captured(cmd, timeout) {
            Ok(captured) if captured.timed_out() => {
                ExecResult::transport_failure(format!("no answer from {} in time", self.host))
            }
            Ok(captured) if captured.exit_code() == SSH_FAILURE_EXIT => {
                let reason = captured.output.trim();
                warn!("ssh to {} failed: {}", self.host, reason);
                if reason.is_empty() {
                    ExecResult::transport_failure(format!("ssh to {} failed", self.host))
                } else {
                    ExecResult::transport_failure(reason)
                }
            }
            Ok(captured) => {
                let exit_code = captured.exit_code();
                ExecResult {
                    success: exit_code == 0,
                    output: captured.output,
                    exit_code,
                }
            }
            Err(e) => {
                error!("Could not start ssh for {}: {}", self.host, e);
                ExecResult::transport_failure(format!("failed to run ssh: {e}"))
            }
        }
    }

    /// Pipes `file` into the receive command on the device.
    ///
    /// If the local side cannot deliver every byte, ssh is killed before stdin closes; the
    /// receive command also refuses to rename a partial file whose size is not `total`.
    fn stream_file(
        &self,
        file: &mut File,
        total: u64,
        remote_path: &str,
        on_progress: &mut ProgressFn<'_>,
    ) -> io::Result<(bool, String, f32)> {
        let mut cmd = self.ssh_command();
        cmd.arg(RemoteCommand::receive_file(remote_path, total).render());
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let readers = spawn_readers(&mut child);

        let mut stdin = child.stdin.take();
        let mut last_fraction = 0.0f32;
        let mut interrupted: Option<String> = None;
        match stdin.as_mut() {
            Some(pipe) => {
                let mut sent: u64 = 0;
                let mut buf = vec![0u8; CHUNK_SIZE];
                loop {
                    let n = match file.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => n,
                        Err(e) => {
                            interrupted = Some(format!("Cannot read local file: {e}"));
                            break;
                        }
                    };
                    if let Err(e) = pipe.write_all(&buf[..n]) {
                        interrupted = Some(format!("Transfer interrupted: {e}"));
                        break;
                    }
                    sent += n as u64;
                    if total > 0 {
                        // 1.0 is reserved for the confirmed rename on the device.
                        let fraction = (sent as f64 / total as f64).min(0.99) as f32;
                        if fraction > last_fraction {
                            last_fraction = fraction;
                            on_progress(fraction, "Transferring...");
                        }
                    }
                }
                if interrupted.is_none() && sent != total {
                    interrupted = Some(format!(
                        "Local file changed during transfer ({sent} of {total} bytes)"
                    ));
                }
            }
            None => interrupted = Some("Transfer channel unavailable".to_string()),
        }

        if let Some(reason) = &interrupted {
            warn!("Transfer to {} interrupted: {}", remote_path, reason);
            if let Err(e) = child.kill() {
                warn!("Failed to stop ssh after interrupted transfer: {}", e);
            }
        }
        // EOF lets `cat` finish on the device.
        drop(stdin);

        let status = child.wait()?;
        let output = collect_readers(readers);
        match interrupted {
            Some(reason) => Ok((false, reason, last_fraction)),
            None => Ok((status.success(), output, last_fraction)),
        }
    }
}

impl RemoteChannel for SshChannel {
    fn host(&self) -> &str {
        &self.host
    }

    fn execute(&self, command: &RemoteCommand) -> ExecResult {
        self.run(command, None)
    }

    fn probe(&self) -> ExecResult {
        self.run(&RemoteCommand::probe(), Some(self.probe_timeout))
    }

    #[instrument(skip(self, on_progress), fields(host = %self.host))]
    fn copy_to_device(
        &self,
        local_path: &Path,
        remote_path: &str,
        on_progress: &mut ProgressFn<'_>,
    ) -> bool {
        let mut file = match File::open(local_path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Cannot read {}: {}", local_path.display(), e);
                on_progress(0.0, "Local file not found");
                return false;
            }
        };
        let total = file.metadata().map(|m| m.len()).unwrap_or(0);

        on_progress(0.0, "Starting transfer...");
        debug!(
            "Streaming {} ({} bytes) to {}:{}",
            local_path.display(),
            total,
            self.host,
            remote_path
        );

        match self.stream_file(&mut file, total, remote_path, on_progress) {
            Ok((true, _, _)) => {
                on_progress(1.0, "Complete");
                true
            }
            Ok((false, output, reached)) => {
                let reason = output.trim();
                let message = if reason.is_empty() {
                    "Transfer failed"
                } else {
                    reason
                };
                error!("Transfer to {} failed: {}", remote_path, message);
                on_progress(reached, message);
                false
            }
            Err(e) => {
                error!("Could not start transfer to {}: {}", remote_path, e);
                on_progress(0.0, "Transfer failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    /// Runs the remote line with the local shell, like a device that shares our filesystem.
    const RUN_LOCALLY: &str = "for last; do :; done\nexec sh -c \"$last\"\n";
    /// Delivers only the first five bytes of stdin to the remote line.
    const TRUNCATE_STDIN: &str = "for last; do :; done\nhead -c 5 | sh -c \"$last\"\n";
    const UNREACHABLE: &str = "echo 'ssh: connect to host 172.16.42.2 port 22: No route to host' >&2\nexit 255\n";

    /// A channel whose `ssh` is a shell script receiving the same arguments, remote line last.
    fn scripted_channel(dir: &Path, script: &str) -> SshChannel {
        let path = dir.join("fake-ssh.sh");
        fs::write(&path, script).unwrap();
        SshChannel {
            program: "sh".to_string(),
            program_args: vec![path.display().to_string(), "ssh".to_string()],
            ..SshChannel::new(&Config::default())
        }
    }

    fn copy(channel: &SshChannel, local: &Path, remote: &Path) -> (bool, Vec<(f32, String)>) {
        let mut seen = Vec::new();
        let ok = channel.copy_to_device(
            local,
            &remote.display().to_string(),
            &mut |f, m| seen.push((f, m.to_string())),
        );
        (ok, seen)
    }

    #[test]
    fn options_carry_timeout() {
        let mut config = Config::default();
        config.connect_timeout = Duration::from_secs(7);
        let channel = SshChannel::new(&config);
        assert!(channel
            .ssh_options()
            .contains(&"ConnectTimeout=7".to_string()));
        assert_eq!(channel.host(), "172.16.42.2");
    }

    #[test]
    fn password_stays_off_the_command_line() {
        let channel = SshChannel::new(&Config::default());
        let cmd = channel.ssh_command();
        let args: Vec<_> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(!args.iter().any(|a| a.contains("llizardos")));
        assert_eq!(args.last().map(String::as_str), Some("root@172.16.42.2"));
        assert!(cmd
            .get_envs()
            .any(|(k, v)| k == "SSHPASS" && v.is_some()));
    }

    #[test]
    fn missing_local_file_reports_and_fails() {
        let channel = SshChannel::new(&Config::default());
        let mut seen = Vec::new();
        let ok = channel.copy_to_device(
            Path::new("/definitely/not/here.so"),
            "/tmp/plugins/here.so",
            &mut |f, m| seen.push((f, m.to_string())),
        );
        assert!(!ok);
        assert_eq!(seen, vec![(0.0, "Local file not found".to_string())]);
    }

    #[test]
    fn copy_streams_whole_file_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let channel = scripted_channel(dir.path(), RUN_LOCALLY);
        let local = dir.path().join("wifi.so");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&local, &content).unwrap();
        let remote = dir.path().join("installed.so");

        let (ok, seen) = copy(&channel, &local, &remote);
        assert!(ok);
        assert_eq!(fs::read(&remote).unwrap(), content);
        assert!(!dir.path().join("installed.so.part").exists());
        assert_eq!(seen.first(), Some(&(0.0, "Starting transfer...".to_string())));
        assert_eq!(seen.last(), Some(&(1.0, "Complete".to_string())));
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn unreadable_local_file_is_never_renamed_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let channel = scripted_channel(dir.path(), RUN_LOCALLY);
        // A directory opens fine but every read fails.
        let local = dir.path().join("plugin.so");
        fs::create_dir(&local).unwrap();
        let remote = dir.path().join("installed.so");

        let (ok, seen) = copy(&channel, &local, &remote);
        assert!(!ok);
        assert!(!remote.exists());
        let (_, last) = seen.last().unwrap();
        assert!(last.starts_with("Cannot read local file"), "{last}");
        assert!(!seen.iter().any(|(f, _)| *f >= 1.0));
    }

    #[test]
    fn short_delivery_fails_size_check() {
        let dir = tempfile::tempdir().unwrap();
        let channel = scripted_channel(dir.path(), TRUNCATE_STDIN);
        let local = dir.path().join("wifi.so");
        fs::write(&local, vec![7u8; 1000]).unwrap();
        let remote = dir.path().join("installed.so");

        let (ok, seen) = copy(&channel, &local, &remote);
        assert!(!ok);
        assert!(!remote.exists());
        assert!(!seen.iter().any(|(f, _)| *f >= 1.0));
    }

    #[test]
    fn ssh_failure_is_a_transport_failure() {
        let dir = tempfile::tempdir().unwrap();
        let channel = scripted_channel(dir.path(), UNREACHABLE);

        let check = channel.execute(&RemoteCommand::test_file("/tmp/plugins/clock.so"));
        assert!(!check.success);
        assert_eq!(check.exit_code, -1);
        assert!(check.output.contains("No route to host"));

        let probe = channel.probe();
        assert!(!probe.success);
        assert_eq!(probe.exit_code, -1);

        let local = dir.path().join("wifi.so");
        fs::write(&local, b"1234").unwrap();
        let (ok, _) = copy(&channel, &local, &dir.path().join("installed.so"));
        assert!(!ok);
    }

    #[test]
    fn remote_exit_codes_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let channel = scripted_channel(dir.path(), RUN_LOCALLY);

        let probe = channel.probe();
        assert!(probe.success);
        assert_eq!(probe.output.trim(), "ok");

        let missing = dir.path().join("missing.so").display().to_string();
        let check = channel.execute(&RemoteCommand::test_file(&missing));
        assert!(!check.success);
        assert_eq!(check.exit_code, 1);
    }
}
