// sal-core/tests/common/mod.rs
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;
use sal_common::config::Config;
use sal_common::model::ConnectionStatus;
use sal_core::{ConnectionMonitor, Deployer, InventoryScanner};
use sal_net::{ExecResult, ProgressFn, RemoteChannel, RemoteCommand};
use tempfile::TempDir;

pub const REMOTE_DIR: &str = "/tmp/plugins";

#[derive(Default)]
struct DeviceState {
    files: BTreeMap<String, u64>,
    reachable: bool,
    // `rm -f` reports success but the file stays.
    sticky_files: bool,
    fail_copy: bool,
    fail_service_stop: bool,
    // Exit code returned by `test -f`, as if the link dropped just before it.
    verify_exit: Option<i32>,
    commands: Vec<String>,
    copies: Vec<(String, String)>,
}

/// In-memory device: a flat file table plus a log of everything asked of it.
pub struct FakeDevice {
    state: Mutex<DeviceState>,
    copy_gate: Mutex<Option<Receiver<()>>>,
    observer: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DeviceState {
                reachable: true,
                ..Default::default()
            }),
            copy_gate: Mutex::new(None),
            observer: Mutex::new(None),
        }
    }

    pub fn put(&self, path: &str, size: u64) {
        self.state.lock().unwrap().files.insert(path.to_string(), size);
    }

    pub fn has(&self, path: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(path)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().reachable = reachable;
    }

    pub fn set_sticky_files(&self, sticky: bool) {
        self.state.lock().unwrap().sticky_files = sticky;
    }

    pub fn set_fail_copy(&self, fail: bool) {
        self.state.lock().unwrap().fail_copy = fail;
    }

    pub fn set_fail_service_stop(&self, fail: bool) {
        self.state.lock().unwrap().fail_service_stop = fail;
    }

    pub fn set_verify_exit(&self, code: Option<i32>) {
        self.state.lock().unwrap().verify_exit = code;
    }

    /// Copies block until the returned sender sends or is dropped.
    pub fn gate_copies(&self) -> crossbeam_channel::Sender<()> {
        let (tx, rx) = crossbeam_channel::bounded(0);
        *self.copy_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// Called after every command and progress report.
    pub fn observe(&self, f: impl Fn() + Send + 'static) {
        *self.observer.lock().unwrap() = Some(Box::new(f));
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn copies(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().copies.clone()
    }

    /// Everything the device was asked, probes excluded.
    pub fn interactions(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .commands
            .iter()
            .filter(|c| c.as_str() != "echo ok")
            .count()
            + state.copies.len()
    }

    pub fn clear_log(&self) {
        let mut state = self.state.lock().unwrap();
        state.commands.clear();
        state.copies.clear();
    }

    fn notify(&self) {
        if let Some(f) = self.observer.lock().unwrap().as_ref() {
            f();
        }
    }

    fn answer(&self, command: &RemoteCommand) -> ExecResult {
        let mut state = self.state.lock().unwrap();
        state.commands.push(command.render());
        if !state.reachable {
            return ExecResult::transport_failure("ssh: connect to host: No route to host");
        }

        let args = command.arg_values();
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or("");
        match command.program() {
            "echo" => ExecResult::ok(format!("{}\n", arg(0))),
            "ls" => {
                let Some((dir, pattern)) = arg(1).rsplit_once('/') else {
                    return ExecResult::failed(2, "");
                };
                let suffix = pattern.trim_start_matches('*');
                let listing: Vec<&str> = state
                    .files
                    .keys()
                    .filter(|p| {
                        p.rsplit_once('/').map(|(d, _)| d) == Some(dir) && p.ends_with(suffix)
                    })
                    .map(String::as_str)
                    .collect();
                if listing.is_empty() {
                    ExecResult::failed(2, "")
                } else {
                    ExecResult::ok(listing.join("\n") + "\n")
                }
            }
            "stat" => match state.files.get(arg(2)) {
                Some(size) => ExecResult::ok(format!("{size}\n")),
                None => ExecResult::failed(1, ""),
            },
            "test" if state.verify_exit.is_some() => ExecResult::failed(
                state.verify_exit.unwrap_or(-1),
                "ssh: connect to host fake-device port 22: No route to host",
            ),
            "test" => {
                if state.files.contains_key(arg(1)) {
                    ExecResult::ok("")
                } else {
                    ExecResult::failed(1, "")
                }
            }
            "rm" => {
                if arg(0) == "-f" && !state.sticky_files {
                    let path = arg(1).to_string();
                    state.files.remove(&path);
                }
                ExecResult::ok("")
            }
            "systemctl" if arg(0) == "stop" && state.fail_service_stop => {
                ExecResult::failed(5, "Failed to stop llizardGUI.service: Unit not loaded.")
            }
            _ => ExecResult::ok(""),
        }
    }
}

impl RemoteChannel for FakeDevice {
    fn host(&self) -> &str {
        "fake-device"
    }

    fn execute(&self, command: &RemoteCommand) -> ExecResult {
        let result = self.answer(command);
        self.notify();
        result
    }

    fn copy_to_device(
        &self,
        local_path: &Path,
        remote_path: &str,
        on_progress: &mut ProgressFn<'_>,
    ) -> bool {
        let gate = self.copy_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }

        let (reachable, fail) = {
            let mut state = self.state.lock().unwrap();
            state
                .copies
                .push((local_path.display().to_string(), remote_path.to_string()));
            (state.reachable, state.fail_copy)
        };

        let Ok(meta) = fs::metadata(local_path) else {
            on_progress(0.0, "Local file not found");
            return false;
        };
        on_progress(0.0, "Starting transfer...");
        self.notify();
        on_progress(0.5, "Transferring...");
        self.notify();

        if !reachable || fail {
            on_progress(0.5, "scp: write failed: No space left on device");
            self.notify();
            return false;
        }

        self.put(remote_path, meta.len());
        on_progress(1.0, "Complete");
        self.notify();
        true
    }
}

/// A device, a local plugin directory and the core components wired together.
pub struct Rig {
    pub dir: TempDir,
    pub config: Config,
    pub device: Arc<FakeDevice>,
    pub monitor: ConnectionMonitor,
    pub scanner: Arc<InventoryScanner>,
    pub deployer: Arc<Deployer>,
}

impl Rig {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let device = Arc::new(FakeDevice::new());
        let channel: Arc<dyn RemoteChannel> = device.clone();
        let monitor = ConnectionMonitor::new(Arc::clone(&channel), &config.user);
        let scanner = Arc::new(InventoryScanner::new(
            &config,
            Arc::clone(&channel),
            monitor.clone(),
        ));
        let deployer = Arc::new(Deployer::new(
            &config,
            channel,
            monitor.clone(),
            Arc::clone(&scanner),
        ));
        Self {
            dir,
            config,
            device,
            monitor,
            scanner,
            deployer,
        }
    }

    pub fn add_local(&self, file_name: &str, bytes: usize) {
        fs::write(self.dir.path().join(file_name), vec![7u8; bytes]).unwrap();
    }

    pub fn remove_local(&self, file_name: &str) {
        fs::remove_file(self.dir.path().join(file_name)).unwrap();
    }

    pub fn connect(&self) -> ConnectionStatus {
        self.monitor.check_connection()
    }

    pub fn scan(&self) {
        assert!(self.deployer.refresh());
    }
}

pub fn test_config(local_dir: &Path) -> Config {
    let mut config = Config::default();
    config.local_dir = local_dir.to_path_buf();
    config.remote_dir = REMOTE_DIR.to_string();
    config
}

pub fn remote(name: &str) -> String {
    format!("{REMOTE_DIR}/{name}.so")
}
