// sal-common/src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use super::error::{Result, SalError};

// Connection defaults for the device as shipped.
const DEFAULT_HOST: &str = "172.16.42.2";
const DEFAULT_USER: &str = "root";
const DEFAULT_PASSWORD: &str = "llizardos";

// Relative to where the tool is usually launched from inside the plugin build tree.
const DEFAULT_LOCAL_DIR: &str = "../../../build-armv7-drm";
const DEFAULT_REMOTE_DIR: &str = "/tmp/plugins";
const DEFAULT_EXTENSION: &str = "so";
const DEFAULT_SERVICE: &str = "llizardGUI";
const DEFAULT_CLEANUP_PATHS: [&str; 2] = [
    "/var/local/llizard/config/{name}",
    "/var/local/llizard/cache/{name}",
];
const DEFAULT_MAX_ARTIFACTS: usize = 64;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub user: String,
    pub password: String,
    pub local_dir: PathBuf,
    pub remote_dir: String,
    pub extension: String,
    pub service: String,
    pub cleanup_paths: Vec<String>,
    pub max_artifacts: usize,
    pub connect_timeout: Duration,
    pub probe_timeout: Duration,
    pub logs_dir: PathBuf,
}

/// On-disk representation. Every key is optional and falls back to the built-in default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    local_dir: Option<PathBuf>,
    remote_dir: Option<String>,
    extension: Option<String>,
    service: Option<String>,
    cleanup_paths: Option<Vec<String>>,
    max_artifacts: Option<usize>,
    connect_timeout: Option<String>,
    probe_timeout: Option<String>,
    logs_dir: Option<PathBuf>,
}

impl Config {
    /// Loads defaults, then the config file (`$SAL_CONFIG` or the platform config dir),
    /// then environment overrides.
    pub fn load() -> Result<Self> {
        debug!("Loading salamander configuration");

        let config_path = env::var("SAL_CONFIG")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .or_else(default_config_path);

        let mut config = match config_path {
            Some(path) if path.is_file() => Self::from_file(&path)?,
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env(|key| env::var(key).ok());
        debug!("Configuration loaded successfully.");
        Ok(config)
    }

    /// Reads a TOML config file on top of the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading config file {}", path.display());
        let raw = fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&raw)?;
        let mut config = Self::default();

        if let Some(host) = file.host {
            config.host = host;
        }
        if let Some(user) = file.user {
            config.user = user;
        }
        if let Some(password) = file.password {
            config.password = password;
        }
        if let Some(local_dir) = file.local_dir {
            config.local_dir = local_dir;
        }
        if let Some(remote_dir) = file.remote_dir {
            config.remote_dir = remote_dir.trim_end_matches('/').to_string();
        }
        if let Some(extension) = file.extension {
            config.extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(service) = file.service {
            config.service = service;
        }
        if let Some(cleanup_paths) = file.cleanup_paths {
            config.cleanup_paths = cleanup_paths;
        }
        if let Some(max_artifacts) = file.max_artifacts {
            config.max_artifacts = max_artifacts;
        }
        if let Some(raw) = file.connect_timeout {
            config.connect_timeout = parse_timeout("connect_timeout", &raw)?;
        }
        if let Some(raw) = file.probe_timeout {
            config.probe_timeout = parse_timeout("probe_timeout", &raw)?;
        }
        if let Some(logs_dir) = file.logs_dir {
            config.logs_dir = logs_dir;
        }

        config.validate()?;
        Ok(config)
    }

    /// Applies `SAL_HOST`, `SAL_USER`, `SAL_PASSWORD` and `SAL_PLUGIN_DIR`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = non_empty("SAL_HOST") {
            debug!("Host overridden by SAL_HOST: {}", host);
            self.host = host;
        }
        if let Some(user) = non_empty("SAL_USER") {
            self.user = user;
        }
        if let Some(password) = non_empty("SAL_PASSWORD") {
            self.password = password;
        }
        if let Some(dir) = non_empty("SAL_PLUGIN_DIR") {
            debug!("Local plugin dir overridden by SAL_PLUGIN_DIR: {}", dir);
            self.local_dir = PathBuf::from(dir);
        }
    }

    /// Rejects values that cannot form a usable ssh destination or deployment layout.
    ///
    /// Runs when a config file is read; callers that override fields afterwards run it again.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() || self.user.is_empty() {
            return Err(SalError::Config(
                "host and user must not be empty".to_string(),
            ));
        }
        for (field, value) in [("host", &self.host), ("user", &self.user)] {
            if value.starts_with('-')
                || value.contains('@')
                || value.chars().any(char::is_whitespace)
            {
                return Err(SalError::Config(format!(
                    "{field} '{value}' is not usable in an ssh destination"
                )));
            }
        }
        if self.local_dir.as_os_str().is_empty() {
            return Err(SalError::Config(
                "local plugin directory must not be empty".to_string(),
            ));
        }
        if !self.remote_dir.starts_with('/') {
            return Err(SalError::Config(format!(
                "remote_dir must be absolute, got '{}'",
                self.remote_dir
            )));
        }
        if self.extension.is_empty() {
            return Err(SalError::Config("extension must not be empty".to_string()));
        }
        if self.max_artifacts == 0 {
            return Err(SalError::Config(
                "max_artifacts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    /// `<remote_dir>/<name>.<extension>`
    pub fn remote_artifact_path(&self, name: &str) -> String {
        format!("{}/{}.{}", self.remote_dir, name, self.extension)
    }

    /// Auxiliary per-artifact paths removed on uninstall.
    pub fn cleanup_paths_for(&self, name: &str) -> Vec<String> {
        self.cleanup_paths
            .iter()
            .map(|template| template.replace("{name}", name))
            .collect()
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            local_dir: PathBuf::from(DEFAULT_LOCAL_DIR),
            remote_dir: DEFAULT_REMOTE_DIR.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            service: DEFAULT_SERVICE.to_string(),
            cleanup_paths: DEFAULT_CLEANUP_PATHS.iter().map(|s| s.to_string()).collect(),
            max_artifacts: DEFAULT_MAX_ARTIFACTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            logs_dir: default_logs_dir(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "salamander")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn default_logs_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| env::temp_dir().join("salamander").join("logs"))
}

fn parse_timeout(key: &str, raw: &str) -> Result<Duration> {
    humantime::parse_duration(raw)
        .map_err(|e| SalError::Config(format!("invalid {key} '{raw}': {e}")))
}
