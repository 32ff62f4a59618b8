// salamander/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use sal_common::config::Config;
use sal_common::error::{Result, SalError};
use sal_common::model::ConnectionStatus;
use sal_core::Session;
use tracing::debug;

pub mod install;
pub mod list;
pub mod progress;
pub mod status;
pub mod uninstall;

use crate::cli::install::InstallArgs;
use crate::cli::list::List;
use crate::cli::status::Status;
use crate::cli::uninstall::Uninstall;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "sal", bin_name = "sal")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Device address (overrides config and SAL_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Login user on the device
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Directory holding locally built plugins
    #[arg(long, global = true, value_name = "DIR")]
    pub local_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl CliArgs {
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(dir) = &self.local_dir {
            config.local_dir = dir.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show whether the device is reachable and what is on it
    Status(Status),
    /// List plugins on this machine and on the device
    List(List),
    /// Copy plugins to the device
    Install(InstallArgs),
    /// Remove plugins from the device
    Uninstall(Uninstall),
}

impl Command {
    pub async fn run(&self, session: Arc<Session>) -> Result<()> {
        match self {
            Self::Status(command) => command.run(session).await,
            Self::List(command) => command.run(session).await,
            Self::Install(command) => command.run(session).await,
            Self::Uninstall(command) => command.run(session).await,
        }
    }
}

/// Runs a blocking session call off the async runtime.
pub(crate) async fn blocking<T, F>(session: &Arc<Session>, f: F) -> Result<T>
where
    F: FnOnce(&Session) -> T + Send + 'static,
    T: Send + 'static,
{
    let session = Arc::clone(session);
    tokio::task::spawn_blocking(move || f(&session))
        .await
        .map_err(|e| SalError::Generic(format!("background task failed: {e}")))
}

/// Probes the device, then rescans both sides.
pub(crate) async fn probe_and_scan(session: &Arc<Session>) -> Result<ConnectionStatus> {
    let status = blocking(session, |s| s.check_connection()).await?;
    debug!("Device status: {}", status);
    let refreshed = blocking(session, |s| s.refresh()).await?;
    if !refreshed {
        return Err(SalError::Generic(session.operation_state().status_message));
    }
    Ok(status)
}
