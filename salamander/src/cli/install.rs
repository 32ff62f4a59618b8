// salamander/src/cli/install.rs
use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use sal_common::error::{Result, SalError};
use sal_common::model::ConnectionStatus;
use sal_core::{DeployRequest, Session};
use tracing::debug;

use crate::cli::{probe_and_scan, progress};

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Plugin names, without the file extension
    #[arg(required = true)]
    pub names: Vec<String>,
}

impl InstallArgs {
    pub async fn run(&self, session: Arc<Session>) -> Result<()> {
        let status = probe_and_scan(&session).await?;
        if status != ConnectionStatus::Connected {
            return Err(SalError::Transport(format!(
                "device {} is {}",
                session.host(),
                status
            )));
        }

        deploy_each(&session, &self.names, "install", DeployRequest::Install).await
    }
}

/// Submits one request per name and follows each to completion, in order.
pub(crate) async fn deploy_each(
    session: &Arc<Session>,
    names: &[String],
    verb: &str,
    request: fn(String) -> DeployRequest,
) -> Result<()> {
    let mut failed: Vec<&str> = Vec::new();

    for name in names {
        debug!("Submitting {} of {}", verb, name);
        if let Err(rejection) = session.submit(request(name.clone())) {
            debug!("Rejected {} of {}: {}", verb, name, rejection);
            eprintln!("{} {}: {}", "✖".red(), name.cyan(), rejection);
            failed.push(name.as_str());
            continue;
        }

        let state = progress::follow(session, name).await;
        if state.success {
            println!("{} {}", "✓".green(), state.status_message);
        } else {
            eprintln!("{} {}", "✖".red(), state.status_message);
            failed.push(name.as_str());
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(SalError::Generic(format!(
            "failed to {} {} of {} plugin(s): {}",
            verb,
            failed.len(),
            names.len(),
            failed.join(", ")
        )))
    }
}
