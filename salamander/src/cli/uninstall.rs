// salamander/src/cli/uninstall.rs
use std::sync::Arc;

use clap::Args;
use sal_common::error::{Result, SalError};
use sal_common::model::ConnectionStatus;
use sal_core::{DeployRequest, Session};

use crate::cli::install::deploy_each;
use crate::cli::probe_and_scan;

#[derive(Args, Debug)]
pub struct Uninstall {
    /// Plugin names as shown by `sal list`
    #[arg(required = true)]
    pub names: Vec<String>,
}

impl Uninstall {
    pub async fn run(&self, session: Arc<Session>) -> Result<()> {
        let status = probe_and_scan(&session).await?;
        if status != ConnectionStatus::Connected {
            return Err(SalError::Transport(format!(
                "device {} is {}",
                session.host(),
                status
            )));
        }

        deploy_each(&session, &self.names, "uninstall", DeployRequest::Uninstall).await
    }
}
