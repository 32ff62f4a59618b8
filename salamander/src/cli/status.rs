// salamander/src/cli/status.rs
use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use sal_common::error::Result;
use sal_common::model::ConnectionStatus;
use sal_core::Session;

use crate::cli::probe_and_scan;
use crate::ui::create_spinner;

#[derive(Args, Debug)]
pub struct Status {}

impl Status {
    pub async fn run(&self, session: Arc<Session>) -> Result<()> {
        let spinner = create_spinner(&format!("Contacting {}...", session.host()));
        let status = probe_and_scan(&session).await;
        spinner.finish_and_clear();
        let status = status?;

        let config = session.config();
        let shown = match status {
            ConnectionStatus::Connected => status.to_string().green().bold(),
            ConnectionStatus::Disconnected => status.to_string().red().bold(),
            _ => status.to_string().yellow().bold(),
        };
        println!("{:<14}{}@{} ({})", "Device:".bold(), session.user(), session.host(), shown);
        println!("{:<14}{}", "Local dir:".bold(), session.local_dir().display());
        println!("{:<14}{}", "Remote dir:".bold(), config.remote_dir);

        let counts = session.inventory().counts();
        println!(
            "{:<14}{} synced, {} device only, {} local only",
            "Plugins:".bold(),
            counts.synced,
            counts.device_only,
            counts.local_only
        );
        if status != ConnectionStatus::Connected {
            println!("{}", "Device plugins are not shown while disconnected.".yellow());
        }
        Ok(())
    }
}
