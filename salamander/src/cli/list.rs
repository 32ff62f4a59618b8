// salamander/src/cli/list.rs
use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use sal_common::error::Result;
use sal_common::format::format_size;
use sal_common::model::{ArtifactRecord, Classification, ConnectionStatus};
use sal_core::Session;

use crate::cli::probe_and_scan;

#[derive(Args, Debug)]
pub struct List {
    /// Print the inventory as JSON
    #[arg(long)]
    pub json: bool,
}

impl List {
    pub async fn run(&self, session: Arc<Session>) -> Result<()> {
        let status = probe_and_scan(&session).await?;
        let inventory = session.inventory();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&inventory)?);
            return Ok(());
        }

        if status != ConnectionStatus::Connected {
            println!(
                "{}",
                format!("Device {} is {}; showing local plugins only", session.host(), status)
                    .yellow()
            );
        }
        if inventory.is_empty() {
            println!("{}", "0 plugins found".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Status").style_spec("b"),
            Cell::new("Name").style_spec("b"),
            Cell::new("Plugin").style_spec("b"),
            Cell::new("Local").style_spec("b"),
            Cell::new("Device").style_spec("b"),
        ]));
        for class in Classification::ALL {
            for record in inventory.by_classification(class) {
                table.add_row(record_row(record));
            }
        }
        table.printstd();

        let counts = inventory.counts();
        println!(
            "{}",
            format!(
                "{} plugins: {} on device only, {} synced, {} local only",
                inventory.len(),
                counts.device_only,
                counts.synced,
                counts.local_only
            )
            .bold()
        );
        Ok(())
    }
}

fn record_row(record: &ArtifactRecord) -> Row {
    let class = record.classification();
    let style = match class {
        Classification::Synced => "Fg",
        Classification::DeviceOnly => "Fc",
        Classification::LocalOnly => "Fy",
    };
    Row::new(vec![
        Cell::new(class.label()).style_spec(style),
        Cell::new(record.display_name()).style_spec("Fb"),
        Cell::new(record.name()),
        Cell::new(&size_column(record.is_local(), record.local_size())),
        Cell::new(&size_column(record.is_on_device(), record.remote_size())),
    ])
}

fn size_column(present: bool, size: Option<u64>) -> String {
    if present {
        format_size(size)
    } else {
        "-".to_string()
    }
}
