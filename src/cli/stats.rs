use std::{path::PathBuf, process};

use checkout::{Portal, Role, Status, Store, Summary};
use clap::Parser;
use tracing::instrument;

use super::terminal::{colored_status, Colorize};

/// Command arguments for `inv stats`.
#[derive(Debug, Parser, Default)]
#[command(about = "Show request counts by status and purpose")]
pub struct Stats {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Stats {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = Store::open(root)?;
        let viewer = store
            .current_user(Portal::Admin)
            .map_err(|_| anyhow::anyhow!("log in to the admin portal first"))?;
        if viewer.role() != Role::Superadmin {
            eprintln!(
                "{}",
                "Access denied: analytics are superadmin-only.".warning()
            );
            process::exit(2);
        }

        let summary = Summary::of(store.requests().iter());

        if summary.total() == 0 {
            println!("No requests yet. Counts will appear once requests are submitted.");
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(&summary);
                } else {
                    Self::output_table(&summary);
                }
            }
        }

        Ok(())
    }

    fn output_quiet(summary: &Summary) {
        let pending = summary.by_status()[&Status::Pending];
        let approved = summary.by_status()[&Status::Approved];
        let rejected = summary.by_status()[&Status::Rejected];
        let withdrawn = summary.by_status()[&Status::Withdrawn];
        println!(
            "total={} pending={pending} approved={approved} rejected={rejected} withdrawn={withdrawn}",
            summary.total()
        );
    }

    fn output_table(summary: &Summary) {
        println!("Requests by status");
        println!("{}", "──────────────────".dim());
        for (&status, count) in summary.by_status() {
            println!("{:<22} {count}", colored_status(status));
        }
        println!("Total      {}", summary.total());

        println!();
        println!("Requests by purpose");
        println!("{}", "───────────────────".dim());
        for (purpose, count) in summary.by_purpose() {
            println!("{:<10} {count}", purpose.to_string());
        }
    }
}
