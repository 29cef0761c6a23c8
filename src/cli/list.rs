use std::path::PathBuf;

use checkout::{Request, Status, Store};
use clap::{Parser, ValueEnum};
use tracing::instrument;

use super::terminal::{colored_status, is_narrow, Colorize};
use super::{active_user, PortalArg};

/// Command arguments for `inv list`.
#[derive(Debug, Parser, Default)]
#[command(about = "List requests visible to the signed-in user")]
pub struct List {
    /// Consult only this portal's session (default: admin, then employee)
    #[clap(long, value_enum)]
    portal: Option<PortalArg>,

    /// Show only requests with this status
    #[clap(long, value_enum)]
    status: Option<StatusArg>,

    /// Output format (default: table)
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting
    #[arg(long)]
    quiet: bool,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Status filters accepted on the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Approved,
    Rejected,
    Withdrawn,
}

impl StatusArg {
    const fn status(self) -> Status {
        match self {
            Self::Pending => Status::Pending,
            Self::Approved => Status::Approved,
            Self::Rejected => Status::Rejected,
            Self::Withdrawn => Status::Withdrawn,
        }
    }
}

impl List {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = Store::open(root)?;
        let viewer = active_user(&store, self.portal.map(PortalArg::portal))?;

        let mut rows = store.requests().visible_to(&viewer);
        if let Some(filter) = self.status {
            rows.retain(|request| request.status() == filter.status());
        }

        if rows.is_empty() {
            if self.status.is_some() {
                println!("No requests matched the specified filters.");
            } else {
                println!("No requests yet. Submit one with 'inv submit'.");
            }
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&rows)?,
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(&rows);
                } else {
                    Self::output_table(&rows);
                }
            }
        }

        Ok(())
    }

    fn output_json(rows: &[&Request]) -> anyhow::Result<()> {
        use serde_json::json;

        let requests: Vec<_> = rows
            .iter()
            .map(|request| {
                json!({
                    "id": request.id(),
                    "requester": request.requester().as_str(),
                    "name": request.name(),
                    "date": request.date().to_string(),
                    "purpose": request.purpose().label(),
                    "warehouse": request.warehouse(),
                    "items": request.items().iter().map(|item| {
                        json!({
                            "part": item.part(),
                            "qty": item.qty().get(),
                            "price": item.price(),
                        })
                    }).collect::<Vec<_>>(),
                    "approver": request.approver().as_str(),
                    "approvedBy": request.approved_by().map(|u| u.as_str().to_string()),
                    "status": request.status().label(),
                })
            })
            .collect();

        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "requests": requests }))?
        );
        Ok(())
    }

    fn output_quiet(rows: &[&Request]) {
        for request in rows {
            println!("{} {}", request.id(), request.status());
        }
    }

    fn output_table(rows: &[&Request]) {
        if is_narrow() {
            // Stacked output for narrow terminals
            for request in rows {
                println!(
                    "{}  {}  {}",
                    request.id(),
                    request.date(),
                    colored_status(request.status())
                );
                println!("  {}", request.items_summary().dim());
            }
            return;
        }

        println!(
            "{:<14} {:<11} {:<9} {:<12} {:<28} {:<11} STATUS",
            "ID", "DATE", "PURPOSE", "WAREHOUSE", "ITEMS", "APPROVER"
        );
        println!("{}", "─".repeat(100).dim());

        for request in rows {
            let mut items = request.items_summary();
            if items.len() > 27 {
                items.truncate(24);
                items.push_str("...");
            }
            println!(
                "{:<14} {:<11} {:<9} {:<12} {:<28} {:<11} {}",
                request.id().to_string(),
                request.date().to_string(),
                request.purpose().to_string(),
                request.warehouse(),
                items,
                request.approver().as_str(),
                colored_status(request.status())
            );
        }

        println!();
        println!(
            "{}",
            format!("{} request(s). Run 'inv show <id>' for details.", rows.len()).dim()
        );
    }
}
