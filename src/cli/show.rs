use std::path::PathBuf;

use checkout::{RequestId, Store};
use clap::Parser;
use tracing::instrument;

use super::terminal::{colored_status, Colorize};
use super::{active_user, PortalArg};

/// Command arguments for `inv show`.
#[derive(Debug, Parser)]
#[command(about = "Show the full detail of a request")]
pub struct Show {
    /// The id of the request to show
    id: RequestId,

    /// Consult only this portal's session (default: admin, then employee)
    #[clap(long, value_enum)]
    portal: Option<PortalArg>,
}

impl Show {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = Store::open(root)?;
        let viewer = active_user(&store, self.portal.map(PortalArg::portal))?;

        let Some(request) = store.requests().get(self.id) else {
            anyhow::bail!("no request with id {}", self.id);
        };
        if !request.visible_to(&viewer) {
            anyhow::bail!("access denied: request {} is not visible to you", self.id);
        }

        println!("Request {}", request.id());
        println!("{}", "─".repeat(40).dim());
        println!(
            "Requester:          {} ({})",
            request.name(),
            request.requester()
        );
        println!("Date:               {}", request.date());
        println!("Purpose:            {}", request.purpose());
        println!("Warehouse:          {}", request.warehouse());
        println!(
            "Project/Job #:      {}",
            request.project_number().unwrap_or_default()
        );
        println!(
            "PO #:               {}",
            request.po_number().unwrap_or_default()
        );
        println!("Notes:              {}", request.notes().unwrap_or_default());
        println!(
            "Total Price:        {}",
            request.total_price().unwrap_or_default()
        );
        println!("Requested Approver: {}", request.approver());
        println!(
            "Actual Approver:    {}",
            request
                .approved_by()
                .map(|username| username.as_str())
                .unwrap_or_default()
        );
        println!("Status:             {}", colored_status(request.status()));
        println!("Items:");
        for item in request.items() {
            match item.price() {
                Some(price) => println!("  • {} – Qty: {}, Price: {price}", item.part(), item.qty()),
                None => println!("  • {} – Qty: {}", item.part(), item.qty()),
            }
        }

        Ok(())
    }
}
