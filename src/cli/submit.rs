use std::{path::PathBuf, str::FromStr};

use checkout::{ItemDraft, Portal, Role, Store, SubmissionForm};
use chrono::NaiveDate;
use tracing::instrument;

use super::terminal::Colorize;

/// An item given on the command line as `PART:QTY` or `PART:QTY:PRICE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSpec(pub(crate) ItemDraft);

impl FromStr for ItemSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (part, qty, price) = match parts.as_slice() {
            [part, qty] => (part, qty, None),
            [part, qty, price] => (part, qty, Some(price)),
            _ => return Err(format!("expected PART:QTY or PART:QTY:PRICE, got '{s}'")),
        };

        let qty: u32 = qty
            .trim()
            .parse()
            .map_err(|_| format!("invalid quantity '{qty}'"))?;
        let price = price
            .map(|raw| {
                raw.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("invalid price '{raw}'"))
            })
            .transpose()?;

        Ok(Self(ItemDraft {
            part: part.trim().to_string(),
            qty,
            price,
        }))
    }
}

#[derive(Debug, clap::Parser)]
pub struct Submit {
    /// The request date (defaults to today)
    #[clap(long)]
    pub(crate) date: Option<NaiveDate>,

    /// Why the parts are being checked out
    #[clap(long, value_enum)]
    pub(crate) purpose: PurposeArg,

    /// The warehouse the parts come from
    #[clap(long)]
    pub(crate) warehouse: String,

    /// The username of the approver the request is addressed to
    #[clap(long)]
    pub(crate) approver: String,

    /// Purchase order number (required for stocking requests)
    #[clap(long)]
    pub(crate) po: Option<String>,

    /// Project or job number
    #[clap(long)]
    pub(crate) project: Option<String>,

    /// Free-form notes
    #[clap(long)]
    pub(crate) notes: Option<String>,

    /// Free-entry total price
    #[clap(long)]
    pub(crate) total: Option<String>,

    /// An item as PART:QTY or PART:QTY:PRICE; repeat for multiple items
    #[clap(long = "item", value_name = "ITEM")]
    pub(crate) items: Vec<ItemSpec>,

    /// Confirm the submission (the request is rejected without this)
    #[clap(long, short = 'y')]
    pub(crate) confirm: bool,
}

/// Purposes accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PurposeArg {
    /// Restocking a warehouse.
    Stocking,
    /// Parts consumed on a service job.
    Service,
}

impl PurposeArg {
    const fn purpose(self) -> checkout::Purpose {
        match self {
            Self::Stocking => checkout::Purpose::Stocking,
            Self::Service => checkout::Purpose::Service,
        }
    }
}

impl Submit {
    #[instrument(skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = Store::open(root)?;
        let requester = store
            .current_user(Portal::Employee)
            .map_err(|_| anyhow::anyhow!("log in to the employee portal first"))?
            .clone();

        // The original form only offered approver accounts in its dropdown;
        // resolve the name before building the submission.
        let approver = self.approver.trim();
        match store.users().get(approver) {
            Some(user) if user.role() == Role::Approver => {}
            Some(_) => anyhow::bail!("'{approver}' is not an approver"),
            None => anyhow::bail!("no approver named '{approver}'"),
        }

        let form = SubmissionForm {
            requester: requester.username().clone(),
            name: requester.name().to_string(),
            date: self
                .date
                .unwrap_or_else(|| chrono::Local::now().date_naive()),
            purpose: self.purpose.purpose(),
            warehouse: self.warehouse,
            project_number: self.project,
            po_number: self.po,
            approver: approver
                .parse()
                .expect("approver was resolved in the directory"),
            notes: self.notes,
            total_price: self.total,
            items: self.items.into_iter().map(|spec| spec.0).collect(),
            confirmed: self.confirm,
        };

        let message = {
            let request = store.submit(form, chrono::Utc::now())?;
            format!(
                "✅ Submitted request {} ({} for {})",
                request.id(),
                request.items_summary(),
                request.approver()
            )
        };
        store.flush()?;

        println!("{}", message.success());
        Ok(())
    }
}
