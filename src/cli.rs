use std::path::PathBuf;

mod list;
mod show;
mod stats;
mod submit;
mod terminal;
mod users;

use checkout::{Config, Decision, MetadataPatch, Portal, RequestId, Role, Store, User};
use clap::ArgAction;
use list::List;
use show::Show;
use stats::Stats;
use submit::Submit;
use terminal::Colorize;
use tracing::instrument;

/// Portal names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PortalArg {
    /// The employee portal: submitting and tracking requests.
    Employee,
    /// The admin portal: deciding requests, user management, analytics.
    Admin,
}

impl PortalArg {
    pub const fn portal(self) -> Portal {
        match self {
            Self::Employee => Portal::Employee,
            Self::Admin => Portal::Admin,
        }
    }
}

/// Finds the user behind an active session.
///
/// With an explicit portal, only that portal is consulted; otherwise the
/// admin session wins over the employee session.
pub(crate) fn active_user(store: &Store, portal: Option<Portal>) -> anyhow::Result<User> {
    if let Some(portal) = portal {
        return Ok(store.current_user(portal)?.clone());
    }
    for portal in [Portal::Admin, Portal::Employee] {
        if let Ok(user) = store.current_user(portal) {
            return Ok(user.clone());
        }
    }
    anyhow::bail!("no active session; run 'inv login <portal> <username>' first")
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the store directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::List(List::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Initialize a new store with the default configuration
    Init,

    /// Sign in to a portal
    Login(Login),

    /// Sign out of a portal
    Logout(Logout),

    /// Show the active sessions
    Whoami,

    /// Submit a new checkout request (employee portal)
    Submit(Submit),

    /// List requests visible to the signed-in user (default)
    List(List),

    /// Show the full detail of a request
    Show(Show),

    /// Approve a pending request (admin portal)
    Approve(Decide),

    /// Reject a pending request (admin portal)
    Reject(Decide),

    /// Withdraw one of your pending requests (employee portal)
    Withdraw(Withdraw),

    /// Move one of your requests to the top of the list (employee portal)
    PushTop(PushTop),

    /// Edit a request's metadata (admin portal)
    Edit(Edit),

    /// Permanently delete a request (admin portal)
    Delete(Delete),

    /// Manage user accounts (superadmin)
    Users(users::Users),

    /// Show aggregate request analytics (superadmin)
    Stats(Stats),

    /// Export every request as CSV, one line per item (superadmin)
    Export(Export),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Init => Init::run(&root)?,
            Self::Login(command) => command.run(root)?,
            Self::Logout(command) => command.run(root)?,
            Self::Whoami => Whoami::run(&root)?,
            Self::Submit(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::Approve(command) => command.run(root, Decision::Approve)?,
            Self::Reject(command) => command.run(root, Decision::Reject)?,
            Self::Withdraw(command) => command.run(root)?,
            Self::PushTop(command) => command.run(root)?,
            Self::Edit(command) => command.run(root)?,
            Self::Delete(command) => command.run(root)?,
            Self::Users(command) => command.run(root)?,
            Self::Stats(command) => command.run(root)?,
            Self::Export(command) => command.run(root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &PathBuf) -> anyhow::Result<()> {
        use std::fs;

        let config_path = root.join("config.toml");
        if config_path.exists() {
            anyhow::bail!("Store already initialized (found existing config.toml)");
        }

        fs::create_dir_all(root)
            .map_err(|e| anyhow::anyhow!("Failed to create store directory: {e}"))?;

        let config = Config::default();
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        // Opening an empty store applies the configured seed accounts.
        let store = Store::open(root.clone())?;
        store.flush()?;

        println!("Initialized checkout store in {}", root.display());
        println!("  Created: config.toml");
        println!(
            "  Created: users.json ({} seed accounts)",
            store.users().len()
        );
        println!("  Created: requests.json");
        println!();
        println!("Next steps:");
        println!("  inv login employee employee1");
        println!(
            "  inv submit --purpose service --warehouse Main --approver approver1 \
             --item 'bolt:4' --confirm"
        );

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Login {
    /// The portal to sign in to
    #[clap(value_enum)]
    portal: PortalArg,

    /// The username to sign in as
    username: String,

    /// Read the password from this flag instead of prompting
    #[clap(long)]
    password: Option<String>,
}

impl Login {
    #[instrument(skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let password = match self.password {
            Some(password) => password,
            None => dialoguer::Password::new()
                .with_prompt(format!("Password for {}", self.username))
                .interact()?,
        };

        let mut store = Store::open(root)?;
        let portal = self.portal.portal();
        let message = {
            let user = store.login(portal, self.username.trim(), &password)?;
            format!(
                "✅ Signed in to the {portal} portal as {} ({})",
                user.name(),
                user.username()
            )
        };
        store.flush()?;

        println!("{}", message.success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Logout {
    /// The portal to sign out of
    #[clap(value_enum)]
    portal: PortalArg,
}

impl Logout {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = Store::open(root)?;
        let portal = self.portal.portal();

        match store.logout(portal) {
            Some(username) => {
                store.flush()?;
                println!("Signed {username} out of the {portal} portal");
            }
            None => println!("No active session on the {portal} portal"),
        }
        Ok(())
    }
}

struct Whoami;

impl Whoami {
    fn run(root: &PathBuf) -> anyhow::Result<()> {
        let store = Store::open(root.clone())?;

        for portal in [Portal::Employee, Portal::Admin] {
            match store.current_user(portal) {
                Ok(user) => println!(
                    "{portal}: {} ({}, {})",
                    user.name(),
                    user.username(),
                    user.role()
                ),
                Err(_) => println!("{portal}: {}", "not signed in".dim()),
            }
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Decide {
    /// The id of the request to decide
    id: RequestId,
}

impl Decide {
    #[instrument]
    fn run(self, root: PathBuf, decision: Decision) -> anyhow::Result<()> {
        let mut store = Store::open(root)?;
        let actor = store
            .current_user(Portal::Admin)
            .map_err(|_| anyhow::anyhow!("log in to the admin portal first"))?
            .clone();

        let status = store.decide(self.id, decision, &actor)?.status();
        store.flush()?;

        println!(
            "{}",
            format!("✅ Request {} is now {status}", self.id).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Withdraw {
    /// The id of the request to withdraw
    id: RequestId,
}

impl Withdraw {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = Store::open(root)?;
        let actor = store
            .current_user(Portal::Employee)
            .map_err(|_| anyhow::anyhow!("log in to the employee portal first"))?
            .clone();

        store.withdraw(self.id, &actor)?;
        store.flush()?;

        println!("{}", format!("✅ Withdrew request {}", self.id).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct PushTop {
    /// The id of the request to move to the top
    id: RequestId,
}

impl PushTop {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = Store::open(root)?;
        let actor = store
            .current_user(Portal::Employee)
            .map_err(|_| anyhow::anyhow!("log in to the employee portal first"))?
            .clone();

        let Some(request) = store.requests().get(self.id) else {
            anyhow::bail!("no request with id {}", self.id);
        };
        if request.requester() != actor.username() {
            anyhow::bail!("request {} was not submitted by you", self.id);
        }

        store.push_to_top(self.id)?;
        store.flush()?;

        println!("Moved request {} to the top", self.id);
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Edit {
    /// The id of the request to edit
    id: RequestId,

    /// Replacement warehouse
    #[clap(long)]
    warehouse: Option<String>,

    /// Replacement project/job number (empty clears)
    #[clap(long)]
    project: Option<String>,

    /// Replacement purchase order number (empty clears)
    #[clap(long)]
    po: Option<String>,

    /// Replacement notes (empty clears)
    #[clap(long)]
    notes: Option<String>,
}

impl Edit {
    #[instrument(skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = Store::open(root)?;
        store
            .current_user(Portal::Admin)
            .map_err(|_| anyhow::anyhow!("log in to the admin portal first"))?;

        let patch = MetadataPatch {
            warehouse: self.warehouse,
            project_number: self.project,
            po_number: self.po,
            notes: self.notes,
        };
        if patch.is_empty() {
            anyhow::bail!(
                "nothing to change; pass at least one of --warehouse, --project, --po, --notes"
            );
        }

        store.edit_request(self.id, patch)?;
        store.flush()?;

        println!("{}", format!("✅ Updated request {}", self.id).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Delete {
    /// The id of the request to delete
    id: RequestId,

    /// Skip confirmation prompts
    #[arg(long, short)]
    yes: bool,
}

impl Delete {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = Store::open(root)?;
        store
            .current_user(Portal::Admin)
            .map_err(|_| anyhow::anyhow!("log in to the admin portal first"))?;

        let Some(request) = store.requests().get(self.id) else {
            anyhow::bail!("no request with id {}", self.id);
        };

        if !self.yes {
            let prompt = format!(
                "Delete request {} ({}, {})? This cannot be undone",
                self.id,
                request.name(),
                request.items_summary()
            );
            if !dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()?
            {
                println!("Cancelled");
                return Ok(());
            }
        }

        store.delete_request(self.id)?;
        store.flush()?;

        println!("{}", format!("✅ Deleted request {}", self.id).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Export {
    /// Write the CSV to this file instead of stdout
    #[clap(long, short)]
    output: Option<PathBuf>,
}

impl Export {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = Store::open(root)?;
        let actor = store
            .current_user(Portal::Admin)
            .map_err(|_| anyhow::anyhow!("log in to the admin portal first"))?;
        if actor.role() != Role::Superadmin {
            anyhow::bail!("access denied: only the superadmin may export requests");
        }

        if store.requests().is_empty() {
            println!("There are no requests to export.");
            return Ok(());
        }

        let csv = checkout::storage::export::to_csv(store.requests().iter());
        match self.output {
            Some(path) => {
                let rows = store
                    .requests()
                    .iter()
                    .map(|request| request.items().len())
                    .sum::<usize>();
                std::fs::write(&path, csv)?;
                println!(
                    "{}",
                    format!("✅ Exported {rows} rows to {}", path.display()).success()
                );
            }
            None => print!("{csv}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use checkout::{Purpose, Status};
    use tempfile::tempdir;

    use super::*;

    fn init_store(root: &std::path::Path) -> Store {
        let store = Store::open(root).unwrap();
        store.flush().unwrap();
        store
    }

    fn login(root: &std::path::Path, portal: PortalArg, username: &str, password: &str) {
        Login {
            portal,
            username: username.to_string(),
            password: Some(password.to_string()),
        }
        .run(root.to_path_buf())
        .expect("login should succeed");
    }

    fn submit_one(root: &std::path::Path) -> RequestId {
        login(root, PortalArg::Employee, "employee1", "password");
        Submit {
            date: None,
            purpose: submit::PurposeArg::Service,
            warehouse: "Main".to_string(),
            approver: "approver1".to_string(),
            po: None,
            project: None,
            notes: None,
            total: None,
            items: vec!["bolt:4".parse().unwrap()],
            confirm: true,
        }
        .run(root.to_path_buf())
        .expect("submit should succeed");

        let store = Store::open(root).unwrap();
        store.requests().iter().next().unwrap().id()
    }

    #[test]
    fn init_seeds_and_creates_files() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("store");

        Init::run(&root).expect("init should succeed");

        assert!(root.join("config.toml").exists());
        assert!(root.join("users.json").exists());
        let store = Store::open(&root).unwrap();
        assert_eq!(store.users().len(), 5);
    }

    #[test]
    fn init_refuses_to_reinitialize() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        Init::run(&root).unwrap();
        assert!(Init::run(&root).is_err());
    }

    #[test]
    fn login_rejects_wrong_portal() {
        let tmp = tempdir().unwrap();
        init_store(tmp.path());

        let result = Login {
            portal: PortalArg::Admin,
            username: "employee1".to_string(),
            password: Some("password".to_string()),
        }
        .run(tmp.path().to_path_buf());

        assert!(result.is_err());
    }

    #[test]
    fn approve_flow_through_commands() {
        let tmp = tempdir().unwrap();
        init_store(tmp.path());
        let id = submit_one(tmp.path());

        login(tmp.path(), PortalArg::Admin, "approver1", "password");
        Decide { id }
            .run(tmp.path().to_path_buf(), Decision::Approve)
            .expect("approve should succeed");

        let store = Store::open(tmp.path()).unwrap();
        let request = store.requests().get(id).unwrap();
        assert_eq!(request.status(), Status::Approved);
        assert_eq!(request.approved_by().unwrap().as_str(), "approver1");
    }

    #[test]
    fn approve_requires_admin_session() {
        let tmp = tempdir().unwrap();
        init_store(tmp.path());
        let id = submit_one(tmp.path());

        // Only the employee session is active.
        let result = Decide { id }.run(tmp.path().to_path_buf(), Decision::Approve);
        assert!(result.is_err());
    }

    #[test]
    fn withdraw_flow_through_commands() {
        let tmp = tempdir().unwrap();
        init_store(tmp.path());
        let id = submit_one(tmp.path());

        Withdraw { id }
            .run(tmp.path().to_path_buf())
            .expect("withdraw should succeed");

        let store = Store::open(tmp.path()).unwrap();
        assert_eq!(
            store.requests().get(id).unwrap().status(),
            Status::Withdrawn
        );
    }

    #[test]
    fn edit_updates_metadata_only() {
        let tmp = tempdir().unwrap();
        init_store(tmp.path());
        let id = submit_one(tmp.path());
        login(tmp.path(), PortalArg::Admin, "approver1", "password");

        Edit {
            id,
            warehouse: Some("Annex".to_string()),
            project: None,
            po: None,
            notes: Some("urgent".to_string()),
        }
        .run(tmp.path().to_path_buf())
        .expect("edit should succeed");

        let store = Store::open(tmp.path()).unwrap();
        let request = store.requests().get(id).unwrap();
        assert_eq!(request.warehouse(), "Annex");
        assert_eq!(request.notes(), Some("urgent"));
        assert_eq!(request.purpose(), Purpose::Service);
        assert_eq!(request.status(), Status::Pending);
    }

    #[test]
    fn delete_with_yes_removes_the_request() {
        let tmp = tempdir().unwrap();
        init_store(tmp.path());
        let id = submit_one(tmp.path());
        login(tmp.path(), PortalArg::Admin, "approver1", "password");

        Delete { id, yes: true }
            .run(tmp.path().to_path_buf())
            .expect("delete should succeed");

        let store = Store::open(tmp.path()).unwrap();
        assert!(store.requests().is_empty());
    }

    #[test]
    fn export_is_superadmin_only() {
        let tmp = tempdir().unwrap();
        init_store(tmp.path());
        let _id = submit_one(tmp.path());
        login(tmp.path(), PortalArg::Admin, "approver1", "password");

        let denied = Export { output: None }.run(tmp.path().to_path_buf());
        assert!(denied.is_err());

        login(tmp.path(), PortalArg::Admin, "superadmin", "admin123");
        let path = tmp.path().join("export.csv");
        Export {
            output: Some(path.clone()),
        }
        .run(tmp.path().to_path_buf())
        .expect("superadmin export should succeed");

        let csv = std::fs::read_to_string(path).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }
}
