use std::path::PathBuf;

use checkout::{Portal, Role, Store, User, Username};
use clap::Parser;
use tracing::instrument;

use super::terminal::Colorize;

/// The well-known superadmin account that the management surface refuses
/// to edit or delete.
const PROTECTED_USERNAME: &str = "superadmin";

/// Command arguments for `inv users`.
#[derive(Debug, Parser)]
#[command(about = "Manage user accounts (superadmin only)")]
pub struct Users {
    #[command(subcommand)]
    command: UsersCommand,
}

#[derive(Debug, Parser)]
enum UsersCommand {
    /// List every account
    List,

    /// Add a new account
    Add(Add),

    /// Edit an existing account
    Edit(Edit),

    /// Remove an account
    Remove(Remove),
}

/// Role names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum RoleArg {
    Employee,
    Approver,
    Superadmin,
}

impl RoleArg {
    const fn role(self) -> Role {
        match self {
            Self::Employee => Role::Employee,
            Self::Approver => Role::Approver,
            Self::Superadmin => Role::Superadmin,
        }
    }
}

#[derive(Debug, Parser)]
struct Add {
    /// The new account's username
    username: String,

    /// The new account's display name
    #[clap(long)]
    name: String,

    /// The new account's role
    #[clap(long, value_enum)]
    role: RoleArg,

    /// Read the password from this flag instead of prompting
    #[clap(long)]
    password: Option<String>,
}

#[derive(Debug, Parser)]
struct Edit {
    /// The username of the account to edit
    username: String,

    /// Rename the account
    #[clap(long)]
    new_username: Option<String>,

    /// Replacement display name
    #[clap(long)]
    name: Option<String>,

    /// Replacement role
    #[clap(long, value_enum)]
    role: Option<RoleArg>,

    /// Replacement password
    #[clap(long)]
    password: Option<String>,
}

#[derive(Debug, Parser)]
struct Remove {
    /// The username of the account to remove
    username: String,

    /// Skip confirmation prompts
    #[arg(long, short)]
    yes: bool,
}

impl Users {
    #[instrument(skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut store = Store::open(root)?;
        let actor = store
            .current_user(Portal::Admin)
            .map_err(|_| anyhow::anyhow!("log in to the admin portal first"))?;
        if actor.role() != Role::Superadmin {
            anyhow::bail!("access denied: only the superadmin may manage users");
        }

        match self.command {
            UsersCommand::List => {
                Self::list(&store);
                Ok(())
            }
            UsersCommand::Add(command) => command.run(&mut store),
            UsersCommand::Edit(command) => command.run(&mut store),
            UsersCommand::Remove(command) => command.run(&mut store),
        }
    }

    fn list(store: &Store) {
        println!("{:<14} {:<22} ROLE", "USERNAME", "NAME");
        println!("{}", "─".repeat(48).dim());
        for user in store.users().iter() {
            println!(
                "{:<14} {:<22} {}",
                user.username().as_str(),
                user.name(),
                user.role()
            );
        }
    }
}

impl Add {
    fn run(self, store: &mut Store) -> anyhow::Result<()> {
        let username: Username = self
            .username
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let password = match self.password {
            Some(password) => password,
            None => dialoguer::Password::new()
                .with_prompt(format!("Password for {username}"))
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()?,
        };

        let user = User::new(username, self.name.trim().to_string(), password, self.role.role())
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let message = format!("✅ Added {} user {}", user.role(), user.username());

        store.add_user(user)?;
        store.flush()?;

        println!("{}", message.success());
        Ok(())
    }
}

impl Edit {
    fn run(self, store: &mut Store) -> anyhow::Result<()> {
        let target = self.username.trim();
        if target == PROTECTED_USERNAME {
            anyhow::bail!("the built-in superadmin account cannot be edited");
        }
        let Some(existing) = store.users().get(target) else {
            anyhow::bail!("no user with username '{target}'");
        };

        let username: Username = match self.new_username {
            Some(new_username) => new_username
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{e}"))?,
            None => existing.username().clone(),
        };
        let name = self
            .name
            .unwrap_or_else(|| existing.name().to_string());
        let password = self
            .password
            .unwrap_or_else(|| existing.password().to_string());
        let role = self
            .role
            .map_or(existing.role(), RoleArg::role);

        let replacement =
            User::new(username, name.trim().to_string(), password, role).map_err(|e| anyhow::anyhow!("{e}"))?;
        let message = format!("✅ Updated user {}", replacement.username());

        store.update_user(target, replacement)?;
        store.flush()?;

        println!("{}", message.success());
        Ok(())
    }
}

impl Remove {
    fn run(self, store: &mut Store) -> anyhow::Result<()> {
        let target = self.username.trim().to_string();
        if target == PROTECTED_USERNAME {
            anyhow::bail!("the built-in superadmin account cannot be removed");
        }
        if store.users().get(&target).is_none() {
            anyhow::bail!("no user with username '{target}'");
        }

        if !self.yes {
            let prompt = format!("Remove user {target}? Their sessions will be signed out");
            if !dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()?
            {
                println!("Cancelled");
                return Ok(());
            }
        }

        store.delete_user(&target)?;
        store.flush()?;

        println!("{}", format!("✅ Removed user {target}").success());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn admin_store(root: &std::path::Path, username: &str, password: &str) {
        let mut store = Store::open(root).unwrap();
        store
            .login(Portal::Admin, username, password)
            .expect("admin login should succeed");
        store.flush().unwrap();
    }

    fn users_command(command: UsersCommand, root: &std::path::Path) -> anyhow::Result<()> {
        Users { command }.run(root.to_path_buf())
    }

    #[test]
    fn user_management_is_superadmin_only() {
        let tmp = tempdir().unwrap();
        admin_store(tmp.path(), "approver1", "password");

        let result = users_command(UsersCommand::List, tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn add_edit_remove_round_trip() {
        let tmp = tempdir().unwrap();
        admin_store(tmp.path(), "superadmin", "admin123");

        users_command(
            UsersCommand::Add(Add {
                username: "carol".to_string(),
                name: "Carol".to_string(),
                role: RoleArg::Employee,
                password: Some("pw".to_string()),
            }),
            tmp.path(),
        )
        .expect("add should succeed");

        users_command(
            UsersCommand::Edit(Edit {
                username: "carol".to_string(),
                new_username: None,
                name: None,
                role: Some(RoleArg::Approver),
                password: None,
            }),
            tmp.path(),
        )
        .expect("edit should succeed");

        let store = Store::open(tmp.path()).unwrap();
        let carol = store.users().get("carol").unwrap();
        assert_eq!(carol.role(), Role::Approver);
        assert_eq!(carol.name(), "Carol");
        assert!(carol.password_matches("pw"));

        users_command(
            UsersCommand::Remove(Remove {
                username: "carol".to_string(),
                yes: true,
            }),
            tmp.path(),
        )
        .expect("remove should succeed");

        let store = Store::open(tmp.path()).unwrap();
        assert!(store.users().get("carol").is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let tmp = tempdir().unwrap();
        admin_store(tmp.path(), "superadmin", "admin123");

        let add = |root: &std::path::Path| {
            users_command(
                UsersCommand::Add(Add {
                    username: "bob".to_string(),
                    name: "Bob".to_string(),
                    role: RoleArg::Employee,
                    password: Some("pw".to_string()),
                }),
                root,
            )
        };

        add(tmp.path()).expect("first add should succeed");
        assert!(add(tmp.path()).is_err());

        let store = Store::open(tmp.path()).unwrap();
        assert_eq!(store.users().len(), 6);
    }

    #[test]
    fn the_built_in_superadmin_is_protected() {
        let tmp = tempdir().unwrap();
        admin_store(tmp.path(), "superadmin", "admin123");

        let remove = users_command(
            UsersCommand::Remove(Remove {
                username: "superadmin".to_string(),
                yes: true,
            }),
            tmp.path(),
        );
        assert!(remove.is_err());

        let edit = users_command(
            UsersCommand::Edit(Edit {
                username: "superadmin".to_string(),
                new_username: None,
                name: Some("Imposter".to_string()),
                role: None,
                password: None,
            }),
            tmp.path(),
        );
        assert!(edit.is_err());
    }
}
