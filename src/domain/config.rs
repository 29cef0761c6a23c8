use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::user::{Role, User, UserFieldError, Username};

/// A user account seeded into an empty store.
///
/// Seed credentials are configuration, not code: edit `config.toml` to
/// change them before the first open of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    /// The account's username.
    pub username: Username,
    /// The account's display name.
    pub name: String,
    /// The account's plain-text password.
    pub password: String,
    /// The account's role.
    pub role: Role,
}

impl SeedUser {
    fn new(username: &str, name: &str, password: &str, role: Role) -> Self {
        Self {
            username: username.parse().expect("seed usernames are valid"),
            name: name.to_string(),
            password: password.to_string(),
            role,
        }
    }

    /// Converts the seed entry into a directory record.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured name or password is empty.
    pub fn into_user(self) -> Result<User, UserFieldError> {
        User::new(self.username, self.name, self.password, self.role)
    }
}

/// Store configuration.
///
/// Currently holds only the seed accounts applied to an empty store. The
/// defaults reproduce the conventional five-account setup: two employees,
/// two approvers, one superadmin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    seed_users: Vec<SeedUser>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_users: default_seed_users(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or
    /// if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The accounts seeded into an empty store.
    #[must_use]
    pub fn seed_users(&self) -> &[SeedUser] {
        &self.seed_users
    }
}

fn default_seed_users() -> Vec<SeedUser> {
    vec![
        SeedUser::new("employee1", "Employee One", "password", Role::Employee),
        SeedUser::new("employee2", "Employee Two", "password", Role::Employee),
        SeedUser::new("approver1", "Approver One", "password", Role::Approver),
        SeedUser::new("approver2", "Approver Two", "password", Role::Approver),
        SeedUser::new("superadmin", "Super Admin", "admin123", Role::Superadmin),
    ]
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the
/// domain type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_seed_users", skip_serializing_if = "Vec::is_empty")]
        seed_users: Vec<SeedUser>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 { seed_users } => Self { seed_users },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            seed_users: config.seed_users,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\n\n[[seed_users]]\nusername = \"root\"\nname = \"Root\"\npassword = \"hunter2\"\nrole = \"superadmin\"\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.seed_users().len(), 1);
        assert_eq!(config.seed_users()[0].username.as_str(), "root");
        assert_eq!(config.seed_users()[0].role, Role::Superadmin);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nseed_users = 3\n").unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        // Deserializing a bare version marker yields the default seed set.
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn default_seeds_cover_the_three_roles() {
        let config = Config::default();
        let roles: Vec<_> = config.seed_users().iter().map(|seed| seed.role).collect();
        assert_eq!(roles.iter().filter(|&&r| r == Role::Employee).count(), 2);
        assert_eq!(roles.iter().filter(|&&r| r == Role::Approver).count(), 2);
        assert_eq!(roles.iter().filter(|&&r| r == Role::Superadmin).count(), 1);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();
        let reloaded = Config::load(&path).unwrap();

        assert_eq!(reloaded, config);
    }
}
