//! A file-backed store for the checkout workflow.
//!
//! The [`Store`] is the explicit application state threaded through every
//! operation: it owns the user directory, the request log and the session
//! table, and persists them as JSON files under a root directory. Every
//! mutation is a full-collection read-modify-write; callers mutate through
//! the store and then [`flush`](Store::flush).

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::domain::directory::{DirectoryError, UserDirectory};
use crate::domain::log::{Decision, LifecycleError, RequestLog};
use crate::domain::request::{MetadataPatch, Request, RequestId};
use crate::domain::session::{Portal, Sessions};
use crate::domain::submission::{SubmissionForm, ValidationError};
use crate::domain::user::{AuthError, User, UserFieldError, Username};
use crate::domain::Config;
use crate::storage::records;
use crate::storage::records::DecodeError;

const USERS_FILE: &str = "users.json";
const REQUESTS_FILE: &str = "requests.json";
const SESSIONS_FILE: &str = "sessions.json";
const CONFIG_FILE: &str = "config.toml";

/// Errors raised by the file-backed store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A store file could not be read.
    #[error("failed to read {}", .path.display())]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A store file could not be written.
    #[error("failed to write {}", .path.display())]
    Write {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A store file failed parse-and-validate.
    #[error("{} is corrupt: {source}", .path.display())]
    Corrupt {
        /// The offending file.
        path: PathBuf,
        /// What was wrong with it.
        #[source]
        source: DecodeError,
    },
    /// A configured seed user is invalid.
    #[error("seed user '{username}': {source}")]
    Seed {
        /// The offending seed entry's username.
        username: Username,
        /// What was wrong with it.
        #[source]
        source: UserFieldError,
    },
    /// Two configured seed users share a username.
    #[error("duplicate seed username '{0}'")]
    DuplicateSeed(Username),
}

/// The file-backed application state.
#[derive(Debug)]
pub struct Store {
    root: PathBuf,
    config: Config,
    users: UserDirectory,
    requests: RequestLog,
    sessions: Sessions,
}

impl Store {
    /// Opens the store rooted at the given directory.
    ///
    /// Missing files are treated as empty collections. If the user
    /// directory comes up empty, the configured seed accounts are applied
    /// (the original's seed-once semantics: seeding happens only while the
    /// collection is empty).
    ///
    /// # Errors
    ///
    /// Returns an error if a store file cannot be read, fails validation,
    /// or the configured seed users are invalid.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let config = load_config(&root);

        let users_path = root.join(USERS_FILE);
        let mut users = match read_optional(&users_path)? {
            Some(json) => records::decode_users(&json).map_err(|source| StoreError::Corrupt {
                path: users_path,
                source,
            })?,
            None => UserDirectory::new(),
        };

        let requests_path = root.join(REQUESTS_FILE);
        let requests = match read_optional(&requests_path)? {
            Some(json) => {
                records::decode_requests(&json).map_err(|source| StoreError::Corrupt {
                    path: requests_path,
                    source,
                })?
            }
            None => RequestLog::new(),
        };

        let sessions_path = root.join(SESSIONS_FILE);
        let sessions = match read_optional(&sessions_path)? {
            Some(json) => {
                records::decode_sessions(&json).map_err(|source| StoreError::Corrupt {
                    path: sessions_path,
                    source,
                })?
            }
            None => Sessions::new(),
        };

        if users.is_empty() {
            seed(&mut users, &config)?;
        }

        tracing::debug!(
            users = users.len(),
            requests = requests.len(),
            "opened store at {}",
            root.display()
        );

        Ok(Self {
            root,
            config,
            users,
            requests,
            sessions,
        })
    }

    /// Writes every collection back to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory or any store file cannot be
    /// written.
    pub fn flush(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            path: self.root.clone(),
            source,
        })?;
        write_file(&self.root.join(USERS_FILE), &records::encode_users(&self.users))?;
        write_file(
            &self.root.join(REQUESTS_FILE),
            &records::encode_requests(&self.requests),
        )?;
        write_file(
            &self.root.join(SESSIONS_FILE),
            &records::encode_sessions(&self.sessions),
        )?;
        Ok(())
    }

    /// The store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The store configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The user directory.
    #[must_use]
    pub const fn users(&self) -> &UserDirectory {
        &self.users
    }

    /// The request log.
    #[must_use]
    pub const fn requests(&self) -> &RequestLog {
        &self.requests
    }

    /// The session table.
    #[must_use]
    pub const fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    // ---- sessions ----

    /// Authenticates the credentials and signs the account in to the
    /// portal, replacing any existing session there.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::InvalidCredentials`] if no account matches,
    /// or [`AuthError::AccessDenied`] if the portal does not admit the
    /// account's role.
    pub fn login(
        &mut self,
        portal: Portal,
        username: &str,
        password: &str,
    ) -> Result<&User, AuthError> {
        let user = self.users.authenticate(username, password)?;
        portal.authorize(user)?;
        let username = user.username().clone();
        tracing::debug!(%username, %portal, "signed in");
        self.sessions.sign_in(portal, username);
        Ok(user)
    }

    /// Clears the portal's session, returning the username that was bound.
    pub fn logout(&mut self, portal: Portal) -> Option<Username> {
        self.sessions.sign_out(portal)
    }

    /// The account currently signed in to the portal.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::AccessDenied`] if no session is active, or
    /// the session points at an account that no longer exists (a deleted
    /// user's session is dead: the caller must log in again).
    pub fn current_user(&self, portal: Portal) -> Result<&User, AuthError> {
        let username = self
            .sessions
            .current(portal)
            .ok_or(AuthError::AccessDenied { portal })?;
        self.users
            .get(username)
            .ok_or(AuthError::AccessDenied { portal })
    }

    // ---- user directory ----

    /// Adds a user to the directory.
    ///
    /// # Errors
    ///
    /// Fails with [`DirectoryError::DuplicateUsername`] if the username is
    /// taken.
    pub fn add_user(&mut self, user: User) -> Result<(), DirectoryError> {
        self.users.add(user)
    }

    /// Replaces the user held under `old_username`.
    ///
    /// If the account is signed in and the update renames it, the session
    /// identity follows the new username.
    ///
    /// # Errors
    ///
    /// See [`UserDirectory::update`].
    pub fn update_user(
        &mut self,
        old_username: &str,
        replacement: User,
    ) -> Result<(), DirectoryError> {
        let new_username = replacement.username().clone();
        self.users.update(old_username, replacement)?;
        if let Ok(old) = Username::new(old_username.to_string()) {
            if old != new_username {
                self.sessions.rename(&old, &new_username);
            }
        }
        Ok(())
    }

    /// Deletes a user and invalidates any session bound to the account.
    ///
    /// # Errors
    ///
    /// Fails with [`DirectoryError::UnknownUser`] if no such user exists.
    pub fn delete_user(&mut self, username: &str) -> Result<User, DirectoryError> {
        let removed = self.users.remove(username)?;
        self.sessions.evict(removed.username());
        tracing::debug!(username = %removed.username(), "deleted user");
        Ok(removed)
    }

    // ---- request lifecycle ----

    /// Validates a submission form and appends the resulting request.
    ///
    /// # Errors
    ///
    /// Returns the violated submission rule; nothing is stored on failure.
    pub fn submit(
        &mut self,
        form: SubmissionForm,
        at: DateTime<Utc>,
    ) -> Result<&Request, ValidationError> {
        let submission = form.validate()?;
        Ok(self.requests.submit(submission, at))
    }

    /// Settles a pending request. See [`RequestLog::decide`].
    ///
    /// # Errors
    ///
    /// See [`RequestLog::decide`].
    pub fn decide(
        &mut self,
        id: RequestId,
        decision: Decision,
        actor: &User,
    ) -> Result<&Request, LifecycleError> {
        self.requests.decide(id, decision, actor)
    }

    /// Withdraws a pending request. See [`RequestLog::withdraw`].
    ///
    /// # Errors
    ///
    /// See [`RequestLog::withdraw`].
    pub fn withdraw(&mut self, id: RequestId, actor: &User) -> Result<&Request, LifecycleError> {
        self.requests.withdraw(id, actor)
    }

    /// Applies a metadata patch to a request. See [`RequestLog::edit`].
    ///
    /// # Errors
    ///
    /// See [`RequestLog::edit`].
    pub fn edit_request(
        &mut self,
        id: RequestId,
        patch: MetadataPatch,
    ) -> Result<&Request, LifecycleError> {
        self.requests.edit(id, patch)
    }

    /// Moves a request to the front of the display order.
    ///
    /// # Errors
    ///
    /// See [`RequestLog::push_to_top`].
    pub fn push_to_top(&mut self, id: RequestId) -> Result<(), LifecycleError> {
        self.requests.push_to_top(id)
    }

    /// Permanently deletes a request.
    ///
    /// # Errors
    ///
    /// See [`RequestLog::remove`].
    pub fn delete_request(&mut self, id: RequestId) -> Result<Request, LifecycleError> {
        self.requests.remove(id)
    }
}

fn seed(users: &mut UserDirectory, config: &Config) -> Result<(), StoreError> {
    for entry in config.seed_users().to_vec() {
        let username = entry.username.clone();
        let user = entry
            .into_user()
            .map_err(|source| StoreError::Seed {
                username: username.clone(),
                source,
            })?;
        users
            .add(user)
            .map_err(|_| StoreError::DuplicateSeed(username))?;
    }
    tracing::debug!(count = users.len(), "seeded default users");
    Ok(())
}

fn load_config(root: &Path) -> Config {
    let path = root.join(CONFIG_FILE);
    Config::load(&path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), StoreError> {
    fs::write(path, content).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
