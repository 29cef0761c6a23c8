//! The user directory.
//!
//! An ordered, in-memory collection of user accounts keyed by username.
//! The directory knows nothing about persistence or sessions; the
//! [`Store`](crate::storage::Store) layers both on top.

use crate::domain::user::{AuthError, Role, User, Username};

/// Errors raised by user-directory mutations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// A user with the candidate username already exists.
    #[error("a user with username '{0}' already exists")]
    DuplicateUsername(Username),
    /// No user with the given username exists.
    #[error("no user with username '{0}'")]
    UnknownUser(String),
}

/// An ordered collection of user accounts with unique usernames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { users: Vec::new() }
    }

    /// Appends a new user.
    ///
    /// # Errors
    ///
    /// Fails with [`DirectoryError::DuplicateUsername`] if the username is
    /// already taken; the directory is unchanged.
    pub fn add(&mut self, user: User) -> Result<(), DirectoryError> {
        if self.get(user.username()).is_some() {
            return Err(DirectoryError::DuplicateUsername(user.username().clone()));
        }
        self.users.push(user);
        Ok(())
    }

    /// Replaces the record held under `old_username`, preserving its
    /// position in the directory.
    ///
    /// The replacement may carry a different username (a rename).
    ///
    /// # Errors
    ///
    /// Fails with [`DirectoryError::UnknownUser`] if `old_username` is not
    /// present, or [`DirectoryError::DuplicateUsername`] when renaming to a
    /// username held by a *different* existing user.
    pub fn update(&mut self, old_username: &str, replacement: User) -> Result<(), DirectoryError> {
        let index = self
            .position(old_username)
            .ok_or_else(|| DirectoryError::UnknownUser(old_username.to_string()))?;

        let renamed = replacement.username().as_str() != old_username;
        if renamed && self.get(replacement.username()).is_some() {
            return Err(DirectoryError::DuplicateUsername(
                replacement.username().clone(),
            ));
        }

        self.users[index] = replacement;
        Ok(())
    }

    /// Removes and returns the record with the given username.
    ///
    /// # Errors
    ///
    /// Fails with [`DirectoryError::UnknownUser`] if no such user exists.
    pub fn remove(&mut self, username: &str) -> Result<User, DirectoryError> {
        let index = self
            .position(username)
            .ok_or_else(|| DirectoryError::UnknownUser(username.to_string()))?;
        Ok(self.users.remove(index))
    }

    /// Looks up the account matching the username/password pair.
    ///
    /// Unknown usernames and wrong passwords are deliberately
    /// indistinguishable.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::InvalidCredentials`] if no account matches.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<&User, AuthError> {
        self.users
            .iter()
            .find(|user| user.username() == username && user.password_matches(password))
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Returns the account with the given username, if any.
    #[must_use]
    pub fn get(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|user| user.username() == username)
    }

    /// Iterates over the accounts in directory order.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    /// Iterates over the accounts holding the approver role.
    ///
    /// These are the accounts a submission may be addressed to.
    pub fn approvers(&self) -> impl Iterator<Item = &User> {
        self.users.iter().filter(|user| user.role() == Role::Approver)
    }

    /// The number of accounts in the directory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the directory holds no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn position(&self, username: &str) -> Option<usize> {
        self.users.iter().position(|user| user.username() == username)
    }
}

impl<'a> IntoIterator for &'a UserDirectory {
    type Item = &'a User;
    type IntoIter = std::slice::Iter<'a, User>;

    fn into_iter(self) -> Self::IntoIter {
        self.users.iter()
    }
}
