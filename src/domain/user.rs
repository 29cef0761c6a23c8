use std::{fmt, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

use crate::domain::session::Portal;

/// A validated username.
///
/// Usernames are non-empty and contain no whitespace. They are the primary
/// key of the user directory and are compared exactly (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Username(NonEmptyString);

impl Username {
    /// Creates a new `Username` from a string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsernameError` if the string is empty or contains
    /// whitespace.
    pub fn new(s: String) -> Result<Self, InvalidUsernameError> {
        // Check non-empty
        let non_empty =
            NonEmptyString::new(s.clone()).map_err(|_| InvalidUsernameError(s.clone()))?;

        if s.chars().any(char::is_whitespace) {
            return Err(InvalidUsernameError(s));
        }

        Ok(Self(non_empty))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Username {
    type Error = InvalidUsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Username {
    type Error = InvalidUsernameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Username {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl PartialEq<str> for Username {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Username {
    type Err = InvalidUsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl Serialize for Username {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// Error returned when a string is not a valid username.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid username '{0}': must be non-empty and contain no whitespace")]
pub struct InvalidUsernameError(String);

/// The role of a user account.
///
/// Roles gate which portal a user may enter and which operations they may
/// perform once inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May log in to the employee portal and submit requests.
    Employee,
    /// May log in to the admin portal and decide requests addressed to them.
    Approver,
    /// Full visibility: decides any request, manages users, views analytics.
    Superadmin,
}

impl Role {
    /// The capitalized display label for the role.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Employee => "Employee",
            Self::Approver => "Approver",
            Self::Superadmin => "Superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Self::Employee),
            "approver" => Ok(Self::Approver),
            "superadmin" => Ok(Self::Superadmin),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// Error returned when a string does not name a role.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown role '{0}': expected 'employee', 'approver' or 'superadmin'")]
pub struct ParseRoleError(String);

/// A user account.
///
/// Passwords are stored and compared in plain text: the workflow is
/// local-first and explicitly offers no authentication security.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub(crate) username: Username,
    pub(crate) name: String,
    pub(crate) password: String,
    pub(crate) role: Role,
}

impl User {
    /// Construct a new user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the display name or password is empty.
    pub fn new(
        username: Username,
        name: String,
        password: String,
        role: Role,
    ) -> Result<Self, UserFieldError> {
        if name.trim().is_empty() {
            return Err(UserFieldError::EmptyName);
        }
        if password.is_empty() {
            return Err(UserFieldError::EmptyPassword);
        }
        Ok(Self {
            username,
            name,
            password,
            role,
        })
    }

    /// The username, the unique key of the account.
    #[must_use]
    pub const fn username(&self) -> &Username {
        &self.username
    }

    /// The display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plain-text password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// The account's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether the candidate password matches this account's password.
    #[must_use]
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }
}

/// Error returned when constructing a user record from invalid fields.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UserFieldError {
    /// The display name is empty.
    #[error("display name must not be empty")]
    EmptyName,
    /// The password is empty.
    #[error("password must not be empty")]
    EmptyPassword,
}

/// Errors raised by authentication and portal authorization.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// The username/password pair does not match any account.
    #[error("invalid username or password")]
    InvalidCredentials,
    /// The account's role is not admitted by the portal, or no session is
    /// active for it.
    #[error("access denied: {}", .portal.admitted_roles())]
    AccessDenied {
        /// The portal that refused the account.
        portal: Portal,
    },
}
