//! Portals and session markers.
//!
//! The workflow has two entry points: the employee portal (submit and track
//! your own requests) and the admin portal (decide, manage, export). Each
//! portal carries at most one session, a bare username marker whose presence
//! implies an authenticated user.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::user::{AuthError, Role, User, Username};

/// One of the two entry portals of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    /// The employee portal: submitting and tracking requests.
    Employee,
    /// The admin portal: deciding requests, user management, analytics.
    Admin,
}

impl Portal {
    /// Whether the portal admits accounts with the given role.
    ///
    /// The employee portal admits only employees; the admin portal admits
    /// approvers and superadmins.
    #[must_use]
    pub const fn admits(self, role: Role) -> bool {
        matches!(
            (self, role),
            (Self::Employee, Role::Employee) | (Self::Admin, Role::Approver | Role::Superadmin)
        )
    }

    /// Checks that the user's role is admitted by this portal.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessDenied`] if the role is not admitted.
    pub fn authorize(self, user: &User) -> Result<(), AuthError> {
        if self.admits(user.role()) {
            Ok(())
        } else {
            Err(AuthError::AccessDenied { portal: self })
        }
    }

    /// A human-readable statement of who may use this portal.
    #[must_use]
    pub const fn admitted_roles(self) -> &'static str {
        match self {
            Self::Employee => "only employees can use the employee portal",
            Self::Admin => "only approvers or superadmins can use the admin portal",
        }
    }
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Employee => f.write_str("employee"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for Portal {
    type Err = ParsePortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Self::Employee),
            "admin" => Ok(Self::Admin),
            _ => Err(ParsePortalError(s.to_string())),
        }
    }
}

/// Error returned when a string does not name a portal.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown portal '{0}': expected 'employee' or 'admin'")]
pub struct ParsePortalError(String);

/// The session table: at most one signed-in username per portal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sessions {
    employee: Option<Username>,
    admin: Option<Username>,
}

impl Sessions {
    /// Creates an empty session table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            employee: None,
            admin: None,
        }
    }

    pub(crate) const fn from_parts(employee: Option<Username>, admin: Option<Username>) -> Self {
        Self { employee, admin }
    }

    /// The username signed in to the given portal, if any.
    #[must_use]
    pub const fn current(&self, portal: Portal) -> Option<&Username> {
        match portal {
            Portal::Employee => self.employee.as_ref(),
            Portal::Admin => self.admin.as_ref(),
        }
    }

    /// Binds the portal's session to the given username, replacing any
    /// existing session on that portal.
    pub fn sign_in(&mut self, portal: Portal, username: Username) {
        *self.slot_mut(portal) = Some(username);
    }

    /// Clears the portal's session, returning the username that was bound.
    pub fn sign_out(&mut self, portal: Portal) -> Option<Username> {
        self.slot_mut(portal).take()
    }

    /// Clears every session bound to the given username.
    ///
    /// Used when the account is deleted: a deleted user's sessions are
    /// invalidated immediately.
    pub(crate) fn evict(&mut self, username: &Username) {
        for portal in [Portal::Employee, Portal::Admin] {
            let slot = self.slot_mut(portal);
            if slot.as_ref() == Some(username) {
                *slot = None;
            }
        }
    }

    /// Rebinds sessions held under `old` to `new`.
    ///
    /// Used when the signed-in account is renamed, so the session identity
    /// follows the account.
    pub(crate) fn rename(&mut self, old: &Username, new: &Username) {
        for portal in [Portal::Employee, Portal::Admin] {
            let slot = self.slot_mut(portal);
            if slot.as_ref() == Some(old) {
                *slot = Some(new.clone());
            }
        }
    }

    const fn slot_mut(&mut self, portal: Portal) -> &mut Option<Username> {
        match portal {
            Portal::Employee => &mut self.employee,
            Portal::Admin => &mut self.admin,
        }
    }
}
