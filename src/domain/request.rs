use std::{fmt, num::NonZeroU32, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::domain::user::{Role, User, Username};

/// Unique identifier of a request.
///
/// Derived from the creation instant in milliseconds since the Unix epoch;
/// when two requests are created in the same millisecond the later one bumps
/// to the next free value, so ids stay unique within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(i64);

impl RequestId {
    /// Wraps a raw id value.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// The id derived from a creation instant.
    #[must_use]
    pub(crate) fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis())
    }

    /// The next candidate id, used to resolve same-millisecond collisions.
    #[must_use]
    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// The lifecycle state of a request.
///
/// `Pending` is the only initial state; the other three are terminal.
/// Serialized capitalized, matching the persisted wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Awaiting a decision.
    Pending,
    /// Approved by a decider.
    Approved,
    /// Rejected by a decider.
    Rejected,
    /// Withdrawn by the requester before a decision.
    Withdrawn,
}

impl Status {
    /// Every status, in display order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Approved, Self::Rejected, Self::Withdrawn];

    /// Whether the request is still awaiting a decision.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Withdrawn => "Withdrawn",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why the parts are being checked out.
///
/// Serialized lowercase (wire fidelity); displayed capitalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    /// Restocking a warehouse; requires a purchase order number.
    Stocking,
    /// Parts consumed on a service job.
    Service,
}

impl Purpose {
    /// Every purpose, in display order.
    pub const ALL: [Self; 2] = [Self::Stocking, Self::Service];

    /// The capitalized display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stocking => "Stocking",
            Self::Service => "Service",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Purpose {
    type Err = ParsePurposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stocking" => Ok(Self::Stocking),
            "service" => Ok(Self::Service),
            _ => Err(ParsePurposeError(s.to_string())),
        }
    }
}

/// Error returned when a string does not name a purpose.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown purpose '{0}': expected 'stocking' or 'service'")]
pub struct ParsePurposeError(String);

/// A single part line of a request.
///
/// Items have no independent lifecycle; each is owned by exactly one
/// request and is immutable after submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) part: String,
    pub(crate) qty: NonZeroU32,
    pub(crate) price: Option<f64>,
}

impl Item {
    /// Constructs a validated item.
    ///
    /// # Errors
    ///
    /// Returns an error if the part is empty, the quantity is zero, or the
    /// price is negative or not finite.
    pub fn new(part: String, qty: u32, price: Option<f64>) -> Result<Self, ItemError> {
        if part.trim().is_empty() {
            return Err(ItemError::EmptyPart);
        }
        let qty = NonZeroU32::new(qty).ok_or(ItemError::ZeroQuantity)?;
        if let Some(price) = price {
            if !price.is_finite() || price < 0.0 {
                return Err(ItemError::InvalidPrice);
            }
        }
        Ok(Self { part, qty, price })
    }

    /// The part number and description.
    #[must_use]
    pub fn part(&self) -> &str {
        &self.part
    }

    /// The quantity requested.
    #[must_use]
    pub const fn qty(&self) -> NonZeroU32 {
        self.qty
    }

    /// The unit price, if one was entered.
    #[must_use]
    pub const fn price(&self) -> Option<f64> {
        self.price
    }
}

/// Error returned when constructing an item from invalid fields.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ItemError {
    /// The part number is empty.
    #[error("part must not be empty")]
    EmptyPart,
    /// The quantity is zero.
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
    /// The price is negative or not a finite number.
    #[error("price must be a finite, non-negative number")]
    InvalidPrice,
}

/// A checkout request.
///
/// Constructed only through submission (see
/// [`RequestLog::submit`](crate::domain::log::RequestLog::submit)), which
/// guarantees the invariants: items are never empty, the status starts at
/// `Pending`, and `approved_by` is recorded exactly when a decision is made.
///
/// `requester`, `name`, `date`, `purpose` and `items` are immutable after
/// creation; metadata edits touch only the warehouse, project number, PO
/// number and notes.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub(crate) id: RequestId,
    pub(crate) requester: Username,
    pub(crate) name: String,
    pub(crate) date: NaiveDate,
    pub(crate) purpose: Purpose,
    pub(crate) warehouse: String,
    pub(crate) project_number: Option<String>,
    pub(crate) po_number: Option<String>,
    pub(crate) approver: Username,
    pub(crate) approved_by: Option<Username>,
    pub(crate) notes: Option<String>,
    pub(crate) total_price: Option<String>,
    pub(crate) status: Status,
    pub(crate) items: NonEmpty<Item>,
}

impl Request {
    /// The unique id.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The username of the employee who submitted the request.
    #[must_use]
    pub const fn requester(&self) -> &Username {
        &self.requester
    }

    /// The requester's display name, snapshotted at submission.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The request date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Why the parts are being checked out.
    #[must_use]
    pub const fn purpose(&self) -> Purpose {
        self.purpose
    }

    /// The warehouse the parts come from.
    #[must_use]
    pub fn warehouse(&self) -> &str {
        &self.warehouse
    }

    /// The project or job number, if any.
    #[must_use]
    pub fn project_number(&self) -> Option<&str> {
        self.project_number.as_deref()
    }

    /// The purchase order number, if any.
    ///
    /// Present on stocking requests at submission time; edits may clear it.
    #[must_use]
    pub fn po_number(&self) -> Option<&str> {
        self.po_number.as_deref()
    }

    /// The username of the requested approver.
    #[must_use]
    pub const fn approver(&self) -> &Username {
        &self.approver
    }

    /// The username of whoever actually decided the request, if settled.
    #[must_use]
    pub const fn approved_by(&self) -> Option<&Username> {
        self.approved_by.as_ref()
    }

    /// Free-form notes, if any.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// The free-entry total price, if any.
    #[must_use]
    pub fn total_price(&self) -> Option<&str> {
        self.total_price.as_deref()
    }

    /// The lifecycle status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// The requested items; never empty.
    #[must_use]
    pub const fn items(&self) -> &NonEmpty<Item> {
        &self.items
    }

    /// A one-line summary of the items, e.g. `"bolt x 4; nut x 8"`.
    #[must_use]
    pub fn items_summary(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{} x {}", item.part, item.qty))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Whether the given user may see this request.
    ///
    /// Employees see their own requests, approvers see requests addressed
    /// to them, superadmins see everything.
    #[must_use]
    pub fn visible_to(&self, user: &User) -> bool {
        match user.role() {
            Role::Superadmin => true,
            Role::Approver => self.approver == *user.username(),
            Role::Employee => self.requester == *user.username(),
        }
    }

    /// Whether the given user may decide this request.
    ///
    /// A superadmin may decide any request; an approver only requests
    /// addressed to them.
    #[must_use]
    pub fn decidable_by(&self, user: &User) -> bool {
        match user.role() {
            Role::Superadmin => true,
            Role::Approver => self.approver == *user.username(),
            Role::Employee => false,
        }
    }
}

/// A partial update to a request's editable metadata.
///
/// `None` leaves the field untouched; `Some` replaces it. For the optional
/// fields an empty string clears the value. Fields outside this struct
/// cannot be edited at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    /// Replacement warehouse, if given.
    pub warehouse: Option<String>,
    /// Replacement project/job number, if given; empty clears.
    pub project_number: Option<String>,
    /// Replacement purchase order number, if given; empty clears.
    pub po_number: Option<String>,
    /// Replacement notes, if given; empty clears.
    pub notes: Option<String>,
}

impl MetadataPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.warehouse.is_none()
            && self.project_number.is_none()
            && self.po_number.is_none()
            && self.notes.is_none()
    }

    pub(crate) fn apply(self, request: &mut Request) {
        if let Some(warehouse) = self.warehouse {
            request.warehouse = warehouse.trim().to_string();
        }
        if let Some(project_number) = self.project_number {
            request.project_number = normalize(project_number);
        }
        if let Some(po_number) = self.po_number {
            request.po_number = normalize(po_number);
        }
        if let Some(notes) = self.notes {
            request.notes = normalize(notes);
        }
    }
}

/// Trims the value and maps an empty result to `None`.
pub(crate) fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
