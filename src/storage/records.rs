//! Versioned wire records for the store files.
//!
//! Each store file is a `_version`-tagged JSON document so the on-disk
//! format can evolve without breaking old stores. Decoding is
//! parse-and-validate: wire records are converted into domain types with
//! every invariant checked, and corrupt records are rejected at this
//! boundary rather than trusted.
//!
//! Wire field names and conventions are preserved from the original data:
//! camelCase keys, lowercase purposes, capitalized statuses, and an empty
//! string for an unset decider.

use chrono::NaiveDate;
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::domain::directory::{DirectoryError, UserDirectory};
use crate::domain::log::RequestLog;
use crate::domain::request::{normalize, Item, ItemError, Purpose, Request, RequestId, Status};
use crate::domain::session::{Portal, Sessions};
use crate::domain::user::{InvalidUsernameError, Role, User, UserFieldError, Username};

/// Errors that can occur when decoding a store file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The JSON could not be parsed (including malformed usernames, dates,
    /// statuses and purposes, which are validated during deserialization).
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Two user records share a username.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// A user record has an empty name or password.
    #[error("user '{username}': {source}")]
    User {
        /// The offending record's username.
        username: Username,
        /// What was wrong with it.
        #[source]
        source: UserFieldError,
    },
    /// Two request records share an id.
    #[error("duplicate request id {0}")]
    DuplicateRequestId(RequestId),
    /// A request record has no items.
    #[error("request {id} has no items")]
    EmptyItems {
        /// The offending record's id.
        id: RequestId,
    },
    /// An item of a request record is invalid.
    #[error("request {id}, item {index}: {source}")]
    Item {
        /// The owning record's id.
        id: RequestId,
        /// Zero-based index of the offending item.
        index: usize,
        /// What was wrong with it.
        #[source]
        source: ItemError,
    },
    /// The `approvedBy` field is not a valid username.
    #[error("request {id}: invalid decider: {source}")]
    Decider {
        /// The offending record's id.
        id: RequestId,
        /// What was wrong with it.
        #[source]
        source: InvalidUsernameError,
    },
    /// A request's status and decider bookkeeping disagree: settled
    /// requests must record a decider, pending and withdrawn ones must not.
    #[error("request {id}: decider bookkeeping does not match status {status}")]
    DecisionMismatch {
        /// The offending record's id.
        id: RequestId,
        /// Its recorded status.
        status: Status,
    },
}

// ---- users.json ----

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum UsersFile {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        users: Vec<UserRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct UserRecord {
    username: Username,
    name: String,
    password: String,
    role: Role,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            username: user.username().clone(),
            name: user.name().to_string(),
            password: user.password().to_string(),
            role: user.role(),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = DecodeError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let username = record.username.clone();
        Self::new(record.username, record.name, record.password, record.role)
            .map_err(|source| DecodeError::User { username, source })
    }
}

pub(crate) fn decode_users(json: &str) -> Result<UserDirectory, DecodeError> {
    let UsersFile::V1 { users } = serde_json::from_str(json)?;
    let mut directory = UserDirectory::new();
    for record in users {
        directory.add(record.try_into()?)?;
    }
    Ok(directory)
}

pub(crate) fn encode_users(directory: &UserDirectory) -> String {
    let file = UsersFile::V1 {
        users: directory.iter().map(UserRecord::from).collect(),
    };
    serde_json::to_string_pretty(&file).expect("this must never fail")
}

// ---- requests.json ----

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum RequestsFile {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        requests: Vec<RequestRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestRecord {
    id: RequestId,
    requester: Username,
    name: String,
    date: NaiveDate,
    purpose: Purpose,
    warehouse: String,
    #[serde(default)]
    project_number: String,
    #[serde(default)]
    po_number: String,
    approver: Username,
    #[serde(default)]
    approved_by: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    total_price: String,
    status: Status,
    items: Vec<ItemRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ItemRecord {
    part: String,
    qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    price: Option<f64>,
}

impl From<&Request> for RequestRecord {
    fn from(request: &Request) -> Self {
        Self {
            id: request.id(),
            requester: request.requester().clone(),
            name: request.name().to_string(),
            date: request.date(),
            purpose: request.purpose(),
            warehouse: request.warehouse().to_string(),
            project_number: request.project_number().unwrap_or_default().to_string(),
            po_number: request.po_number().unwrap_or_default().to_string(),
            approver: request.approver().clone(),
            approved_by: request
                .approved_by()
                .map(ToString::to_string)
                .unwrap_or_default(),
            notes: request.notes().unwrap_or_default().to_string(),
            total_price: request.total_price().unwrap_or_default().to_string(),
            status: request.status(),
            items: request
                .items()
                .iter()
                .map(|item| ItemRecord {
                    part: item.part().to_string(),
                    qty: item.qty().get(),
                    price: item.price(),
                })
                .collect(),
        }
    }
}

impl TryFrom<RequestRecord> for Request {
    type Error = DecodeError;

    fn try_from(record: RequestRecord) -> Result<Self, Self::Error> {
        let id = record.id;

        let mut items = Vec::with_capacity(record.items.len());
        for (index, item) in record.items.into_iter().enumerate() {
            let item = Item::new(item.part, item.qty, item.price)
                .map_err(|source| DecodeError::Item { id, index, source })?;
            items.push(item);
        }
        let items = NonEmpty::from_vec(items).ok_or(DecodeError::EmptyItems { id })?;

        let approved_by = match record.approved_by.as_str() {
            "" => None,
            raw => Some(
                Username::new(raw.to_string())
                    .map_err(|source| DecodeError::Decider { id, source })?,
            ),
        };

        let settled = matches!(record.status, Status::Approved | Status::Rejected);
        if settled != approved_by.is_some() {
            return Err(DecodeError::DecisionMismatch {
                id,
                status: record.status,
            });
        }

        Ok(Self {
            id,
            requester: record.requester,
            name: record.name,
            date: record.date,
            purpose: record.purpose,
            warehouse: record.warehouse,
            project_number: normalize(record.project_number),
            po_number: normalize(record.po_number),
            approver: record.approver,
            approved_by,
            notes: normalize(record.notes),
            total_price: normalize(record.total_price),
            status: record.status,
            items,
        })
    }
}

pub(crate) fn decode_requests(json: &str) -> Result<RequestLog, DecodeError> {
    let RequestsFile::V1 { requests } = serde_json::from_str(json)?;
    let mut decoded: Vec<Request> = Vec::with_capacity(requests.len());
    for record in requests {
        let request: Request = record.try_into()?;
        if decoded.iter().any(|existing| existing.id() == request.id()) {
            return Err(DecodeError::DuplicateRequestId(request.id()));
        }
        decoded.push(request);
    }
    Ok(RequestLog::from_requests(decoded))
}

pub(crate) fn encode_requests(log: &RequestLog) -> String {
    let file = RequestsFile::V1 {
        requests: log.iter().map(RequestRecord::from).collect(),
    };
    serde_json::to_string_pretty(&file).expect("this must never fail")
}

// ---- sessions.json ----

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum SessionsFile {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        employee: Option<Username>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        admin: Option<Username>,
    },
}

pub(crate) fn decode_sessions(json: &str) -> Result<Sessions, DecodeError> {
    let SessionsFile::V1 { employee, admin } = serde_json::from_str(json)?;
    Ok(Sessions::from_parts(employee, admin))
}

pub(crate) fn encode_sessions(sessions: &Sessions) -> String {
    let file = SessionsFile::V1 {
        employee: sessions.current(Portal::Employee).cloned(),
        admin: sessions.current(Portal::Admin).cloned(),
    };
    serde_json::to_string_pretty(&file).expect("this must never fail")
}
