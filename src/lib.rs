//! Local-first Inventory Checkout
//!
//! Employees submit part requests, approvers and superadmins decide them,
//! and a superadmin manages the user directory, views analytics and
//! exports the full log. All state is JSON files under a store root; there
//! is no server.

pub mod domain;
pub use domain::{
    AuthError, Config, Decision, DirectoryError, Item, ItemDraft, LifecycleError, MetadataPatch,
    Portal, Purpose, Request, RequestId, RequestLog, Role, Sessions, Status, Submission,
    SubmissionForm, Summary, User, UserDirectory, Username, ValidationError,
};

/// File-backed persistence and export.
pub mod storage;
pub use storage::{Store, StoreError};
