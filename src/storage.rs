//! File-backed persistence and export for the checkout workflow.

/// Flattened CSV export.
pub mod export;
mod records;
mod store;

pub use records::DecodeError;
pub use store::{Store, StoreError};
