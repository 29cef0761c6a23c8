//! Aggregate request counts for the analytics view.

use std::collections::BTreeMap;

use serde::{ser::SerializeStruct, Serialize, Serializer};

use crate::domain::request::{Purpose, Request, Status};

/// Derived counts over the request collection.
///
/// Recomputed on demand; nothing is persisted. Every status and purpose is
/// pre-seeded at zero so the summary always shows the full fixed set of
/// categories, including `Withdrawn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    by_status: BTreeMap<Status, usize>,
    by_purpose: BTreeMap<Purpose, usize>,
    total: usize,
}

impl Serialize for Summary {
    /// Serializes both count maps under their capitalized display labels
    /// (purposes are stored lowercase on the wire, but count keys are
    /// labels).
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct Labeled<'a>(&'a BTreeMap<Purpose, usize>);

        impl Serialize for Labeled<'_> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.collect_map(
                    self.0
                        .iter()
                        .map(|(purpose, &count)| (purpose.label(), count)),
                )
            }
        }

        let mut state = serializer.serialize_struct("Summary", 3)?;
        state.serialize_field("by_status", &self.by_status)?;
        state.serialize_field("by_purpose", &Labeled(&self.by_purpose))?;
        state.serialize_field("total", &self.total)?;
        state.end()
    }
}

impl Summary {
    /// Computes the summary over the given requests.
    #[must_use]
    pub fn of<'a>(requests: impl IntoIterator<Item = &'a Request>) -> Self {
        let mut by_status: BTreeMap<Status, usize> =
            Status::ALL.iter().map(|&status| (status, 0)).collect();
        let mut by_purpose: BTreeMap<Purpose, usize> =
            Purpose::ALL.iter().map(|&purpose| (purpose, 0)).collect();
        let mut total = 0;

        for request in requests {
            *by_status.entry(request.status()).or_insert(0) += 1;
            *by_purpose.entry(request.purpose()).or_insert(0) += 1;
            total += 1;
        }

        Self {
            by_status,
            by_purpose,
            total,
        }
    }

    /// Counts keyed by status, in declaration order.
    #[must_use]
    pub const fn by_status(&self) -> &BTreeMap<Status, usize> {
        &self.by_status
    }

    /// Counts keyed by purpose, in declaration order.
    #[must_use]
    pub const fn by_purpose(&self) -> &BTreeMap<Purpose, usize> {
        &self.by_purpose
    }

    /// The total number of requests counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }
}
