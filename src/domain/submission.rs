//! Submission forms and their validation.
//!
//! A [`SubmissionForm`] is raw form input; [`SubmissionForm::validate`]
//! checks every submission rule and produces a [`Submission`], the only
//! value the lifecycle engine will accept. Nothing is persisted when
//! validation fails.

use chrono::NaiveDate;
use nonempty::NonEmpty;

use crate::domain::request::{normalize, Item, ItemError, Purpose};
use crate::domain::user::Username;

/// One unvalidated item line of a submission form.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    /// Part number and description.
    pub part: String,
    /// Quantity requested; must be greater than zero to validate.
    pub qty: u32,
    /// Unit price, if entered.
    pub price: Option<f64>,
}

/// A filled-out request form, not yet validated.
///
/// The requester and display name are snapshotted from the authenticated
/// account by the caller, never typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionForm {
    /// The submitting employee's username.
    pub requester: Username,
    /// The submitting employee's display name.
    pub name: String,
    /// The request date.
    pub date: NaiveDate,
    /// Why the parts are being checked out.
    pub purpose: Purpose,
    /// The warehouse the parts come from.
    pub warehouse: String,
    /// Project or job number, if any.
    pub project_number: Option<String>,
    /// Purchase order number; required when `purpose` is `Stocking`.
    pub po_number: Option<String>,
    /// The approver the request is addressed to.
    pub approver: Username,
    /// Free-form notes, if any.
    pub notes: Option<String>,
    /// Free-entry total price, if any.
    pub total_price: Option<String>,
    /// The requested items.
    pub items: Vec<ItemDraft>,
    /// Whether the submitter ticked the confirmation box.
    pub confirmed: bool,
}

impl SubmissionForm {
    /// Validates the form into a [`Submission`].
    ///
    /// # Errors
    ///
    /// Returns the first violated rule: empty name or warehouse, a stocking
    /// request without a purchase order number, no items, an invalid item,
    /// or a missing confirmation.
    pub fn validate(self) -> Result<Submission, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }

        let warehouse = self.warehouse.trim().to_string();
        if warehouse.is_empty() {
            return Err(ValidationError::MissingWarehouse);
        }

        let po_number = self.po_number.and_then(normalize);
        if self.purpose == Purpose::Stocking && po_number.is_none() {
            return Err(ValidationError::PurchaseOrderRequired);
        }

        let mut items = Vec::with_capacity(self.items.len());
        for (index, draft) in self.items.into_iter().enumerate() {
            let item = Item::new(draft.part, draft.qty, draft.price)
                .map_err(|source| ValidationError::Item { index, source })?;
            items.push(item);
        }
        let items = NonEmpty::from_vec(items).ok_or(ValidationError::NoItems)?;

        if !self.confirmed {
            return Err(ValidationError::NotConfirmed);
        }

        Ok(Submission {
            requester: self.requester,
            name: self.name.trim().to_string(),
            date: self.date,
            purpose: self.purpose,
            warehouse,
            project_number: self.project_number.and_then(normalize),
            po_number,
            approver: self.approver,
            notes: self.notes.and_then(normalize),
            total_price: self.total_price.and_then(normalize),
            items,
        })
    }
}

/// A validated submission, ready for the lifecycle engine.
///
/// Can only be obtained through [`SubmissionForm::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub(crate) requester: Username,
    pub(crate) name: String,
    pub(crate) date: NaiveDate,
    pub(crate) purpose: Purpose,
    pub(crate) warehouse: String,
    pub(crate) project_number: Option<String>,
    pub(crate) po_number: Option<String>,
    pub(crate) approver: Username,
    pub(crate) notes: Option<String>,
    pub(crate) total_price: Option<String>,
    pub(crate) items: NonEmpty<Item>,
}

/// A submission rule violation.
///
/// Each variant renders as the human-readable reason shown to the
/// submitter.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The requester display name is empty.
    #[error("requester name must not be empty")]
    MissingName,
    /// The warehouse is empty.
    #[error("warehouse must not be empty")]
    MissingWarehouse,
    /// A stocking request has no purchase order number.
    #[error("a purchase order number is required for stocking requests")]
    PurchaseOrderRequired,
    /// The form contains no items.
    #[error("a request must contain at least one item")]
    NoItems,
    /// An item failed validation.
    #[error("item {index}: {source}")]
    Item {
        /// Zero-based index of the offending item.
        index: usize,
        /// What was wrong with it.
        #[source]
        source: ItemError,
    },
    /// The confirmation box was not ticked.
    #[error("the submission must be confirmed")]
    NotConfirmed,
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn form(purpose: Purpose) -> SubmissionForm {
        SubmissionForm {
            requester: "employee1".parse().unwrap(),
            name: "Employee One".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            purpose,
            warehouse: "Main".to_string(),
            project_number: None,
            po_number: Some("PO-42".to_string()),
            approver: "approver1".parse().unwrap(),
            notes: None,
            total_price: None,
            items: vec![ItemDraft {
                part: "bolt".to_string(),
                qty: 4,
                price: None,
            }],
            confirmed: true,
        }
    }

    #[test]
    fn valid_form_passes() {
        let submission = form(Purpose::Service).validate().unwrap();
        assert_eq!(submission.items.len(), 1);
        assert_eq!(submission.po_number.as_deref(), Some("PO-42"));
    }

    #[test]
    fn stocking_requires_purchase_order() {
        let mut missing = form(Purpose::Stocking);
        missing.po_number = None;
        assert_eq!(
            missing.validate().unwrap_err(),
            ValidationError::PurchaseOrderRequired
        );

        let mut blank = form(Purpose::Stocking);
        blank.po_number = Some("   ".to_string());
        assert_eq!(
            blank.validate().unwrap_err(),
            ValidationError::PurchaseOrderRequired
        );
    }

    #[test]
    fn service_does_not_require_purchase_order() {
        let mut form = form(Purpose::Service);
        form.po_number = None;
        assert!(form.validate().is_ok());
    }

    #[test]
    fn empty_items_rejected() {
        let mut form = form(Purpose::Service);
        form.items.clear();
        assert_eq!(form.validate().unwrap_err(), ValidationError::NoItems);
    }

    #[test]
    fn bad_item_reports_index() {
        let mut form = form(Purpose::Service);
        form.items.push(ItemDraft {
            part: "nut".to_string(),
            qty: 0,
            price: None,
        });
        assert_eq!(
            form.validate().unwrap_err(),
            ValidationError::Item {
                index: 1,
                source: ItemError::ZeroQuantity
            }
        );
    }

    #[test]
    fn unconfirmed_form_rejected() {
        let mut form = form(Purpose::Service);
        form.confirmed = false;
        assert_eq!(form.validate().unwrap_err(), ValidationError::NotConfirmed);
    }

    #[test]
    fn blank_name_rejected() {
        let mut form = form(Purpose::Service);
        form.name = "  ".to_string();
        assert_eq!(form.validate().unwrap_err(), ValidationError::MissingName);
    }

    #[test]
    fn optional_fields_are_normalized() {
        let mut form = form(Purpose::Service);
        form.notes = Some("  keep dry  ".to_string());
        form.project_number = Some("   ".to_string());
        let submission = form.validate().unwrap();
        assert_eq!(submission.notes.as_deref(), Some("keep dry"));
        assert_eq!(submission.project_number, None);
    }
}
