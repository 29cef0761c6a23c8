//! The request lifecycle engine.
//!
//! [`RequestLog`] is the filesystem-agnostic, ordered collection of
//! requests. Storage order is display order: "push to top" is a reorder of
//! this collection and nothing else. All status transitions live here.

use chrono::{DateTime, Utc};

use crate::domain::request::{MetadataPatch, Request, RequestId, Status};
use crate::domain::submission::Submission;
use crate::domain::user::{User, Username};

/// The decision a decider can take on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Approve the request.
    Approve,
    /// Reject the request.
    Reject,
}

impl Decision {
    /// The terminal status this decision settles the request into.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Approve => Status::Approved,
            Self::Reject => Status::Rejected,
        }
    }
}

/// Errors raised by lifecycle transitions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// No request with the given id exists (stale id).
    #[error("no request with id {0}")]
    NotFound(RequestId),
    /// The request has already left the `Pending` state.
    #[error("request {id} is {status}, not Pending")]
    NotPending {
        /// The addressed request.
        id: RequestId,
        /// Its current (terminal) status.
        status: Status,
    },
    /// The acting user is not permitted to perform this transition.
    #[error("access denied: '{actor}' may not act on request {id}")]
    AccessDenied {
        /// The addressed request.
        id: RequestId,
        /// The user who attempted the transition.
        actor: Username,
    },
}

/// The ordered collection of requests and their transition rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestLog {
    requests: Vec<Request>,
}

impl RequestLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requests: Vec::new(),
        }
    }

    pub(crate) const fn from_requests(requests: Vec<Request>) -> Self {
        Self { requests }
    }

    /// Appends a new request built from a validated submission.
    ///
    /// The id is derived from `at` (milliseconds since the epoch), bumping
    /// past any existing id so it is unique. The request starts `Pending`
    /// with no decider recorded.
    pub fn submit(&mut self, submission: Submission, at: DateTime<Utc>) -> &Request {
        let id = self.allocate_id(at);
        let request = Request {
            id,
            requester: submission.requester,
            name: submission.name,
            date: submission.date,
            purpose: submission.purpose,
            warehouse: submission.warehouse,
            project_number: submission.project_number,
            po_number: submission.po_number,
            approver: submission.approver,
            approved_by: None,
            notes: submission.notes,
            total_price: submission.total_price,
            status: Status::Pending,
            items: submission.items,
        };
        tracing::debug!(%id, requester = %request.requester, "submitted request");
        self.requests.push(request);
        self.requests.last().expect("just pushed")
    }

    /// Settles a pending request as approved or rejected.
    ///
    /// Only a superadmin, or the approver the request is addressed to, may
    /// decide it. On success the status becomes the decision's terminal
    /// status and `approved_by` records the acting user.
    ///
    /// # Errors
    ///
    /// Fails with [`LifecycleError::NotFound`] for a stale id,
    /// [`LifecycleError::AccessDenied`] if the actor may not decide this
    /// request, or [`LifecycleError::NotPending`] if it is already settled
    /// (an earlier decision is never overwritten).
    pub fn decide(
        &mut self,
        id: RequestId,
        decision: Decision,
        actor: &User,
    ) -> Result<&Request, LifecycleError> {
        let request = self
            .requests
            .iter_mut()
            .find(|request| request.id == id)
            .ok_or(LifecycleError::NotFound(id))?;

        if !request.decidable_by(actor) {
            return Err(LifecycleError::AccessDenied {
                id,
                actor: actor.username().clone(),
            });
        }
        if !request.status.is_pending() {
            return Err(LifecycleError::NotPending {
                id,
                status: request.status,
            });
        }

        request.status = decision.status();
        request.approved_by = Some(actor.username().clone());
        tracing::debug!(%id, status = %request.status, decider = %actor.username(), "decided request");
        Ok(request)
    }

    /// Withdraws a pending request.
    ///
    /// Only the original requester may withdraw, and only while the request
    /// is `Pending`. No decider is recorded.
    ///
    /// # Errors
    ///
    /// Fails with [`LifecycleError::NotFound`] for a stale id,
    /// [`LifecycleError::AccessDenied`] if the actor is not the requester,
    /// or [`LifecycleError::NotPending`] if the request is already settled.
    pub fn withdraw(&mut self, id: RequestId, actor: &User) -> Result<&Request, LifecycleError> {
        let request = self
            .requests
            .iter_mut()
            .find(|request| request.id == id)
            .ok_or(LifecycleError::NotFound(id))?;

        if request.requester != *actor.username() {
            return Err(LifecycleError::AccessDenied {
                id,
                actor: actor.username().clone(),
            });
        }
        if !request.status.is_pending() {
            return Err(LifecycleError::NotPending {
                id,
                status: request.status,
            });
        }

        request.status = Status::Withdrawn;
        tracing::debug!(%id, "withdrew request");
        Ok(request)
    }

    /// Applies a metadata patch to a request.
    ///
    /// Only the warehouse, project number, PO number and notes can change;
    /// any status is editable and the status itself never changes.
    ///
    /// # Errors
    ///
    /// Fails with [`LifecycleError::NotFound`] for a stale id.
    pub fn edit(&mut self, id: RequestId, patch: MetadataPatch) -> Result<&Request, LifecycleError> {
        let request = self
            .requests
            .iter_mut()
            .find(|request| request.id == id)
            .ok_or(LifecycleError::NotFound(id))?;
        patch.apply(request);
        tracing::debug!(%id, "edited request metadata");
        Ok(request)
    }

    /// Moves a request to the front of the storage (display) order.
    ///
    /// A pure reorder: no field of any request changes.
    ///
    /// # Errors
    ///
    /// Fails with [`LifecycleError::NotFound`] for a stale id.
    pub fn push_to_top(&mut self, id: RequestId) -> Result<(), LifecycleError> {
        let index = self
            .requests
            .iter()
            .position(|request| request.id == id)
            .ok_or(LifecycleError::NotFound(id))?;
        let request = self.requests.remove(index);
        self.requests.insert(0, request);
        Ok(())
    }

    /// Permanently removes a request. Irreversible; there is no soft delete.
    ///
    /// # Errors
    ///
    /// Fails with [`LifecycleError::NotFound`] for a stale id.
    pub fn remove(&mut self, id: RequestId) -> Result<Request, LifecycleError> {
        let index = self
            .requests
            .iter()
            .position(|request| request.id == id)
            .ok_or(LifecycleError::NotFound(id))?;
        let removed = self.requests.remove(index);
        tracing::debug!(%id, "deleted request");
        Ok(removed)
    }

    /// Returns the request with the given id, if any.
    #[must_use]
    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.iter().find(|request| request.id == id)
    }

    /// Iterates over all requests in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.requests.iter()
    }

    /// The requests the given user may see, sorted for display.
    ///
    /// Sorted descending by date; the sort is stable, so requests sharing a
    /// date keep their storage order (which "push to top" controls).
    #[must_use]
    pub fn visible_to(&self, user: &User) -> Vec<&Request> {
        let mut rows: Vec<&Request> = self
            .requests
            .iter()
            .filter(|request| request.visible_to(user))
            .collect();
        rows.sort_by(|a, b| b.date().cmp(&a.date()));
        rows
    }

    /// The number of requests in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the log holds no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn allocate_id(&self, at: DateTime<Utc>) -> RequestId {
        let mut id = RequestId::from_timestamp(at);
        while self.get(id).is_some() {
            id = id.next();
        }
        id
    }
}

impl<'a> IntoIterator for &'a RequestLog {
    type Item = &'a Request;
    type IntoIter = std::slice::Iter<'a, Request>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.iter()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::request::Purpose;
    use crate::domain::submission::{ItemDraft, SubmissionForm};
    use crate::domain::user::Role;

    fn user(username: &str, role: Role) -> User {
        User::new(
            username.parse().unwrap(),
            format!("{username} name"),
            "password".to_string(),
            role,
        )
        .unwrap()
    }

    fn submission(requester: &str, approver: &str, date: NaiveDate) -> Submission {
        SubmissionForm {
            requester: requester.parse().unwrap(),
            name: format!("{requester} name"),
            date,
            purpose: Purpose::Service,
            warehouse: "Main".to_string(),
            project_number: None,
            po_number: None,
            approver: approver.parse().unwrap(),
            notes: None,
            total_price: None,
            items: vec![ItemDraft {
                part: "bolt".to_string(),
                qty: 2,
                price: None,
            }],
            confirmed: true,
        }
        .validate()
        .unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn submit_starts_pending_with_no_decider() {
        let mut log = RequestLog::new();
        let request = log.submit(submission("employee1", "approver1", date(1)), at(1_000));
        assert_eq!(request.status(), Status::Pending);
        assert_eq!(request.approved_by(), None);
        assert_eq!(request.id(), RequestId::new(1_000));
    }

    #[test]
    fn same_instant_submissions_get_distinct_ids() {
        let mut log = RequestLog::new();
        let first = log.submit(submission("employee1", "approver1", date(1)), at(1_000)).id();
        let second = log.submit(submission("employee1", "approver1", date(1)), at(1_000)).id();
        assert_ne!(first, second);
        assert_eq!(second, RequestId::new(1_001));
    }

    #[test]
    fn assigned_approver_can_decide() {
        let mut log = RequestLog::new();
        let id = log.submit(submission("employee1", "approver1", date(1)), at(1)).id();

        let approver = user("approver1", Role::Approver);
        let request = log.decide(id, Decision::Approve, &approver).unwrap();

        assert_eq!(request.status(), Status::Approved);
        assert_eq!(request.approved_by().unwrap().as_str(), "approver1");
    }

    #[test]
    fn other_approver_is_denied_but_superadmin_succeeds() {
        let mut log = RequestLog::new();
        let id = log.submit(submission("employee1", "approver2", date(1)), at(1)).id();

        let wrong = user("approver1", Role::Approver);
        assert!(matches!(
            log.decide(id, Decision::Approve, &wrong).unwrap_err(),
            LifecycleError::AccessDenied { .. }
        ));
        assert_eq!(log.get(id).unwrap().status(), Status::Pending);

        let root = user("superadmin", Role::Superadmin);
        let request = log.decide(id, Decision::Reject, &root).unwrap();
        assert_eq!(request.status(), Status::Rejected);
        assert_eq!(request.approved_by().unwrap().as_str(), "superadmin");
    }

    #[test]
    fn settled_requests_cannot_be_redecided() {
        let mut log = RequestLog::new();
        let id = log.submit(submission("employee1", "approver1", date(1)), at(1)).id();
        let approver = user("approver1", Role::Approver);
        log.decide(id, Decision::Approve, &approver).unwrap();

        let error = log.decide(id, Decision::Reject, &approver).unwrap_err();

        assert_eq!(
            error,
            LifecycleError::NotPending {
                id,
                status: Status::Approved
            }
        );
        // The earlier decision is untouched.
        assert_eq!(log.get(id).unwrap().status(), Status::Approved);
    }

    #[test]
    fn withdraw_requires_the_original_requester() {
        let mut log = RequestLog::new();
        let id = log.submit(submission("employee1", "approver1", date(1)), at(1)).id();

        let other = user("employee2", Role::Employee);
        assert!(matches!(
            log.withdraw(id, &other).unwrap_err(),
            LifecycleError::AccessDenied { .. }
        ));

        let requester = user("employee1", Role::Employee);
        let request = log.withdraw(id, &requester).unwrap();
        assert_eq!(request.status(), Status::Withdrawn);
        assert_eq!(request.approved_by(), None);
    }

    #[test]
    fn withdraw_fails_once_settled() {
        let mut log = RequestLog::new();
        let id = log.submit(submission("employee1", "approver1", date(1)), at(1)).id();
        log.decide(id, Decision::Approve, &user("approver1", Role::Approver))
            .unwrap();

        let requester = user("employee1", Role::Employee);
        assert!(matches!(
            log.withdraw(id, &requester).unwrap_err(),
            LifecycleError::NotPending { .. }
        ));
    }

    #[test]
    fn edit_touches_only_metadata() {
        let mut log = RequestLog::new();
        let id = log.submit(submission("employee1", "approver1", date(1)), at(1)).id();

        let patch = MetadataPatch {
            warehouse: Some("Annex".to_string()),
            project_number: Some("J-17".to_string()),
            po_number: None,
            notes: Some("".to_string()),
        };
        let request = log.edit(id, patch).unwrap();

        assert_eq!(request.warehouse(), "Annex");
        assert_eq!(request.project_number(), Some("J-17"));
        assert_eq!(request.notes(), None);
        assert_eq!(request.status(), Status::Pending);
        assert_eq!(request.requester().as_str(), "employee1");
    }

    #[test]
    fn push_to_top_reorders_without_mutation() {
        let mut log = RequestLog::new();
        let first = log.submit(submission("employee1", "approver1", date(1)), at(1)).id();
        let second = log.submit(submission("employee1", "approver1", date(1)), at(2)).id();
        let before = log.get(second).unwrap().clone();

        log.push_to_top(second).unwrap();

        let order: Vec<_> = log.iter().map(Request::id).collect();
        assert_eq!(order, [second, first]);
        assert_eq!(log.get(second).unwrap(), &before);
    }

    #[test]
    fn stale_ids_are_reported() {
        let mut log = RequestLog::new();
        let ghost = RequestId::new(404);
        assert_eq!(
            log.push_to_top(ghost).unwrap_err(),
            LifecycleError::NotFound(ghost)
        );
        assert_eq!(log.remove(ghost).unwrap_err(), LifecycleError::NotFound(ghost));
        assert_eq!(
            log.edit(ghost, MetadataPatch::default()).unwrap_err(),
            LifecycleError::NotFound(ghost)
        );
    }

    #[test]
    fn visibility_follows_roles() {
        let mut log = RequestLog::new();
        log.submit(submission("employee1", "approver1", date(1)), at(1));
        log.submit(submission("employee2", "approver1", date(2)), at(2));
        log.submit(submission("employee2", "approver2", date(3)), at(3));

        assert_eq!(log.visible_to(&user("employee1", Role::Employee)).len(), 1);
        assert_eq!(log.visible_to(&user("approver1", Role::Approver)).len(), 2);
        assert_eq!(log.visible_to(&user("superadmin", Role::Superadmin)).len(), 3);
    }

    #[test]
    fn display_sort_is_date_descending_and_stable() {
        let mut log = RequestLog::new();
        let a = log.submit(submission("employee1", "approver1", date(5)), at(1)).id();
        let b = log.submit(submission("employee1", "approver1", date(9)), at(2)).id();
        let c = log.submit(submission("employee1", "approver1", date(5)), at(3)).id();

        // Tie on date(5): storage order decides, and push-to-top changes it.
        log.push_to_top(c).unwrap();

        let visible = log.visible_to(&user("employee1", Role::Employee));
        let order: Vec<_> = visible.iter().map(|request| request.id()).collect();
        assert_eq!(order, [b, c, a]);
    }
}
