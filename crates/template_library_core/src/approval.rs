//! The approval state machine for template versions.
//!
//! `Pending` moves to `Approved`, `Rejected` or `Canceled`. Those three are final for the version
//! document; further edits either reopen a rejected version in place or fork a new version.

use chrono::{DateTime, Utc};
use template_store::{Approval, ApprovalStatus, ChangeMessage, Template, Version, Visibility};

use crate::errors::{WorkflowError, WorkflowResult};

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;

/// Whether a change skips review: private versions and changes made by admins do.
pub fn is_auto_approve(visibility: Visibility, is_admin: bool) -> bool {
    visibility == Visibility::Private || is_admin
}

/// How an update is applied to a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateBranch {
    /// The last version is still under review and is edited in place.
    InPlace,
    /// The last version is final; a new version and report are created.
    Fork,
}

impl UpdateBranch {
    pub fn for_status(status: ApprovalStatus) -> Self {
        if status.is_under_review() {
            UpdateBranch::InPlace
        } else {
            UpdateBranch::Fork
        }
    }
}

/// Checks that a version is waiting for review.
///
/// # Errors
///
/// Returns the `VersionIs*` error matching the version's final status.
pub fn ensure_pending(status: ApprovalStatus) -> WorkflowResult<()> {
    match WorkflowError::for_final_status(status) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Marks an approval as approved by `approver`, keeping the reviewer comment log.
pub fn mark_approved(approval: &mut Approval, approver: &str, now: DateTime<Utc>) {
    approval.status = ApprovalStatus::Approved;
    approval.approved_by = Some(approver.to_string());
    approval.time_approved = Some(now);
}

/// Marks an approval as rejected and appends the reviewer's comment.
pub fn mark_rejected(approval: &mut Approval, reviewer: &str, comment: &str, now: DateTime<Utc>) {
    approval.status = ApprovalStatus::Rejected;
    approval.changes.push(ChangeMessage {
        email: reviewer.to_string(),
        text: comment.to_string(),
        timestamp: now,
    });
}

/// Reopens a version for review after an in-place edit.
pub fn mark_pending(approval: &mut Approval) {
    approval.status = ApprovalStatus::Pending;
    approval.approved_by = None;
    approval.time_approved = None;
}

/// Publishes `version` as the template's active version.
///
/// Approves the version, marks it active and points the template at it and its report.
pub fn activate(template: &mut Template, version: &mut Version, approver: &str, now: DateTime<Utc>) {
    mark_approved(&mut version.approval, approver, now);
    version.active = true;
    version.time_modified = now;
    template.active_version = Some(version.reference.clone());
    template.active_report = Some(version.report.clone());
    template.time_modified = now;
}

/// Clears the active flag of a version that is being replaced.
///
/// Returns `false` if the version was not active and needs no write.
pub fn deactivate(version: &mut Version, now: DateTime<Utc>) -> bool {
    if !version.active {
        return false;
    }
    version.active = false;
    version.time_modified = now;
    true
}
