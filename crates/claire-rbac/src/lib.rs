//! Pure RBAC evaluation for CLAIRE. No I/O, no async — every function here
//! is a total function of its inputs, which keeps the enforcer trivially
//! testable and usable from both `claire-submissions` and `claire-http`.
//!
//! Submission and draft types live in their owning crates (`claire-submissions`,
//! `claire-drafts`); to avoid a dependency cycle, this crate evaluates them
//! through the narrow [`SubmissionView`]/[`DraftView`] traits rather than
//! depending on those crates' concrete types.

mod permissions;

use claire_core::Principal;
pub use permissions::{any_permission_matches, permission_matches};

/// The reserved permission granting unconditional view access.
const VIEW_ALL: &str = "view:*";
/// The scoped permission granting view access to submissions sharing a group.
const VIEW_GROUP: &str = "view:group";
/// The scoped permission granting view access to the principal's own submissions.
const VIEW_OWN: &str = "view:own";

/// The minimal view of a submission the enforcer needs to evaluate scope
/// predicates, implemented by `claire-submissions::Submission`.
pub trait SubmissionView {
    /// The username that created this submission (object-key provenance
    /// only — `view:own` must compare the stable subject, see
    /// `submitter_subject`).
    fn submitter(&self) -> &str;
    /// The stable subject identifier of the submitter, per §4.4's
    /// `view:own` predicate (`submission.submitter == principal.subject`).
    /// Distinct from `submitter()`, which is the display username and may
    /// be reassigned or recycled across identities.
    fn submitter_subject(&self) -> &str;
    /// The group memberships of the submitter at submission time.
    fn submitter_groups(&self) -> &[String];
}

/// The minimal view of a draft the enforcer needs, implemented by
/// `claire-drafts::Draft`.
pub trait DraftView {
    /// The principal id that owns this draft.
    fn owner(&self) -> &str;
}

/// An action a caller may attempt against a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftAction {
    /// Create a new draft.
    Create,
    /// Update an existing draft's body.
    Update,
    /// Delete a draft.
    Delete,
}

impl DraftAction {
    fn permission_suffix(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Whether `principal` may submit against `sop_id`.
#[must_use]
pub fn can_submit(principal: &Principal, sop_id: &str) -> bool {
    if principal.is_admin {
        return true;
    }
    let required = format!("submit:{sop_id}");
    any_permission_matches(&principal.permissions, &required)
}

/// Whether `principal` may submit against a deprecated SOP version.
///
/// Requires the literal `submit:deprecated` permission in addition to the
/// ordinary `can_submit` check — deprecation override is deliberately a
/// separate grant so it can be revoked without touching per-SOP submit
/// permissions.
#[must_use]
pub fn can_submit_deprecated(principal: &Principal, sop_id: &str) -> bool {
    if principal.is_admin {
        return true;
    }
    can_submit(principal, sop_id)
        && any_permission_matches(&principal.permissions, "submit:deprecated")
}

/// Whether `principal` may view `submission`, per the §4.4 scope predicates.
#[must_use]
pub fn can_view(principal: &Principal, submission: &impl SubmissionView) -> bool {
    if principal.is_admin {
        return true;
    }
    for permission in &principal.permissions {
        if permission == VIEW_ALL {
            return true;
        }
        if permission == VIEW_GROUP && principal.shares_group(submission.submitter_groups()) {
            return true;
        }
        if permission == VIEW_OWN && submission.submitter_subject() == principal.subject {
            return true;
        }
    }
    false
}

/// Whether `principal` may perform `action` against `draft`.
///
/// Drafts are exclusively owned; only the owner or an admin may act on them,
/// and the principal must additionally hold the matching `draft:*`
/// permission.
#[must_use]
pub fn can_manage_drafts(
    principal: &Principal,
    action: DraftAction,
    draft: &impl DraftView,
) -> bool {
    if principal.is_admin {
        return true;
    }
    if draft.owner() != principal.subject {
        return false;
    }
    let required = format!("draft:{}", action.permission_suffix());
    any_permission_matches(&principal.permissions, &required)
}

/// Filter `submissions` down to those `principal` may view, preserving order.
#[must_use]
pub fn filter_viewable<T: SubmissionView>(principal: &Principal, submissions: Vec<T>) -> Vec<T> {
    submissions
        .into_iter()
        .filter(|s| can_view(principal, s))
        .collect()
}
