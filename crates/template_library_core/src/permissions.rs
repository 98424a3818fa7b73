//! Who may edit or hide a template.

use auth_handler::Actor;
use template_store::{Version, Visibility};

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod tests;

/// Facts the hide decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteCheck {
    /// The actor is a template library administrator.
    pub is_admin: bool,
    /// The actor created the template's last version.
    pub is_creator: bool,
    /// The template has an active version.
    pub is_published: bool,
    /// Visibility of the template's last version.
    pub visibility: Visibility,
}

/// Whether a template may be hidden.
///
/// Admins may hide anything. The creator of the last version may hide the template unless it
/// has been published to an audience beyond themselves.
pub fn can_delete(check: DeleteCheck) -> bool {
    let shared_and_published = check.is_published && check.visibility != Visibility::Private;
    check.is_admin || (check.is_creator && !shared_and_published)
}

/// Whether `actor` may change a template whose last version is `last`.
///
/// Versions still under review may be edited by their creator or an admin. Once a version is
/// approved or canceled, a private template needs an owner or editor collaborator and a shared
/// one needs internal staff.
pub fn can_update(last: &Version, actor: &Actor, is_admin: bool) -> bool {
    if last.approval.status.is_under_review() {
        return last.is_created_by(actor.email()) || is_admin;
    }

    match last.visibility {
        Visibility::Private => last
            .collaborator_role(actor.email())
            .is_some_and(|role| role.can_edit()),
        Visibility::Internal | Visibility::Global => actor.is_internal_staff(),
    }
}
