//! Visibility rules for template versions.
//!
//! A version may widen its audience but never narrow it, except that private versions may move
//! anywhere. Only private versions carry collaborators.

use template_store::{Collaborator, Visibility};

use crate::errors::{WorkflowError, WorkflowResult};

#[cfg(test)]
#[path = "visibility_tests.rs"]
mod tests;

/// Checks that a version with visibility `current` may be replaced by one with `requested`.
///
/// # Errors
///
/// Returns `WorkflowError::VisibilityCanNotBeDemoted` for `Internal -> Private` and for
/// `Global -> Internal | Private`.
pub fn can_change_visibility(current: Visibility, requested: Visibility) -> WorkflowResult<()> {
    let allowed = match current {
        Visibility::Private => true,
        Visibility::Internal | Visibility::Global => requested >= current,
    };

    if allowed {
        Ok(())
    } else {
        Err(WorkflowError::VisibilityCanNotBeDemoted {
            from: current,
            to: requested,
        })
    }
}

/// The collaborator list a version with `visibility` created or edited by `actor_email` carries.
pub fn collaborators_for(visibility: Visibility, actor_email: &str) -> Vec<Collaborator> {
    match visibility {
        Visibility::Private => vec![Collaborator::owner(actor_email)],
        Visibility::Internal | Visibility::Global => Vec::new(),
    }
}
