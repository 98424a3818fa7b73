//! Hiding a template from the library.

use auth_handler::{Actor, AuthorizationOracle};
use template_store::{TemplateId, TemplateStore};
use tracing::{debug, info};

use crate::errors::{Operation, WorkflowError, WorkflowResult};
use crate::permissions::{can_delete, DeleteCheck};

#[cfg(test)]
#[path = "delete_tests.rs"]
mod tests;

/// Hides a template if `actor` may delete it.
///
/// This is a single flag write outside of any transaction. The actor is authorized first, so a
/// template that is already hidden is only reported as such to callers who may delete it; for
/// them hiding it again changes nothing and succeeds.
///
/// # Returns
///
/// `true` if the template was hidden by this call.
///
/// # Errors
///
/// - `WorkflowError::NotFound` if the template or its last version does not exist
/// - `WorkflowError::Unauthorized` if the actor may not delete the template
pub(crate) async fn hide_template(
    store: &dyn TemplateStore,
    oracle: &dyn AuthorizationOracle,
    actor: &Actor,
    template_id: &TemplateId,
) -> WorkflowResult<bool> {
    let template = store.get_template(template_id).await?;
    let last = store.get_version(&template.last_version).await?;
    let is_admin = oracle.is_template_library_admin(actor.email()).await?;

    let check = DeleteCheck {
        is_admin,
        is_creator: last.is_created_by(actor.email()),
        is_published: template.is_published(),
        visibility: last.visibility,
    };
    if !can_delete(check) {
        return Err(WorkflowError::unauthorized(Operation::Delete));
    }
    if template.hidden {
        debug!(template_id = %template_id, "Template already hidden");
        return Ok(false);
    }

    store.hide_template(template_id).await?;
    info!(
        template_id = %template_id,
        actor = %actor,
        is_admin = is_admin,
        "Template hidden"
    );
    Ok(true)
}
