//! Pieces shared by the transaction bodies of the state-changing operations.

use auth_handler::{Actor, AuthorizationOracle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use template_store::{StoreTransaction, Template, Version, VersionRef};

use crate::approval::deactivate;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::notifications::{Notification, NotificationKind, Recipient, TemplateUrls};

/// A template together with its most recent version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateWithVersion {
    pub template: Template,
    pub last_version: Version,
}

impl TemplateWithVersion {
    /// Checks that `last_version` is the version the template points at.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidReturnType` if the two disagree.
    pub(crate) fn ensure_consistent(&self) -> WorkflowResult<()> {
        if self.template.last_version != self.last_version.reference {
            return Err(WorkflowError::InvalidReturnType(format!(
                "template '{}' points at version {} but version {} was returned",
                self.template.id(),
                self.template.last_version.id,
                self.last_version.id()
            )));
        }
        Ok(())
    }
}

/// What a committed transaction produced: the new state and the notifications to send for it.
#[derive(Debug)]
pub(crate) struct Transition {
    pub result: TemplateWithVersion,
    pub notifications: Vec<Notification>,
}

/// Who is acting and the services a transaction body consults while deciding.
#[derive(Clone, Copy)]
pub(crate) struct TransitionContext<'a> {
    pub actor: &'a Actor,
    pub oracle: &'a dyn AuthorizationOracle,
    pub urls: &'a TemplateUrls,
}

impl TransitionContext<'_> {
    pub async fn actor_is_admin(&self) -> WorkflowResult<bool> {
        Ok(self
            .oracle
            .is_template_library_admin(self.actor.email())
            .await?)
    }

    pub fn notification(
        &self,
        kind: NotificationKind,
        recipients: Vec<Recipient>,
        version: &Version,
        template_name: &str,
    ) -> Notification {
        Notification {
            kind,
            recipients,
            template_id: version.template.id.clone(),
            template_name: template_name.to_string(),
            template_url: self
                .urls
                .template_url(&version.template.id, &version.report.id),
            actor: self.actor.email().to_string(),
            comment: None,
        }
    }
}

/// Reads the version that stops being active when `target` is published.
///
/// Returns `None` if the template has no active version or `target` already is the active one.
/// `last` is returned instead of read again when it is the active version.
pub(crate) async fn read_replaced_active(
    tx: &mut dyn StoreTransaction,
    template: &Template,
    target: Option<&VersionRef>,
    last: &Version,
) -> WorkflowResult<Option<Version>> {
    let Some(active) = template.active_version.as_ref() else {
        return Ok(None);
    };
    if Some(active) == target {
        return Ok(None);
    }
    if *active == last.reference {
        return Ok(Some(last.clone()));
    }
    Ok(Some(tx.get_version(active).await?))
}

/// Stages the deactivation of a replaced version, if it is still flagged active.
pub(crate) fn retire(
    tx: &mut dyn StoreTransaction,
    replaced: Option<Version>,
    now: DateTime<Utc>,
) -> WorkflowResult<()> {
    if let Some(mut version) = replaced {
        if deactivate(&mut version, now) {
            tx.update_version(&version)?;
        }
    }
    Ok(())
}
