//! Read-side views of the library.

use serde::{Deserialize, Serialize};
use template_store::{
    short_path, DocumentKind, Report, ReportStore, Template, TemplateId, TemplateStore, Version,
    VersionRef,
};

use crate::errors::{WorkflowError, WorkflowResult};

#[cfg(test)]
#[path = "read_tests.rs"]
mod tests;

/// The templates a caller may browse and the version of each they get to see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateData {
    pub templates: Vec<Template>,
    pub versions: Vec<Version>,
}

/// The version of `template` a caller sees: internal staff see the latest, others the published.
fn visible_version(template: &Template, is_internal_staff: bool) -> Option<&VersionRef> {
    if is_internal_staff {
        Some(&template.last_version)
    } else {
        template.active_version.as_ref()
    }
}

fn shorten(name: &mut String) {
    *name = short_path(name).to_string();
}

fn shorten_template(template: &mut Template) {
    shorten(&mut template.reference.name);
    shorten(&mut template.last_version.name);
    if let Some(active) = template.active_version.as_mut() {
        shorten(&mut active.name);
    }
    if let Some(report) = template.active_report.as_mut() {
        shorten(&mut report.name);
    }
}

fn shorten_version(version: &mut Version) {
    shorten(&mut version.reference.name);
    shorten(&mut version.template.name);
    shorten(&mut version.report.name);
    if let Some(previous) = version.previous_version.as_mut() {
        shorten(&mut previous.name);
    }
}

/// Lists visible templates with the version the caller may see, in one batch read.
///
/// Templates without a visible version are left out. Every reference in the result is rewritten
/// to its path relative to the database root.
pub(crate) async fn template_data(
    store: &dyn TemplateStore,
    is_internal_staff: bool,
) -> WorkflowResult<TemplateData> {
    let (mut templates, refs): (Vec<Template>, Vec<VersionRef>) = store
        .list_templates(true)
        .await?
        .into_iter()
        .filter_map(|template| {
            let chosen = visible_version(&template, is_internal_staff)?.clone();
            Some((template, chosen))
        })
        .unzip();

    let mut versions = store.get_versions(&refs).await?;
    if versions.len() != refs.len() {
        return Err(WorkflowError::InvalidReturnType(format!(
            "requested {} versions but received {}",
            refs.len(),
            versions.len()
        )));
    }

    templates.iter_mut().for_each(shorten_template);
    versions.iter_mut().for_each(shorten_version);

    Ok(TemplateData {
        templates,
        versions,
    })
}

/// The report bound to the version of a template the caller may see.
///
/// # Errors
///
/// Returns `WorkflowError::NotFound` if the template is missing or hidden, or has no version the
/// caller may see.
pub(crate) async fn template_report(
    store: &dyn TemplateStore,
    reports: &dyn ReportStore,
    template_id: &TemplateId,
    is_internal_staff: bool,
) -> WorkflowResult<Report> {
    let not_found = |kind: DocumentKind| WorkflowError::NotFound {
        kind,
        id: template_id.to_string(),
    };

    let template = store.get_template(template_id).await?;
    if template.hidden {
        return Err(not_found(DocumentKind::Template));
    }
    let reference = visible_version(&template, is_internal_staff)
        .ok_or_else(|| not_found(DocumentKind::Version))?;
    let version = store.get_version(reference).await?;

    Ok(reports.get_report(&version.report.id).await?)
}
