//! Template library document types
//!
//! Templates, their versions and the saved reports the versions are bound to, together with the
//! typed references used to address them in the document store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DocumentKind, StoreError, StoreResult};

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;

/// Separator between the database prefix and the storage-relative path of a resource name.
pub const DOCUMENTS_SEGMENT: &str = "/documents/";

/// Collection holding one document per template.
pub const TEMPLATES_COLLECTION: &str =
    "cloudAnalytics/template-library/templateLibraryReportTemplates";

/// Sub-collection of a template document holding its versions.
pub const VERSIONS_COLLECTION: &str = "reportTemplateVersions";

/// Collection holding saved reports.
pub const REPORTS_COLLECTION: &str = "dashboards/google-cloud-reports/savedReports";

fn validate_id(kind: DocumentKind, id: &str) -> StoreResult<()> {
    if id.trim().is_empty() || id.contains('/') || id != id.trim() {
        return Err(StoreError::invalid_id(kind, id));
    }
    Ok(())
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Strips the database prefix from an absolute resource name.
///
/// Names without the `/documents/` segment are returned unchanged.
pub fn short_path(resource_name: &str) -> &str {
    match resource_name.find(DOCUMENTS_SEGMENT) {
        Some(index) => &resource_name[index + DOCUMENTS_SEGMENT.len()..],
        None => resource_name,
    }
}

/// A weak handle to a stored document: an identifier plus its absolute resource name.
pub trait DocumentRef {
    /// The document identifier within its collection.
    fn document_id(&self) -> String;

    /// The absolute resource name, `projects/{project}/databases/(default)/documents/...`.
    fn resource_name(&self) -> &str;

    /// The resource name relative to the database root.
    fn short_path(&self) -> &str {
        short_path(self.resource_name())
    }
}

/// Identifier of a template document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateId(String);

impl TemplateId {
    /// Creates a template id, rejecting empty ids and ids containing path separators.
    pub fn new(id: impl Into<String>) -> StoreResult<Self> {
        let id = id.into();
        validate_id(DocumentKind::Template, &id)?;
        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(generate_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TemplateId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TemplateId> for String {
    fn from(value: TemplateId) -> Self {
        value.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a saved report document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportId(String);

impl ReportId {
    pub fn new(id: impl Into<String>) -> StoreResult<Self> {
        let id = id.into();
        validate_id(DocumentKind::Report, &id)?;
        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(generate_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReportId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReportId> for String {
    fn from(value: ReportId) -> Self {
        value.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-template version number, stored as a decimal string ("0", "1", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionId(u64);

impl VersionId {
    /// The id of the first version of every template.
    pub fn first() -> Self {
        Self(0)
    }

    /// The id assigned to the version forked from this one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidId` if this is the largest representable id.
    pub fn next(self) -> StoreResult<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| StoreError::invalid_id(DocumentKind::Version, self.to_string()))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for VersionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for VersionId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Signs and leading zeros would give one version two ids.
        let canonical = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_digit())
            && (s.len() == 1 || !s.starts_with('0'));
        if !canonical {
            return Err(StoreError::invalid_id(DocumentKind::Version, s));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| StoreError::invalid_id(DocumentKind::Version, s))
    }
}

impl TryFrom<String> for VersionId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionId> for String {
    fn from(value: VersionId) -> Self {
        value.0.to_string()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a template document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateRef {
    pub id: TemplateId,
    pub name: String,
}

impl DocumentRef for TemplateRef {
    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn resource_name(&self) -> &str {
        &self.name
    }
}

/// Reference to a version document, nested under its template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRef {
    pub template_id: TemplateId,
    pub id: VersionId,
    pub name: String,
}

impl DocumentRef for VersionRef {
    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn resource_name(&self) -> &str {
        &self.name
    }
}

/// Reference to a saved report document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportRef {
    pub id: ReportId,
    pub name: String,
}

impl DocumentRef for ReportRef {
    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn resource_name(&self) -> &str {
        &self.name
    }
}

/// The absolute database prefix that every resource name starts with.
///
/// Builds typed references so that all references produced by one store share a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRoot {
    prefix: String,
}

impl DocumentRoot {
    pub fn new(project_id: &str) -> Self {
        Self {
            prefix: format!("projects/{project_id}/databases/(default)/documents"),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn template_ref(&self, id: &TemplateId) -> TemplateRef {
        TemplateRef {
            id: id.clone(),
            name: format!("{}/{}/{}", self.prefix, TEMPLATES_COLLECTION, id),
        }
    }

    pub fn version_ref(&self, template_id: &TemplateId, id: VersionId) -> VersionRef {
        VersionRef {
            template_id: template_id.clone(),
            id,
            name: format!(
                "{}/{}/{}/{}/{}",
                self.prefix, TEMPLATES_COLLECTION, template_id, VERSIONS_COLLECTION, id
            ),
        }
    }

    pub fn report_ref(&self, id: &ReportId) -> ReportRef {
        ReportRef {
            id: id.clone(),
            name: format!("{}/{}/{}", self.prefix, REPORTS_COLLECTION, id),
        }
    }
}

/// Who may see a template version.
///
/// Variants are declared in rank order, so `Private < Internal < Global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to the creator and the listed collaborators only.
    Private,

    /// Visible to internal staff.
    Internal,

    /// Visible to every customer.
    Global,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Internal => "internal",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a visibility level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid report template visibility: {0}")]
pub struct ParseVisibilityError(pub String);

impl FromStr for Visibility {
    type Err = ParseVisibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "internal" => Ok(Self::Internal),
            "global" => Ok(Self::Global),
            other => Err(ParseVisibilityError(other.to_string())),
        }
    }
}

/// Review state of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Canceled,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
        }
    }

    /// Pending and rejected versions are still under review and are edited in place.
    pub fn is_under_review(&self) -> bool {
        matches!(self, Self::Pending | Self::Rejected)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer comment in a version's audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMessage {
    pub email: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Review record of a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub status: ApprovalStatus,
    pub approved_by: Option<String>,
    pub time_approved: Option<DateTime<Utc>>,
    /// Append-only log of reviewer comments.
    #[serde(default)]
    pub changes: Vec<ChangeMessage>,
}

impl Approval {
    pub fn pending() -> Self {
        Self {
            status: ApprovalStatus::Pending,
            approved_by: None,
            time_approved: None,
            changes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorRole {
    Owner,
    Editor,
    Viewer,
}

impl CollaboratorRole {
    /// Owners and editors may change the version they collaborate on.
    pub fn can_edit(&self) -> bool {
        matches!(self, Self::Owner | Self::Editor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub email: String,
    pub role: CollaboratorRole,
}

impl Collaborator {
    pub fn owner(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: CollaboratorRole::Owner,
        }
    }
}

/// A saved report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub reference: ReportRef,
    pub name: String,
    pub description: String,
    pub config: Option<ReportConfig>,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

/// Metadata field types a report can group or filter by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFieldType {
    Fixed,
    Datetime,
    Label,
    ProjectLabel,
    SystemLabel,
    Tag,
    Attribution,
    AttributionGroup,
    Gke,
    GkeLabel,
    #[serde(other)]
    Other,
}

impl MetadataFieldType {
    /// Customer-defined label and tag keys, which a shared template cannot rely on.
    pub fn is_customer_label(&self) -> bool {
        matches!(self, Self::Label | Self::ProjectLabel | Self::Tag)
    }
}

/// A metadata field the report includes as an optional dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalField {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: MetadataFieldType,
}

/// The structured configuration of a report.
///
/// Only the fields the template library inspects are typed; everything else is carried through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_metric: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional: Vec<OptionalField>,
    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

/// One reviewable snapshot of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub reference: VersionRef,
    pub template: TemplateRef,
    pub report: ReportRef,
    pub previous_version: Option<VersionRef>,
    pub created_by: String,
    pub approval: Approval,
    pub active: bool,
    pub visibility: Visibility,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub cloud: Vec<String>,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

impl Version {
    pub fn id(&self) -> VersionId {
        self.reference.id
    }

    /// The role `email` holds on this version, if any. Comparison ignores case.
    pub fn collaborator_role(&self, email: &str) -> Option<CollaboratorRole> {
        self.collaborators
            .iter()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .map(|c| c.role)
    }

    pub fn is_created_by(&self, email: &str) -> bool {
        self.created_by.eq_ignore_ascii_case(email)
    }
}

/// Top-level template document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub reference: TemplateRef,
    pub active_report: Option<ReportRef>,
    pub active_version: Option<VersionRef>,
    pub last_version: VersionRef,
    pub hidden: bool,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

impl Template {
    pub fn id(&self) -> &TemplateId {
        &self.reference.id
    }

    /// Whether any version of this template has been approved.
    pub fn is_published(&self) -> bool {
        self.active_version.is_some()
    }
}
