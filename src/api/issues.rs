//! Redmine issues.
//!
//! An [`Issue`] keeps every attribute the server sends, including custom
//! fields and plugin attributes this crate knows nothing about, so that a
//! fetched issue can be modified and saved back without losing data.

use std::collections::BTreeMap;
use std::fmt;

use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use super::client::{Query, RedmineClient};
use super::error::{ApiError, Result};
use super::extensible::{self, ExtensionBag, KnownSchema};
use super::types::{Id, IdName};
use super::uploads::Upload;

/// Key Redmine reads as "set (or clear, when empty) the parent issue".
pub const PARENT_ISSUE_ID_KEY: &str = "parent_issue_id";

/// The fixed attributes of an issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueFields {
    /// The issue ID.
    #[serde(default)]
    pub id: u32,
    /// One-line summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Long description (Textile or Markdown, per server settings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The project the issue belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<IdName>,
    /// The tracker (Bug, Feature, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<IdName>,
    /// The parent issue. `None` clears the parent when the issue is saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Id>,
    /// The workflow status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IdName>,
    /// The priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<IdName>,
    /// Who opened the issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<IdName>,
    /// Target version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<IdName>,
    /// Current assignee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<IdName>,
    /// Issue category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<IdName>,
    /// Notes to add as a journal entry on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_on: Option<String>,
    /// Custom field values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
    /// Uploaded files to attach on save.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploads: Vec<Upload>,
    /// Percent done, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_ratio: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "finite_hours"
    )]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    /// History entries (only present with `include=journals`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub journals: Vec<Journal>,
}

impl KnownSchema for IssueFields {
    const KNOWN_KEYS: &'static [&'static str] = &[
        "id",
        "subject",
        "description",
        "project",
        "tracker",
        "parent",
        "status",
        "priority",
        "author",
        "fixed_version",
        "assigned_to",
        "category",
        "notes",
        "status_date",
        "created_on",
        "updated_on",
        "start_date",
        "due_date",
        "closed_on",
        "custom_fields",
        "uploads",
        "done_ratio",
        "estimated_hours",
        "is_private",
        "journals",
        PARENT_ISSUE_ID_KEY,
    ];

    fn finish_encoding(&self, known: &mut Map<String, Value>) {
        // Redmine clears the parent relationship on an empty parent_issue_id.
        if self.parent.is_none() {
            known.insert(PARENT_ISSUE_ID_KEY.to_string(), Value::String(String::new()));
        }
    }
}

/// A Redmine issue.
///
/// Attributes outside [`IssueFields`] are kept in `extra` and written back
/// on output. When `extra` holds a key that is also a known attribute, the
/// known attribute wins on output and the extra value is lost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Issue {
    /// The fixed attributes.
    pub fields: IssueFields,
    /// Every other attribute the server sent.
    pub extra: ExtensionBag,
}

impl Issue {
    /// Decode an issue from a JSON payload.
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(ApiError::Parse)
    }

    /// Encode the issue, extras included, as a JSON object.
    pub fn to_json(&self) -> Result<Value> {
        extensible::merge_known(&self.fields, &self.extra)
            .map(Value::Object)
            .map_err(ApiError::Serialization)
    }

    /// Get the issue subject, or an empty string.
    pub fn subject(&self) -> &str {
        self.fields.subject.as_deref().unwrap_or_default()
    }

    /// Get the issue status name, if known.
    pub fn status(&self) -> Option<&str> {
        self.fields.status.as_ref().map(IdName::name)
    }

    /// Get the assignee name, or "Unassigned" if not set.
    pub fn assignee_name(&self) -> &str {
        self.fields
            .assigned_to
            .as_ref()
            .map(IdName::name)
            .unwrap_or("Unassigned")
    }

    /// Get a custom field value by custom field ID.
    pub fn custom_field(&self, id: u32) -> Option<&Value> {
        self.fields
            .custom_fields
            .iter()
            .find(|cf| cf.id == id)
            .map(|cf| &cf.value)
    }

    /// `"<tracker> #<id>: <subject>"`
    pub fn title(&self) -> String {
        match &self.fields.tracker {
            Some(tracker) => format!("{} #{}: {}", tracker.name(), self.fields.id, self.subject()),
            None => format!("#{}: {}", self.fields.id, self.subject()),
        }
    }
}

/// JSON has no NaN or infinity; refuse them rather than writing `null`.
fn finite_hours<S: Serializer>(
    hours: &Option<f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match hours {
        Some(h) if !h.is_finite() => Err(ser::Error::custom(format!(
            "estimated_hours must be a finite number, got {}",
            h
        ))),
        _ => hours.serialize(serializer),
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

impl Serialize for Issue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        extensible::merge_known(&self.fields, &self.extra)
            .map_err(ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Issue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let (fields, extra) = extensible::decode::<IssueFields>(raw).map_err(de::Error::custom)?;
        Ok(Self { fields, extra })
    }
}

/// A custom field value on an issue or project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    /// The custom field definition ID.
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the field holds a list of values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    /// A string, or an array of strings for multi-value fields.
    #[serde(default)]
    pub value: Value,
}

impl CustomField {
    /// A value to send for custom field `id`.
    pub fn value(id: u32, value: impl Into<Value>) -> Self {
        Self {
            id,
            name: None,
            description: None,
            multiple: None,
            value: value.into(),
        }
    }
}

/// A history entry on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: u32,
    #[serde(default)]
    pub user: Option<IdName>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub details: Vec<JournalDetails>,
}

/// One attribute change recorded in a journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalDetails {
    /// `attr`, `cf`, `attachment` or `relation`.
    pub property: String,
    pub name: String,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
}

/// Payload for creating or updating an issue.
///
/// Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_version_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_issue_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watcher_user_ids: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "finite_hours")]
    pub estimated_hours: Option<f64>,
    /// Notes added as a journal entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Previously uploaded files to attach.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploads: Vec<Upload>,
}

impl IssueDraft {
    /// The minimum Redmine needs to create an issue.
    pub fn new(project_id: u32, tracker_id: u32, subject: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id),
            tracker_id: Some(tracker_id),
            subject: Some(subject.into()),
            ..Default::default()
        }
    }
}

/// Criteria for listing issues.
///
/// Values use Redmine's filter syntax, e.g. `status_id = "*"` for all
/// statuses or `updated_on = ">=2024-01-01"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub project_id: Option<String>,
    pub subproject_id: Option<String>,
    pub tracker_id: Option<String>,
    pub status_id: Option<String>,
    pub assigned_to_id: Option<String>,
    pub updated_on: Option<String>,
    /// Any other filter, e.g. `cf_12` or `sort`.
    pub extra_filters: BTreeMap<String, String>,
}

impl IssueFilter {
    /// Render the filter as query parameters.
    pub fn to_query(&self) -> Query {
        let mut query = Query::new();
        let named = [
            ("project_id", &self.project_id),
            ("subproject_id", &self.subproject_id),
            ("tracker_id", &self.tracker_id),
            ("status_id", &self.status_id),
            ("assigned_to_id", &self.assigned_to_id),
            ("updated_on", &self.updated_on),
        ];
        for (key, value) in named {
            if let Some(value) = value {
                query.push(key, value);
            }
        }
        for (key, value) in &self.extra_filters {
            query.push(key.as_str(), value);
        }
        query
    }
}

#[derive(Deserialize)]
struct IssueEnvelope {
    issue: Issue,
}

#[derive(Serialize)]
struct IssueRequest<'a, T: Serialize> {
    issue: &'a T,
}

impl RedmineClient {
    /// Get a single issue by ID.
    #[instrument(skip(self))]
    pub async fn issue(&self, id: u32) -> Result<Issue> {
        self.issue_with_args(id, Query::new()).await
    }

    /// Get a single issue with extra parameters, e.g. `include=journals`.
    #[instrument(skip(self))]
    pub async fn issue_with_args(&self, id: u32, args: Query) -> Result<Issue> {
        debug!("Fetching issue");

        let path = format!("/issues/{}.json", id);
        let envelope: IssueEnvelope = self
            .get_json(&path, &args, &format!("issue #{}", id))
            .await?;

        Ok(envelope.issue)
    }

    /// List all issues visible to the user (open ones, unless filtered).
    #[instrument(skip(self))]
    pub async fn issues(&self) -> Result<Vec<Issue>> {
        self.get_all("/issues.json", Query::new(), "issues").await
    }

    /// List the issues of a project (ID or identifier).
    #[instrument(skip(self))]
    pub async fn issues_of(&self, project_id: &str) -> Result<Vec<Issue>> {
        let query = Query::new().with("project_id", project_id);
        self.get_all("/issues.json", query, &format!("issues of project {}", project_id))
            .await
    }

    /// List the issues matched by a saved query.
    #[instrument(skip(self))]
    pub async fn issues_by_query(&self, query_id: u32) -> Result<Vec<Issue>> {
        let query = Query::new().with("query_id", query_id);
        self.get_all("/issues.json", query, &format!("saved query {}", query_id))
            .await
    }

    /// List the issues matching a filter.
    #[instrument(skip(self, filter))]
    pub async fn issues_by_filter(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        self.get_all("/issues.json", filter.to_query(), "filtered issues")
            .await
    }

    /// Create an issue, returning it as stored by the server.
    #[instrument(skip(self, draft))]
    pub async fn create_issue(&self, draft: &IssueDraft) -> Result<Issue> {
        let envelope: IssueEnvelope = self
            .post_json("/issues.json", &IssueRequest { issue: draft }, "new issue")
            .await?;

        info!(issue_id = envelope.issue.fields.id, "Created issue");
        Ok(envelope.issue)
    }

    /// Apply changes to an existing issue.
    #[instrument(skip(self, draft))]
    pub async fn update_issue(&self, id: u32, draft: &IssueDraft) -> Result<()> {
        let path = format!("/issues/{}.json", id);
        self.put_json(&path, &IssueRequest { issue: draft }, &format!("issue #{}", id))
            .await?;

        info!("Updated issue");
        Ok(())
    }

    /// Save a full issue record back, extra attributes included.
    ///
    /// An issue without a parent is sent with an empty `parent_issue_id`,
    /// which clears any parent on the server.
    #[instrument(skip(self, issue), fields(issue_id = issue.fields.id))]
    pub async fn save_issue(&self, issue: &Issue) -> Result<()> {
        let payload = issue.to_json()?;
        let id = issue.fields.id;
        let path = format!("/issues/{}.json", id);
        self.put_json(&path, &IssueRequest { issue: &payload }, &format!("issue #{}", id))
            .await?;

        info!("Saved issue");
        Ok(())
    }

    /// Delete an issue.
    #[instrument(skip(self))]
    pub async fn delete_issue(&self, id: u32) -> Result<()> {
        let path = format!("/issues/{}.json", id);
        self.delete(&path, &format!("issue #{}", id)).await?;

        info!("Deleted issue");
        Ok(())
    }
}
