//! Redmine projects.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::client::{Query, RedmineClient};
use super::error::Result;
use super::issues::CustomField;
use super::types::IdName;

/// A Redmine project.
///
/// The same type is used to read projects and to create/update them; fields
/// the server computes (`created_on`, `parent`) are ignored on write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub id: u32,
    /// The parent project, as returned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<IdName>,
    pub name: String,
    /// The URL slug (e.g. "web-site").
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    /// The parent project to set on create/update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_members: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracker_ids: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_module_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
    /// Custom field values to set, keyed by custom field ID.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_field_values: BTreeMap<String, String>,
}

fn is_zero(id: &u32) -> bool {
    *id == 0
}

impl Project {
    /// A new project with the required name and identifier.
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.identifier)
    }
}

#[derive(Deserialize)]
struct ProjectEnvelope {
    project: Project,
}

#[derive(Serialize)]
struct ProjectRequest<'a> {
    project: &'a Project,
}

impl RedmineClient {
    /// Get a project by numeric ID or identifier.
    #[instrument(skip(self))]
    pub async fn project(&self, id: &str) -> Result<Project> {
        debug!("Fetching project");

        let path = format!("/projects/{}.json", urlencoding::encode(id));
        let envelope: ProjectEnvelope = self
            .get_json(&path, &Query::new(), &format!("project {}", id))
            .await?;
        Ok(envelope.project)
    }

    /// List all projects visible to the user.
    #[instrument(skip(self))]
    pub async fn projects(&self) -> Result<Vec<Project>> {
        self.get_all("/projects.json", Query::new(), "projects").await
    }

    /// List projects matching arbitrary filters (e.g. `status=1`).
    #[instrument(skip(self))]
    pub async fn projects_by_filter(&self, filters: &BTreeMap<String, String>) -> Result<Vec<Project>> {
        let query: Query = filters.iter().map(|(k, v)| (k.as_str(), v)).collect();
        self.get_all("/projects.json", query, "filtered projects").await
    }

    /// Create a project.
    #[instrument(skip(self, project), fields(identifier = %project.identifier))]
    pub async fn create_project(&self, project: &Project) -> Result<Project> {
        let envelope: ProjectEnvelope = self
            .post_json("/projects.json", &ProjectRequest { project }, "new project")
            .await?;

        info!(project_id = envelope.project.id, "Created project");
        Ok(envelope.project)
    }

    /// Update a project, addressed by its numeric ID.
    #[instrument(skip(self, project), fields(project_id = project.id))]
    pub async fn update_project(&self, project: &Project) -> Result<()> {
        let path = format!("/projects/{}.json", project.id);
        self.put_json(
            &path,
            &ProjectRequest { project },
            &format!("project {}", project.id),
        )
        .await?;

        info!("Updated project");
        Ok(())
    }

    /// Delete a project by numeric ID or identifier.
    #[instrument(skip(self))]
    pub async fn delete_project(&self, id: &str) -> Result<()> {
        let path = format!("/projects/{}.json", urlencoding::encode(id));
        self.delete(&path, &format!("project {}", id)).await?;

        info!("Deleted project");
        Ok(())
    }
}
