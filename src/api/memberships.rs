//! Project memberships: which users and groups hold which roles.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::client::{Query, RedmineClient};
use super::error::Result;
use super::types::IdName;

/// A user's (or group's) membership in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: u32,
    pub project: IdName,
    /// Set for user memberships.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<IdName>,
    /// Set for group memberships.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<IdName>,
    #[serde(default)]
    pub roles: Vec<IdName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<IdName>,
}

impl Membership {
    /// The member's display name, user or group.
    pub fn member_name(&self) -> &str {
        self.user
            .as_ref()
            .or(self.group.as_ref())
            .map(IdName::name)
            .unwrap_or_default()
    }
}

/// Payload for adding a member to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMembership {
    /// A user or group ID.
    pub user_id: u32,
    pub role_ids: Vec<u32>,
}

#[derive(Serialize)]
struct RoleUpdate<'a> {
    role_ids: &'a [u32],
}

#[derive(Deserialize)]
struct MembershipEnvelope {
    membership: Membership,
}

#[derive(Serialize)]
struct MembershipRequest<T: Serialize> {
    membership: T,
}

impl RedmineClient {
    /// Get a membership by ID.
    #[instrument(skip(self))]
    pub async fn membership(&self, id: u32) -> Result<Membership> {
        let path = format!("/memberships/{}.json", id);
        let envelope: MembershipEnvelope = self
            .get_json(&path, &Query::new(), &format!("membership #{}", id))
            .await?;
        Ok(envelope.membership)
    }

    /// List the memberships of a project (ID or identifier).
    #[instrument(skip(self))]
    pub async fn memberships(&self, project_id: &str) -> Result<Vec<Membership>> {
        let path = format!("/projects/{}/memberships.json", urlencoding::encode(project_id));
        self.get_all(&path, Query::new(), &format!("project {}", project_id))
            .await
    }

    /// Add a member to a project.
    #[instrument(skip(self, membership), fields(user_id = membership.user_id))]
    pub async fn create_membership(
        &self,
        project_id: &str,
        membership: &NewMembership,
    ) -> Result<Membership> {
        let path = format!("/projects/{}/memberships.json", urlencoding::encode(project_id));
        let envelope: MembershipEnvelope = self
            .post_json(
                &path,
                &MembershipRequest { membership },
                &format!("project {}", project_id),
            )
            .await?;

        info!(membership_id = envelope.membership.id, "Created membership");
        Ok(envelope.membership)
    }

    /// Replace the roles of a membership.
    #[instrument(skip(self))]
    pub async fn update_membership(&self, id: u32, role_ids: &[u32]) -> Result<()> {
        let path = format!("/memberships/{}.json", id);
        self.put_json(
            &path,
            &MembershipRequest {
                membership: RoleUpdate { role_ids },
            },
            &format!("membership #{}", id),
        )
        .await?;

        info!("Updated membership");
        Ok(())
    }

    /// Remove a membership.
    #[instrument(skip(self))]
    pub async fn delete_membership(&self, id: u32) -> Result<()> {
        let path = format!("/memberships/{}.json", id);
        self.delete(&path, &format!("membership #{}", id)).await?;

        info!("Deleted membership");
        Ok(())
    }
}
