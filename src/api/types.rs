//! Shared Redmine API types.
//!
//! These are the small pieces every resource uses: reference stubs linking
//! one entity to another, and the error envelope returned on failures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to another entity: its ID and, usually, its display name.
///
/// Used for projects, trackers, statuses, priorities, users, versions,
/// categories, roles and groups embedded in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdName {
    /// The referenced entity's ID.
    pub id: u32,
    /// The referenced entity's display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IdName {
    /// Create a reference with both ID and name.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }

    /// Create a reference carrying only an ID.
    pub fn id_only(id: u32) -> Self {
        Self { id, name: None }
    }

    /// The display name, or an empty string if the server omitted it.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for IdName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "#{}", self.id),
        }
    }
}

/// A bare ID reference (Redmine sends the parent issue this way).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Id {
    /// The referenced entity's ID.
    pub id: u32,
}

impl Id {
    /// Create an ID reference.
    pub fn new(id: u32) -> Self {
        Self { id }
    }
}

/// Error body returned by Redmine on failed mutations.
///
/// `{ "errors": ["Subject can't be blank", ...] }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorsEnvelope {
    /// The validation or failure messages.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ErrorsEnvelope {
    /// All messages joined with newlines, or `None` when there are none.
    pub fn joined(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join("\n"))
        }
    }
}
