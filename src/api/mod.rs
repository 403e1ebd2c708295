//! Redmine API client and types.
//!
//! This module provides the interface for communicating with the Redmine REST API.

pub mod auth;
mod client;
pub mod error;
pub mod extensible;
mod issues;
mod memberships;
pub mod pagination;
mod projects;
mod types;
mod uploads;

pub use auth::ApiKey;
pub use client::{Query, RedmineClient, DEFAULT_TIMEOUT_SECS};
pub use error::{ApiError, Result};
pub use extensible::{ExtensionBag, KnownSchema};
pub use issues::{
    CustomField, Issue, IssueDraft, IssueFields, IssueFilter, Journal, JournalDetails,
    PARENT_ISSUE_ID_KEY,
};
pub use memberships::{Membership, NewMembership};
pub use pagination::Page;
pub use projects::Project;
pub use types::{ErrorsEnvelope, Id, IdName};
pub use uploads::Upload;
