//! redmine-client - a typed client for the Redmine REST API.
//!
//! ```no_run
//! use redmine_client::{IssueFilter, RedmineClient};
//!
//! # async fn demo() -> redmine_client::api::Result<()> {
//! let client = RedmineClient::with_credentials("https://redmine.example.com", "my-api-key")?;
//!
//! let mut issue = client.issue(42).await?;
//! issue.fields.subject = Some("Renamed".to_string());
//! client.save_issue(&issue).await?; // custom attributes are written back untouched
//!
//! let filter = IssueFilter {
//!     project_id: Some("web".to_string()),
//!     status_id: Some("*".to_string()),
//!     ..Default::default()
//! };
//! for issue in client.issues_by_filter(&filter).await? {
//!     println!("{}", issue.title());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod logging;

pub use api::{
    ApiError, CustomField, ExtensionBag, Id, IdName, Issue, IssueDraft, IssueFields, IssueFilter,
    Journal, Membership, NewMembership, Project, Query, RedmineClient, Upload,
};
pub use config::{Config, Profile, Settings};
