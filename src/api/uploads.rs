//! File uploads.
//!
//! Redmine attaches files in two steps: the raw content is POSTed to
//! `/uploads.json`, which answers with a token; the token is then sent in the
//! `uploads` list of an issue create/update.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::client::{Query, RedmineClient};
use super::error::Result;

/// An uploaded file, referenced by its token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    /// Opaque reference to the uploaded content.
    pub token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,
}

impl Upload {
    /// Set the attachment name and MIME type used when attaching the upload.
    pub fn named(mut self, filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.filename = filename.into();
        self.content_type = content_type.into();
        self
    }
}

#[derive(Deserialize)]
struct UploadEnvelope {
    upload: Upload,
}

impl RedmineClient {
    /// Upload a local file.
    ///
    /// The returned upload carries the file name; the content type is left for
    /// the caller to set.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<Upload> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        let mut upload = self.upload_bytes(content, filename.as_deref()).await?;
        if upload.filename.is_empty() {
            if let Some(filename) = filename {
                upload.filename = filename;
            }
        }
        Ok(upload)
    }

    /// Upload raw content.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn upload_bytes(&self, content: Vec<u8>, filename: Option<&str>) -> Result<Upload> {
        let mut query = Query::new();
        if let Some(filename) = filename {
            query.push("filename", filename);
        }

        let envelope: UploadEnvelope = self
            .post_bytes("/uploads.json", &query, content, "upload")
            .await?;

        info!("Uploaded file");
        Ok(envelope.upload)
    }
}
