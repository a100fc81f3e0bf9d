//! Repository ingestion.
//!
//! Fetching and indexing repository content is not implemented. A request
//! is validated, logged, and, when the repository id names a stored source,
//! stamps that source's `last_sync_at`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::truthy;
use crate::orgs;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub repo_id: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub subdir: Option<String>,
    #[serde(default)]
    pub file_format: Option<String>,
}

/// A request that passed validation, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestJob {
    pub repo_id: String,
    pub url: String,
    pub branch: String,
    pub subdir: String,
    pub file_format: String,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
}

impl IngestRequest {
    /// Returns `None` when the repository id or URL is missing. Either may
    /// be any truthy JSON value.
    pub fn into_job(self) -> Option<IngestJob> {
        let repo_id = truthy(self.repo_id)?;
        let url = truthy(self.url)?;
        Some(IngestJob {
            repo_id,
            url,
            branch: self
                .branch
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "main".to_string()),
            subdir: self.subdir.unwrap_or_default(),
            file_format: self
                .file_format
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "md".to_string()),
        })
    }
}

pub async fn run_ingest(pool: &SqlitePool, job: &IngestJob) -> Result<IngestResponse> {
    tracing::info!(
        repo_id = %job.repo_id,
        url = %job.url,
        branch = %job.branch,
        subdir = %job.subdir,
        file_format = %job.file_format,
        "ingest requested"
    );

    if orgs::mark_synced(pool, &job.repo_id).await? {
        tracing::debug!(source_id = %job.repo_id, "source sync time updated");
    }

    Ok(IngestResponse {
        success: true,
        message: "Repository data ingested successfully".to_string(),
    })
}
