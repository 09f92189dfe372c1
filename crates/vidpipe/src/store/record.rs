//! The job status record shared by both stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::job_repo::JobRow;
use crate::error::StoreError;
use crate::status::JobStatus;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn parse_timestamp(s: &str, job_id: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("Job {}: failed to parse timestamp '{}': {}", job_id, s, e);
            Utc::now()
        })
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ─── StatusRecord ───────────────────────────────────────────────────────────

/// Status of one job as held by the cache and durable stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    /// Source media reference supplied at intake.
    pub source_path: String,
    pub status: JobStatus,
    /// Detection result, set when the job finishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure detail, set when the job fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusRecord {
    /// A freshly submitted job.
    pub fn received(id: impl Into<String>, source_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            source_path: source_path.into(),
            status: JobStatus::Received,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Applies a status update in place. Does not check the transition rule.
    pub fn apply(&mut self, update: &StatusUpdate) {
        let now = Utc::now();
        self.status = update.status;
        self.updated_at = now;
        if update.result.is_some() {
            self.result = update.result.clone();
        }
        if update.error.is_some() {
            self.error = update.error.clone();
        }
        if update.status.is_terminal() {
            self.completed_at = Some(now);
        }
    }

    /// Converts a database row, rejecting unknown statuses and invalid result JSON.
    pub fn from_job_row(row: &JobRow) -> Result<Self, StoreError> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|e| StoreError::Corrupt {
                id: row.id.clone(),
                reason: e.to_string(),
            })?;
        let result = row
            .result
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                id: row.id.clone(),
                reason: format!("invalid result JSON: {}", e),
            })?;

        Ok(Self {
            id: row.id.clone(),
            source_path: row.source_path.clone(),
            status,
            result,
            error: row.error.clone(),
            created_at: parse_timestamp(&row.created_at, &row.id),
            updated_at: parse_timestamp(&row.updated_at, &row.id),
            completed_at: row
                .completed_at
                .as_deref()
                .map(|s| parse_timestamp(s, &row.id)),
        })
    }

    pub fn to_job_row(&self) -> JobRow {
        JobRow {
            id: self.id.clone(),
            source_path: self.source_path.clone(),
            status: self.status.as_str().to_string(),
            result: self.result.as_ref().map(Value::to_string),
            error: self.error.clone(),
            created_at: format_timestamp(self.created_at),
            updated_at: format_timestamp(self.updated_at),
            completed_at: self.completed_at.map(format_timestamp),
        }
    }
}

// ─── StatusUpdate ───────────────────────────────────────────────────────────

/// A proposed status write.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: JobStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn to(status: JobStatus) -> Self {
        Self {
            status,
            result: None,
            error: None,
        }
    }

    pub fn finished(result: Value) -> Self {
        Self {
            status: JobStatus::Finished,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn stopped() -> Self {
        Self::to(JobStatus::Stopped)
    }
}
