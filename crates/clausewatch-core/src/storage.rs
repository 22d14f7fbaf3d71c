use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::finding::ConsolidatedReport;

const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(Uuid);

impl ReportId {
    /// Time-ordered, so ids sort by creation.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ReportId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub owner_id: String,
    /// Opening of the analysed text, for listings
    pub preview: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ReportMetadata {
    pub fn new(owner_id: impl Into<String>, document_text: &str) -> Self {
        Self {
            owner_id: owner_id.into(),
            preview: preview(document_text),
            created_at: Utc::now(),
            source_document_id: None,
            filename: None,
        }
    }

    #[must_use]
    pub fn with_source_document(mut self, id: impl Into<String>) -> Self {
        self.source_document_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// First 500 characters of `text`, with an ellipsis when it was cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: ReportId,
    pub report: ConsolidatedReport,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Report not found: {0}")]
    NotFound(ReportId),
    #[error("Report {0} belongs to another owner")]
    Forbidden(ReportId),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for finished reports. Reads are scoped to the owner that
/// saved the report.
#[async_trait::async_trait]
pub trait ReportStore: Send + Sync {
    async fn save(&self, report: ConsolidatedReport, metadata: ReportMetadata) -> StoreResult<ReportId>;

    async fn fetch(&self, id: ReportId, owner_id: &str) -> StoreResult<StoredReport>;

    /// The owner's reports, newest first.
    async fn list(&self, owner_id: &str) -> StoreResult<Vec<StoredReport>>;
}

/// In-process store, used by the CLI and tests.
#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<HashMap<ReportId, StoredReport>>,
}

impl MemoryReportStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ReportStore for MemoryReportStore {
    async fn save(&self, report: ConsolidatedReport, metadata: ReportMetadata) -> StoreResult<ReportId> {
        let id = ReportId::new();
        tracing::debug!(report_id = %id, owner = %metadata.owner_id, "report saved");
        self.reports.write().await.insert(
            id,
            StoredReport {
                id,
                report,
                metadata,
            },
        );
        Ok(id)
    }

    async fn fetch(&self, id: ReportId, owner_id: &str) -> StoreResult<StoredReport> {
        let reports = self.reports.read().await;
        let stored = reports.get(&id).ok_or(StoreError::NotFound(id))?;
        if stored.metadata.owner_id != owner_id {
            return Err(StoreError::Forbidden(id));
        }
        Ok(stored.clone())
    }

    async fn list(&self, owner_id: &str) -> StoreResult<Vec<StoredReport>> {
        let reports = self.reports.read().await;
        let mut owned: Vec<StoredReport> = reports
            .values()
            .filter(|r| r.metadata.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(owned)
    }
}
