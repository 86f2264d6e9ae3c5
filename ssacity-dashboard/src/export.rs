//! Snapshot export: pretty JSON report with a capture timestamp

use crate::models::Snapshot;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// RFC 3339, UTC
    pub timestamp: DateTime<Utc>,
    pub snapshot: Snapshot,
}

impl ExportDocument {
    pub fn capture(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: Utc::now(),
            snapshot: snapshot.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize export document")
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid export document")
    }

    /// `ssacity-report-YYYY-MM-DD.json`
    pub fn file_name(date: NaiveDate) -> String {
        format!("ssacity-report-{}.json", date.format("%Y-%m-%d"))
    }

    /// Write into `dir` (created if missing); same-day exports overwrite.
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create export dir {}", dir.display()))?;

        let path = dir.join(Self::file_name(self.timestamp.date_naive()));
        tokio::fs::write(&path, self.to_json()?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Exported snapshot to {}", path.display());
        Ok(path)
    }
}
