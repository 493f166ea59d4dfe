//! File-backed report storage

use crate::atomic_file::write_json_atomic;
use async_trait::async_trait;
use autobake_core::{Error, ReportSink, Result};
use std::path::Path;

/// Writes reports as pretty-printed JSON files, replacing them atomically
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileReportSink;

#[async_trait]
impl ReportSink for JsonFileReportSink {
    async fn persist(&self, path: &Path, report: &serde_json::Value) -> Result<()> {
        let path = path.to_path_buf();
        let report = report.clone();
        let target = path.clone();

        tokio::task::spawn_blocking(move || write_json_atomic(&target, &report))
            .await
            .map_err(|e| Error::configuration(format!("report writer panicked: {e}")))??;

        tracing::info!(path = %path.display(), "report written");
        Ok(())
    }
}
