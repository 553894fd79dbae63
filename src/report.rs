//! Report Viewer
//!
//! Fetches the backend's generated analysis report. Copy and download act
//! on whatever text is currently displayed and never re-fetch, so what the
//! user saves is exactly what they were shown.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::api::AssistantApi;
use crate::error::{ReportError, Result};

pub const GENERATING_PLACEHOLDER: &str = "Generating report...";
pub const REPORT_ERROR: &str =
    "Error generating the report. Check that the backend is running with observability enabled.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportDisplay {
    /// Viewer not opened yet
    #[default]
    Closed,
    Generating,
    Ready(String),
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct ReportViewer {
    display: ReportDisplay,
}

impl ReportViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display(&self) -> &ReportDisplay {
        &self.display
    }

    /// Text currently on screen
    pub fn displayed_text(&self) -> &str {
        match &self.display {
            ReportDisplay::Closed => "",
            ReportDisplay::Generating => GENERATING_PLACEHOLDER,
            ReportDisplay::Ready(text) => text,
            ReportDisplay::Failed => REPORT_ERROR,
        }
    }

    /// Show the placeholder while the report is generated
    pub fn begin(&mut self) {
        self.display = ReportDisplay::Generating;
    }

    /// Swap in the fetched report verbatim, or the fixed error string
    pub fn finish(&mut self, outcome: Result<String>) {
        self.display = match outcome {
            Ok(report) => ReportDisplay::Ready(report),
            Err(err) => {
                tracing::warn!("Report generation failed: {}", err);
                ReportDisplay::Failed
            }
        };
    }

    pub async fn open(&mut self, api: &dyn AssistantApi) {
        self.begin();
        let outcome = api.generate_report().await;
        self.finish(outcome);
    }

    /// Text for the clipboard. `None` until something other than the
    /// placeholder is displayed.
    pub fn copy_text(&self) -> Option<&str> {
        match self.display {
            ReportDisplay::Closed | ReportDisplay::Generating => None,
            ReportDisplay::Ready(_) | ReportDisplay::Failed => Some(self.displayed_text()),
        }
    }

    /// Write the displayed text to `grozy_report_<timestamp>.txt` in `dir`
    pub fn download(&self, dir: &Path) -> std::result::Result<PathBuf, ReportError> {
        self.download_at(dir, Local::now())
    }

    pub fn download_at(
        &self,
        dir: &Path,
        at: DateTime<Local>,
    ) -> std::result::Result<PathBuf, ReportError> {
        let text = self.copy_text().ok_or(ReportError::NothingDisplayed)?;
        let path = dir.join(report_file_name(at));
        std::fs::write(&path, text).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Report saved to {}", path.display());
        Ok(path)
    }
}

pub fn report_file_name(at: DateTime<Local>) -> String {
    format!("grozy_report_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use chrono::TimeZone;

    #[test]
    fn test_placeholder_then_report() {
        let mut viewer = ReportViewer::new();
        assert_eq!(viewer.copy_text(), None);
        viewer.begin();
        assert_eq!(viewer.displayed_text(), GENERATING_PLACEHOLDER);
        assert_eq!(viewer.copy_text(), None);
        viewer.finish(Ok("REPORTE\n1. RESUMEN".to_string()));
        assert_eq!(viewer.copy_text(), Some("REPORTE\n1. RESUMEN"));
    }

    #[test]
    fn test_failure_shows_fixed_error() {
        let mut viewer = ReportViewer::new();
        viewer.begin();
        viewer.finish(Err(ClientError::transport("/api/report/generate", "down")));
        assert_eq!(viewer.displayed_text(), REPORT_ERROR);
    }

    #[test]
    fn test_file_name() {
        let at = Local.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(report_file_name(at), "grozy_report_20250301_090507.txt");
    }

    #[test]
    fn test_download_requires_content() {
        let viewer = ReportViewer::new();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            viewer.download(dir.path()),
            Err(ReportError::NothingDisplayed)
        ));
    }
}
