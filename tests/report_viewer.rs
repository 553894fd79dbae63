//! Report Viewer Integration Tests
//!
//! Open/copy/download against the fake backend; downloads go to a
//! temporary directory.

mod helpers;

use std::sync::atomic::Ordering;

use chrono::{Local, TimeZone};

use grozy_console::report::{ReportDisplay, REPORT_ERROR};
use grozy_console::{ReportError, ReportViewer};

use helpers::{refused, FakeBackend};

#[tokio::test]
async fn test_open_shows_report_verbatim() {
    let api = FakeBackend::new();
    api.set_report(Ok("REPORTE\n\n1. RESUMEN\n   Total: 10".to_string()));
    let mut viewer = ReportViewer::new();

    viewer.open(&api).await;

    assert_eq!(
        viewer.display(),
        &ReportDisplay::Ready("REPORTE\n\n1. RESUMEN\n   Total: 10".to_string())
    );
    assert_eq!(viewer.copy_text(), Some("REPORTE\n\n1. RESUMEN\n   Total: 10"));
}

#[tokio::test]
async fn test_open_failure_shows_fixed_error() {
    let api = FakeBackend::new();
    api.set_report(Err(refused("/api/report/generate")));
    let mut viewer = ReportViewer::new();

    viewer.open(&api).await;

    assert_eq!(viewer.display(), &ReportDisplay::Failed);
    assert_eq!(viewer.displayed_text(), REPORT_ERROR);
}

#[tokio::test]
async fn test_download_writes_displayed_text_without_refetch() {
    let api = FakeBackend::new();
    api.set_report(Ok("primer reporte".to_string()));
    let mut viewer = ReportViewer::new();
    viewer.open(&api).await;

    // Backend content changes after the report was shown
    api.set_report(Ok("otro reporte".to_string()));

    let dir = tempfile::tempdir().unwrap();
    let at = Local.with_ymd_and_hms(2025, 3, 1, 14, 30, 5).unwrap();
    let path = viewer.download_at(dir.path(), at).unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "grozy_report_20250301_143005.txt"
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "primer reporte");
    assert_eq!(viewer.copy_text(), Some("primer reporte"));
    assert_eq!(api.report_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_placeholder_cannot_be_saved() {
    let mut viewer = ReportViewer::new();
    viewer.begin();
    let dir = tempfile::tempdir().unwrap();

    assert!(viewer.copy_text().is_none());
    assert!(matches!(
        viewer.download(dir.path()),
        Err(ReportError::NothingDisplayed)
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_download_into_missing_dir_reports_path() {
    let api = FakeBackend::new();
    let mut viewer = ReportViewer::new();
    viewer.open(&api).await;

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no_existe");
    match viewer.download(&missing) {
        Err(ReportError::Io { path, .. }) => assert!(path.starts_with(&missing)),
        other => panic!("expected Io error, got {other:?}"),
    }
}
