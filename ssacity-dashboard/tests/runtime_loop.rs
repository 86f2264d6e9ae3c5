//! Main loop driven by a command channel

use serde_json::json;
use ssacity_dashboard::export::ExportDocument;
use ssacity_dashboard::runtime::{Command, Runtime};
use ssacity_dashboard::{ApiClient, ConnectionStatus, Dashboard, DashboardConfig, Profile};
use ssacity_devkit::{FixtureBuilder, StubEndpoint, TestHarness};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

#[tokio::test]
async fn test_loop_refreshes_exports_and_quits() {
    let harness = TestHarness::start().await.unwrap();
    let export_dir = tempfile::tempdir().unwrap();

    let mut config = DashboardConfig::default();
    config.api.base_url = harness.base_url();
    config.api.profile = Profile::Simple;
    config.refresh.interval_secs = 60;
    config.export.dir = export_dir.path().to_path_buf();

    let client = ApiClient::new(&config.api).unwrap();
    let (tx, rx) = mpsc::channel(8);
    let runtime = Runtime::new(Dashboard::new(config), client, Vec::new());
    let task = tokio::spawn(runtime.run(rx));

    // first tick fires at once
    assert!(harness.wait_for_hits(StubEndpoint::OperationalKpis, 1, 2000).await);
    sleep(Duration::from_millis(200)).await;

    tx.send(Command::Refresh).await.unwrap();
    assert!(harness.wait_for_hits(StubEndpoint::OperationalKpis, 2, 2000).await);
    sleep(Duration::from_millis(200)).await;

    tx.send(Command::Export).await.unwrap();
    tx.send(Command::Quit).await.unwrap();

    let dashboard = task.await.unwrap().unwrap();
    assert_eq!(dashboard.status(), ConnectionStatus::Connected);
    assert_eq!(dashboard.snapshot().bins.len(), 12);
    assert_eq!(harness.hits(StubEndpoint::ZoneAnalytics), 0);

    let exported: Vec<_> = std::fs::read_dir(export_dir.path()).unwrap().collect();
    assert_eq!(exported.len(), 1);
    let path = exported[0].as_ref().unwrap().path();
    let doc = ExportDocument::from_json(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(doc.snapshot, *dashboard.snapshot());
}

#[tokio::test]
async fn test_polling_continues_after_input_closes() {
    let harness = TestHarness::start().await.unwrap();
    let mut config = DashboardConfig::default();
    config.api.base_url = harness.base_url();
    config.refresh.interval_secs = 1;

    let client = ApiClient::new(&config.api).unwrap();
    let (tx, rx) = mpsc::channel::<Command>(1);
    drop(tx);

    let runtime = Runtime::new(Dashboard::new(config), client, std::io::sink());
    let task = tokio::spawn(runtime.run(rx));

    assert!(harness.wait_for_hits(StubEndpoint::SmartBins, 3, 4000).await);
    assert!(!task.is_finished());
    task.abort();
}

#[derive(Clone, Default)]
struct Screen(Arc<Mutex<Vec<u8>>>);

impl Screen {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Screen {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_manual_refresh_overlaps_slow_cycle() {
    let harness = TestHarness::start().await.unwrap();
    harness.slow(StubEndpoint::SmartBins, Duration::from_millis(1500));

    let mut config = DashboardConfig::default();
    config.api.base_url = harness.base_url();
    config.refresh.interval_secs = 60;
    config.refresh.clock_interval_ms = 100;

    let client = ApiClient::new(&config.api).unwrap();
    let screen = Screen::default();
    let (tx, rx) = mpsc::channel(8);
    let runtime = Runtime::new(Dashboard::new(config), client, screen.clone());
    let task = tokio::spawn(runtime.run(rx));

    // timer cycle is stuck on smart-bins; the manual one gets a fast, smaller answer
    assert!(harness.wait_for_hits(StubEndpoint::SmartBins, 1, 2000).await);
    harness.recover().set_payload(
        StubEndpoint::SmartBins,
        json!([FixtureBuilder::bin("BIN-500", "Harbor", 60.0), FixtureBuilder::bin("BIN-501", "Harbor", 20.0)]),
    );
    tx.send(Command::Refresh).await.unwrap();
    assert!(harness.wait_for_hits(StubEndpoint::SmartBins, 2, 2000).await);

    sleep(Duration::from_millis(400)).await;
    let during = screen.text();
    assert!(during.contains("== Smart Bins (2) =="));
    assert!(!during.contains("== Smart Bins (12) =="));
    // clock kept ticking while the timer cycle was in flight
    assert!(during.matches('\r').count() >= 3);

    sleep(Duration::from_millis(1500)).await;
    tx.send(Command::Quit).await.unwrap();
    let dashboard = task.await.unwrap().unwrap();

    // the slow cycle arrived last and was not cancelled
    assert!(screen.text().contains("== Smart Bins (12) =="));
    assert_eq!(dashboard.snapshot().bins.len(), 12);
    assert_eq!(dashboard.status(), ConnectionStatus::Connected);
    assert_eq!(harness.hits(StubEndpoint::SmartBins), 2);
}
