//! Telemetry poller state
//!
//! `Dashboard` owns the current snapshot, the connection status and the view
//! settings. A refresh cycle is split in three so the owning loop never blocks
//! on the network: `begin_cycle` flips the status to loading, `fetch_snapshot`
//! runs anywhere (usually a spawned task), `apply` commits the outcome.

use crate::client::{ApiClient, FetchError};
use crate::config::{DashboardConfig, FailurePolicy, Profile};
use crate::filter::BinFilter;
use crate::models::Snapshot;
use crate::render::{self, Renderer, Tab};
use chrono::{DateTime, Local, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Loading,
    Connected,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEvent {
    Started,
    Succeeded,
    Failed,
}

impl ConnectionStatus {
    /// Every state moves to loading when a cycle starts; a finished cycle
    /// decides connected/error whatever state an overlapping cycle left.
    pub fn transition(self, event: CycleEvent) -> ConnectionStatus {
        match event {
            CycleEvent::Started => ConnectionStatus::Loading,
            CycleEvent::Succeeded => ConnectionStatus::Connected,
            CycleEvent::Failed => ConnectionStatus::Error,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Loading => "Loading...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error => "Connection failed",
        }
    }

    pub fn dot(&self) -> char {
        match self {
            ConnectionStatus::Loading => '◌',
            ConnectionStatus::Connected => '●',
            ConnectionStatus::Error => '✖',
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.dot(), self.label())
    }
}

/// Result of one fetch cycle, tagged with the cycle that produced it.
#[derive(Debug)]
pub struct CycleResult {
    pub cycle: u64,
    pub outcome: Result<Snapshot, FetchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    /// Failed, previous snapshot kept
    Retained,
    /// Failed, demo dataset substituted
    FellBack,
}

/// Fetch every endpoint the profile requires, concurrently.
/// Returns only when all succeeded, or on the first failure.
pub async fn fetch_snapshot(client: &ApiClient, profile: Profile) -> Result<Snapshot, FetchError> {
    match profile {
        Profile::Simple => {
            let (bins, alerts, kpis) = tokio::try_join!(
                client.smart_bins(),
                client.predictive_alerts(),
                client.operational_kpis()
            )?;
            Ok(Snapshot {
                bins,
                alerts,
                kpis,
                zones: None,
                platform_metrics: None,
            })
        }
        Profile::Full => {
            let (bins, alerts, kpis, zones, platform) = tokio::try_join!(
                client.smart_bins(),
                client.predictive_alerts(),
                client.operational_kpis(),
                client.zone_analytics(),
                client.platform_metrics()
            )?;
            Ok(Snapshot {
                bins,
                alerts,
                kpis,
                zones: Some(zones),
                platform_metrics: Some(platform),
            })
        }
    }
}

pub struct Dashboard {
    config: DashboardConfig,
    renderer: Renderer,
    snapshot: Arc<Snapshot>,
    status: ConnectionStatus,
    last_updated: Option<DateTime<Utc>>,
    last_error: Option<String>,
    filter: BinFilter,
    tab: Tab,
    next_cycle: u64,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        let renderer = Renderer::from_config(&config);
        Self {
            config,
            renderer,
            snapshot: Arc::new(Snapshot::default()),
            status: ConnectionStatus::Loading,
            last_updated: None,
            last_error: None,
            filter: BinFilter::All,
            tab: Tab::Overview,
            next_cycle: 1,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn filter(&self) -> &BinFilter {
        &self.filter
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    /// Start a cycle: status goes to loading. Returns the cycle number.
    pub fn begin_cycle(&mut self) -> u64 {
        let cycle = self.next_cycle;
        self.next_cycle += 1;
        self.status = self.status.transition(CycleEvent::Started);
        cycle
    }

    /// Commit a finished cycle. Results apply in arrival order.
    pub fn apply(&mut self, result: CycleResult) -> RefreshOutcome {
        match result.outcome {
            Ok(snapshot) => {
                info!(
                    "Cycle {} committed: {} bins, {} alerts, {} KPIs",
                    result.cycle,
                    snapshot.bins.len(),
                    snapshot.alerts.len(),
                    snapshot.kpis.len()
                );
                self.snapshot = Arc::new(snapshot);
                self.status = self.status.transition(CycleEvent::Succeeded);
                self.last_updated = Some(Utc::now());
                self.last_error = None;
                RefreshOutcome::Updated
            }
            Err(e) => {
                warn!("Cycle {} failed: {}", result.cycle, e);
                self.status = self.status.transition(CycleEvent::Failed);
                self.last_error = Some(e.to_string());
                match self.config.refresh.on_failure {
                    FailurePolicy::Retain => RefreshOutcome::Retained,
                    FailurePolicy::Fallback => {
                        self.snapshot = Arc::new(Snapshot::fallback());
                        RefreshOutcome::FellBack
                    }
                }
            }
        }
    }

    /// Whole cycle inline; the runtime splits it across a task instead.
    pub async fn refresh(&mut self, client: &ApiClient) -> RefreshOutcome {
        let cycle = self.begin_cycle();
        let outcome = fetch_snapshot(client, self.config.api.profile).await;
        self.apply(CycleResult { cycle, outcome })
    }

    pub fn set_filter(&mut self, filter: BinFilter) {
        self.filter = filter;
        if self.filter.is_active() {
            self.tab = Tab::Bins;
        }
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn bin_details(&self, bin_id: &str) -> Option<String> {
        self.snapshot.find_bin(bin_id).map(render::bin_details)
    }

    pub fn status_line(&self, now: DateTime<Local>) -> String {
        let updated = self
            .last_updated
            .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        format!("{} | Updated {} | {}", self.status, updated, now.format("%H:%M:%S"))
    }

    /// Current tab as text. The bins area becomes the error panel while the
    /// status is error under the retain policy.
    pub fn screen(&self) -> String {
        let view = self.renderer.render(&self.snapshot);
        let mut out = format!("--- SSAcity Dashboard :: {} ---\n", self.tab.name());

        let show_error = self.status == ConnectionStatus::Error
            && self.config.refresh.on_failure == FailurePolicy::Retain;
        let error_panel = || render::error_panel(self.last_error.as_deref().unwrap_or("fetch failed"));

        match self.tab {
            Tab::Overview => {
                out.push_str(&view.kpi_panel());
                if show_error {
                    out.push_str(&error_panel());
                } else {
                    out.push_str(&view.bins_panel());
                }
                out.push_str(&view.recent_alerts_panel());
            }
            Tab::Bins => {
                if show_error {
                    out.push_str(&error_panel());
                } else if self.filter.is_active() {
                    out.push_str(&self.renderer.filtered_panel(&self.snapshot, &self.filter));
                } else {
                    out.push_str(&view.bins_panel());
                }
            }
            other => out.push_str(&view.tab(other)),
        }
        out
    }
}
