//! SSAcity Dashboard - smart-bin telemetry poller and renderer
//!
//! Polls the SSAcity REST backend on a fixed cadence and renders:
//! - Operational KPIs (server-supplied or derived client-side)
//! - Smart bins with fill-level bands, search and band filters
//! - Predictive alerts, zone analytics and platform metrics
//! - JSON export of the current snapshot

pub mod bands;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod filter;
pub mod kpis;
pub mod models;
pub mod render;
pub mod runtime;

pub use client::{ApiClient, Endpoint, FetchError};
pub use config::{DashboardConfig, FailurePolicy, Profile};
pub use dashboard::{ConnectionStatus, Dashboard, RefreshOutcome};
pub use models::{Alert, Bin, MetricMap, Severity, Snapshot, Zone};
