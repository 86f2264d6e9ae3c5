//! KPI cards and the client-side formulas used when the server omits a value

use crate::config::Profile;
use crate::models::{Bin, Snapshot};
use serde::{Deserialize, Serialize};

/// Mean fill level rounded to `decimals` places, 0 for an empty list.
pub fn average_fill(bins: &[Bin], decimals: u32) -> f64 {
    if bins.is_empty() {
        return 0.0;
    }
    let total: f64 = bins.iter().map(|b| b.fill_level).sum();
    round_to(total / bins.len() as f64, decimals)
}

/// Bins whose fill level is strictly above `threshold`.
pub fn count_above(bins: &[Bin], threshold: f64) -> usize {
    bins.iter().filter(|b| b.fill_level > threshold).count()
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// How to compute a KPI the server did not send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiFallback {
    BinCount,
    AverageFill,
    CriticalCount,
    AlertCount,
    #[default]
    Zero,
}

/// One KPI card: which server key it shows and how to derive it otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSpec {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub fallback: KpiFallback,
    /// Thousands separators (large counters such as kg or users)
    #[serde(default)]
    pub grouped: bool,
}

impl KpiSpec {
    fn new(key: &str, label: &str, unit: &str, caption: &str, fallback: KpiFallback) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            unit: unit.to_string(),
            caption: caption.to_string(),
            fallback,
            grouped: false,
        }
    }

    fn grouped(mut self) -> Self {
        self.grouped = true;
        self
    }

    pub fn defaults_for(profile: Profile) -> Vec<KpiSpec> {
        match profile {
            Profile::Simple => vec![
                KpiSpec::new("total_bins", "Total Bins", "", "", KpiFallback::BinCount),
                KpiSpec::new("avg_fill", "Avg Fill", "%", "", KpiFallback::AverageFill),
                KpiSpec::new("critical_bins", "Critical Bins", "", "", KpiFallback::CriticalCount),
                KpiSpec::new("active_alerts", "Active Alerts", "", "", KpiFallback::AlertCount),
            ],
            Profile::Full => vec![
                KpiSpec::new("total_bins", "Smart Bins", "", "Active", KpiFallback::BinCount),
                KpiSpec::new("total_waste_collected_kg", "Waste Collected", " kg", "Today", KpiFallback::Zero)
                    .grouped(),
                KpiSpec::new("total_collections_today", "Collections", "", "Completed", KpiFallback::Zero),
                KpiSpec::new("avg_route_efficiency", "Efficiency", "%", "Route Opt.", KpiFallback::Zero),
                KpiSpec::new("bins_above_80", "Critical Bins", "", "Above threshold", KpiFallback::CriticalCount),
                KpiSpec::new("collection_coverage", "Coverage", "%", "City Wide", KpiFallback::Zero),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiSource {
    Server,
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpiValue {
    pub value: f64,
    pub source: KpiSource,
}

/// Thresholds the derived formulas need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpiContext {
    pub critical_threshold: f64,
    pub avg_fill_decimals: u32,
}

pub fn resolve(spec: &KpiSpec, snapshot: &Snapshot, ctx: &KpiContext) -> KpiValue {
    if let Some(value) = snapshot.kpis.number(&spec.key) {
        return KpiValue { value, source: KpiSource::Server };
    }

    let value = match spec.fallback {
        KpiFallback::BinCount => snapshot.bins.len() as f64,
        KpiFallback::AverageFill => average_fill(&snapshot.bins, ctx.avg_fill_decimals),
        KpiFallback::CriticalCount => count_above(&snapshot.bins, ctx.critical_threshold) as f64,
        KpiFallback::AlertCount => snapshot.alerts.len() as f64,
        KpiFallback::Zero => 0.0,
    };
    KpiValue { value, source: KpiSource::Derived }
}
