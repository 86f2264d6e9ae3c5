//! Telemetry records returned by the SSAcity REST backend
//!
//! Records are passthrough JSON: the fields the dashboard reads are typed,
//! everything else lands in `extra` so an export reproduces what the server sent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Smart bin sensor reading (GET /api/v2/smart-bins)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub bin_id: String,
    #[serde(default)]
    pub location: String,
    pub fill_level: f64,
    #[serde(default = "default_waste_type")]
    pub waste_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>,
    #[serde(default = "default_bin_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_emptied: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_waste_type() -> String {
    "mixed".to_string()
}

fn default_bin_status() -> String {
    "active".to_string()
}

impl Bin {
    pub fn new(bin_id: impl Into<String>, location: impl Into<String>, fill_level: f64) -> Self {
        Self {
            bin_id: bin_id.into(),
            location: location.into(),
            fill_level,
            waste_type: default_waste_type(),
            battery_level: None,
            status: default_bin_status(),
            last_emptied: None,
            temperature: None,
            extra: Map::new(),
        }
    }

    pub fn with_waste_type(mut self, waste_type: impl Into<String>) -> Self {
        self.waste_type = waste_type.into();
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

/// Alert urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Lenient parse: anything unrecognised is treated as medium.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Severity::Low,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Medium,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Missing, null and unknown severities all collapse to the default.
fn deserialize_severity<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(Severity::parse_lenient).unwrap_or_default())
}

/// Predictive alert (GET /api/v2/predictive-alerts)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type", default)]
    pub category: String,
    #[serde(default, deserialize_with = "deserialize_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub recommended_action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Alert {
    pub fn new(category: impl Into<String>, severity: Severity, location: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            severity,
            location: location.into(),
            recommended_action: String::new(),
            predicted_time: None,
            confidence: None,
            extra: Map::new(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.recommended_action = action.into();
        self
    }

    /// "overflow_prediction" -> "OVERFLOW PREDICTION", empty -> "ALERT"
    pub fn title(&self) -> String {
        if self.category.trim().is_empty() {
            return "ALERT".to_string();
        }
        self.category.replace('_', " ").to_uppercase()
    }
}

/// City zone analytics row (GET /api/v2/zone-analytics)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_bins: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_bin_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_fill_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_level: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ordered JSON object of named metrics (KPIs, platform metrics)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricMap(Map<String, Value>);

impl MetricMap {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Numeric value of `key`; numeric strings are accepted too.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for MetricMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Everything one successful refresh cycle returned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub bins: Vec<Bin>,
    pub alerts: Vec<Alert>,
    pub kpis: MetricMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<Zone>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_metrics: Option<MetricMap>,
}

impl Snapshot {
    /// Fixed demo dataset shown when the backend is unreachable and the
    /// failure policy is `fallback`.
    pub fn fallback() -> Self {
        let bins = vec![
            Bin::new("BIN-001", "Downtown", 75.0).with_waste_type("General"),
            Bin::new("BIN-002", "Park", 90.0).with_waste_type("Recyclable"),
            Bin::new("BIN-003", "Mall", 45.0).with_waste_type("Organic"),
        ];
        let alerts = vec![Alert::new("overflow", Severity::Critical, "Downtown").with_action("Collect now")];

        let mut kpis = MetricMap::new();
        kpis.insert("total_bins", 3);
        kpis.insert("avg_fill", 70);
        kpis.insert("critical_bins", 1);
        kpis.insert("active_alerts", 1);

        Self {
            bins,
            alerts,
            kpis,
            zones: None,
            platform_metrics: None,
        }
    }

    pub fn find_bin(&self, bin_id: &str) -> Option<&Bin> {
        self.bins.iter().find(|b| b.bin_id.eq_ignore_ascii_case(bin_id))
    }
}
