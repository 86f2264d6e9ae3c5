/*!
Générateurs de payloads SSAcity pour tests et démo

Tous les jeux de données sont déterministes : même `n`, mêmes poubelles.
*/

use chrono::{Duration, Utc};
use serde_json::{json, Value};

const LOCATIONS: [&str; 8] = [
    "Downtown",
    "Central Park",
    "Mall",
    "Harbor",
    "University",
    "Old Town",
    "Station",
    "Riverside",
];

const WASTE_TYPES: [&str; 4] = ["general", "recyclable", "organic", "hazardous"];

const ALERT_KINDS: [(&str, &str, &str); 4] = [
    ("overflow_risk", "critical", "Schedule immediate collection"),
    ("rapid_fill", "high", "Increase collection frequency"),
    ("low_battery", "medium", "Replace sensor battery"),
    ("sensor_drift", "low", "Recalibrate fill sensor"),
];

pub struct FixtureBuilder;

impl FixtureBuilder {
    pub fn bin(bin_id: &str, location: &str, fill_level: f64) -> Value {
        json!({
            "bin_id": bin_id,
            "location": location,
            "fill_level": fill_level,
            "waste_type": "general",
            "battery_level": 80,
            "status": "active",
            "last_emptied": Utc::now().to_rfc3339(),
            "temperature": 21.5
        })
    }

    pub fn alert(kind: &str, severity: &str, location: &str, action: &str) -> Value {
        json!({
            "type": kind,
            "severity": severity,
            "location": location,
            "recommended_action": action,
            "predicted_time": (Utc::now() + Duration::hours(2)).to_rfc3339(),
            "confidence": 0.87
        })
    }

    /// `n` poubelles réparties sur les quartiers, remplissage entre 5 et 99
    pub fn city_bins(n: usize) -> Value {
        let bins: Vec<Value> = (0..n)
            .map(|i| {
                let fill = 5 + (i * 37 + 11) % 95;
                let mut bin = Self::bin(
                    &format!("BIN-{:03}", i + 1),
                    LOCATIONS[i % LOCATIONS.len()],
                    fill as f64,
                );
                bin["waste_type"] = json!(WASTE_TYPES[i % WASTE_TYPES.len()]);
                bin["battery_level"] = json!(100 - (i * 13) % 90);
                if i % 7 == 6 {
                    bin["status"] = json!("maintenance");
                }
                bin
            })
            .collect();
        Value::Array(bins)
    }

    pub fn city_alerts(n: usize) -> Value {
        let alerts: Vec<Value> = (0..n)
            .map(|i| {
                let (kind, severity, action) = ALERT_KINDS[i % ALERT_KINDS.len()];
                Self::alert(kind, severity, LOCATIONS[(i * 3) % LOCATIONS.len()], action)
            })
            .collect();
        Value::Array(alerts)
    }

    /// KPI cohérents avec `bins` et `alerts`, champs des deux profils
    pub fn kpis_for(bins: &Value, alerts: &Value) -> Value {
        let fills: Vec<f64> = bins
            .as_array()
            .map(|b| b.iter().filter_map(|bin| bin["fill_level"].as_f64()).collect())
            .unwrap_or_default();
        let total = fills.len();
        let avg = if total == 0 {
            0.0
        } else {
            (fills.iter().sum::<f64>() / total as f64 * 10.0).round() / 10.0
        };
        let critical = fills.iter().filter(|f| **f > 85.0).count();
        let above_80 = fills.iter().filter(|f| **f > 80.0).count();
        let alert_count = alerts.as_array().map(Vec::len).unwrap_or(0);

        json!({
            "total_bins": total,
            "avg_fill": avg,
            "critical_bins": critical,
            "active_alerts": alert_count,
            "total_waste_collected_kg": 15420,
            "total_collections_today": 47,
            "avg_route_efficiency": 87.5,
            "bins_above_80": above_80,
            "collection_coverage": 92.3
        })
    }

    pub fn zones() -> Value {
        json!([
            {"name": "Downtown", "active_bins": 45, "smart_bin_count": 40, "avg_fill_level": 72.4, "priority_level": 3},
            {"name": "Central Park", "active_bins": 30, "smart_bin_count": 30, "avg_fill_level": 55.1, "priority_level": 2},
            {"name": "Harbor", "active_bins": 18, "smart_bin_count": 12, "avg_fill_level": 38.9, "priority_level": 1}
        ])
    }

    pub fn platform_metrics() -> Value {
        json!({
            "total_users": 12840,
            "active_users": 3921,
            "avg_separation_rate": 68.2,
            "total_rewards": 254300
        })
    }
}
