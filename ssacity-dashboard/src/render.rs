//! Snapshot -> view model -> text
//!
//! `Renderer::render` is pure: the same snapshot always yields the same
//! `DashboardView`, and the text panels are plain functions of that view.

use crate::bands::{FillBand, FillBreakpoints};
use crate::config::DashboardConfig;
use crate::filter::BinFilter;
use crate::kpis::{self, KpiContext, KpiSource, KpiSpec};
use crate::models::{Alert, Bin, MetricMap, Severity, Snapshot, Zone};
use chrono::{DateTime, Local, NaiveDateTime};
use std::fmt::{self, Write as _};
use std::str::FromStr;

const GAUGE_WIDTH: usize = 10;

/// Dashboard tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Bins,
    Alerts,
    Analytics,
}

impl Tab {
    pub fn name(&self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Bins => "Smart Bins",
            Tab::Alerts => "Alerts",
            Tab::Analytics => "Analytics",
        }
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" | "home" => Ok(Tab::Overview),
            "bins" => Ok(Tab::Bins),
            "alerts" => Ok(Tab::Alerts),
            "analytics" | "zones" => Ok(Tab::Analytics),
            other => Err(format!("unknown tab '{other}' (overview, bins, alerts, analytics)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiCard {
    pub label: String,
    pub value: String,
    pub caption: String,
    pub derived: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinCard {
    pub bin_id: String,
    pub location: String,
    pub fill_level: f64,
    pub band: FillBand,
    pub waste_type: String,
    pub battery: String,
    pub status: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertItem {
    pub title: String,
    pub severity: Severity,
    pub location: String,
    pub action: String,
    pub meta: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRow {
    pub name: String,
    pub bins: String,
    pub avg_fill: String,
    pub priority: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricTile {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardView {
    pub kpis: Vec<KpiCard>,
    pub bins: Vec<BinCard>,
    pub alerts: Vec<AlertItem>,
    pub recent_alerts: Vec<AlertItem>,
    pub zones: Vec<ZoneRow>,
    pub platform: Vec<MetricTile>,
}

/// Everything `render` needs besides the snapshot.
#[derive(Debug, Clone)]
pub struct Renderer {
    cards: Vec<KpiSpec>,
    ctx: KpiContext,
    breakpoints: FillBreakpoints,
    sort_bins_by_fill: bool,
    recent_alerts: usize,
}

impl Renderer {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            cards: config.kpi_cards(),
            ctx: config.kpi_context(),
            breakpoints: config.thresholds.breakpoints,
            sort_bins_by_fill: config.display.sort_bins_by_fill,
            recent_alerts: config.display.recent_alerts,
        }
    }

    pub fn render(&self, snapshot: &Snapshot) -> DashboardView {
        let kpis = self
            .cards
            .iter()
            .map(|spec| {
                let resolved = kpis::resolve(spec, snapshot, &self.ctx);
                KpiCard {
                    label: spec.label.clone(),
                    value: format!("{}{}", format_number(resolved.value, spec.grouped), spec.unit),
                    caption: spec.caption.clone(),
                    derived: resolved.source == KpiSource::Derived,
                }
            })
            .collect();

        let bins = self.bin_cards(snapshot.bins.iter());
        let alerts: Vec<AlertItem> = snapshot.alerts.iter().map(alert_item).collect();
        let recent_alerts = alerts.iter().take(self.recent_alerts).cloned().collect();

        let zones = snapshot
            .zones
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(zone_row)
            .collect();

        let platform = snapshot
            .platform_metrics
            .as_ref()
            .filter(|metrics| !metrics.is_empty())
            .map(platform_tiles)
            .unwrap_or_default();

        DashboardView {
            kpis,
            bins,
            alerts,
            recent_alerts,
            zones,
            platform,
        }
    }

    /// Grid order: descending fill when configured, server order otherwise.
    pub fn bin_cards<'a>(&self, bins: impl Iterator<Item = &'a Bin>) -> Vec<BinCard> {
        let mut cards: Vec<BinCard> = bins.map(|b| self.bin_card(b)).collect();
        if self.sort_bins_by_fill {
            // stable, so equal fills keep server order
            cards.sort_by(|a, b| b.fill_level.total_cmp(&a.fill_level));
        }
        cards
    }

    fn bin_card(&self, bin: &Bin) -> BinCard {
        BinCard {
            bin_id: bin.bin_id.clone(),
            location: bin.location.clone(),
            fill_level: bin.fill_level,
            band: self.breakpoints.classify(bin.fill_level),
            waste_type: bin.waste_type.clone(),
            battery: optional_reading(bin.battery_level, "%"),
            status: bin.status.clone(),
            active: bin.is_active(),
        }
    }

    /// Bins panel for an active filter, headed "N of M". Matches stay in
    /// server order whatever the grid sorting.
    pub fn filtered_panel(&self, snapshot: &Snapshot, filter: &BinFilter) -> String {
        let cards: Vec<BinCard> = filter
            .apply(&snapshot.bins, &self.breakpoints)
            .into_iter()
            .map(|bin| self.bin_card(bin))
            .collect();

        let mut out = String::new();
        let _ = writeln!(
            out,
            "== Smart Bins ({} of {}) - {} ==",
            cards.len(),
            snapshot.bins.len(),
            filter
        );
        if cards.is_empty() {
            out.push_str("  No bins match the filter\n");
        }
        for card in &cards {
            let _ = writeln!(out, "{card}");
        }
        out
    }
}

fn alert_item(alert: &Alert) -> AlertItem {
    let mut meta = Vec::new();
    if let Some(when) = alert.predicted_time.as_deref() {
        meta.push(format_timestamp(when));
    }
    if let Some(confidence) = alert.confidence {
        meta.push(format!("Confidence: {:.0}%", confidence * 100.0));
    }

    AlertItem {
        title: alert.title(),
        severity: alert.severity,
        location: alert.location.clone(),
        action: if alert.recommended_action.trim().is_empty() {
            "Take action".to_string()
        } else {
            alert.recommended_action.clone()
        },
        meta: (!meta.is_empty()).then(|| meta.join(" | ")),
    }
}

fn zone_row(zone: &Zone) -> ZoneRow {
    let count = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
    ZoneRow {
        name: zone.name.clone(),
        bins: format!("{}/{}", count(zone.active_bins), count(zone.smart_bin_count)),
        avg_fill: zone
            .avg_fill_level
            .map(|v| format!("{}%", format_number(v, false)))
            .unwrap_or_else(|| "-".to_string()),
        priority: zone
            .priority_level
            .map(|p| format!("P{p}"))
            .unwrap_or_else(|| "-".to_string()),
    }
}

fn platform_tiles(metrics: &MetricMap) -> Vec<MetricTile> {
    const TILES: [(&str, &str, &str, bool); 4] = [
        ("total_users", "Total Users", "", true),
        ("active_users", "Active Users", "", true),
        ("avg_separation_rate", "Separation Rate", "%", false),
        ("total_rewards", "Total Rewards", "", true),
    ];

    TILES
        .iter()
        .map(|(key, label, unit, grouped)| MetricTile {
            label: label.to_string(),
            value: format!("{}{}", format_number(metrics.number(key).unwrap_or(0.0), *grouped), unit),
        })
        .collect()
}

fn optional_reading(value: Option<f64>, unit: &str) -> String {
    value
        .map(|v| format!("{v:.1}{unit}"))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Integral values print without decimals; `grouped` adds thousands separators.
pub fn format_number(value: f64, grouped: bool) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let integral = value.fract() == 0.0;
    let text = if integral { format!("{}", value as i64) } else { format!("{value}") };
    if !grouped {
        return text;
    }

    let (sign, rest) = text.strip_prefix('-').map(|r| ("-", r)).unwrap_or(("", text.as_str()));
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let mut grouped_int = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped_int.push(',');
        }
        grouped_int.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped_int}.{f}"),
        None => format!("{sign}{grouped_int}"),
    }
}

/// RFC 3339 or naive ISO timestamps in local time, anything else verbatim.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}

fn gauge(fill_level: f64, band: FillBand) -> String {
    let filled = ((fill_level.clamp(0.0, 100.0) / 100.0) * GAUGE_WIDTH as f64).round() as usize;
    let mut bar = String::with_capacity(GAUGE_WIDTH + 2);
    bar.push('[');
    bar.extend(std::iter::repeat(band.marker()).take(filled));
    bar.extend(std::iter::repeat(' ').take(GAUGE_WIDTH - filled));
    bar.push(']');
    bar
}

impl fmt::Display for KpiCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {:<18} {:>12}", self.label, self.value)?;
        if !self.caption.is_empty() {
            write!(f, "  {}", self.caption)?;
        }
        if self.derived {
            f.write_str("  (derived)")?;
        }
        Ok(())
    }
}

impl fmt::Display for BinCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  {:<9} {:<28} {:>5}% {} {:<8} {:<10} battery {:<6} {}",
            self.bin_id,
            self.location,
            format_number(self.fill_level, false),
            gauge(self.fill_level, self.band),
            self.band,
            self.waste_type,
            self.battery,
            if self.active { "active".to_string() } else { self.status.to_lowercase() },
        )
    }
}

impl fmt::Display for AlertItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  [{}] {}", self.severity, self.title)?;
        writeln!(f, "      {}", self.location)?;
        write!(f, "      -> {}", self.action)?;
        if let Some(meta) = &self.meta {
            write!(f, "\n      {meta}")?;
        }
        Ok(())
    }
}

impl DashboardView {
    pub fn kpi_panel(&self) -> String {
        let mut out = String::from("== KPIs ==\n");
        for card in &self.kpis {
            let _ = writeln!(out, "{card}");
        }
        out
    }

    pub fn bins_panel(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== Smart Bins ({}) ==", self.bins.len());
        if self.bins.is_empty() {
            out.push_str("  No bins data\n");
        }
        for card in &self.bins {
            let _ = writeln!(out, "{card}");
        }
        out
    }

    pub fn recent_alerts_panel(&self) -> String {
        let mut out = String::from("== Recent Alerts ==\n");
        if self.recent_alerts.is_empty() {
            out.push_str("  No alerts\n");
        }
        for alert in &self.recent_alerts {
            let _ = writeln!(out, "  [{}] {} - {}", alert.severity, alert.title, alert.location);
        }
        out
    }

    pub fn alerts_panel(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== Predictive Alerts ({}) ==", self.alerts.len());
        if self.alerts.is_empty() {
            out.push_str("  No predictive alerts at this time\n");
        }
        for alert in &self.alerts {
            let _ = writeln!(out, "{alert}");
        }
        out
    }

    pub fn analytics_panel(&self) -> String {
        let mut out = String::from("== Zones ==\n");
        if self.zones.is_empty() {
            out.push_str("  No zone analytics\n");
        } else {
            let _ = writeln!(out, "  {:<24} {:>9} {:>9} {:>9}", "Zone", "Bins", "Avg Fill", "Priority");
            for zone in &self.zones {
                let _ = writeln!(
                    out,
                    "  {:<24} {:>9} {:>9} {:>9}",
                    zone.name, zone.bins, zone.avg_fill, zone.priority
                );
            }
        }

        out.push_str("== Platform ==\n");
        if self.platform.is_empty() {
            out.push_str("  No platform metrics\n");
        }
        for tile in &self.platform {
            let _ = writeln!(out, "  {:<18} {:>12}", tile.label, tile.value);
        }
        out
    }

    pub fn tab(&self, tab: Tab) -> String {
        match tab {
            Tab::Overview => format!("{}{}{}", self.kpi_panel(), self.bins_panel(), self.recent_alerts_panel()),
            Tab::Bins => self.bins_panel(),
            Tab::Alerts => self.alerts_panel(),
            Tab::Analytics => self.analytics_panel(),
        }
    }
}

/// Inline panel shown in place of the bins after a failed cycle.
pub fn error_panel(message: &str) -> String {
    format!(
        "== Connection Error ==\n  Backend not responding\n  {message}\n  Type 'r' + Enter to retry\n"
    )
}

pub fn bin_details(bin: &Bin) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Bin Details: {}", bin.bin_id);
    let _ = writeln!(out, "  Location:     {}", bin.location);
    let _ = writeln!(out, "  Fill Level:   {}%", format_number(bin.fill_level, false));
    let _ = writeln!(out, "  Type:         {}", bin.waste_type);
    let _ = writeln!(out, "  Battery:      {}", optional_reading(bin.battery_level, "%"));
    let _ = writeln!(out, "  Status:       {}", bin.status);
    let _ = writeln!(
        out,
        "  Last Emptied: {}",
        bin.last_emptied.as_deref().map(format_timestamp).unwrap_or_else(|| "Never".to_string())
    );
    let _ = writeln!(out, "  Temperature:  {}", optional_reading(bin.temperature, "°C"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;
    use serde_json::json;

    fn renderer(profile: Profile) -> Renderer {
        let mut config = DashboardConfig::default();
        config.api.profile = profile;
        Renderer::from_config(&config)
    }

    fn snapshot() -> Snapshot {
        serde_json::from_value(json!({
            "bins": [
                {"bin_id": "BIN-001", "location": "Downtown", "fill_level": 40, "battery_level": 80},
                {"bin_id": "BIN-002", "location": "Park", "fill_level": 90},
                {"bin_id": "BIN-003", "location": "Mall", "fill_level": 72, "status": "offline"}
            ],
            "alerts": [
                {"type": "overflow_prediction", "severity": "critical", "location": "Park",
                 "recommended_action": "Schedule immediate collection", "confidence": 0.87},
                {"type": "battery_low", "location": "Mall"},
                {"type": "rapid_fill", "severity": "high", "location": "Downtown"},
                {"type": "temperature_high", "severity": "low", "location": "Harbor"}
            ],
            "kpis": {"total_waste_collected_kg": 10234, "collection_coverage": 91},
            "zones": [{"name": "Centre", "active_bins": 4, "smart_bin_count": 5, "avg_fill_level": 62.5, "priority_level": 1}],
            "platform_metrics": {"total_users": 15230, "active_users": 8120, "avg_separation_rate": 71.5, "total_rewards": 420000}
        }))
        .unwrap()
    }

    #[test]
    fn test_render_is_idempotent() {
        let r = renderer(Profile::Full);
        let snap = snapshot();
        let first = r.render(&snap);
        let second = r.render(&snap);
        assert_eq!(first, second);
        for tab in [Tab::Overview, Tab::Bins, Tab::Alerts, Tab::Analytics] {
            assert_eq!(first.tab(tab), second.tab(tab));
        }
    }

    #[test]
    fn test_bins_sorted_by_fill_descending() {
        let view = renderer(Profile::Full).render(&snapshot());
        let order: Vec<&str> = view.bins.iter().map(|b| b.bin_id.as_str()).collect();
        assert_eq!(order, vec!["BIN-002", "BIN-003", "BIN-001"]);
        assert_eq!(view.bins[0].band, FillBand::Critical);
        assert_eq!(view.bins[1].band, FillBand::High);
        assert_eq!(view.bins[2].band, FillBand::Low);
        assert_eq!(view.bins[2].battery, "80.0%");
        assert_eq!(view.bins[0].battery, "N/A");
    }

    #[test]
    fn test_server_order_when_sorting_disabled() {
        let mut config = DashboardConfig::default();
        config.display.sort_bins_by_fill = false;
        let view = Renderer::from_config(&config).render(&snapshot());
        assert_eq!(view.bins[0].bin_id, "BIN-001");
    }

    #[test]
    fn test_alerts_keep_server_order_and_default_severity() {
        let view = renderer(Profile::Full).render(&snapshot());
        let titles: Vec<&str> = view.alerts.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["OVERFLOW PREDICTION", "BATTERY LOW", "RAPID FILL", "TEMPERATURE HIGH"]);
        assert_eq!(view.alerts[1].severity, Severity::Medium);
        assert_eq!(view.alerts[1].action, "Take action");
        assert_eq!(view.alerts[0].meta.as_deref(), Some("Confidence: 87%"));
        assert_eq!(view.recent_alerts.len(), 3);
        assert!(view.alerts_panel().contains("[medium] BATTERY LOW"));
    }

    #[test]
    fn test_kpi_cards_mix_server_and_derived() {
        let view = renderer(Profile::Full).render(&snapshot());
        let waste = &view.kpis[1];
        assert_eq!(waste.value, "10,234 kg");
        assert!(!waste.derived);

        let smart_bins = &view.kpis[0];
        assert_eq!(smart_bins.value, "3");
        assert!(smart_bins.derived);

        let critical = &view.kpis[4];
        assert_eq!(critical.value, "1");
        assert!(view.kpi_panel().contains("(derived)"));
    }

    #[test]
    fn test_simple_profile_average() {
        let view = renderer(Profile::Simple).render(&snapshot());
        // (40 + 90 + 72) / 3 = 67.33
        assert_eq!(view.kpis[1].value, "67.3%");
        assert_eq!(view.kpis[3].value, "4");
    }

    #[test]
    fn test_analytics_panel() {
        let view = renderer(Profile::Full).render(&snapshot());
        assert_eq!(view.zones[0].bins, "4/5");
        assert_eq!(view.zones[0].priority, "P1");
        assert_eq!(view.platform[0].value, "15,230");
        assert_eq!(view.platform[2].value, "71.5%");
        assert!(view.analytics_panel().contains("Centre"));
    }

    #[test]
    fn test_empty_snapshot_panels() {
        let view = renderer(Profile::Full).render(&Snapshot::default());
        assert!(view.bins_panel().contains("No bins data"));
        assert!(view.recent_alerts_panel().contains("No alerts"));
        assert!(view.analytics_panel().contains("No zone analytics"));
    }

    #[test]
    fn test_filtered_panel_counts() {
        let r = renderer(Profile::Full);
        let panel = r.filtered_panel(&snapshot(), &BinFilter::Band(FillBand::High));
        assert!(panel.contains("(1 of 3)"));
        assert!(panel.contains("BIN-003"));

        let none = r.filtered_panel(&snapshot(), &BinFilter::search("airport"));
        assert!(none.contains("No bins match the filter"));
    }

    #[test]
    fn test_filtered_panel_keeps_server_order() {
        let r = renderer(Profile::Full);
        let panel = r.filtered_panel(&snapshot(), &BinFilter::search("bin"));
        assert!(panel.contains("(3 of 3)"));

        let first = panel.find("BIN-001").unwrap();
        let second = panel.find("BIN-002").unwrap();
        let third = panel.find("BIN-003").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_empty_platform_metrics_render_no_tiles() {
        let mut snap = snapshot();
        snap.platform_metrics = Some(MetricMap::default());
        assert!(renderer(Profile::Full).render(&snap).platform.is_empty());
        assert_eq!(renderer(Profile::Full).render(&snapshot()).platform.len(), 4);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.0, true), "1,234,567");
        assert_eq!(format_number(999.0, true), "999");
        assert_eq!(format_number(-4500.5, true), "-4,500.5");
        assert_eq!(format_number(61.4, false), "61.4");
        assert_eq!(format_number(f64::NAN, true), "0");
    }

    #[test]
    fn test_gauge() {
        assert_eq!(gauge(90.0, FillBand::Critical), "[!!!!!!!!! ]");
        assert_eq!(gauge(0.0, FillBand::Low), "[          ]");
        assert_eq!(gauge(140.0, FillBand::Critical).len(), GAUGE_WIDTH + 2);
    }

    #[test]
    fn test_bin_details() {
        let snap = snapshot();
        let details = bin_details(&snap.bins[0]);
        assert!(details.contains("Bin Details: BIN-001"));
        assert!(details.contains("Last Emptied: Never"));
        assert!(details.contains("Temperature:  N/A"));
    }

    #[test]
    fn test_naive_timestamp() {
        assert_eq!(format_timestamp("2024-05-01T10:30:00.123456"), "2024-05-01 10:30");
        assert_eq!(format_timestamp("soon"), "soon");
    }

    #[test]
    fn test_tab_parse() {
        assert_eq!("Analytics".parse::<Tab>().unwrap(), Tab::Analytics);
        assert!("settings".parse::<Tab>().is_err());
    }
}
