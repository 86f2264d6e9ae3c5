//! Dashboard configuration
//!
//! Handles:
//! - Backend base URL and endpoint profile
//! - Refresh cadence and failure policy
//! - KPI cards, critical threshold and fill breakpoints
//! - Export directory
//!
//! Stored as TOML in the OS config directory; a missing file means defaults.

use crate::bands::FillBreakpoints;
use crate::kpis::{KpiContext, KpiSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable overriding `api.base_url`
pub const BASE_URL_ENV: &str = "SSACITY_API_BASE";

const MAX_AVG_FILL_DECIMALS: u32 = 6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find config directory")]
    NoConfigDir,
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
    pub thresholds: ThresholdConfig,
    pub display: DisplayConfig,
    pub export: ExportConfig,
    /// Empty means the profile's default card set
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub kpis: Vec<KpiSpec>,
}

/// Which endpoints a refresh cycle requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// bins, alerts, KPIs
    Simple,
    /// bins, alerts, KPIs, zone analytics, platform metrics
    #[default]
    Full,
}

/// What the screen shows after a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep the last good snapshot, show the error panel
    #[default]
    Retain,
    /// Replace the snapshot with the fixed demo dataset
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub profile: Profile,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub clock_interval_ms: u64,
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Bins strictly above this level count as critical
    pub critical_bin: f64,
    pub avg_fill_decimals: u32,
    pub breakpoints: FillBreakpoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub sort_bins_by_fill: bool,
    pub recent_alerts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: Profile::Simple,
            timeout_secs: 10,
            connect_timeout_secs: 3,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            clock_interval_ms: 1000,
            on_failure: FailurePolicy::Retain,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            critical_bin: 85.0,
            avg_fill_decimals: 1,
            breakpoints: FillBreakpoints::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sort_bins_by_fill: true,
            recent_alerts: 3,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from(".") }
    }
}

impl DashboardConfig {
    /// Load config from the OS-specific location, then apply the env override
    pub async fn load() -> Result<Self, ConfigError> {
        let path = Self::config_file_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path).await?
        } else {
            info!("No config at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                debug!("{} overrides base URL", BASE_URL_ENV);
                config.api.base_url = base_url.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        toml::from_str(content)
    }

    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("ssacity-dashboard");
        path.push("config.toml");
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!("base_url must be an http(s) URL, got '{base}'")));
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::Invalid("refresh.interval_secs must be > 0".into()));
        }
        if self.refresh.clock_interval_ms == 0 {
            return Err(ConfigError::Invalid("refresh.clock_interval_ms must be > 0".into()));
        }
        if !(0.0..=100.0).contains(&self.thresholds.critical_bin) {
            return Err(ConfigError::Invalid("thresholds.critical_bin must lie within 0..=100".into()));
        }
        if self.thresholds.avg_fill_decimals > MAX_AVG_FILL_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "thresholds.avg_fill_decimals must be at most {MAX_AVG_FILL_DECIMALS}"
            )));
        }
        self.thresholds.breakpoints.validate().map_err(ConfigError::Invalid)?;
        if let Some(spec) = self.kpis.iter().find(|k| k.key.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("KPI card '{}' has an empty key", spec.label)));
        }
        Ok(())
    }

    pub fn kpi_cards(&self) -> Vec<KpiSpec> {
        if self.kpis.is_empty() {
            KpiSpec::defaults_for(self.api.profile)
        } else {
            self.kpis.clone()
        }
    }

    pub fn kpi_context(&self) -> KpiContext {
        KpiContext {
            critical_threshold: self.thresholds.critical_bin,
            avg_fill_decimals: self.thresholds.avg_fill_decimals,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.clock_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpis::KpiFallback;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.refresh.interval_secs, 30);
        assert_eq!(config.api.profile, Profile::Simple);
        assert_eq!(config.refresh.on_failure, FailurePolicy::Retain);
        assert_eq!(config.thresholds.critical_bin, 85.0);
        assert!(config.validate().is_ok());
        assert_eq!(config.kpi_cards().len(), 4);
    }

    #[test]
    fn test_config_file_path() {
        let path = DashboardConfig::config_file_path().unwrap();
        assert!(path.to_string_lossy().contains("ssacity-dashboard"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_partial_toml() {
        let config = DashboardConfig::from_toml(
            r#"
            [api]
            base_url = "http://localhost:5001"
            profile = "simple"

            [refresh]
            on_failure = "fallback"

            [thresholds.breakpoints]
            critical = 80.0
            high = 60.0
            medium = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:5001");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.refresh.interval_secs, 30);
        assert_eq!(config.refresh.on_failure, FailurePolicy::Fallback);
        assert_eq!(config.thresholds.breakpoints.high, 60.0);
        assert_eq!(config.kpi_cards().len(), 4);
    }

    #[test]
    fn test_custom_kpi_cards() {
        let config = DashboardConfig::from_toml(
            r#"
            [[kpis]]
            key = "avg_fill"
            label = "Average"
            unit = "%"
            fallback = "average_fill"
            "#,
        )
        .unwrap();

        let cards = config.kpi_cards();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].fallback, KpiFallback::AverageFill);
        assert!(!cards[0].grouped);
    }

    #[test]
    fn test_validation() {
        let mut config = DashboardConfig::default();
        config.api.base_url = "localhost:5000".into();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.refresh.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.thresholds.breakpoints.high = 90.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_avg_fill_decimals_bounded() {
        let mut config = DashboardConfig::default();
        config.thresholds.avg_fill_decimals = 6;
        assert!(config.validate().is_ok());

        config.thresholds.avg_fill_decimals = 400;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let parsed = DashboardConfig::from_toml("[thresholds]\navg_fill_decimals = 7\n").unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(DashboardConfig::from_toml("  \n").unwrap(), DashboardConfig::default());
    }

    #[tokio::test]
    async fn test_load_from_missing_file() {
        let err = DashboardConfig::load_from(Path::new("/nonexistent/ssacity.toml")).await;
        assert!(matches!(err, Err(ConfigError::Read { .. })));
    }
}
