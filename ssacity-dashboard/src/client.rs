//! REST client for the SSAcity telemetry backend

use crate::config::ApiConfig;
use crate::models::{Alert, Bin, MetricMap, Zone};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    SmartBins,
    PredictiveAlerts,
    OperationalKpis,
    ZoneAnalytics,
    PlatformMetrics,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::SmartBins => "/api/v2/smart-bins",
            Endpoint::PredictiveAlerts => "/api/v2/predictive-alerts",
            Endpoint::OperationalKpis => "/api/v2/operational-kpis",
            Endpoint::ZoneAnalytics => "/api/v2/zone-analytics",
            Endpoint::PlatformMetrics => "/api/v2/platform-metrics",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Why one request failed. The refresh cycle treats every variant the same.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot reach {endpoint}: {source}")]
    Network {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered HTTP {status}")]
    Status { endpoint: Endpoint, status: StatusCode },
    #[error("malformed JSON from {endpoint}: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            FetchError::Network { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => *endpoint,
        }
    }
}

pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("ssacity-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, FetchError> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Network { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { endpoint, status });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| FetchError::Decode { endpoint, source })
    }

    pub async fn smart_bins(&self) -> Result<Vec<Bin>, FetchError> {
        self.get_json(Endpoint::SmartBins).await
    }

    pub async fn predictive_alerts(&self) -> Result<Vec<Alert>, FetchError> {
        self.get_json(Endpoint::PredictiveAlerts).await
    }

    pub async fn operational_kpis(&self) -> Result<MetricMap, FetchError> {
        self.get_json(Endpoint::OperationalKpis).await
    }

    pub async fn zone_analytics(&self) -> Result<Vec<Zone>, FetchError> {
        self.get_json(Endpoint::ZoneAnalytics).await
    }

    pub async fn platform_metrics(&self) -> Result<MetricMap, FetchError> {
        self.get_json(Endpoint::PlatformMetrics).await
    }
}
