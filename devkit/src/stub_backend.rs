/*!
Backend REST simulé pour développement sans serveur SSAcity

Sert les cinq endpoints /api/v2/... avec des payloads configurables.
Permet d'injecter des pannes (statut HTTP, JSON invalide, latence) par endpoint
et compte les requêtes reçues pour les assertions de tests.
*/

use crate::fixtures::FixtureBuilder;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub type Shared<T> = Arc<Mutex<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubEndpoint {
    SmartBins,
    PredictiveAlerts,
    OperationalKpis,
    ZoneAnalytics,
    PlatformMetrics,
}

impl StubEndpoint {
    pub const ALL: [StubEndpoint; 5] = [
        StubEndpoint::SmartBins,
        StubEndpoint::PredictiveAlerts,
        StubEndpoint::OperationalKpis,
        StubEndpoint::ZoneAnalytics,
        StubEndpoint::PlatformMetrics,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            StubEndpoint::SmartBins => "/api/v2/smart-bins",
            StubEndpoint::PredictiveAlerts => "/api/v2/predictive-alerts",
            StubEndpoint::OperationalKpis => "/api/v2/operational-kpis",
            StubEndpoint::ZoneAnalytics => "/api/v2/zone-analytics",
            StubEndpoint::PlatformMetrics => "/api/v2/platform-metrics",
        }
    }
}

/// Panne injectée sur un endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Répond avec ce statut HTTP
    Status(u16),
    /// 200 avec un corps JSON tronqué
    Malformed,
    /// Répond normalement après ce délai
    Delay(Duration),
}

#[derive(Debug, Default)]
struct StubState {
    payloads: HashMap<StubEndpoint, Value>,
    faults: HashMap<StubEndpoint, Fault>,
    hits: HashMap<StubEndpoint, usize>,
}

/// Backend simulé, clonable (état partagé)
#[derive(Clone)]
pub struct StubBackend {
    state: Shared<StubState>,
}

/// Serveur lancé en tâche de fond
pub struct RunningStub {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl RunningStub {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for RunningStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl StubBackend {
    /// Backend vide : tous les endpoints répondent `null`
    pub fn empty() -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState::default())),
        }
    }

    /// Backend pré-rempli avec un jeu de données de ville déterministe
    pub fn with_city_data() -> Self {
        let stub = Self::empty();
        let bins = FixtureBuilder::city_bins(12);
        let alerts = FixtureBuilder::city_alerts(5);
        stub.set_payload(StubEndpoint::OperationalKpis, FixtureBuilder::kpis_for(&bins, &alerts));
        stub.set_payload(StubEndpoint::SmartBins, bins);
        stub.set_payload(StubEndpoint::PredictiveAlerts, alerts);
        stub.set_payload(StubEndpoint::ZoneAnalytics, FixtureBuilder::zones());
        stub.set_payload(StubEndpoint::PlatformMetrics, FixtureBuilder::platform_metrics());
        stub
    }

    pub fn set_payload(&self, endpoint: StubEndpoint, payload: Value) {
        self.state.lock().payloads.insert(endpoint, payload);
    }

    pub fn inject(&self, endpoint: StubEndpoint, fault: Fault) {
        log::info!("💥 [STUB] {} -> {:?}", endpoint.path(), fault);
        self.state.lock().faults.insert(endpoint, fault);
    }

    pub fn fail(&self, endpoint: StubEndpoint, status: u16) {
        self.inject(endpoint, Fault::Status(status));
    }

    pub fn heal(&self, endpoint: StubEndpoint) {
        self.state.lock().faults.remove(&endpoint);
    }

    pub fn heal_all(&self) {
        self.state.lock().faults.clear();
    }

    pub fn hits(&self, endpoint: StubEndpoint) -> usize {
        self.state.lock().hits.get(&endpoint).copied().unwrap_or(0)
    }

    pub fn router(&self) -> Router {
        let mut router = Router::new().route("/health", get(|| async { Json(serde_json::json!({"status": "healthy"})) }));

        for endpoint in StubEndpoint::ALL {
            router = router.route(
                endpoint.path(),
                get(move |State(stub): State<StubBackend>| async move { stub.respond(endpoint).await }),
            );
        }

        router.with_state(self.clone())
    }

    async fn respond(&self, endpoint: StubEndpoint) -> Response {
        let (fault, payload) = {
            let mut state = self.state.lock();
            *state.hits.entry(endpoint).or_insert(0) += 1;
            (
                state.faults.get(&endpoint).copied(),
                state.payloads.get(&endpoint).cloned().unwrap_or(Value::Null),
            )
        };

        match fault {
            Some(Fault::Status(code)) => {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(serde_json::json!({"error": "stub fault"}))).into_response()
            }
            Some(Fault::Malformed) => {
                (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], "[{\"bin_id\": ").into_response()
            }
            Some(Fault::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Json(payload).into_response()
            }
            None => Json(payload).into_response(),
        }
    }

    /// Lance le serveur sur `addr` (port 0 = port libre)
    pub async fn spawn(&self, addr: SocketAddr) -> Result<RunningStub> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind stub backend on {addr}"))?;
        let addr = listener.local_addr()?;
        let app = self.router();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("❌ [STUB] server error: {}", e);
            }
        });

        log::info!("🚀 [STUB] listening on http://{}", addr);
        Ok(RunningStub { addr, handle })
    }

    /// Lance le serveur sur un port libre de localhost
    pub async fn spawn_local(&self) -> Result<RunningStub> {
        self.spawn(SocketAddr::from(([127, 0, 0, 1], 0))).await
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::with_city_data()
    }
}
