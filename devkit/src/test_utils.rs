/*!
Test Harness pour le dashboard SSAcity

Facilite l'écriture de tests d'intégration avec:
- Backend simulé lancé sur un port libre
- Pilotage des pannes par endpoint
- Attente des requêtes reçues par le backend
*/

use crate::stub_backend::{Fault, RunningStub, StubBackend, StubEndpoint};
use anyhow::Result;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Harness de test : un backend simulé et son serveur
pub struct TestHarness {
    pub stub: StubBackend,
    server: RunningStub,
}

impl TestHarness {
    /// Démarre un backend avec les données de ville par défaut
    pub async fn start() -> Result<Self> {
        Self::with_backend(StubBackend::with_city_data()).await
    }

    pub async fn with_backend(stub: StubBackend) -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let server = stub.spawn_local().await?;
        Ok(Self { stub, server })
    }

    pub fn base_url(&self) -> String {
        self.server.base_url()
    }

    pub fn set_payload(&self, endpoint: StubEndpoint, payload: Value) -> &Self {
        self.stub.set_payload(endpoint, payload);
        self
    }

    pub fn fail(&self, endpoint: StubEndpoint) -> &Self {
        self.stub.fail(endpoint, 500);
        self
    }

    pub fn malformed(&self, endpoint: StubEndpoint) -> &Self {
        self.stub.inject(endpoint, Fault::Malformed);
        self
    }

    pub fn slow(&self, endpoint: StubEndpoint, delay: Duration) -> &Self {
        self.stub.inject(endpoint, Fault::Delay(delay));
        self
    }

    pub fn recover(&self) -> &Self {
        self.stub.heal_all();
        self
    }

    pub fn hits(&self, endpoint: StubEndpoint) -> usize {
        self.stub.hits(endpoint)
    }

    /// Attend que `endpoint` ait reçu au moins `count` requêtes
    pub async fn wait_for_hits(&self, endpoint: StubEndpoint, count: usize, timeout_ms: u64) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        while Instant::now() < deadline {
            if self.stub.hits(endpoint) >= count {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        self.stub.hits(endpoint) >= count
    }
}
