/*!
# SSAcity DevKit - Backend simulé et utilitaires de test

Bibliothèque facilitant le développement du dashboard SSAcity avec:
- Backend REST simulé pour tests sans serveur
- Générateurs de payloads déterministes
- Harness de tests d'intégration
*/

pub mod fixtures;
pub mod stub_backend;
pub mod test_utils;

pub use fixtures::FixtureBuilder;
pub use stub_backend::{Fault, RunningStub, StubBackend, StubEndpoint};
pub use test_utils::TestHarness;
