//! Service container for dependency injection
//!
//! Wires up the reputation client and hands out sessions.

use std::io::Write;
use std::sync::Arc;

use crate::application::services::ScanSession;
use crate::config::Settings;
use crate::infrastructure::http::HttpReputationClient;
use crate::infrastructure::traits::ReputationClient;
use crate::infrastructure::InfraResult;

/// Container holding the application's long-lived dependencies.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Reputation service client
    pub client: Arc<dyn ReputationClient>,
}

impl ServiceContainer {
    /// Create a new service container with the HTTP client.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let client = HttpReputationClient::new(&settings)?;
        Ok(Self::with_deps(settings, Arc::new(client)))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, client: Arc<dyn ReputationClient>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, client }
    }

    /// Start a session writing to `out`.
    pub fn session<W: Write>(&self, out: W) -> ScanSession<W> {
        ScanSession::new(Arc::clone(&self.client), out)
    }
}
