//! Test support: logging setup and an in-memory reputation client

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{RescanOptions, Response};
use crate::infrastructure::traits::ReputationClient;
use crate::infrastructure::{InfraError, InfraResult};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let noisy_modules = ["hyper", "reqwest", "rustls"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = env::var("RUST_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new("vtscan=trace"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// A call seen by [`RecordingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Scan { api_key: String, path: PathBuf },
    Rescan { api_key: String, hash: String },
    Report { api_key: String, resource: String },
    Clusters { api_key: String, date: String },
    Download { api_key: String, hash: String, out_path: PathBuf },
}

/// In-memory [`ReputationClient`] that records every call.
///
/// Scan, rescan and report answer with `response`; clusters streams
/// `clusters`; download writes `sample` to the output path. With
/// `fail_with` set, every call fails with that HTTP status instead.
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<ClientCall>>,
    response: Value,
    clusters: Vec<Value>,
    sample: Vec<u8>,
    fail_with: Option<u16>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, body: Value) -> Self {
        self.response = body;
        self
    }

    pub fn with_clusters(mut self, items: Vec<Value>) -> Self {
        self.clusters = items;
        self
    }

    pub fn with_sample(mut self, content: &[u8]) -> Self {
        self.sample = content.to_vec();
        self
    }

    pub fn failing(mut self, status: u16) -> Self {
        self.fail_with = Some(status);
        self
    }

    /// Calls so far, oldest first.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, call: ClientCall) -> InfraResult<()> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
        match self.fail_with {
            Some(status) => Err(InfraError::Http { status }),
            None => Ok(()),
        }
    }
}

impl ReputationClient for RecordingClient {
    fn scan(&self, api_key: &str, path: &Path) -> InfraResult<Response> {
        self.record(ClientCall::Scan {
            api_key: api_key.to_string(),
            path: path.to_path_buf(),
        })?;
        Ok(Response::new(self.response.clone()))
    }

    fn rescan(&self, api_key: &str, hash: &str, _options: &RescanOptions) -> InfraResult<Response> {
        self.record(ClientCall::Rescan {
            api_key: api_key.to_string(),
            hash: hash.to_string(),
        })?;
        Ok(Response::new(self.response.clone()))
    }

    fn report(&self, api_key: &str, resource: &str) -> InfraResult<Response> {
        self.record(ClientCall::Report {
            api_key: api_key.to_string(),
            resource: resource.to_string(),
        })?;
        Ok(Response::new(self.response.clone()))
    }

    fn clusters(
        &self,
        api_key: &str,
        date: &str,
        on_item: &mut dyn FnMut(&Value),
    ) -> InfraResult<()> {
        self.record(ClientCall::Clusters {
            api_key: api_key.to_string(),
            date: date.to_string(),
        })?;
        self.clusters.iter().for_each(|item| on_item(item));
        Ok(())
    }

    fn download(&self, api_key: &str, hash: &str, out_path: &Path) -> InfraResult<()> {
        self.record(ClientCall::Download {
            api_key: api_key.to_string(),
            hash: hash.to_string(),
            out_path: out_path.to_path_buf(),
        })?;
        std::fs::write(out_path, &self.sample)
            .map_err(|e| InfraError::io(format!("write {}", out_path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn given_failing_client_then_call_recorded_and_status_returned() {
        let client = RecordingClient::new().failing(204);
        let err = client.report("k", "h").unwrap_err();
        assert_eq!(err.status_code(), 204);
        assert_eq!(
            client.calls(),
            vec![ClientCall::Report {
                api_key: "k".into(),
                resource: "h".into()
            }]
        );
    }
}
