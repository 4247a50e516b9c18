//! I/O boundary traits for testability
//!
//! The reputation service is reached through [`ReputationClient`], allowing
//! the session to be tested with fake implementations.

use std::path::Path;

use serde_json::Value;

use crate::domain::{RescanOptions, Response};
use crate::infrastructure::InfraResult;

/// File-reputation service client.
///
/// Every call is blocking and carries the API key explicitly. Implementations
/// perform exactly one request per call and never retry.
pub trait ReputationClient: Send + Sync {
    /// Upload a file for scanning.
    fn scan(&self, api_key: &str, path: &Path) -> InfraResult<Response>;

    /// Request a rescan of an already known file.
    fn rescan(&self, api_key: &str, hash: &str, options: &RescanOptions) -> InfraResult<Response>;

    /// Fetch the latest report for a hash or scan id.
    fn report(&self, api_key: &str, resource: &str) -> InfraResult<Response>;

    /// Query the clusters for a date (`YYYY-MM-DD`).
    ///
    /// `on_item` is called once per cluster, in the order the service returns them.
    fn clusters(
        &self,
        api_key: &str,
        date: &str,
        on_item: &mut dyn FnMut(&Value),
    ) -> InfraResult<()>;

    /// Download a sample into `out_path`.
    fn download(&self, api_key: &str, hash: &str, out_path: &Path) -> InfraResult<()>;
}
