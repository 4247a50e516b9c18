//! Blocking HTTP implementation of [`ReputationClient`]
//!
//! Talks to the VirusTotal public API v2. One call is one request; status
//! codes other than 200 (including 204, which the service uses for an
//! exhausted request quota) are returned as [`InfraError::Http`].

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::Settings;
use crate::domain::{RescanOptions, Response};
use crate::infrastructure::traits::ReputationClient;
use crate::infrastructure::{InfraError, InfraResult};

/// Date format accepted by the cluster endpoint.
const CLUSTER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date format for scheduled rescans.
const RESCAN_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Reputation client backed by `reqwest`.
#[derive(Debug)]
pub struct HttpReputationClient {
    http: Client,
    base_url: String,
}

impl HttpReputationClient {
    /// Build a client from settings (base URL, timeout, user agent).
    pub fn new(settings: &Settings) -> InfraResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|source| InfraError::ClientSetup { source })?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request and return the body of a 200 response.
    fn send(&self, request: RequestBuilder, context: &str) -> InfraResult<Vec<u8>> {
        let resp = request
            .send()
            .map_err(|e| InfraError::transport(context, e))?;
        let status = resp.status();
        debug!(%status, context, "response received");
        if status == StatusCode::NO_CONTENT || !status.is_success() {
            return Err(InfraError::Http {
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().map_err(|e| InfraError::transport(context, e))?;
        Ok(body.to_vec())
    }

    fn send_json(&self, request: RequestBuilder, context: &str) -> InfraResult<Response> {
        let body = self.send(request, context)?;
        Response::from_slice(&body).map_err(|e| InfraError::InvalidJson(e.to_string()))
    }
}

/// Form fields for a rescan request.
pub fn rescan_form(api_key: &str, hash: &str, options: &RescanOptions) -> Vec<(&'static str, String)> {
    let mut form = vec![("apikey", api_key.to_string()), ("resource", hash.to_string())];
    if let Some(date) = options.date {
        form.push(("date", date.format(RESCAN_DATE_FORMAT).to_string()));
    }
    if let Some(period) = options.period {
        form.push(("period", period.to_string()));
    }
    if let Some(repeat) = options.repeat {
        form.push(("repeat", repeat.to_string()));
    }
    if let Some(url) = &options.notify_url {
        form.push(("notify_url", url.clone()));
        if options.notify_changes_only {
            form.push(("notify_changes_only", "1".to_string()));
        }
    }
    form
}

/// Reject cluster dates the service would not understand.
pub fn validate_cluster_date(date: &str) -> InfraResult<NaiveDate> {
    NaiveDate::parse_from_str(date, CLUSTER_DATE_FORMAT)
        .map_err(|e| InfraError::InvalidRequest(format!("cluster date {:?}: {}", date, e)))
}

impl ReputationClient for HttpReputationClient {
    #[instrument(level = "debug", skip(self, api_key))]
    fn scan(&self, api_key: &str, path: &Path) -> InfraResult<Response> {
        let form = multipart::Form::new()
            .text("apikey", api_key.to_string())
            .file("file", path)
            .map_err(|e| InfraError::io(format!("open {}", path.display()), e))?;
        let request = self.http.post(self.endpoint("file/scan")).multipart(form);
        self.send_json(request, "file/scan")
    }

    #[instrument(level = "debug", skip(self, api_key))]
    fn rescan(&self, api_key: &str, hash: &str, options: &RescanOptions) -> InfraResult<Response> {
        let request = self
            .http
            .post(self.endpoint("file/rescan"))
            .form(&rescan_form(api_key, hash, options));
        self.send_json(request, "file/rescan")
    }

    #[instrument(level = "debug", skip(self, api_key))]
    fn report(&self, api_key: &str, resource: &str) -> InfraResult<Response> {
        let request = self
            .http
            .post(self.endpoint("file/report"))
            .form(&[("apikey", api_key), ("resource", resource)]);
        self.send_json(request, "file/report")
    }

    #[instrument(level = "debug", skip(self, api_key, on_item))]
    fn clusters(
        &self,
        api_key: &str,
        date: &str,
        on_item: &mut dyn FnMut(&Value),
    ) -> InfraResult<()> {
        validate_cluster_date(date)?;
        let request = self
            .http
            .get(self.endpoint("file/clusters"))
            .query(&[("apikey", api_key), ("date", date)]);
        let response = self.send_json(request, "file/clusters")?;
        match response.body().get("clusters").and_then(Value::as_array) {
            Some(clusters) => clusters.iter().for_each(|c| on_item(c)),
            None => debug!("no clusters in response"),
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self, api_key))]
    fn download(&self, api_key: &str, hash: &str, out_path: &Path) -> InfraResult<()> {
        let request = self
            .http
            .get(self.endpoint("file/download"))
            .query(&[("apikey", api_key), ("hash", hash)]);
        let body = self.send(request, "file/download")?;
        std::fs::write(out_path, &body)
            .map_err(|e| InfraError::io(format!("write {}", out_path.display()), e))?;
        debug!(bytes = body.len(), "sample written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn client() -> HttpReputationClient {
        let settings = Settings {
            // unroutable: nothing in these tests reaches the network
            base_url: "http://127.0.0.1:9/vtapi/v2/".to_string(),
            ..Settings::default()
        };
        HttpReputationClient::new(&settings).unwrap()
    }

    #[test]
    fn given_trailing_slash_when_endpoint_then_single_separator() {
        assert_eq!(
            client().endpoint("file/scan"),
            "http://127.0.0.1:9/vtapi/v2/file/scan"
        );
    }

    #[test]
    fn given_default_options_when_rescan_form_then_only_key_and_resource() {
        let form = rescan_form("k", "h", &RescanOptions::default());
        assert_eq!(
            form,
            vec![("apikey", "k".to_string()), ("resource", "h".to_string())]
        );
    }

    #[test]
    fn given_scheduled_options_when_rescan_form_then_all_fields() {
        let options = RescanOptions {
            date: NaiveDateTime::parse_from_str("2014-03-01 12:30:00", "%Y-%m-%d %H:%M:%S").ok(),
            period: Some(7),
            repeat: Some(2),
            notify_url: Some("https://example.org/hook".to_string()),
            notify_changes_only: true,
        };
        let form = rescan_form("k", "h", &options);
        assert!(form.contains(&("date", "20140301123000".to_string())));
        assert!(form.contains(&("period", "7".to_string())));
        assert!(form.contains(&("repeat", "2".to_string())));
        assert!(form.contains(&("notify_changes_only", "1".to_string())));
    }

    #[test]
    fn given_bad_date_when_clusters_then_invalid_request_without_items() {
        let mut calls = 0;
        let err = client()
            .clusters("k", "01/02/2014", &mut |_: &Value| calls += 1)
            .unwrap_err();
        assert!(matches!(err, InfraError::InvalidRequest(_)));
        assert_eq!(err.status_code(), -3);
        assert_eq!(calls, 0);
    }

    #[test]
    fn given_missing_file_when_scan_then_io_error() {
        let err = client()
            .scan("k", Path::new("/definitely/not/here.exe"))
            .unwrap_err();
        assert!(matches!(err, InfraError::Io { .. }));
    }

    #[test]
    fn given_valid_date_then_accepted() {
        assert!(validate_cluster_date("2014-02-28").is_ok());
        assert!(validate_cluster_date("2014-02-30").is_err());
    }
}
