//! Domain entities: core data structures

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::domain::DomainError;

/// Upper bound for the verbose message shown after a report.
pub const VERBOSE_MSG_MAX_BYTES: usize = 255;

/// Indentation used for every JSON dump.
const JSON_INDENT: &[u8] = b"    ";

/// Per-run configuration collected from configuration flags.
///
/// Owned by a single session and mutated only while directives are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// API key, required before any action
    pub api_key: Option<String>,
    /// Destination for downloads, required before `--download`
    pub output_path: Option<PathBuf>,
    /// Level given with `--verbose=LEVEL` (informational only)
    pub verbosity: Option<String>,
}

impl Configuration {
    /// Set the API key. The last call wins.
    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Some(key.into());
    }

    /// Set the download destination. The last call wins.
    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) {
        self.output_path = Some(path.into());
    }

    pub fn require_api_key(&self) -> Result<&str, DomainError> {
        self.api_key.as_deref().ok_or(DomainError::MissingApiKey)
    }

    pub fn require_output_path(&self) -> Result<&Path, DomainError> {
        self.output_path
            .as_deref()
            .ok_or(DomainError::MissingOutputPath)
    }

    /// API key safe for log output, e.g. `1a2b…(64)`.
    pub fn masked_api_key(&self) -> String {
        match &self.api_key {
            Some(key) => mask_secret(key),
            None => "<unset>".to_string(),
        }
    }
}

fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{}…({})", prefix, secret.chars().count())
}

/// A network-bound operation triggered by one action flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Upload a local file for scanning
    Scan(PathBuf),
    /// Ask the service to rescan a known hash
    Rescan(String),
    /// Fetch the report for a hash or resource id
    Report(String),
    /// Fetch the clusters computed for a date (`YYYY-MM-DD`)
    ClusterQuery(String),
    /// Download the sample with the given hash into the output path
    Download(String),
}

impl Action {
    /// Command-line flag that produces this action.
    pub fn flag(&self) -> &'static str {
        match self {
            Action::Scan(_) => "--filescan",
            Action::Rescan(_) => "--rescan",
            Action::Report(_) => "--report",
            Action::ClusterQuery(_) => "--clusters",
            Action::Download(_) => "--download",
        }
    }
}

/// Optional scheduling parameters for a rescan request.
///
/// The default leaves everything unset: rescan once, now, without notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescanOptions {
    /// Run the rescan at this point in time
    pub date: Option<NaiveDateTime>,
    /// Repeat every `period` days
    pub period: Option<u32>,
    /// Number of repetitions (requires `period`)
    pub repeat: Option<u32>,
    /// Callback URL notified with the results
    pub notify_url: Option<String>,
    /// Only notify when the results changed
    pub notify_changes_only: bool,
}

/// JSON body returned by scan, rescan and report calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    body: Value,
}

impl Response {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Parse a raw response body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(bytes)
            .map(Self::new)
            .map_err(|e| DomainError::InvalidResponse(e.to_string()))
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Serialize the body, optionally indented by four spaces.
    pub fn to_json(&self, indent: bool) -> Result<String, DomainError> {
        render_json(&self.body, indent)
    }

    /// The `verbose_msg` field, truncated to at most `max_bytes` bytes.
    ///
    /// Truncation never splits a UTF-8 character. Missing field yields "".
    pub fn verbose_message(&self, max_bytes: usize) -> String {
        let msg = self
            .body
            .get("verbose_msg")
            .and_then(Value::as_str)
            .unwrap_or_default();
        truncate_utf8(msg, max_bytes).to_string()
    }

    /// The numeric `response_code` field, if present.
    pub fn response_code(&self) -> Option<i64> {
        let code = self.body.get("response_code")?;
        code.as_i64()
            .or_else(|| code.as_str().and_then(|s| s.trim().parse().ok()))
    }
}

/// Counts cluster items streamed back by a single cluster query.
#[derive(Debug, Default)]
pub struct ClusterCounter {
    count: usize,
}

impl ClusterCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more item and return its 1-based number.
    pub fn advance(&mut self) -> usize {
        self.count += 1;
        self.count
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Serialize a JSON value, compact or with four-space indentation.
pub fn render_json(value: &Value, indent: bool) -> Result<String, DomainError> {
    if !indent {
        return serde_json::to_string(value).map_err(|e| DomainError::InvalidResponse(e.to_string()));
    }
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(JSON_INDENT));
    value
        .serialize(&mut ser)
        .map_err(|e| DomainError::InvalidResponse(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| DomainError::InvalidResponse(e.to_string()))
}

/// Longest prefix of `s` that fits in `max_bytes` without splitting a character.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Expand environment variables in a path string.
///
/// Supports:
/// - `$VAR` syntax
/// - `${VAR}` syntax
/// - `~` for home directory
///
/// Uses shellexpand crate for robust expansion.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_no_key_when_require_api_key_then_missing() {
        let config = Configuration::default();
        assert!(matches!(
            config.require_api_key(),
            Err(DomainError::MissingApiKey)
        ));
    }

    #[test]
    fn given_two_keys_when_set_then_last_wins() {
        let mut config = Configuration::default();
        config.set_api_key("k1");
        config.set_api_key("k2");
        assert_eq!(config.require_api_key().unwrap(), "k2");
    }

    #[test]
    fn given_key_when_masked_then_only_prefix_visible() {
        let mut config = Configuration::default();
        config.set_api_key("abcdefghij");
        assert_eq!(config.masked_api_key(), "abcd…(10)");
    }

    #[test]
    fn given_long_message_when_verbose_message_then_truncated() {
        let long = "x".repeat(400);
        let response = Response::new(json!({ "verbose_msg": long }));
        assert_eq!(response.verbose_message(VERBOSE_MSG_MAX_BYTES).len(), 255);
    }

    #[test]
    fn given_multibyte_message_when_truncated_then_char_boundary_kept() {
        // "é" is two bytes; 3 bytes would split the second one
        let response = Response::new(json!({ "verbose_msg": "éé" }));
        assert_eq!(response.verbose_message(3), "é");
    }

    #[test]
    fn given_missing_message_when_verbose_message_then_empty() {
        let response = Response::new(json!({ "response_code": 1 }));
        assert_eq!(response.verbose_message(VERBOSE_MSG_MAX_BYTES), "");
    }

    #[test]
    fn given_response_code_when_parsed_then_numeric() {
        assert_eq!(
            Response::new(json!({ "response_code": -2 })).response_code(),
            Some(-2)
        );
        assert_eq!(
            Response::new(json!({ "response_code": "1" })).response_code(),
            Some(1)
        );
        assert_eq!(Response::new(json!({})).response_code(), None);
    }

    #[test]
    fn given_object_when_rendered_indented_then_four_spaces() {
        let rendered = render_json(&json!({ "a": 1 }), true).unwrap();
        assert_eq!(rendered, "{\n    \"a\": 1\n}");
    }

    #[test]
    fn given_invalid_bytes_when_from_slice_then_invalid_response() {
        assert!(matches!(
            Response::from_slice(b"<html>"),
            Err(DomainError::InvalidResponse(_))
        ));
    }

    #[test]
    fn given_counter_when_advanced_then_counts_from_one() {
        let mut counter = ClusterCounter::new();
        assert_eq!(counter.advance(), 1);
        assert_eq!(counter.advance(), 2);
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn given_action_then_flag_names_it() {
        assert_eq!(Action::Download("h".into()).flag(), "--download");
        assert_eq!(Action::ClusterQuery("d".into()).flag(), "--clusters");
    }
}
