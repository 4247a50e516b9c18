//! Scan session: runs actions against the reputation service
//!
//! A session owns the per-run [`Configuration`] and the output sink. Actions
//! are executed one at a time, in the order they are handed in. Missing
//! preconditions abort the run; failed client calls are printed and the
//! session carries on with the next action.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::application::hash;
use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{
    expand_env_vars, render_json, Action, ClusterCounter, Configuration, RescanOptions,
    Response, VERBOSE_MSG_MAX_BYTES,
};
use crate::infrastructure::traits::ReputationClient;
use crate::infrastructure::InfraError;

/// Sequential action runner bound to one client and one output sink.
pub struct ScanSession<W: Write> {
    client: Arc<dyn ReputationClient>,
    config: Configuration,
    out: W,
}

impl<W: Write> ScanSession<W> {
    /// Create a session with an empty configuration.
    pub fn new(client: Arc<dyn ReputationClient>, out: W) -> Self {
        Self {
            client,
            config: Configuration::default(),
            out,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Output sink, for callers that print around actions.
    pub fn output(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn set_api_key(&mut self, key: &str) {
        self.config.set_api_key(key);
        info!(api_key = %self.config.masked_api_key(), "API key set");
    }

    /// Set the download destination; `~` and `$VAR` are expanded.
    ///
    /// A path that is not valid UTF-8 is kept as given.
    pub fn set_output_path(&mut self, path: &Path) {
        let expanded = match path.to_str() {
            Some(text) => PathBuf::from(expand_env_vars(text)),
            None => path.to_path_buf(),
        };
        info!(path = %expanded.display(), "output path set");
        self.config.set_output_path(expanded);
    }

    /// Record `--verbose[=LEVEL]`. Informational only.
    pub fn set_verbosity(&mut self, level: Option<&str>) -> ApplicationResult<()> {
        writeln!(self.out, " verbose selected").or_output_error()?;
        if let Some(level) = level {
            writeln!(self.out, " verbose level {}", level).or_output_error()?;
            self.config.verbosity = Some(level.to_string());
        }
        Ok(())
    }

    /// Run one action.
    ///
    /// # Errors
    /// `MissingApiKey` / `MissingOutputPath` when a precondition is not met;
    /// the client is not called in that case. Client failures are printed as
    /// `Error: <code>` and are not returned.
    pub fn run(&mut self, action: &Action) -> ApplicationResult<()> {
        let key = self.config.require_api_key()?.to_owned();
        match action {
            Action::Scan(path) => self.scan(&key, path),
            Action::Rescan(hash) => self.rescan(&key, hash),
            Action::Report(resource) => self.report(&key, resource),
            Action::ClusterQuery(date) => self.clusters(&key, date),
            Action::Download(hash) => {
                let out_path = self.config.require_output_path()?.to_path_buf();
                self.download(&key, hash, &out_path)
            }
        }
    }

    #[instrument(level = "debug", skip(self, key))]
    fn scan(&mut self, key: &str, path: &Path) -> ApplicationResult<()> {
        if let Ok(digest) = hash::file_sha256(path) {
            debug!(sha256 = %digest, "uploading file");
        }
        let result = self.client.scan(key, path);
        debug!(ok = result.is_ok(), "scan returned");
        match result {
            Ok(response) => self.print_response(&response),
            Err(e) => self.print_failure("--filescan", &e),
        }
    }

    #[instrument(level = "debug", skip(self, key))]
    fn rescan(&mut self, key: &str, hash: &str) -> ApplicationResult<()> {
        let result = self.client.rescan(key, hash, &RescanOptions::default());
        debug!(ok = result.is_ok(), "rescan returned");
        match result {
            Ok(response) => self.print_response(&response),
            Err(e) => self.print_failure("--rescan", &e),
        }
    }

    #[instrument(level = "debug", skip(self, key))]
    fn report(&mut self, key: &str, resource: &str) -> ApplicationResult<()> {
        let result = self.client.report(key, resource);
        debug!(ok = result.is_ok(), "report returned");
        let response = match result {
            Ok(response) => response,
            Err(e) => return self.print_failure("--report", &e),
        };
        self.print_response(&response)?;
        writeln!(
            self.out,
            "Msg: {}",
            response.verbose_message(VERBOSE_MSG_MAX_BYTES)
        )
        .or_output_error()?;
        if let Some(code) = response.response_code() {
            writeln!(self.out, "response code: {}", code).or_output_error()?;
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self, key))]
    fn clusters(&mut self, key: &str, date: &str) -> ApplicationResult<()> {
        let mut counter = ClusterCounter::new();
        let mut write_error = None;
        let out = &mut self.out;
        let result = self.client.clusters(key, date, &mut |item: &Value| {
            let n = counter.advance();
            if write_error.is_none() {
                write_error = write_cluster_item(&mut *out, n, item).err();
            }
        });
        debug!(items = counter.count(), ok = result.is_ok(), "clusters returned");
        if let Some(e) = write_error {
            return Err(e).or_output_error();
        }
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.print_failure("--clusters", &e),
        }
    }

    #[instrument(level = "debug", skip(self, key))]
    fn download(&mut self, key: &str, hash: &str, out_path: &Path) -> ApplicationResult<()> {
        let result = self.client.download(key, hash, out_path);
        debug!(ok = result.is_ok(), "download returned");
        match result {
            Ok(()) => {
                check_download(out_path, hash);
                Ok(())
            }
            Err(e) => self.print_failure("--download", &e),
        }
    }

    fn print_response(&mut self, response: &Response) -> ApplicationResult<()> {
        match response.to_json(true) {
            Ok(json) => writeln!(self.out, "Response:\n{}", json).or_output_error(),
            Err(e) => {
                warn!(error = %e, "cannot render response");
                Ok(())
            }
        }
    }

    fn print_failure(&mut self, flag: &str, err: &InfraError) -> ApplicationResult<()> {
        warn!(flag, error = %err, "request failed");
        writeln!(self.out, "Error: {}", err.status_code()).or_output_error()
    }
}

fn write_cluster_item<W: Write>(out: &mut W, n: usize, item: &Value) -> std::io::Result<()> {
    let json = render_json(item, true).unwrap_or_else(|_| item.to_string());
    writeln!(out, "------------- Result {} ----------------", n)?;
    writeln!(out, "{}", json)?;
    writeln!(out)
}

fn check_download(path: &Path, requested: &str) {
    match hash::verify_download(path, requested) {
        Ok(Some(false)) => warn!(
            path = %path.display(),
            requested,
            "downloaded file does not match requested hash"
        ),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "cannot verify downloaded file"),
    }
}
