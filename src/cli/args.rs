//! CLI argument definitions using clap
//!
//! Every flag may be repeated and the order of flags matters, so parsing
//! happens in two passes. [`normalize`] rewrites argv into canonical
//! `--name[=value]` tokens: single-dash long flags and unique prefixes are
//! resolved, and unknown flags are set aside as [`Rejected`]. clap then
//! parses the canonical tokens and [`Invocation`] restores the command-line
//! order from clap's argument indices.
//!
//! Path values (`--filescan`, `--out`) stay `OsString` end to end, so empty
//! and non-UTF-8 paths reach the session unchanged and fail there, per
//! action, instead of aborting the whole command line.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

use clap::parser::Indices;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueHint};
use tracing::{debug, warn};

use crate::cli::{CliError, CliResult};
use crate::domain::Action;

/// Query a file-reputation service: scan files, fetch reports, rescan, list clusters, download samples
#[derive(Parser, Debug)]
#[command(name = "vtscan")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(
    override_usage = "vtscan --apikey <KEY> [--filescan <FILE>]... [--report <SHA/MD5>]... [--rescan <HASH>]... [--clusters <YYYY-MM-DD>]... [--out <FILE> --download <HASH>]..."
)]
pub struct Cli {
    /// Your API key. Must come before any action flag
    #[arg(long, value_name = "KEY")]
    pub apikey: Vec<String>,

    /// File to scan. May be given multiple times
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub filescan: Vec<OsString>,

    /// Rescan a previously submitted file
    #[arg(long, value_name = "HASH")]
    pub rescan: Vec<String>,

    /// Get the report for a hash or scan id
    #[arg(long, value_name = "SHA/MD5")]
    pub report: Vec<String>,

    /// Get the clusters computed for a day
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub clusters: Vec<String>,

    /// Download a sample into the --out file
    #[arg(long, value_name = "HASH")]
    pub download: Vec<String>,

    /// Output file for --download. Must come before it
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub out: Vec<OsString>,

    /// Print the verbosity level (informational)
    #[arg(
        long,
        value_name = "LEVEL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = ""
    )]
    pub verbose: Vec<String>,

    /// Print this help and stop
    #[arg(
        long,
        value_name = "TOPIC",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = ""
    )]
    pub help: Vec<String>,

    /// Arguments that are not flags
    #[arg(value_name = "ARGS", hide = true)]
    pub rest: Vec<String>,
}

/// Rendered usage text.
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

/// Why a command-line token was not turned into a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unrecognized,
    Ambiguous,
    MissingValue,
}

/// A flag-like token that could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// Number of recognized flags that preceded the token
    pub after: usize,
    /// The token as typed
    pub token: String,
    pub reason: RejectReason,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            RejectReason::Unrecognized => write!(f, "unrecognized option '{}'", self.token),
            RejectReason::Ambiguous => write!(f, "ambiguous option '{}'", self.token),
            RejectReason::MissingValue => {
                write!(f, "option '{}' requires an argument", self.token)
            }
        }
    }
}

/// Canonical argv plus the tokens that were set aside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedArgs {
    /// Program name followed by canonical tokens
    pub args: Vec<OsString>,
    pub rejected: Vec<Rejected>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    /// `--flag VALUE` or `--flag=VALUE`
    Required,
    /// `--flag` or `--flag=VALUE` only
    Optional,
}

#[derive(Debug)]
struct FlagSpec {
    name: String,
    value: ValueKind,
    /// Value is a path and is kept as raw `OsString`
    raw: bool,
}

enum Lookup<'a> {
    Found(&'a FlagSpec),
    Ambiguous,
    Unknown,
}

/// Long flags known to [`Cli`], read from the clap definition.
fn flag_specs() -> Vec<FlagSpec> {
    Cli::command()
        .get_arguments()
        .filter_map(|arg| {
            let name = arg.get_long()?;
            let value = if arg.is_require_equals_set() || !arg.get_action().takes_values() {
                ValueKind::Optional
            } else {
                ValueKind::Required
            };
            Some(FlagSpec {
                name: name.to_string(),
                value,
                raw: matches!(arg.get_value_hint(), ValueHint::FilePath),
            })
        })
        .collect()
}

/// Exact name first, then a unique prefix.
fn lookup<'a>(specs: &'a [FlagSpec], name: &str) -> Lookup<'a> {
    if name.is_empty() {
        return Lookup::Unknown;
    }
    if let Some(spec) = specs.iter().find(|s| s.name == name) {
        return Lookup::Found(spec);
    }
    let mut candidates = specs.iter().filter(|s| s.name.starts_with(name));
    match (candidates.next(), candidates.next()) {
        (Some(spec), None) => Lookup::Found(spec),
        (Some(_), Some(_)) => Lookup::Ambiguous,
        _ => Lookup::Unknown,
    }
}

/// Flag name (and inline value) of a flag-like token, `None` for plain arguments.
fn flag_body(token: &str) -> Option<&str> {
    if token.len() < 2 || !token.starts_with('-') {
        return None;
    }
    Some(token.strip_prefix("--").unwrap_or(&token[1..]))
}

/// Text of a non-path token; lossy conversion is logged.
fn lossy(token: OsString) -> String {
    match token.into_string() {
        Ok(text) => text,
        Err(raw) => {
            let text = raw.to_string_lossy().into_owned();
            warn!(token = %text, "argument is not valid UTF-8");
            text
        }
    }
}

/// Bytes after the first `=` of a flag token, unchanged.
#[cfg(unix)]
fn raw_inline_value(raw: &OsStr) -> Option<OsString> {
    use std::os::unix::ffi::OsStrExt;

    let bytes = raw.as_bytes();
    let at = bytes.iter().position(|b| *b == b'=')?;
    Some(OsStr::from_bytes(&bytes[at + 1..]).to_os_string())
}

#[cfg(not(unix))]
fn raw_inline_value(raw: &OsStr) -> Option<OsString> {
    let text = raw.to_string_lossy();
    text.split_once('=').map(|(_, value)| OsString::from(value))
}

/// Rewrite argv into canonical tokens.
///
/// - `-apikey K`, `--api K` and `--apikey=K` all become `--apikey=K`
/// - a required value is taken from the next token whatever it looks like
/// - path values are kept byte for byte, other text is made UTF-8
/// - `--` stops flag processing; the rest is passed through untouched
/// - unknown, ambiguous and value-less flags are removed and reported
pub fn normalize<I, T>(args: I) -> NormalizedArgs
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let specs = flag_specs();
    let mut iter = args.into_iter().map(Into::into);
    let mut normalized = NormalizedArgs::default();
    if let Some(program) = iter.next() {
        normalized.args.push(program);
    }

    let mut recognized = 0;
    while let Some(raw) = iter.next() {
        if raw.to_str() == Some("--") {
            normalized.args.push(raw);
            normalized
                .args
                .extend(iter.by_ref().map(|t| OsString::from(lossy(t))));
            break;
        }
        let token = raw.to_string_lossy().into_owned();
        let Some(body) = flag_body(&token) else {
            normalized.args.push(lossy(raw).into());
            continue;
        };
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(OsString::from(value))),
            None => (body, None),
        };

        let reject = |reason| Rejected {
            after: recognized,
            token: token.clone(),
            reason,
        };
        let spec = match lookup(&specs, name) {
            Lookup::Found(spec) => spec,
            Lookup::Ambiguous => {
                normalized.rejected.push(reject(RejectReason::Ambiguous));
                continue;
            }
            Lookup::Unknown => {
                normalized.rejected.push(reject(RejectReason::Unrecognized));
                continue;
            }
        };

        let value = match (spec.value, inline) {
            (_, Some(_)) if spec.raw => raw_inline_value(&raw),
            (_, Some(value)) => {
                if raw.to_str().is_none() {
                    warn!(token = %token, "argument is not valid UTF-8");
                }
                Some(value)
            }
            (ValueKind::Required, None) => match iter.next() {
                Some(value) if spec.raw => Some(value),
                Some(value) => Some(OsString::from(lossy(value))),
                None => {
                    normalized.rejected.push(reject(RejectReason::MissingValue));
                    continue;
                }
            },
            (ValueKind::Optional, None) => None,
        };
        let mut canonical = OsString::from(format!("--{}", spec.name));
        if let Some(value) = value {
            canonical.push("=");
            canonical.push(value);
        }
        normalized.args.push(canonical);
        recognized += 1;
    }

    normalized
}

/// One step of a run, in command-line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    ApiKey(String),
    OutputPath(PathBuf),
    /// `--verbose`, with the level if one was attached
    Verbose(Option<String>),
    Help,
    Run(Action),
    Rejected(Rejected),
}

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub directives: Vec<Directive>,
    /// Non-flag arguments, reported after all directives ran
    pub leftovers: Vec<String>,
}

impl Invocation {
    /// Parse argv (program name first).
    pub fn parse<I, T>(args: I) -> CliResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let normalized = normalize(args);
        debug!(args = ?normalized.args, rejected = normalized.rejected.len(), "normalized argv");
        let matches = Cli::command()
            .try_get_matches_from(&normalized.args)
            .map_err(|e| CliError::InvalidArgs(e.to_string()))?;
        let cli = Cli::from_arg_matches(&matches).map_err(|e| CliError::InvalidArgs(e.to_string()))?;
        Ok(Self::assemble(cli, &matches, normalized.rejected))
    }

    fn assemble(cli: Cli, matches: &ArgMatches, rejected: Vec<Rejected>) -> Self {
        let mut ordered = Vec::new();
        push_ordered(&mut ordered, matches.indices_of("apikey"), cli.apikey, Directive::ApiKey);
        push_ordered(&mut ordered, matches.indices_of("out"), cli.out, |path| {
            Directive::OutputPath(PathBuf::from(path))
        });
        push_ordered(&mut ordered, matches.indices_of("filescan"), cli.filescan, |path| {
            Directive::Run(Action::Scan(PathBuf::from(path)))
        });
        push_ordered(&mut ordered, matches.indices_of("rescan"), cli.rescan, |hash| {
            Directive::Run(Action::Rescan(hash))
        });
        push_ordered(&mut ordered, matches.indices_of("report"), cli.report, |resource| {
            Directive::Run(Action::Report(resource))
        });
        push_ordered(&mut ordered, matches.indices_of("clusters"), cli.clusters, |date| {
            Directive::Run(Action::ClusterQuery(date))
        });
        push_ordered(&mut ordered, matches.indices_of("download"), cli.download, |hash| {
            Directive::Run(Action::Download(hash))
        });
        push_ordered(&mut ordered, matches.indices_of("verbose"), cli.verbose, |level| {
            Directive::Verbose(Some(level).filter(|l| !l.is_empty()))
        });
        push_ordered(&mut ordered, matches.indices_of("help"), cli.help, |_| Directive::Help);
        ordered.sort_by_key(|(index, _)| *index);

        // put rejected tokens back between the recognized flags they sat between
        let mut rejected = rejected.into_iter().peekable();
        let mut directives = Vec::with_capacity(ordered.len() + rejected.len());
        for (position, (_, directive)) in ordered.into_iter().enumerate() {
            while let Some(r) = rejected.next_if(|r| r.after <= position) {
                directives.push(Directive::Rejected(r));
            }
            directives.push(directive);
        }
        directives.extend(rejected.map(Directive::Rejected));

        Self {
            directives,
            leftovers: cli.rest,
        }
    }
}

fn push_ordered<T>(
    ordered: &mut Vec<(usize, Directive)>,
    indices: Option<Indices<'_>>,
    values: Vec<T>,
    make: impl Fn(T) -> Directive,
) {
    if let Some(indices) = indices {
        ordered.extend(indices.zip(values).map(|(index, value)| (index, make(value))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_known_flags_then_specs_have_value_kinds() {
        let specs = flag_specs();
        let kind = |name: &str| specs.iter().find(|s| s.name == name).map(|s| s.value);
        assert_eq!(kind("apikey"), Some(ValueKind::Required));
        assert_eq!(kind("verbose"), Some(ValueKind::Optional));
        assert_eq!(kind("help"), Some(ValueKind::Optional));
    }

    #[test]
    fn given_prefixes_then_lookup_resolves_unique_only() {
        let specs = flag_specs();
        assert!(matches!(lookup(&specs, "file"), Lookup::Found(s) if s.name == "filescan"));
        assert!(matches!(lookup(&specs, "re"), Lookup::Ambiguous));
        assert!(matches!(lookup(&specs, "bogus"), Lookup::Unknown));
        assert!(matches!(lookup(&specs, ""), Lookup::Unknown));
    }

    #[test]
    fn given_tokens_then_flag_body_strips_dashes() {
        assert_eq!(flag_body("--apikey"), Some("apikey"));
        assert_eq!(flag_body("-apikey"), Some("apikey"));
        assert_eq!(flag_body("-"), None);
        assert_eq!(flag_body("file.exe"), None);
    }
}
