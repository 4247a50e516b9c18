//! Command execution: feeds parsed directives to a scan session in order

use std::ffi::OsString;
use std::io::Write;

use tracing::{debug, instrument};

use crate::application::IoResultExt;
use crate::cli::args::{usage, Directive, Invocation};
use crate::cli::CliResult;
use crate::infrastructure::di::ServiceContainer;

/// Run a full command line.
///
/// Without arguments only the usage is printed and `connect` is never
/// called. Otherwise the arguments are parsed first, then `connect` builds
/// the services and every directive runs in command-line order.
pub fn run<W, F>(args: Vec<OsString>, out: &mut W, connect: F) -> CliResult<()>
where
    W: Write,
    F: FnOnce() -> CliResult<ServiceContainer>,
{
    if args.len() < 2 {
        write!(out, "{}", usage()).or_output_error()?;
        return Ok(());
    }
    let invocation = Invocation::parse(args)?;
    let container = connect()?;
    execute(&invocation, &container, out)
}

/// Execute parsed directives against one session.
///
/// Stops at the first `--help` or at the first action whose precondition is
/// missing. Leftover non-flag arguments are listed once all directives ran.
#[instrument(skip_all, fields(directives = invocation.directives.len()))]
pub fn execute<W: Write>(
    invocation: &Invocation,
    container: &ServiceContainer,
    out: W,
) -> CliResult<()> {
    debug!(base_url = %container.settings.base_url, "starting session");
    let mut session = container.session(out);

    for directive in &invocation.directives {
        match directive {
            Directive::ApiKey(key) => session.set_api_key(key),
            Directive::OutputPath(path) => session.set_output_path(path),
            Directive::Verbose(level) => session.set_verbosity(level.as_deref())?,
            Directive::Help => {
                write!(session.output(), "{}", usage()).or_output_error()?;
                debug!("help requested, remaining arguments ignored");
                return Ok(());
            }
            Directive::Run(action) => {
                debug!(flag = action.flag(), "running action");
                session.run(action)?;
            }
            Directive::Rejected(rejected) => {
                writeln!(session.output(), "?? {} ??", rejected).or_output_error()?;
            }
        }
    }

    if !invocation.leftovers.is_empty() {
        writeln!(
            session.output(),
            "non-option ARGV-elements: {}",
            invocation.leftovers.join(" ")
        )
        .or_output_error()?;
    }
    Ok(())
}
