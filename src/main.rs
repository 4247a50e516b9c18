use std::ffi::OsString;
use std::{env, io, process};

use tracing::debug;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use vtscan::cli::commands::run;
use vtscan::cli::{output, CliResult};
use vtscan::config::Settings;
use vtscan::infrastructure::di::ServiceContainer;

fn main() {
    let args: Vec<OsString> = env::args_os().collect();

    let result = {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        run(args, &mut out, connect)
    };

    if let Err(e) = result {
        if e.is_precondition() {
            println!("{}", e);
        } else {
            output::error(&e);
        }
        process::exit(e.exit_code());
    }
}

/// Load settings, start logging and build the services.
fn connect() -> CliResult<ServiceContainer> {
    let settings = Settings::load()?;

    let filter = settings.level_filter().unwrap_or_else(|| {
        output::warning(&format!(
            "unknown log_level {:?}, using warn",
            settings.log_level
        ));
        LevelFilter::WARN
    });
    setup_logging(filter);
    debug!("effective settings:\n{}", settings.to_toml()?);

    Ok(ServiceContainer::new(settings)?)
}

fn setup_logging(filter: LevelFilter) {
    // Create a noisy module filter
    let noisy_modules = ["hyper", "reqwest", "rustls"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    // Create a subscriber with formatted output directed to stderr
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr) // Set writer first
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::ENTER)
        .with_span_events(FmtSpan::CLOSE);

    // Apply filters to the layer
    let filtered_layer = fmt_layer.with_filter(filter).with_filter(module_filter);

    tracing_subscriber::registry().with(filtered_layer).init();

    match filter {
        LevelFilter::INFO => tracing::info!("Log level: info"),
        LevelFilter::DEBUG => tracing::debug!("Log level: debug"),
        LevelFilter::TRACE => tracing::debug!("Log level: trace"),
        _ => {}
    }
}
