//! Tracing subscriber setup for the command-line tool

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the crate logs warnings, or debug output
/// with `verbose`. With a `log_file` the output is appended there instead of
/// going to stderr.
pub fn init(verbose: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let default_directive = if verbose { "cmma=debug" } else { "cmma=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into());

    let registry = tracing_subscriber::registry().with(filter);

    // try_init: a second call (tests, embedding) keeps the first subscriber
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init();
        }
        None => {
            let _ = registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init();
        }
    }
    Ok(())
}
