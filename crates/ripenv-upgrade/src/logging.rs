//! Diagnostic logging.
//!
//! Internal diagnostics use `tracing`; user-facing output goes through
//! [`crate::printer::Printer`]. The subscriber writes to stderr and honours
//! `RUST_LOG`, falling back to a level derived from `-v`.

use tracing_subscriber::EnvFilter;

/// The default filter for a `-v` count.
fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "ripenv_upgrade=warn",
        1 => "ripenv_upgrade=debug",
        _ => "ripenv_upgrade=trace",
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn setup_logging(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("off")
        } else {
            EnvFilter::new(default_directive(verbosity))
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .without_time()
        .try_init();
}
