//! Diagnostics setup.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber writing to stderr.
///
/// `verbose` raises the level from `info` to `debug`. Does nothing if a
/// subscriber is already installed.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
