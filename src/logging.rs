use std::io;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "DECLUTTER_LOG";

/// Send diagnostics to stderr so they never mix with command output.
///
/// `DECLUTTER_LOG` takes an `EnvFilter` directive; `--verbose` forces debug.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("declutter=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}
