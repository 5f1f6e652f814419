//! Diagnostics setup.
//!
//! Diagnostics go to stderr through `tracing`; trace records are program
//! output and never pass through here. Verbosity is controlled with the
//! `JNATIVETRACER_LOG` environment variable in `EnvFilter` syntax.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the diagnostics filter.
pub const LOG_ENV: &str = "JNATIVETRACER_LOG";

const DEFAULT_FILTER: &str = "jnativetracer=info";

/// Installs the stderr subscriber.
///
/// Does nothing if the embedding process already installed a global
/// subscriber, so it is safe to call on every load.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .try_init();
}
