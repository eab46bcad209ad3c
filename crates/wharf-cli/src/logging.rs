//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter, `RUST_LOG` is the fallback
pub const LOG_ENV: &str = "WHARF_LOG";

/// Install the global subscriber, logging to stderr
///
/// Output printed by the actions goes to stdout, so the default level only
/// lets warnings through. `--debug` raises it to debug regardless of the
/// environment.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .with_level(true)
        .compact();

    // A second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
