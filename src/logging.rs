//! Log setup for the binary.
//!
//! `RUST_LOG` wins when set; otherwise the level name given on the command line (or in
//! `LOG_LEVEL`) is mapped onto a `tracing` filter:
//!
//! | Name                  | Filter  |
//! |-----------------------|---------|
//! | `CRITICAL`, `FATAL`, `ERROR` | `error` |
//! | `WARNING`, `WARN`     | `warn`  |
//! | `INFO`                | `info`  |
//! | `DEBUG`               | `debug` |
//! | `TRACE`               | `trace` |
//! | anything else         | `info`  |

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Maps a level name (any case) onto a `tracing` filter directive.
pub fn level_directive(name: &str) -> &'static str {
    match name.trim().to_ascii_uppercase().as_str() {
        "CRITICAL" | "FATAL" | "ERROR" => "error",
        "WARNING" | "WARN" => "warn",
        "DEBUG" => "debug",
        "TRACE" => "trace",
        _ => "info",
    }
}

/// Installs the global `tracing` subscriber. Safe to call more than once.
pub fn init(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_directive(level)));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
