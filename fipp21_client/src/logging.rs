//! Structured logging configuration.
//!
//! Logs go to stderr so they never interleave with shell output on stdout.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,fipp21=info,hyper=warn,reqwest=warn";

/// Initialize structured logging
///
/// Levels are configurable via the `RUST_LOG` env var. Returns false if a
/// global subscriber was already installed.
///
/// # Example
///
/// ```no_run
/// use fipp21_client::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Client starting");
/// }
/// ```
pub fn init() -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Structured logging initialized");
    }
    installed
}
