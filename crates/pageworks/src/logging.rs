//! Tracing bootstrap for test binaries.
//!
//! pageworks only emits `tracing` events; nothing is printed until a
//! subscriber is installed. Call [`init_logging`] from a test or harness
//! `main`. `RUST_LOG` takes precedence over the default directive.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines, written through the test writer
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install a global subscriber.
///
/// Returns `false` when one was already installed (by an earlier call or
/// by another crate); the existing subscriber is kept.
pub fn init_logging(default_directive: &str, format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_test_writer().with_target(true))
            .try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    installed.is_ok()
}
