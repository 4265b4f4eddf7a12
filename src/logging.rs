use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

use crate::util::env::env_flag;

/// Installs the global fmt subscriber shared by every binary.
///
/// `RUST_LOG` wins over `default_filter`. With `LOG_SPANS=true` each closed span
/// (a refresh run, a source fetch) also logs its busy/idle timings.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let span_events = if env_flag("LOG_SPANS", false) {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
