//! Tracing setup shared by the Tollgate binaries.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Honours `RUST_LOG` (info by default); `TG_LOG_JSON=true` switches to
/// JSON lines for log shippers.
pub fn init() {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let json = std::env::var("TG_LOG_JSON")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
