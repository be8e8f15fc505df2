//! Logging integration for the waypoint routing engine.
//!
//! Provides a helper for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings). The engine itself only emits
//! `debug` events on the resolution path and a `warn` when a deprecated
//! compatibility path is exercised.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level`. In debug mode a pretty,
/// human-readable format is used; otherwise a structured JSON format.
/// Installing a second subscriber is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span covering one resolution or reverse call.
///
/// # Examples
///
/// ```
/// use waypoint_core::logging::resolution_span;
///
/// let span = resolution_span("resolve", "/articles/2024/");
/// let _guard = span.enter();
/// tracing::debug!("matching");
/// ```
pub fn resolution_span(operation: &str, subject: &str) -> tracing::Span {
    tracing::debug_span!("routing", op = operation, subject = subject)
}
