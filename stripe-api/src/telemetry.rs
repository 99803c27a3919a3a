use http_transport::telemetry::{env_filter_for, layer_for, level_directive_for};
use tracing::Level;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Target prefix of every event this crate emits, `stripe_api::requestor` included.
pub const TARGET_PREFIX: &str = "stripe_api";

/// Formatting layer that renders only Stripe client events.
///
/// Compose it in the binary next to the global subscriber.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    layer_for(TARGET_PREFIX)
}

/// `stripe_api=<level>` directive.
pub fn level_directive(level: Level) -> Result<Directive, ParseError> {
    level_directive_for(TARGET_PREFIX, level)
}

/// Filter from `RUST_LOG` (or `default`), with this crate raised to `level`.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    env_filter_for(TARGET_PREFIX, default, level)
}
