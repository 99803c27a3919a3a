//! Log formatting shared by the API client crates.
//!
//! Each client crate tags its events with its own target prefix
//! (`graph_api`, `stripe_api`) and builds its layer here from that prefix.

use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// RFC3339 UTC timer, e.g. `2025-09-12T10:20:30Z`.
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Formatting layer that renders only events whose target starts with
/// `prefix`.
///
/// Compact single-line output on stderr with `file:line`, ANSI colors only on a
/// terminal.
pub fn layer_for<S>(prefix: &'static str) -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stderr().is_terminal();
    let only_prefix = filter::filter_fn(move |meta| meta.target().starts_with(prefix));

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stderr)
        .with_ansi(use_ansi)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(only_prefix)
}

/// `<prefix>=<level>` directive.
pub fn level_directive_for(prefix: &str, level: Level) -> Result<Directive, filter::ParseError> {
    Directive::from_str(&format!("{prefix}={}", level.as_str().to_lowercase()))
}

/// Filter from `RUST_LOG` (or `default`), with `prefix` raised to `level`.
pub fn env_filter_for(prefix: &str, default: &str, level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    match level_directive_for(prefix, level) {
        Ok(directive) => base.add_directive(directive),
        Err(_) => base,
    }
}
