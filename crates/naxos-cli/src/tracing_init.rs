//! Log output for the `naxos` binary.
//!
//! Run reports go to stdout, so every log line is written to stderr. The
//! level comes from `RUST_LOG` when set and from the config's `log_level`
//! otherwise; `--log-json` switches the lines to JSON objects.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Call once, before any session work.
pub fn init_tracing(log_level: &str, log_json: bool) {
    let filter = build_filter(log_level, std::env::var("RUST_LOG").ok());
    let text = (!log_json).then(|| fmt::layer().with_writer(std::io::stderr));
    let json = log_json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

/// `RUST_LOG` wins over the configured level.
fn build_filter(log_level: &str, rust_log: Option<String>) -> EnvFilter {
    EnvFilter::new(rust_log.unwrap_or_else(|| log_level.to_string()))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_applies_without_rust_log() {
        assert_eq!(build_filter("debug", None).to_string(), "debug");
    }

    #[test]
    fn rust_log_overrides_configured_level() {
        let filter = build_filter("info", Some("naxos_crypto=trace".into()));
        assert_eq!(filter.to_string(), "naxos_crypto=trace");
    }
}
