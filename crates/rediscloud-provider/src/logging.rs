//! Tracing setup for the provider process
//!
//! The host owns stdout, so every log line goes to stderr. `RUST_LOG` wins;
//! otherwise `TF_LOG` picks the level for this crate and the core crate.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const HOST_LOG_ENV_VAR: &str = "TF_LOG";

/// Map a host log level to a filter directive
fn directive(level: &str) -> String {
    let level = match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "error" => "error",
        _ => "warn",
    };
    format!("rediscloud_provider={level},rediscloud_core={level}")
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var(HOST_LOG_ENV_VAR).unwrap_or_default();
        EnvFilter::new(directive(&level))
    })
}

/// Install the global subscriber. Returns false when one is already set.
pub fn try_init(json: bool) -> bool {
    let registry = tracing_subscriber::registry().with(filter());
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true).compact())
            .try_init()
    };
    result.is_ok()
}

pub fn init() {
    if !try_init(false) {
        tracing::debug!("Tracing subscriber already installed");
    }
}
