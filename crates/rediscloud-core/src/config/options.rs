//! HTTP client options
//!
//! Serde-friendly so hosts that pass provider configuration as JSON can
//! override individual knobs and leave the rest at their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options applied to the shared HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Page size used when listing databases
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Interval between polls of a task endpoint, in milliseconds
    #[serde(default = "default_task_poll_interval")]
    pub task_poll_interval_ms: u64,

    /// Sleep before the first status refresh of a state wait, in milliseconds
    #[serde(default = "default_wait_delay")]
    pub wait_delay_ms: u64,

    /// Interval between status refreshes of slow transitions, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Interval between status refreshes of fast transitions, in milliseconds
    #[serde(default = "default_fast_poll_interval")]
    pub fast_poll_interval_ms: u64,
}

impl ClientOptions {
    pub fn task_poll_interval(&self) -> Duration {
        Duration::from_millis(self.task_poll_interval_ms)
    }

    pub fn wait_delay(&self) -> Duration {
        Duration::from_millis(self.wait_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fast_poll_interval(&self) -> Duration {
        Duration::from_millis(self.fast_poll_interval_ms)
    }

    /// Options with every wait interval set to zero, for tests against a mock server
    pub fn immediate() -> Self {
        Self {
            task_poll_interval_ms: 0,
            wait_delay_ms: 0,
            poll_interval_ms: 0,
            fast_poll_interval_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            page_size: default_page_size(),
            task_poll_interval_ms: default_task_poll_interval(),
            wait_delay_ms: default_wait_delay(),
            poll_interval_ms: default_poll_interval(),
            fast_poll_interval_ms: default_fast_poll_interval(),
        }
    }
}

// Default value functions for serde
fn default_user_agent() -> String {
    format!("rediscloud-provider/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    120
}

fn default_page_size() -> u32 {
    100
}

fn default_task_poll_interval() -> u64 {
    10_000
}

fn default_wait_delay() -> u64 {
    10_000
}

fn default_poll_interval() -> u64 {
    30_000
}

fn default_fast_poll_interval() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_options_keep_defaults() {
        let options: ClientOptions = serde_json::from_str(r#"{"page_size": 25}"#).unwrap();
        assert_eq!(options.page_size, 25);
        assert_eq!(options.request_timeout_secs, 120);
        assert!(options.user_agent.starts_with("rediscloud-provider/"));
        assert_eq!(options.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_immediate_zeroes_waits_only() {
        let options = ClientOptions::immediate();
        assert!(options.wait_delay().is_zero());
        assert!(options.task_poll_interval().is_zero());
        assert_eq!(options.page_size, 100);
    }
}
