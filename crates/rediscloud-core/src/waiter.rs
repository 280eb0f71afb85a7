//! State-change waiter
//!
//! Converts an eventually-consistent remote resource into a synchronous
//! call: refresh the resource until its state tag reaches a target set.
//!
//! ```text
//! delay ──► refresh ──► state ∈ target ─────────► Ok
//!              ▲           state ∈ pending ──┐
//!              └──── poll_interval ◄─────────┘
//!                          otherwise ────────────► UnexpectedState
//! ```
//!
//! A not-found error from `refresh` counts as reaching [`STATE_DELETED`]
//! when that tag is part of the target set.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::context::OperationContext;
use crate::error::{CoreError, Result};

/// Synthetic state reported when the resource is gone
pub const STATE_DELETED: &str = "deleted";

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Poll interval for transitions that usually finish in seconds
pub const FAST_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Waiter configuration
#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    /// Initial sleep before the first refresh
    pub delay: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl WaitConfig {
    pub fn new<P, T>(pending: P, target: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            delay: Duration::from_secs(10),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: Duration::from_secs(30 * 60),
        }
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn is_target(&self, state: &str) -> bool {
        self.target.iter().any(|t| t == state)
    }

    fn is_pending(&self, state: &str) -> bool {
        self.pending.iter().any(|p| p == state)
    }
}

/// Result of one refresh: the observed value and its state tag
#[derive(Debug, Clone)]
pub struct Observed<T> {
    pub value: Option<T>,
    pub state: String,
}

impl<T> Observed<T> {
    pub fn new(value: T, state: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            state: state.into(),
        }
    }

    /// An observation with only a state tag
    pub fn state(state: impl Into<String>) -> Self {
        Self {
            value: None,
            state: state.into(),
        }
    }
}

/// Poll `refresh` until the state tag enters the target set
///
/// Errors:
/// - [`CoreError::UnexpectedState`] when the tag is neither pending nor target
/// - [`CoreError::TaskTimeout`] when `timeout` elapses (includes the last tag)
/// - [`CoreError::Cancelled`] when the context is cancelled
/// - any non-retryable error returned by `refresh`
pub async fn wait_for_state<T, F, Fut>(
    ctx: &OperationContext,
    config: &WaitConfig,
    mut refresh: F,
) -> Result<Observed<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observed<T>>>,
{
    let start = Instant::now();
    let mut last_state = String::from("unknown");
    // Every sleep and refresh below ends at the wait deadline
    let ctx = ctx.with_timeout(config.timeout);

    if !config.delay.is_zero() {
        ctx.sleep(config.delay).await.map_err(|e| timeout_or(e, config, &last_state))?;
    }

    loop {
        if start.elapsed() >= config.timeout {
            return Err(CoreError::TaskTimeout {
                timeout: config.timeout,
                last_state,
            });
        }

        match ctx.run(refresh()).await {
            Ok(observed) => {
                trace!(state = %observed.state, "Refreshed");
                if config.is_target(&observed.state) {
                    debug!(state = %observed.state, elapsed_secs = start.elapsed().as_secs(), "Reached target state");
                    return Ok(observed);
                }
                if !config.is_pending(&observed.state) {
                    return Err(CoreError::UnexpectedState {
                        state: observed.state,
                        target: config.target.clone(),
                    });
                }
                last_state = observed.state;
            }
            Err(e) if e.is_not_found() && config.is_target(STATE_DELETED) => {
                debug!("Resource no longer exists, treating as deleted");
                return Ok(Observed::state(STATE_DELETED));
            }
            Err(e) if e.is_retryable() => {
                debug!(error = %e, "Transient error while waiting, polling again");
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) if e.is_timeout() && ctx.is_done() => {
                return Err(timeout_or(e, config, &last_state));
            }
            Err(e) => return Err(e),
        }

        ctx.sleep(config.poll_interval)
            .await
            .map_err(|e| timeout_or(e, config, &last_state))?;
    }
}

/// Replace a context deadline error with one that carries the last state
fn timeout_or(err: CoreError, config: &WaitConfig, last_state: &str) -> CoreError {
    if err.is_timeout() {
        CoreError::TaskTimeout {
            timeout: config.timeout,
            last_state: last_state.to_string(),
        }
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceFamily;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast(pending: &[&str], target: &[&str]) -> WaitConfig {
        WaitConfig::new(pending.iter().copied(), target.iter().copied())
            .delay(Duration::ZERO)
            .poll_interval(Duration::from_millis(5))
            .timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_reaches_target_after_pending() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = fast(&["pending"], &["active"]);

        let observed = wait_for_state(&OperationContext::background(), &config, || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let state = if n < 2 { "pending" } else { "active" };
                Ok(Observed::new(n, state))
            }
        })
        .await
        .unwrap();

        assert_eq!(observed.state, "active");
        assert_eq!(observed.value, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unexpected_state_fails() {
        let config = fast(&["pending"], &["active"]);
        let err = wait_for_state(&OperationContext::background(), &config, || async {
            Ok(Observed::<()>::state("error"))
        })
        .await
        .unwrap_err();

        match err {
            CoreError::UnexpectedState { state, target } => {
                assert_eq!(state, "error");
                assert_eq!(target, vec!["active".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_found_counts_as_deleted_only_when_targeted() {
        let deleting = fast(&["deleting"], &[STATE_DELETED]);
        let observed = wait_for_state(&OperationContext::background(), &deleting, || async {
            Err::<Observed<()>, _>(CoreError::not_found(ResourceFamily::Database, "gone"))
        })
        .await
        .unwrap();
        assert_eq!(observed.state, STATE_DELETED);

        let activating = fast(&["pending"], &["active"]);
        let err = wait_for_state(&OperationContext::background(), &activating, || async {
            Err::<Observed<()>, _>(CoreError::not_found(ResourceFamily::Database, "gone"))
        })
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_transient_errors_keep_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = fast(&["pending"], &["active"]);

        let observed = wait_for_state(&OperationContext::background(), &config, || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(CoreError::Cloud(redis_cloud::CloudError::ApiError {
                        code: 502,
                        message: "Bad Gateway".to_string(),
                    }))
                } else {
                    Ok(Observed::<()>::state("active"))
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(observed.state, "active");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_last_state() {
        let config = WaitConfig::new(["pending"], ["active"])
            .delay(Duration::ZERO)
            .poll_interval(Duration::from_secs(30))
            .timeout(Duration::from_secs(60));

        let err = wait_for_state(&OperationContext::background(), &config, || async {
            Ok(Observed::<()>::state("pending"))
        })
        .await
        .unwrap_err();

        match err {
            CoreError::TaskTimeout { last_state, .. } => assert_eq!(last_state, "pending"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_sleep_and_refresh() {
        let config = WaitConfig::new(["pending"], ["active"])
            .delay(Duration::ZERO)
            .poll_interval(Duration::from_secs(600))
            .timeout(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let started = Instant::now();

        let err = wait_for_state(&OperationContext::background(), &config, || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(Observed::<()>::state("pending"))
                } else {
                    // a refresh that never answers
                    std::future::pending().await
                }
            }
        })
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() <= Duration::from_secs(61));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let hanging = WaitConfig::new(["pending"], ["active"])
            .delay(Duration::ZERO)
            .timeout(Duration::from_secs(30));
        let started = Instant::now();
        let err = wait_for_state(&OperationContext::background(), &hanging, || async {
            std::future::pending::<Result<Observed<()>>>().await
        })
        .await
        .unwrap_err();
        match err {
            CoreError::TaskTimeout { timeout, .. } => assert_eq!(timeout, Duration::from_secs(30)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(started.elapsed() <= Duration::from_secs(31));
    }

    #[tokio::test]
    async fn test_cancellation_stops_waiting() {
        let ctx = OperationContext::background();
        let config = fast(&["pending"], &["active"]).poll_interval(Duration::from_secs(60));
        let canceller = ctx.clone();

        let handle = tokio::spawn(async move {
            wait_for_state(&ctx, &config, || async {
                Ok(Observed::<()>::state("pending"))
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }
}
