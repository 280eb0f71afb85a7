//! Per-operation context: cancellation plus an optional deadline.
//!
//! Every blocking point (waiter sleeps, subscription lock acquisition, HTTP
//! calls issued from the waiter) races against [`OperationContext::done`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, Result};

/// Cancellation and deadline carried through a single CRUD callback
#[derive(Debug, Clone)]
pub struct OperationContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::background()
    }
}

impl OperationContext {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A context bound to an externally owned cancellation token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a child context whose deadline is at most `timeout` from now.
    /// Cancelling the parent cancels the child.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and every child derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancelled or past the deadline
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline, if any
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The error a blocking point reports once the context is done
    pub fn err(&self) -> CoreError {
        if self.token.is_cancelled() {
            CoreError::Cancelled
        } else {
            CoreError::TaskTimeout {
                timeout: Duration::ZERO,
                last_state: "deadline exceeded".to_string(),
            }
        }
    }

    /// Resolves when the context is cancelled or its deadline passes
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Sleep for `duration`, returning early with an error if the context ends first
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.done() => Err(self.err()),
        }
    }

    /// Run a future to completion unless the context ends first
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            res = fut => res,
            _ = self.done() => Err(self.err()),
        }
    }
}
