//! Per-subscription mutation serializer
//!
//! The Cloud API rejects concurrent mutations against one subscription, so
//! every create/update/delete first takes the subscription's lock. Entries
//! are never removed: a waiter may still hold a clone of the inner mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, trace};

use crate::context::OperationContext;
use crate::error::Result;

/// Keyed async mutex over subscription IDs
#[derive(Debug, Default)]
pub struct SubscriptionLocks {
    entries: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

/// Exclusive hold on one subscription, released on drop
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription_id: i64,
    _guard: OwnedMutexGuard<()>,
}

impl SubscriptionGuard {
    pub fn subscription_id(&self) -> i64 {
        self.subscription_id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        trace!(subscription_id = self.subscription_id, "Released subscription lock");
    }
}

impl SubscriptionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide lock table shared by every resource controller
    pub fn global() -> Arc<SubscriptionLocks> {
        static GLOBAL: OnceLock<Arc<SubscriptionLocks>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(SubscriptionLocks::new())).clone()
    }

    fn entry(&self, subscription_id: i64) -> Arc<AsyncMutex<()>> {
        // A poisoned table only means another thread panicked mid-insert;
        // the map itself is still usable.
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .entry(subscription_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Block until the subscription is exclusively held or the context ends
    pub async fn lock(&self, ctx: &OperationContext, subscription_id: i64) -> Result<SubscriptionGuard> {
        let mutex = self.entry(subscription_id);
        debug!(subscription_id, "Waiting for subscription lock");
        let guard = ctx.run(async { Ok(mutex.lock_owned().await) }).await?;
        debug!(subscription_id, "Acquired subscription lock");
        Ok(SubscriptionGuard {
            subscription_id,
            _guard: guard,
        })
    }

    /// Number of subscriptions ever locked in this table
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|e| e.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_subscription_is_serialized() {
        let locks = Arc::new(SubscriptionLocks::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(&OperationContext::background(), 42).await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_different_subscriptions_do_not_block() {
        let locks = SubscriptionLocks::new();
        let ctx = OperationContext::background();

        let first = locks.lock(&ctx, 1).await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), locks.lock(&ctx, 2))
            .await
            .expect("second subscription should not wait")
            .unwrap();

        assert_eq!(first.subscription_id(), 1);
        assert_eq!(second.subscription_id(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_gives_up_and_lock_is_released_on_drop() {
        let locks = SubscriptionLocks::new();
        let holder_ctx = OperationContext::background();
        let held = locks.lock(&holder_ctx, 7).await.unwrap();

        let waiter_ctx = OperationContext::background();
        waiter_ctx.cancel();
        let err = locks.lock(&waiter_ctx, 7).await.unwrap_err();
        assert!(err.is_cancelled());

        drop(held);
        let again = tokio::time::timeout(Duration::from_secs(1), locks.lock(&holder_ctx, 7))
            .await
            .expect("lock should be free after drop");
        assert!(again.is_ok());
        assert_eq!(locks.len(), 1);
    }
}
