//! Submit-and-settle sequences for Pro and Active-Active resources
//!
//! These workflows compose the family handlers (and, for deletes, the
//! `redis-cloud` handlers directly) with the task poller and the state
//! waiter: "submit, poll the task, wait for the resource to settle".
//! Resource controllers call them while holding the subscription lock.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::status;
use crate::api::acl::AclHandler;
use crate::api::cloud_accounts::CloudAccountHandler;
use crate::api::databases::{Database, DatabaseHandler, DatabaseRequest};
use crate::api::fixed::{FixedDatabase, FixedDatabaseHandler, FixedSubscription, FixedSubscriptionHandler};
use crate::api::psc::{PscEndpoint, PscHandler, PscScope};
use crate::api::subscriptions::{Subscription, SubscriptionHandler};
use crate::api::tasks::TaskStateUpdate;
use crate::api::api_id;
use crate::client::CloudClient;
use crate::context::OperationContext;
use crate::error::{CoreError, InFamily, ResourceFamily, Result};
use crate::progress::wait_for_task;
use crate::waiter::{Observed, STATE_DELETED, WaitConfig, wait_for_state};

/// Build a waiter config using the client's poll cadence
fn wait_config(
    client: &CloudClient,
    pending: &[&str],
    target: &[&str],
    timeout: Duration,
    fast: bool,
) -> WaitConfig {
    let options = client.options();
    let interval = if fast {
        options.fast_poll_interval()
    } else {
        options.poll_interval()
    };
    WaitConfig::new(pending.iter().copied(), target.iter().copied())
        .delay(options.wait_delay())
        .poll_interval(interval)
        .timeout(timeout)
}

/// Poll a submitted task to completion
pub async fn complete_task(
    ctx: &OperationContext,
    client: &CloudClient,
    task: TaskStateUpdate,
    timeout: Duration,
) -> Result<TaskStateUpdate> {
    wait_for_task(ctx, client, task, timeout).await
}

// Subscriptions

/// Wait until the subscription reports `active`
pub async fn wait_for_subscription_active(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    timeout: Duration,
) -> Result<Subscription> {
    let handler = SubscriptionHandler::new(client.clone());
    let config = wait_config(
        client,
        status::subscription::PENDING,
        &[status::ACTIVE],
        timeout,
        false,
    );
    let observed = wait_for_state(ctx, &config, || async {
        let sub = handler.get(subscription_id).await?;
        let state = sub.status().to_string();
        Ok(Observed::new(sub, state))
    })
    .await?;
    observed.value.ok_or_else(|| {
        CoreError::not_found(
            ResourceFamily::Subscription,
            format!("subscription {} disappeared", subscription_id),
        )
    })
}

/// Wait until the subscription is gone
pub async fn wait_for_subscription_deleted(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    timeout: Duration,
) -> Result<()> {
    let handler = SubscriptionHandler::new(client.clone());
    let config = wait_config(
        client,
        status::subscription::DELETE_PENDING,
        &[STATE_DELETED],
        timeout,
        false,
    );
    wait_for_state(ctx, &config, || async {
        let sub = handler.get(subscription_id).await?;
        Ok(Observed::<()>::state(sub.status()))
    })
    .await?;
    Ok(())
}

pub async fn wait_for_fixed_subscription_active(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    timeout: Duration,
) -> Result<FixedSubscription> {
    let handler = FixedSubscriptionHandler::new(client.clone());
    let config = wait_config(
        client,
        status::subscription::PENDING,
        &[status::ACTIVE],
        timeout,
        true,
    );
    let observed = wait_for_state(ctx, &config, || async {
        let sub = handler.get(subscription_id).await?;
        let state = sub.status().to_string();
        Ok(Observed::new(sub, state))
    })
    .await?;
    observed.value.ok_or_else(|| {
        CoreError::not_found(
            ResourceFamily::FixedSubscription,
            format!("essentials subscription {} disappeared", subscription_id),
        )
    })
}

pub async fn wait_for_fixed_subscription_deleted(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    timeout: Duration,
) -> Result<()> {
    let handler = FixedSubscriptionHandler::new(client.clone());
    let config = wait_config(
        client,
        status::subscription::DELETE_PENDING,
        &[STATE_DELETED],
        timeout,
        true,
    );
    wait_for_state(ctx, &config, || async {
        let sub = handler.get(subscription_id).await?;
        Ok(Observed::<()>::state(sub.status()))
    })
    .await?;
    Ok(())
}

// Databases

pub async fn wait_for_database_active(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    database_id: i64,
    timeout: Duration,
) -> Result<Database> {
    let handler = DatabaseHandler::new(client.clone());
    let config = wait_config(
        client,
        status::database::PENDING,
        &[status::ACTIVE],
        timeout,
        false,
    );
    let observed = wait_for_state(ctx, &config, || async {
        let db = handler.get(subscription_id, database_id).await?;
        let state = db.status().to_string();
        Ok(Observed::new(db, state))
    })
    .await?;
    observed.value.ok_or_else(|| {
        CoreError::not_found(
            ResourceFamily::Database,
            format!("database {}/{} disappeared", subscription_id, database_id),
        )
    })
}

pub async fn wait_for_database_deleted(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    database_id: i64,
    timeout: Duration,
) -> Result<()> {
    let handler = DatabaseHandler::new(client.clone());
    let config = wait_config(
        client,
        status::database::DELETE_PENDING,
        &[STATE_DELETED],
        timeout,
        false,
    );
    wait_for_state(ctx, &config, || async {
        let db = handler.get(subscription_id, database_id).await?;
        Ok(Observed::<()>::state(db.status()))
    })
    .await?;
    Ok(())
}

pub async fn wait_for_fixed_database_active(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    database_id: i64,
    timeout: Duration,
) -> Result<FixedDatabase> {
    let handler = FixedDatabaseHandler::new(client.clone());
    let config = wait_config(
        client,
        status::database::PENDING,
        &[status::ACTIVE],
        timeout,
        true,
    );
    let observed = wait_for_state(ctx, &config, || async {
        let db = handler.get(subscription_id, database_id).await?;
        let state = db.status().to_string();
        Ok(Observed::new(db, state))
    })
    .await?;
    observed.value.ok_or_else(|| {
        CoreError::not_found(
            ResourceFamily::FixedDatabase,
            format!("essentials database {}/{} disappeared", subscription_id, database_id),
        )
    })
}

pub async fn wait_for_fixed_database_deleted(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    database_id: i64,
    timeout: Duration,
) -> Result<()> {
    let handler = FixedDatabaseHandler::new(client.clone());
    let config = wait_config(
        client,
        status::database::DELETE_PENDING,
        &[STATE_DELETED],
        timeout,
        true,
    );
    wait_for_state(ctx, &config, || async {
        let db = handler.get(subscription_id, database_id).await?;
        Ok(Observed::<()>::state(db.status()))
    })
    .await?;
    Ok(())
}

/// Submit a database create, follow its task, then hold until the new
/// database reports `active`. Yields the ID the task assigned.
pub async fn create_database_and_wait(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    request: &DatabaseRequest,
    timeout: Duration,
) -> Result<i64> {
    let handler = DatabaseHandler::new(client.clone());

    let task = handler.create(subscription_id, request).await?;
    let completed = complete_task(ctx, client, task, timeout).await?;
    let database_id = completed.resource_id()?;

    wait_for_database_active(ctx, client, subscription_id, database_id, timeout).await?;
    Ok(database_id)
}

/// Delete a database and wait until it is gone
pub async fn delete_database_and_wait(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    database_id: i64,
    timeout: Duration,
) -> Result<()> {
    let task = client
        .cloud()
        .databases()
        .delete_database_by_id(api_id(subscription_id)?, api_id(database_id)?)
        .await
        .in_family(ResourceFamily::Database)?;
    complete_task(ctx, client, TaskStateUpdate::from_task(&task)?, timeout).await?;
    wait_for_database_deleted(ctx, client, subscription_id, database_id, timeout).await
}

/// Tear down the databases a creation plan seeded into a new subscription.
///
/// The server provisions regional infrastructure by creating the planned
/// databases; once the subscription is active they are removed, leaving an
/// empty but sized subscription.
pub async fn remove_creation_plan_databases(
    ctx: &OperationContext,
    client: &CloudClient,
    subscription_id: i64,
    timeout: Duration,
) -> Result<()> {
    wait_for_subscription_active(ctx, client, subscription_id, timeout).await?;

    let databases = DatabaseHandler::new(client.clone())
        .list(subscription_id)
        .await?;
    info!(
        subscription_id,
        count = databases.len(),
        "Removing creation-plan databases"
    );

    for db in &databases {
        wait_for_database_active(ctx, client, subscription_id, db.database_id, timeout).await?;
    }
    for db in &databases {
        debug!(subscription_id, database_id = db.database_id, "Deleting creation-plan database");
        delete_database_and_wait(ctx, client, subscription_id, db.database_id, timeout).await?;
    }

    wait_for_subscription_active(ctx, client, subscription_id, timeout).await?;
    Ok(())
}

// Cloud accounts

pub async fn wait_for_cloud_account_active(
    ctx: &OperationContext,
    client: &CloudClient,
    account_id: i64,
    timeout: Duration,
) -> Result<()> {
    let handler = CloudAccountHandler::new(client.clone());
    let config = wait_config(
        client,
        status::cloud_account::PENDING,
        &[status::ACTIVE],
        timeout,
        true,
    );
    wait_for_state(ctx, &config, || async {
        let account = handler.get(account_id).await?;
        Ok(Observed::<()>::state(account.status()))
    })
    .await?;
    Ok(())
}

pub async fn wait_for_cloud_account_deleted(
    ctx: &OperationContext,
    client: &CloudClient,
    account_id: i64,
    timeout: Duration,
) -> Result<()> {
    let handler = CloudAccountHandler::new(client.clone());
    let config = wait_config(
        client,
        status::cloud_account::DELETE_PENDING,
        &[STATE_DELETED],
        timeout,
        true,
    );
    wait_for_state(ctx, &config, || async {
        let account = handler.get(account_id).await?;
        Ok(Observed::<()>::state(account.status()))
    })
    .await?;
    Ok(())
}

// ACL

/// Which ACL entity a wait targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclKind {
    Rule,
    Role,
    User,
}

async fn acl_status(handler: &AclHandler, kind: AclKind, id: i64) -> Result<String> {
    let status = match kind {
        AclKind::Rule => handler.get_rule(id).await?.status,
        AclKind::Role => handler.get_role(id).await?.status,
        AclKind::User => handler.get_user(id).await?.status,
    };
    // Entities that predate status reporting come back without one
    Ok(status.unwrap_or_else(|| status::ACTIVE.to_string()))
}

pub async fn wait_for_acl_active(
    ctx: &OperationContext,
    client: &CloudClient,
    kind: AclKind,
    id: i64,
    timeout: Duration,
) -> Result<()> {
    let handler = AclHandler::new(client.clone());
    let config = wait_config(client, status::acl::PENDING, &[status::ACTIVE], timeout, true);
    wait_for_state(ctx, &config, || async {
        Ok(Observed::<()>::state(acl_status(&handler, kind, id).await?))
    })
    .await?;
    Ok(())
}

pub async fn wait_for_acl_deleted(
    ctx: &OperationContext,
    client: &CloudClient,
    kind: AclKind,
    id: i64,
    timeout: Duration,
) -> Result<()> {
    let handler = AclHandler::new(client.clone());
    let config = wait_config(
        client,
        status::acl::DELETE_PENDING,
        &[STATE_DELETED],
        timeout,
        true,
    );
    wait_for_state(ctx, &config, || async {
        Ok(Observed::<()>::state(acl_status(&handler, kind, id).await?))
    })
    .await?;
    Ok(())
}

/// Delete an ACL user, re-issuing the delete with backoff while the API
/// still returns the user. A not-found read is the only success signal.
pub async fn delete_acl_user_and_wait(
    ctx: &OperationContext,
    client: &CloudClient,
    user_id: i64,
    timeout: Duration,
) -> Result<()> {
    let handler = AclHandler::new(client.clone());
    let acl = client.cloud().acl();
    let ctx = ctx.with_timeout(timeout);
    let mut backoff = client.options().fast_poll_interval();
    let max_backoff = Duration::from_secs(60);

    loop {
        match acl.delete_user(api_id(user_id)?).await.in_family(ResourceFamily::AclUser) {
            Ok(task) => {
                complete_task(&ctx, client, TaskStateUpdate::from_task(&task)?, timeout).await?;
            }
            Err(e) if e.is_not_found_in(ResourceFamily::AclUser) => return Ok(()),
            Err(e) => return Err(e),
        }

        match handler.get_user(user_id).await {
            Err(e) if e.is_not_found_in(ResourceFamily::AclUser) => return Ok(()),
            Err(e) => return Err(e),
            Ok(_) => {
                let backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
                warn!(user_id, backoff_ms, "ACL user still present after delete, retrying");
                ctx.sleep(backoff).await.map_err(|e| {
                    if e.is_timeout() {
                        CoreError::TaskTimeout {
                            timeout,
                            last_state: "user still present".to_string(),
                        }
                    } else {
                        e
                    }
                })?;
                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }
}

// Private Service Connect

/// Wait for a PSC endpoint to move from `pending` states into `target`.
/// Returns `None` when the endpoint vanished and `deleted` was a target.
#[allow(clippy::too_many_arguments)]
pub async fn wait_for_psc_endpoint(
    ctx: &OperationContext,
    client: &CloudClient,
    scope: PscScope,
    psc_service_id: i64,
    endpoint_id: i64,
    pending: &[&str],
    target: &[&str],
    timeout: Duration,
) -> Result<Option<PscEndpoint>> {
    let handler = PscHandler::new(client.clone());
    let config = wait_config(client, pending, target, timeout, true);
    let observed = wait_for_state(ctx, &config, || async {
        let endpoint = handler
            .get_endpoint(ctx, scope, psc_service_id, endpoint_id)
            .await?;
        let state = endpoint.status().to_string();
        Ok(Observed::new(endpoint, state))
    })
    .await?;
    Ok(observed.value)
}

/// Wait until the endpoint disappears from its service's endpoint list
pub async fn wait_for_psc_endpoint_gone(
    ctx: &OperationContext,
    client: &CloudClient,
    scope: PscScope,
    psc_service_id: i64,
    endpoint_id: i64,
    timeout: Duration,
) -> Result<()> {
    wait_for_psc_endpoint(
        ctx,
        client,
        scope,
        psc_service_id,
        endpoint_id,
        status::psc::DELETE_PENDING,
        &[status::psc::DELETED, STATE_DELETED],
        timeout,
    )
    .await?;
    Ok(())
}
