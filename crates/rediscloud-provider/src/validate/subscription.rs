//! Subscription and region rules

use std::collections::BTreeSet;

use ipnetwork::IpNetwork;
use rediscloud_core::api::cloud_accounts::INTERNAL_CLOUD_ACCOUNT_ID;
use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::host::value::{UNKNOWN, is_unknown};
use crate::host::walk::{self, join};
use crate::host::{Diagnostics, ResourceDiff, SuppressArgs};

pub const PAYMENT_CREDIT_CARD: &str = "credit-card";
pub const PAYMENT_MARKETPLACE: &str = "marketplace";
pub const PROVIDER_GCP: &str = "GCP";

/// First apply needs a `creation_plan`; later plans ignore it
pub fn require_creation_plan(diff: &ResourceDiff<'_>) -> Result<()> {
    if diff.id().is_some() {
        return Ok(());
    }
    let present = walk::lookup(diff.config(), "creation_plan")
        .is_some_and(|v| is_unknown(v) || v.as_array().is_some_and(|items| !items.is_empty()));
    if present {
        Ok(())
    } else {
        Err(ProviderError::validation_at(
            "creation_plan",
            "creation_plan is required when creating a subscription",
        ))
    }
}

/// Once the resource exists, changes to the block never reach the API
pub fn suppress_after_create(args: &SuppressArgs<'_>) -> bool {
    walk::get(args.prior, "id").is_some()
}

/// `credit-card` needs a payment method ID; `marketplace` must not have one
pub fn check_payment_method(config: &Value) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let method = walk::get(config, "payment_method")
        .and_then(Value::as_str)
        .unwrap_or(PAYMENT_CREDIT_CARD);
    let has_id = walk::is_set(config, "payment_method_id");
    match method {
        PAYMENT_CREDIT_CARD if !has_id => diags.error_at(
            "payment_method_id",
            "payment_method_id is required when payment_method is credit-card",
        ),
        PAYMENT_MARKETPLACE if has_id => diags.error_at(
            "payment_method_id",
            "payment_method_id must not be set when payment_method is marketplace",
        ),
        _ => {}
    }
    diags
}

/// Cloud account of a provider block; absent means the Redis-managed account
fn account_id(block: &Value) -> Option<i64> {
    match walk::lookup(block, "cloud_account_id") {
        Some(v) if is_unknown(v) => None,
        Some(Value::String(s)) => s.parse().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        _ => Some(INTERNAL_CLOUD_ACCOUNT_ID),
    }
}

/// GCP subscriptions run in the Redis-managed account
pub fn check_gcp_account(config: &Value, provider_path: &str) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let Some(block) = walk::get(config, provider_path) else {
        return diags;
    };
    let provider = walk::get(block, "provider").and_then(Value::as_str);
    if provider == Some(PROVIDER_GCP)
        && let Some(id) = account_id(block)
        && id != INTERNAL_CLOUD_ACCOUNT_ID
    {
        diags.error_at(
            join(provider_path, "cloud_account_id"),
            format!("GCP subscriptions must use cloud_account_id {}", INTERNAL_CLOUD_ACCOUNT_ID),
        );
    }
    diags
}

/// Allowlists are not available in the Redis-managed account
pub fn check_allowlist_account(config: &Value, provider_path: &str) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let allowlist = walk::lookup(config, "allowlist")
        .is_some_and(|v| v.as_array().is_some_and(|items| !items.is_empty()) || v.is_object());
    if !allowlist {
        return diags;
    }
    let account = walk::get(config, provider_path).map_or(Some(INTERNAL_CLOUD_ACCOUNT_ID), account_id);
    if account == Some(INTERNAL_CLOUD_ACCOUNT_ID) {
        diags.error_at(
            "allowlist",
            "allowlist cannot be used with the Redis-managed cloud account (cloud_account_id 1)",
        );
    }
    diags
}

/// Deployment CIDRs of the regions under `list_path` must not overlap
pub fn check_cidr_overlap(config: &Value, list_path: &str, cidr_key: &str) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let Some(items) = walk::get(config, list_path).and_then(Value::as_array) else {
        return diags;
    };
    let networks: Vec<(usize, IpNetwork)> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let cidr = item.get(cidr_key)?.as_str()?;
            cidr.parse::<IpNetwork>().ok().map(|n| (i, n))
        })
        .collect();

    for (pos, (i, a)) in networks.iter().enumerate() {
        for (j, b) in &networks[pos + 1..] {
            if a.contains(b.network()) || b.contains(a.network()) {
                diags.error_at(
                    format!("{}.{}.{}", list_path, j, cidr_key),
                    format!("deployment CIDR {} overlaps {} (region {})", b, a, i),
                );
            }
        }
    }
    diags
}

/// Names of the blocks under `list_path` must be unique
pub fn check_unique_region_names(config: &Value, list_path: &str, key: &str) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let Some(items) = walk::get(config, list_path).and_then(Value::as_array) else {
        return diags;
    };
    let mut seen = BTreeSet::new();
    for (i, item) in items.iter().enumerate() {
        let Some(name) = item.get(key).and_then(Value::as_str) else {
            continue;
        };
        if name == UNKNOWN {
            continue;
        }
        if !seen.insert(name) {
            diags.error_at(
                format!("{}.{}.{}", list_path, i, key),
                format!("region '{}' is listed more than once", name),
            );
        }
    }
    diags
}
