//! Active-Active region override reconciliation
//!
//! Each region of an Active-Active database reports its effective settings,
//! which are either inherited from the global values or overridden for that
//! region. Refresh has to decide which per-region fields to put back into
//! state without inventing overrides the user never wrote.
//!
//! A field is surfaced when:
//!
//! 1. the user's config sets it for that region, or
//! 2. the API value differs from the global value, or
//! 3. the current state already carries it.
//!
//! Config and state are inspected with [`walk`](crate::host::walk) so that an
//! absent key is not mistaken for a zero value.

use rediscloud_core::api::Alert;
use serde_json::{Map, Value, json};

use crate::host::value::is_unknown;
use crate::host::walk;

pub const OVERRIDE_REGION: &str = "override_region";
pub const FIELD_DATA_PERSISTENCE: &str = "override_global_data_persistence";
pub const FIELD_PASSWORD: &str = "override_global_password";
pub const FIELD_ENABLE_DEFAULT_USER: &str = "enable_default_user";
pub const FIELD_SOURCE_IPS: &str = "override_global_source_ips";
pub const FIELD_ALERT: &str = "override_global_alert";
pub const FIELD_REMOTE_BACKUP: &str = "remote_backup";

/// Source IP lists the API reports when nothing was configured
const ALL_ADDRESSES: &[&str] = &["0.0.0.0/0"];
const PRIVATE_RANGES: &[&str] = &["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16", "100.64.0.0/10"];

/// Settings that exist both globally and per region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideValues {
    pub data_persistence: Option<String>,
    pub password: Option<String>,
    pub enable_default_user: Option<bool>,
    pub source_ips: Vec<String>,
    pub alerts: Vec<Alert>,
    /// Backup block in state shape, present only when the API reports
    /// remote backup enabled for the region
    pub remote_backup: Option<Value>,
}

/// The API's default source IP lists mean "not overridden"
pub fn filter_default_source_ips(ips: &[String]) -> Vec<String> {
    let is = |defaults: &[&str]| ips.iter().map(String::as_str).eq(defaults.iter().copied());
    if is(ALL_ADDRESSES) || is(PRIVATE_RANGES) {
        Vec::new()
    } else {
        ips.to_vec()
    }
}

/// Alerts compare as multisets of `(name, value)`
pub fn alerts_equal(a: &[Alert], b: &[Alert]) -> bool {
    let key = |alerts: &[Alert]| {
        let mut pairs: Vec<(String, i64)> = alerts.iter().map(|x| (x.name.clone(), x.value)).collect();
        pairs.sort();
        pairs
    };
    key(a) == key(b)
}

fn same_members(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

fn alerts_value(alerts: &[Alert]) -> Value {
    Value::Array(
        alerts
            .iter()
            .map(|a| json!({"name": a.name, "value": a.value}))
            .collect(),
    )
}

/// Rules 1 and 3: explicitly present in config or in current state
fn explicitly_present(field: &str, config: Option<&Value>, current: Option<&Value>) -> bool {
    config.is_some_and(|c| walk::is_set(c, field)) || current.is_some_and(|p| walk::is_set(p, field))
}

/// Reconcile one region. `config` and `current` are that region's
/// `override_region` element from raw config and current state, when
/// present. Returns `None` when nothing should be recorded for the region.
pub fn reconcile_region(
    name: &str,
    api: &OverrideValues,
    globals: &OverrideValues,
    config: Option<&Value>,
    current: Option<&Value>,
) -> Option<Value> {
    let mut block = Map::new();
    let mut surfaced = false;

    let mut put = |block: &mut Map<String, Value>, field: &str, value: Value| {
        surfaced = true;
        block.insert(field.to_string(), value);
    };

    // data persistence
    if let Some(api_value) = &api.data_persistence {
        let differs = globals.data_persistence.as_ref() != Some(api_value);
        if differs || explicitly_present(FIELD_DATA_PERSISTENCE, config, current) {
            put(&mut block, FIELD_DATA_PERSISTENCE, json!(api_value));
        }
    }

    // password
    let configured_password = config
        .and_then(|c| walk::get(c, FIELD_PASSWORD))
        .and_then(Value::as_str);
    match &api.password {
        Some(api_value) => {
            let differs = globals.password.as_ref() != Some(api_value);
            if differs || explicitly_present(FIELD_PASSWORD, config, current) {
                let surfaced_value = match configured_password {
                    Some(c) if c == api_value => c.to_string(),
                    _ if !differs => String::new(),
                    _ => api_value.clone(),
                };
                put(&mut block, FIELD_PASSWORD, json!(surfaced_value));
            }
        }
        // Write-only on the API side: keep what was written
        None => {
            let kept = configured_password
                .map(str::to_string)
                .or_else(|| {
                    current
                        .and_then(|c| walk::get(c, FIELD_PASSWORD))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                });
            if let Some(kept) = kept {
                put(&mut block, FIELD_PASSWORD, json!(kept));
            }
        }
    }

    // default user
    if let Some(api_value) = api.enable_default_user {
        let differs = globals.enable_default_user.is_some_and(|g| g != api_value);
        if differs || explicitly_present(FIELD_ENABLE_DEFAULT_USER, config, current) {
            put(&mut block, FIELD_ENABLE_DEFAULT_USER, json!(api_value));
        }
    }

    // source IPs
    let filtered = filter_default_source_ips(&api.source_ips);
    let differs = !filtered.is_empty() && !same_members(&filtered, &globals.source_ips);
    if differs || explicitly_present(FIELD_SOURCE_IPS, config, current) {
        put(&mut block, FIELD_SOURCE_IPS, json!(api.source_ips));
    }

    // alerts
    let differs = !api.alerts.is_empty() && !alerts_equal(&api.alerts, &globals.alerts);
    if differs || explicitly_present(FIELD_ALERT, config, current) {
        put(&mut block, FIELD_ALERT, alerts_value(&api.alerts));
    }

    // remote backup: never adopt a server-side default
    let had_backup = current
        .and_then(|c| walk::get(c, FIELD_REMOTE_BACKUP))
        .is_some_and(|b| b.as_array().is_some_and(|items| !items.is_empty()) || b.is_object());
    if let Some(backup) = &api.remote_backup
        && had_backup
    {
        put(&mut block, FIELD_REMOTE_BACKUP, json!([backup]));
    }

    let named = config.is_some() || current.is_some();
    if !surfaced && !named {
        return None;
    }
    block.insert("name".to_string(), json!(name));
    Some(Value::Object(block))
}

/// The `override_region` element named `name`, when the list is known
fn element<'a>(root: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    root.and_then(|r| walk::lookup(r, OVERRIDE_REGION))
        .filter(|list| !is_unknown(list))
        .and_then(|list| walk::find_by_key(list, "name", name))
}

/// Reconcile every region the API reports, in API order
pub fn reconcile_regions(
    regions: &[(String, OverrideValues)],
    globals: &OverrideValues,
    raw_config: Option<&Value>,
    current_state: Option<&Value>,
) -> Vec<Value> {
    regions
        .iter()
        .filter_map(|(name, api)| {
            reconcile_region(
                name,
                api,
                globals,
                element(raw_config, name),
                element(current_state, name),
            )
        })
        .collect()
}
