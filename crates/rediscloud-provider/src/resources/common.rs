//! Helpers shared by the resource controllers

use rediscloud_core::api::databases::{Backup, DatabaseModule, RemoteBackupRequest};
use rediscloud_core::api::{Alert, Module, ThroughputMeasurement};
use rediscloud_core::ids::parse_int_id;
use rediscloud_core::{ResourceFamily, Result as CoreResult};
use serde_json::{Value, json};

use crate::error::{ProviderError, Result};
use crate::host::walk::join;
use crate::host::{Attribute, AttrType, Block, ResourceData, Validation};
use crate::validate::suppress_twelve_hour_shift;

pub const THROUGHPUT_BY: &[&str] = &["number-of-shards", "operations-per-second"];
pub const PROTOCOLS: &[&str] = &["redis", "memcached", "stack"];
pub const RESP_VERSIONS: &[&str] = &["resp2", "resp3"];
pub const BACKUP_INTERVALS: &[&str] = &[
    "every-1-hours",
    "every-2-hours",
    "every-4-hours",
    "every-6-hours",
    "every-12-hours",
    "every-24-hours",
];
pub const BACKUP_STORAGE_TYPES: &[&str] = &["http", "redis", "ftp", "aws-s3", "azure-blob-storage", "google-blob-storage"];
pub const EVICTION_POLICIES: &[&str] = &[
    "allkeys-lru",
    "allkeys-lfu",
    "allkeys-random",
    "volatile-lru",
    "volatile-lfu",
    "volatile-random",
    "volatile-ttl",
    "noeviction",
];
pub const PERSISTENCE_KINDS: &[&str] = &[
    "none",
    "aof-every-1-second",
    "aof-every-write",
    "snapshot-every-1-hour",
    "snapshot-every-6-hours",
    "snapshot-every-12-hours",
];

/// Turn a lookup into `None` when the object is gone, clearing the ID so
/// the host drops it from state. Only a 404 from `family` counts as gone.
pub fn found<T>(data: &mut ResourceData, family: ResourceFamily, result: CoreResult<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found_in(family) => {
            data.clear_id();
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Integer ID stored in a string attribute
pub fn int_attr(data: &ResourceData, attribute: &str, kind: &str) -> Result<i64> {
    let raw = data
        .get(attribute)
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .ok_or_else(|| ProviderError::validation_at(attribute, format!("{} is not set", attribute)))?;
    Ok(parse_int_id(kind, &raw)?)
}

pub fn subscription_id(data: &ResourceData) -> Result<i64> {
    int_attr(data, "subscription_id", "Subscription")
}

/// The resource's own ID as a bare integer
pub fn own_id(data: &ResourceData, kind: &str) -> Result<i64> {
    Ok(parse_int_id(kind, data.id())?)
}

// Schema fragments

pub fn alert_block() -> Attribute {
    Attribute::set_block(
        Block::new()
            .attr(
                "name",
                Attribute::string().required().description("Alert name, e.g. dataset-size"),
            )
            .attr("value", Attribute::int().required()),
    )
    .optional()
}

pub fn module_block() -> Attribute {
    Attribute::list_block(Block::new().attr("name", Attribute::string().required()))
        .optional()
        .force_new()
}

pub fn remote_backup_block() -> Attribute {
    Attribute::list_block(
        Block::new()
            .attr(
                "interval",
                Attribute::string()
                    .required()
                    .validate(Validation::OneOf(BACKUP_INTERVALS)),
            )
            .attr(
                "time_utc",
                Attribute::string()
                    .optional()
                    .validate(Validation::Pattern(
                        r"^([01]\d|2[0-3]):[0-5]\d$",
                        "time_utc must be HH:MM",
                    ))
                    .suppress(suppress_twelve_hour_shift),
            )
            .attr(
                "storage_type",
                Attribute::string()
                    .required()
                    .validate(Validation::OneOf(BACKUP_STORAGE_TYPES)),
            )
            .attr("storage_path", Attribute::string().required()),
    )
    .optional()
    .max_items(1)
}

pub fn cidr_set() -> Attribute {
    Attribute::set(AttrType::String).validate(Validation::Cidr)
}

// Config to request

pub fn alerts(data: &ResourceData, path: &str) -> Vec<Alert> {
    data.get_list(path)
        .iter()
        .filter_map(|a| {
            Some(Alert {
                name: a.get("name")?.as_str()?.to_string(),
                value: a.get("value")?.as_i64()?,
            })
        })
        .collect()
}

/// Module names from a list of `{name}` blocks
pub fn modules(data: &ResourceData, path: &str) -> Vec<Module> {
    data.get_list(path)
        .iter()
        .filter_map(|m| m.get("name").and_then(Value::as_str))
        .map(|name| Module {
            name: name.to_string(),
            parameters: None,
        })
        .collect()
}

pub fn throughput(data: &ResourceData, prefix: &str) -> Option<ThroughputMeasurement> {
    Some(ThroughputMeasurement {
        by: data.get_string(&join(prefix, "throughput_measurement_by"))?,
        value: data.get_i64(&join(prefix, "throughput_measurement_value"))?,
    })
}

/// Remote backup request for the block at `path`; an absent block turns
/// backup off
pub fn remote_backup(data: &ResourceData, path: &str) -> RemoteBackupRequest {
    let Some(block) = data.get_block(path) else {
        return RemoteBackupRequest {
            active: false,
            ..Default::default()
        };
    };
    let text = |key: &str| {
        block
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    RemoteBackupRequest {
        active: true,
        interval: text("interval"),
        time_utc: text("time_utc"),
        storage_type: text("storage_type"),
        storage_path: text("storage_path"),
    }
}

// API to state

/// Alerts ordered like the current state so refresh does not reorder them
pub fn alerts_state(current: Option<&Value>, alerts: &[Alert]) -> Value {
    let items = alerts
        .iter()
        .map(|a| json!({"name": a.name, "value": a.value}))
        .collect();
    ordered_like(current, items, "name")
}

pub fn modules_state(current: Option<&Value>, modules: &[DatabaseModule]) -> Value {
    let items = modules.iter().map(|m| json!({"name": m.name})).collect();
    ordered_like(current, items, "name")
}

/// A `remote_backup` list holding one block when backup is on
pub fn backup_state(backup: Option<&Backup>) -> Value {
    match backup.filter(|b| b.is_enabled()) {
        Some(b) => json!([{
            "interval": b.interval,
            "time_utc": b.time_utc,
            "storage_type": b.destination_type,
            "storage_path": b.destination,
        }]),
        None => json!([]),
    }
}

/// Order `items` by the position of their `key` in `current`; new items
/// keep their API order after the known ones
pub fn ordered_like(current: Option<&Value>, mut items: Vec<Value>, key: &str) -> Value {
    let known: Vec<&str> = current
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|v| v.get(key).and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    items.sort_by_key(|item| {
        item.get(key)
            .and_then(Value::as_str)
            .and_then(|k| known.iter().position(|x| *x == k))
            .unwrap_or(usize::MAX)
    });
    Value::Array(items)
}

/// Strings ordered like the current state
pub fn strings_like(current: &[String], mut items: Vec<String>) -> Value {
    items.sort_by_key(|s| current.iter().position(|c| c == s).unwrap_or(usize::MAX));
    json!(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_refresh_keeps_state_order() {
        let current = json!([{"name": "b"}, {"name": "a"}]);
        let items = vec![json!({"name": "a"}), json!({"name": "c"}), json!({"name": "b"})];
        assert_eq!(
            ordered_like(Some(&current), items, "name"),
            json!([{"name": "b"}, {"name": "a"}, {"name": "c"}])
        );
        let current = vec!["10.0.0.0/8".to_string(), "192.168.0.0/16".to_string()];
        assert_eq!(
            strings_like(&current, vec!["192.168.0.0/16".into(), "10.0.0.0/8".into()]),
            json!(["10.0.0.0/8", "192.168.0.0/16"])
        );
    }

    #[test]
    fn test_absent_backup_block_turns_backup_off() {
        let data = ResourceData::new(json!({"remote_backup": []}));
        assert!(!remote_backup(&data, "remote_backup").active);

        let data = ResourceData::new(json!({"remote_backup": [{
            "interval": "every-12-hours", "time_utc": "", "storage_type": "aws-s3", "storage_path": "s3://b"
        }]}));
        let request = remote_backup(&data, "remote_backup");
        assert!(request.active);
        assert_eq!(request.time_utc, None);
        assert_eq!(request.storage_path.as_deref(), Some("s3://b"));
    }

    #[test]
    fn test_missing_subscription_id_is_attribute_scoped() {
        let data = ResourceData::new(json!({}));
        match subscription_id(&data) {
            Err(ProviderError::Validation { attribute, .. }) => {
                assert_eq!(attribute.as_deref(), Some("subscription_id"))
            }
            other => panic!("unexpected {:?}", other),
        }
        let data = ResourceData::new(json!({"subscription_id": "1234"}));
        assert_eq!(subscription_id(&data).unwrap(), 1234);
    }
}
