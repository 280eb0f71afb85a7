//! Structural walker over raw config and raw state
//!
//! Paths are dot-separated with list indices as segments:
//! `override_region.0.remote_backup.0.time_utc`. The walker works on the
//! raw JSON value, so a key that is absent reads differently from a key set
//! to a zero value. Typed getters on [`ResourceData`](super::ResourceData)
//! cannot make that distinction.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::value::is_unknown;

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

/// The value at `path`, including explicit nulls
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// The value at `path` when it is present, not null and known
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    lookup(root, path).filter(|v| !v.is_null() && !is_unknown(v))
}

/// Key present with a non-null value. An explicitly empty list counts as set.
pub fn is_set(root: &Value, path: &str) -> bool {
    lookup(root, path).is_some_and(|v| !v.is_null())
}

/// Write `value` at `path`, creating intermediate objects and list slots
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = parts.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for (i, segment) in parents.iter().enumerate() {
        let next_is_index = parts[i + 1].parse::<usize>().is_ok();
        current = child_mut(current, segment, next_is_index);
    }

    match current {
        Value::Array(items) => {
            if let Ok(index) = last.parse::<usize>() {
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
                items[index] = value;
            }
        }
        other => {
            if !other.is_object() {
                *other = Value::Object(Map::new());
            }
            if let Value::Object(map) = other {
                map.insert(last.to_string(), value);
            }
        }
    }
}

fn child_mut<'a>(current: &'a mut Value, segment: &str, container_is_list: bool) -> &'a mut Value {
    let fresh = || {
        if container_is_list {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        }
    };

    if let Ok(index) = segment.parse::<usize>() {
        if !current.is_array() {
            *current = Value::Array(Vec::new());
        }
        return match current {
            Value::Array(items) => {
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
                if items[index].is_null() {
                    items[index] = fresh();
                }
                &mut items[index]
            }
            other => other,
        };
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            let entry = map.entry(segment.to_string()).or_insert_with(fresh);
            if entry.is_null() {
                *entry = fresh();
            }
            entry
        }
        other => other,
    }
}

/// Find the element of a list of objects whose `key` equals `value`
pub fn find_by_key<'a>(list: &'a Value, key: &str, value: &str) -> Option<&'a Value> {
    list.as_array()?
        .iter()
        .find(|item| item.get(key).and_then(Value::as_str) == Some(value))
}

/// `a.0.b.1.c` -> `a.b.c`, the schema path of an attribute
pub fn schema_path(path: &str) -> String {
    segments(path)
        .filter(|s| s.parse::<usize>().is_err())
        .collect::<Vec<_>>()
        .join(".")
}

/// Everything before the last segment; empty for a top-level key
pub fn parent(path: &str) -> &str {
    path.rsplit_once('.').map_or("", |(head, _)| head)
}

/// The last segment
pub fn leaf(path: &str) -> &str {
    path.rsplit_once('.').map_or(path, |(_, tail)| tail)
}

pub fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

/// Empty containers and null read the same when diffing
fn blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Leaf paths whose values differ between `old` and `new`
pub fn changed_paths(old: &Value, new: &Value) -> Vec<String> {
    let mut out = Vec::new();
    diff_into(&mut out, "", old, new);
    out
}

fn diff_into(out: &mut Vec<String>, path: &str, old: &Value, new: &Value) {
    if blank(old) && blank(new) {
        return;
    }
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            for key in keys {
                let child = join(path, key);
                diff_into(
                    out,
                    &child,
                    a.get(key).unwrap_or(&Value::Null),
                    b.get(key).unwrap_or(&Value::Null),
                );
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            for i in 0..a.len().max(b.len()) {
                let child = join(path, &i.to_string());
                diff_into(
                    out,
                    &child,
                    a.get(i).unwrap_or(&Value::Null),
                    b.get(i).unwrap_or(&Value::Null),
                );
            }
        }
        (Value::Object(_) | Value::Array(_), Value::Null)
        | (Value::Null, Value::Object(_) | Value::Array(_)) => {
            let empty = if old.is_object() || new.is_object() {
                Value::Object(Map::new())
            } else {
                Value::Array(Vec::new())
            };
            let (a, b) = if old.is_null() { (&empty, new) } else { (old, &empty) };
            diff_into(out, path, a, b);
        }
        (a, b) if numbers_equal(a, b) => {}
        (a, b) if a != b => out.push(path.to_string()),
        _ => {}
    }
}

/// 1 and 1.0 are the same number to the host
fn numbers_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => a.is_number() && b.is_number() && x == y,
        _ => false,
    }
}

/// Every object stored under a key named `name`, at any depth, with its path.
/// List-nested blocks yield one entry per element.
pub fn find_blocks<'a>(root: &'a Value, name: &str) -> Vec<(String, &'a Value)> {
    let mut out = Vec::new();
    collect_blocks(&mut out, "", root, name);
    out
}

fn collect_blocks<'a>(out: &mut Vec<(String, &'a Value)>, path: &str, value: &'a Value, name: &str) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = join(path, key);
                if key == name {
                    match child {
                        Value::Array(items) => {
                            for (i, item) in items.iter().enumerate() {
                                if item.is_object() {
                                    out.push((join(&child_path, &i.to_string()), item));
                                }
                            }
                        }
                        Value::Object(_) => out.push((child_path.clone(), child)),
                        _ => {}
                    }
                }
                collect_blocks(out, &child_path, child, name);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_blocks(out, &join(path, &i.to_string()), item, name);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_absent_and_zero_are_distinct() {
        let config = json!({"override_region": [{"name": "us-east-1", "override_global_alert": [], "override_global_data_persistence": null}]});
        assert!(is_set(&config, "override_region.0.override_global_alert"));
        assert!(!is_set(&config, "override_region.0.override_global_data_persistence"));
        assert!(!is_set(&config, "override_region.0.override_global_password"));
        assert!(lookup(&config, "override_region.0.override_global_data_persistence").is_some());
    }

    #[test]
    fn test_set_path_creates_intermediate_blocks() {
        let mut state = json!({});
        set_path(&mut state, "remote_backup.0.interval", json!("every-6-hours"));
        set_path(&mut state, "name", json!("db"));
        assert_eq!(state, json!({"name": "db", "remote_backup": [{"interval": "every-6-hours"}]}));
    }

    #[test]
    fn test_changed_paths_reports_leaves() {
        let old = json!({"name": "a", "alert": [{"name": "throughput-higher-than", "value": 80}], "tags": {}});
        let new = json!({"name": "a", "alert": [{"name": "throughput-higher-than", "value": 90}], "tags": null, "port": 1.0});
        let prior_port = json!({"port": 1});
        assert_eq!(changed_paths(&old, &new), vec!["alert.0.value", "port"]);
        assert!(changed_paths(&prior_port, &json!({"port": 1.0})).is_empty());
    }

    #[test]
    fn test_find_blocks_walks_nested_lists() {
        let config = json!({
            "remote_backup": [{"interval": "every-1-hours"}],
            "override_region": [
                {"name": "us-east-1", "remote_backup": [{"interval": "every-12-hours", "time_utc": "02:00"}]},
                {"name": "eu-west-1"}
            ]
        });
        let mut paths: Vec<String> = find_blocks(&config, "remote_backup").into_iter().map(|(p, _)| p).collect();
        paths.sort();
        assert_eq!(paths, vec!["override_region.0.remote_backup.0", "remote_backup.0"]);
    }

    #[test]
    fn test_schema_path_and_parent() {
        assert_eq!(schema_path("override_region.0.remote_backup.0.time_utc"), "override_region.remote_backup.time_utc");
        assert_eq!(parent("override_region.0.remote_backup.0.time_utc"), "override_region.0.remote_backup.0");
        assert_eq!(leaf("override_region.0.name"), "name");
        assert_eq!(parent("name"), "");
    }

    #[test]
    fn test_find_by_key() {
        let regions = json!([{"name": "us-east-1", "x": 1}, {"name": "eu-west-1", "x": 2}]);
        assert_eq!(find_by_key(&regions, "name", "eu-west-1").unwrap()["x"], json!(2));
        assert!(find_by_key(&regions, "name", "ap-south-1").is_none());
    }
}
