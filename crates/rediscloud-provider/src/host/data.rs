//! Per-call resource data
//!
//! Controllers read inputs from and write results to a [`ResourceData`].
//! On create and update it starts as the planned state; on read, delete and
//! import it starts as the prior state.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{Map, Value};

use super::timeouts::{Operation, Timeouts};
use super::value::{is_unknown, resolve_unknowns};
use super::walk;

#[derive(Debug, Clone)]
pub struct ResourceData {
    state: Value,
    prior: Option<Value>,
    config: Option<Value>,
    timeouts: Timeouts,
}

impl ResourceData {
    pub fn new(state: Value) -> Self {
        let state = if state.is_object() { state } else { Value::Object(Map::new()) };
        Self {
            state,
            prior: None,
            config: None,
            timeouts: Timeouts::default(),
        }
    }

    pub fn from_parts(
        state: Value,
        prior: Option<Value>,
        config: Option<Value>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            prior,
            config,
            timeouts,
            ..Self::new(state)
        }
    }

    /// Data for an import: only the ID is known
    pub fn for_import(id: &str) -> Self {
        let mut data = Self::new(Value::Object(Map::new()));
        data.set_id(id);
        data
    }

    pub fn id(&self) -> &str {
        self.get_str("id").unwrap_or_default()
    }

    pub fn has_id(&self) -> bool {
        !self.id().is_empty()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set("id", id.into());
    }

    /// Mark the resource as gone; the host drops it from state
    pub fn clear_id(&mut self) {
        self.set("id", Value::Null);
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        walk::get(&self.state, path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Non-empty string at `path`
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get_str(path).filter(|s| !s.is_empty()).map(str::to_string)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        })
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    /// Elements of the list at `path`; empty when absent
    pub fn get_list(&self, path: &str) -> Vec<Value> {
        self.get(path)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter(|v| !is_unknown(v)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_strings(&self, path: &str) -> Vec<String> {
        self.get_list(path)
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    pub fn get_map(&self, path: &str) -> BTreeMap<String, String> {
        self.get(path)
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The first element of a list block, or a single block
    pub fn get_block(&self, path: &str) -> Option<&Value> {
        match self.get(path)? {
            Value::Array(items) => items.first().filter(|v| v.is_object()),
            obj @ Value::Object(_) => Some(obj),
            _ => None,
        }
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        walk::set_path(&mut self.state, path, value.into());
    }

    /// Set `path` only when `value` is present; otherwise store null
    pub fn set_opt<T: Into<Value>>(&mut self, path: &str, value: Option<T>) {
        self.set(path, value.map_or(Value::Null, Into::into));
    }

    /// The value at `path` before this operation
    pub fn old(&self, path: &str) -> Option<&Value> {
        self.prior.as_ref().and_then(|p| walk::get(p, path))
    }

    /// The value differs between prior and current state
    pub fn has_change(&self, path: &str) -> bool {
        let Some(prior) = &self.prior else {
            return walk::get(&self.state, path).is_some();
        };
        let old = walk::lookup(prior, path).unwrap_or(&Value::Null);
        let new = walk::lookup(&self.state, path).unwrap_or(&Value::Null);
        !walk::changed_paths(old, new).is_empty()
    }

    pub fn has_changes(&self, paths: &[&str]) -> bool {
        paths.iter().any(|p| self.has_change(p))
    }

    /// Config exactly as written, if this call has one
    pub fn raw_config(&self) -> Option<&Value> {
        self.config.as_ref()
    }

    /// State from before this operation, if any
    pub fn raw_state(&self) -> Option<&Value> {
        self.prior.as_ref()
    }

    pub fn state(&self) -> &Value {
        &self.state
    }

    pub fn timeout(&self, op: Operation) -> Duration {
        self.timeouts.get(op)
    }

    /// Final state for the host, with unknowns resolved to null
    pub fn into_state(self) -> Value {
        let mut state = self.state;
        resolve_unknowns(&mut state);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::value::UNKNOWN;
    use serde_json::json;

    #[test]
    fn test_getters_skip_unknown_and_null() {
        let data = ResourceData::new(json!({
            "id": "12",
            "name": "cache",
            "port": 12000.0,
            "endpoint": UNKNOWN,
            "password": null,
            "source_ips": ["10.0.0.0/8", UNKNOWN],
            "tags": {"env": "prod"}
        }));
        assert_eq!(data.id(), "12");
        assert_eq!(data.get_i64("port"), Some(12000));
        assert_eq!(data.get_i64("id"), Some(12));
        assert!(data.get("endpoint").is_none());
        assert!(data.get_str("password").is_none());
        assert_eq!(data.get_strings("source_ips"), vec!["10.0.0.0/8"]);
        assert_eq!(data.get_map("tags").get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_has_change_against_prior() {
        let prior = json!({"id": "1", "name": "a", "alert": [{"name": "x", "value": 1}]});
        let mut data = ResourceData::from_parts(prior.clone(), Some(prior), None, Timeouts::default());
        assert!(!data.has_change("alert"));
        data.set("alert.0.value", 2);
        assert!(data.has_change("alert"));
        assert!(!data.has_change("name"));
        assert_eq!(data.old("alert.0.value"), Some(&json!(1)));
    }

    #[test]
    fn test_clear_id_and_final_state() {
        let mut data = ResourceData::new(json!({"id": "5", "public_endpoint": UNKNOWN}));
        data.clear_id();
        assert!(!data.has_id());
        assert_eq!(data.into_state(), json!({"id": null, "public_endpoint": null}));
    }
}
