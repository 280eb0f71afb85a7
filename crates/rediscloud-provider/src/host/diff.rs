//! Planned change for one resource
//!
//! Built from the schema, the prior state and the config. Attribute
//! suppress functions run first, then the resource's own diff customizer may
//! read the plan, rewrite planned values or force replacement.

use std::collections::BTreeSet;

use serde_json::Value;

use super::schema::{Schema, SuppressArgs};
use super::value::unknown;
use super::walk;

#[derive(Debug)]
pub struct ResourceDiff<'s> {
    schema: &'s Schema,
    prior: Option<Value>,
    planned: Value,
    config: Value,
    forced: BTreeSet<String>,
}

impl<'s> ResourceDiff<'s> {
    pub fn new(schema: &'s Schema, prior: Option<Value>, config: Value) -> Self {
        let mut planned = schema.block.plan(&config, prior.as_ref());
        let id = prior
            .as_ref()
            .and_then(|p| walk::get(p, "id"))
            .cloned()
            .unwrap_or_else(unknown);
        walk::set_path(&mut planned, "id", id);
        Self {
            schema,
            prior,
            planned,
            config,
            forced: BTreeSet::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    /// No prior state: this plan creates the resource
    pub fn is_create(&self) -> bool {
        self.prior.is_none()
    }

    /// ID of the existing resource, if any
    pub fn id(&self) -> Option<&str> {
        self.prior
            .as_ref()
            .and_then(|p| walk::get(p, "id"))
            .and_then(Value::as_str)
    }

    pub fn prior(&self) -> Option<&Value> {
        self.prior.as_ref()
    }

    pub fn planned(&self) -> &Value {
        &self.planned
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Planned value at `path` when known and not null
    pub fn get(&self, path: &str) -> Option<&Value> {
        walk::get(&self.planned, path)
    }

    pub fn get_old(&self, path: &str) -> Option<&Value> {
        self.prior.as_ref().and_then(|p| walk::get(p, path))
    }

    /// Leaf paths that differ between prior and planned state. On create
    /// every planned leaf counts as changed.
    pub fn changed_paths(&self) -> Vec<String> {
        let empty = Value::Object(Default::default());
        walk::changed_paths(self.prior.as_ref().unwrap_or(&empty), &self.planned)
    }

    pub fn has_change(&self, path: &str) -> bool {
        self.changed_paths()
            .iter()
            .any(|p| p == path || p.starts_with(&format!("{}.", path)))
    }

    pub fn set_new(&mut self, path: &str, value: Value) {
        walk::set_path(&mut self.planned, path, value);
    }

    /// Mark `path` as known only after apply
    pub fn set_new_computed(&mut self, path: &str) {
        self.set_new(path, unknown());
    }

    /// A change at `path` replaces the resource
    pub fn force_new(&mut self, path: &str) {
        self.forced.insert(path.to_string());
    }

    /// Keep the prior value at `path`
    pub fn suppress(&mut self, path: &str) {
        let old = self
            .prior
            .as_ref()
            .and_then(|p| walk::lookup(p, path))
            .cloned()
            .unwrap_or(Value::Null);
        walk::set_path(&mut self.planned, path, old);
    }

    /// Run every attribute suppress function against the current plan.
    /// The outermost attribute with a suppress function decides for all
    /// leaves beneath it.
    pub fn apply_suppressions(&mut self) {
        let Some(prior) = self.prior.clone() else {
            return;
        };
        let mut decided = BTreeSet::new();
        let mut suppressed = Vec::new();
        for path in self.changed_paths() {
            let Some((attr_path, f)) = self
                .schema
                .block
                .ancestors(&path)
                .into_iter()
                .find_map(|(p, attr)| attr.suppress.map(|f| (p, f)))
            else {
                continue;
            };
            if !decided.insert(attr_path.clone()) {
                continue;
            }
            let null = Value::Null;
            let args = SuppressArgs {
                path: &attr_path,
                old: walk::lookup(&prior, &attr_path).unwrap_or(&null),
                new: walk::lookup(&self.planned, &attr_path).unwrap_or(&null),
                prior: &prior,
                planned: &self.planned,
            };
            if f(&args) {
                suppressed.push(attr_path);
            }
        }
        for path in suppressed {
            self.suppress(&path);
        }
    }

    /// Attribute paths whose change forces replacement; always empty on create
    pub fn requires_replace(&self) -> Vec<String> {
        if self.prior.is_none() {
            return Vec::new();
        }
        let mut out: BTreeSet<String> = BTreeSet::new();
        for path in self.changed_paths() {
            if let Some((attr_path, _)) = self
                .schema
                .block
                .ancestors(&path)
                .into_iter()
                .find(|(_, attr)| attr.force_new)
            {
                out.insert(walk::schema_path(&attr_path));
            }
        }
        out.extend(self.forced.iter().cloned());
        out.into_iter().collect()
    }

    pub fn into_planned(self) -> Value {
        self.planned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::schema::{Attribute, Block};
    use crate::host::value::is_unknown;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ignore_case(args: &SuppressArgs<'_>) -> bool {
        match (args.old.as_str(), args.new.as_str()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }

    fn schema() -> Schema {
        Schema::resource(
            Block::new()
                .attr("name", Attribute::string().required())
                .attr("region", Attribute::string().required().force_new())
                .attr("label", Attribute::string().optional().suppress(ignore_case))
                .attr("endpoint", Attribute::string().computed()),
            None,
        )
    }

    #[test]
    fn test_create_plan_has_unknown_id() {
        let schema = schema();
        let diff = ResourceDiff::new(&schema, None, json!({"name": "a", "region": "us-east-1"}));
        assert!(diff.is_create());
        assert!(is_unknown(&diff.planned()["id"]));
        assert!(diff.requires_replace().is_empty());
    }

    #[test]
    fn test_suppressed_change_keeps_prior_value() {
        let schema = schema();
        let prior = json!({"id": "9", "name": "a", "region": "us-east-1", "label": "Blue", "endpoint": "e:1"});
        let mut diff = ResourceDiff::new(&schema, Some(prior), json!({"name": "a", "region": "us-east-1", "label": "blue"}));
        assert!(diff.has_change("label"));
        diff.apply_suppressions();
        assert!(diff.changed_paths().is_empty());
        assert_eq!(diff.planned()["label"], json!("Blue"));
        assert_eq!(diff.planned()["endpoint"], json!("e:1"));
    }

    #[test]
    fn test_force_new_attribute_requires_replace() {
        let schema = schema();
        let prior = json!({"id": "9", "name": "a", "region": "us-east-1"});
        let mut diff = ResourceDiff::new(&schema, Some(prior), json!({"name": "b", "region": "eu-west-1"}));
        assert_eq!(diff.requires_replace(), vec!["region"]);
        diff.force_new("name");
        assert_eq!(diff.requires_replace(), vec!["name", "region"]);
    }
}
