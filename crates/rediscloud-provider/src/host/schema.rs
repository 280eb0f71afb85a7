//! Attribute schemas
//!
//! Each resource and data source describes its config and state as a
//! [`Block`] of named [`Attribute`]s. The host adapter uses the schema to
//! type-check config, fill defaults, compute the planned state and decide
//! which changes force replacement.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use regex::Regex;
use serde_json::{Map, Value, json};

use super::diag::{Diagnostic, Diagnostics};
use super::timeouts::Timeouts;
use super::value::{is_unknown, unknown};
use super::walk::join;

/// Arguments handed to a diff-suppress function
#[derive(Debug)]
pub struct SuppressArgs<'a> {
    /// Value path of the attribute being compared
    pub path: &'a str,
    pub old: &'a Value,
    pub new: &'a Value,
    /// Whole prior state
    pub prior: &'a Value,
    /// Whole planned state
    pub planned: &'a Value,
}

/// Returns true when `old -> new` should not count as a change
pub type SuppressFn = fn(&SuppressArgs<'_>) -> bool;

/// Custom single-value validator
pub type ValidateFn = fn(&Value) -> Result<(), String>;

#[derive(Clone)]
pub enum Validation {
    OneOf(&'static [&'static str]),
    IntAtLeast(i64),
    IntBetween(i64, i64),
    FloatAtLeast(f64),
    /// Regex and the message shown when it does not match
    Pattern(&'static str, &'static str),
    Cidr,
    IpAddress,
    Custom(ValidateFn),
}

impl Validation {
    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Validation::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Ok(()),
                _ => Err(format!(
                    "expected one of [{}], got {}",
                    allowed.join(", "),
                    value
                )),
            },
            Validation::IntAtLeast(min) => match as_int(value) {
                Some(n) if n >= *min => Ok(()),
                _ => Err(format!("expected an integer of at least {}, got {}", min, value)),
            },
            Validation::IntBetween(min, max) => match as_int(value) {
                Some(n) if n >= *min && n <= *max => Ok(()),
                _ => Err(format!("expected an integer between {} and {}, got {}", min, max, value)),
            },
            Validation::FloatAtLeast(min) => match value.as_f64() {
                Some(n) if n >= *min => Ok(()),
                _ => Err(format!("expected a number of at least {}, got {}", min, value)),
            },
            Validation::Pattern(pattern, message) => {
                let s = value.as_str().unwrap_or_default();
                match Regex::new(pattern) {
                    Ok(re) if re.is_match(s) => Ok(()),
                    Ok(_) => Err(format!("{}, got '{}'", message, s)),
                    Err(e) => Err(format!("invalid pattern {}: {}", pattern, e)),
                }
            }
            Validation::Cidr => {
                let s = value.as_str().unwrap_or_default();
                match s.parse::<IpNetwork>() {
                    Ok(_) if s.contains('/') => Ok(()),
                    _ => Err(format!("expected a CIDR block, got '{}'", s)),
                }
            }
            Validation::IpAddress => {
                let s = value.as_str().unwrap_or_default();
                s.parse::<IpAddr>()
                    .map(|_| ())
                    .map_err(|_| format!("expected an IP address, got '{}'", s))
            }
            Validation::Custom(f) => f(value),
        }
    }
}

fn as_int(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    List,
    Set,
    Single,
}

#[derive(Debug, Clone)]
pub enum AttrType {
    String,
    Int,
    Float,
    Bool,
    List(Box<AttrType>),
    Set(Box<AttrType>),
    Map(Box<AttrType>),
    Block(Nesting, Block),
}

impl AttrType {
    fn name(&self) -> &'static str {
        match self {
            AttrType::String => "string",
            AttrType::Int => "number",
            AttrType::Float => "number",
            AttrType::Bool => "bool",
            AttrType::List(_) => "list",
            AttrType::Set(_) => "set",
            AttrType::Map(_) => "map",
            AttrType::Block(..) => "block",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        if value.is_null() || is_unknown(value) {
            return true;
        }
        match self {
            AttrType::String => value.is_string(),
            AttrType::Int => as_int(value).is_some(),
            AttrType::Float => value.is_number(),
            AttrType::Bool => value.is_boolean(),
            AttrType::List(elem) | AttrType::Set(elem) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| elem.matches(v))),
            AttrType::Map(elem) => value
                .as_object()
                .is_some_and(|map| map.values().all(|v| elem.matches(v))),
            AttrType::Block(Nesting::Single, _) => value.is_object(),
            AttrType::Block(..) => value.is_array(),
        }
    }
}

#[derive(Clone)]
pub struct Attribute {
    pub kind: AttrType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub force_new: bool,
    pub default: Option<Value>,
    pub description: Option<&'static str>,
    pub deprecated: Option<&'static str>,
    pub validators: Vec<Validation>,
    pub suppress: Option<SuppressFn>,
    pub conflicts_with: Vec<&'static str>,
    pub exactly_one_of: Vec<&'static str>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("force_new", &self.force_new)
            .finish_non_exhaustive()
    }
}

impl Attribute {
    pub fn new(kind: AttrType) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            force_new: false,
            default: None,
            description: None,
            deprecated: None,
            validators: Vec::new(),
            suppress: None,
            conflicts_with: Vec::new(),
            exactly_one_of: Vec::new(),
            min_items: None,
            max_items: None,
        }
    }

    pub fn string() -> Self {
        Self::new(AttrType::String)
    }

    pub fn int() -> Self {
        Self::new(AttrType::Int)
    }

    pub fn float() -> Self {
        Self::new(AttrType::Float)
    }

    pub fn bool() -> Self {
        Self::new(AttrType::Bool)
    }

    pub fn list(elem: AttrType) -> Self {
        Self::new(AttrType::List(Box::new(elem)))
    }

    pub fn set(elem: AttrType) -> Self {
        Self::new(AttrType::Set(Box::new(elem)))
    }

    pub fn map(elem: AttrType) -> Self {
        Self::new(AttrType::Map(Box::new(elem)))
    }

    pub fn list_block(block: Block) -> Self {
        Self::new(AttrType::Block(Nesting::List, block))
    }

    pub fn set_block(block: Block) -> Self {
        Self::new(AttrType::Block(Nesting::Set, block))
    }

    pub fn single_block(block: Block) -> Self {
        Self::new(AttrType::Block(Nesting::Single, block))
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    #[must_use]
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.optional = true;
        self
    }

    #[must_use]
    pub fn description(mut self, text: &'static str) -> Self {
        self.description = Some(text);
        self
    }

    #[must_use]
    pub fn deprecated(mut self, message: &'static str) -> Self {
        self.deprecated = Some(message);
        self
    }

    #[must_use]
    pub fn validate(mut self, validation: Validation) -> Self {
        self.validators.push(validation);
        self
    }

    #[must_use]
    pub fn suppress(mut self, f: SuppressFn) -> Self {
        self.suppress = Some(f);
        self
    }

    #[must_use]
    pub fn conflicts_with(mut self, names: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(names);
        self
    }

    /// Group of sibling attributes of which exactly one must be set;
    /// include this attribute's own name
    #[must_use]
    pub fn exactly_one_of(mut self, names: &[&'static str]) -> Self {
        self.exactly_one_of.extend_from_slice(names);
        self
    }

    #[must_use]
    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = Some(n);
        self
    }

    #[must_use]
    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    /// Config may set this attribute
    pub fn is_settable(&self) -> bool {
        self.required || self.optional
    }

    pub fn nested(&self) -> Option<(Nesting, &Block)> {
        match &self.kind {
            AttrType::Block(nesting, block) => Some((*nesting, block)),
            _ => None,
        }
    }

    /// Scalar element validators also apply to each member of a list or set
    fn check_value(&self, path: &str, value: &Value, diags: &mut Diagnostics) {
        let members: Vec<&Value> = match (&self.kind, value) {
            (AttrType::List(_) | AttrType::Set(_), Value::Array(items)) => items.iter().collect(),
            (AttrType::Map(_), Value::Object(map)) => map.values().collect(),
            _ => vec![value],
        };
        for member in members {
            if member.is_null() || is_unknown(member) {
                continue;
            }
            for validation in &self.validators {
                if let Err(message) = validation.check(member) {
                    diags.error_at(path, message);
                }
            }
        }
    }
}

/// A set of named attributes
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: BTreeMap<String, Attribute>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn attr(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Resolve a value path such as `region.0.networking_deployment_cidr`.
    /// Index segments are skipped.
    pub fn attribute(&self, path: &str) -> Option<&Attribute> {
        self.ancestors(path).last().map(|(_, attr)| *attr)
    }

    /// Attributes along a value path, outermost first, each with the value
    /// path that addresses it
    pub fn ancestors(&self, path: &str) -> Vec<(String, &Attribute)> {
        let mut out = Vec::new();
        let mut block = Some(self);
        let mut prefix = String::new();
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            prefix = join(&prefix, segment);
            if segment.parse::<usize>().is_ok() {
                continue;
            }
            let Some(attr) = block.and_then(|b| b.get(segment)) else {
                break;
            };
            out.push((prefix.clone(), attr));
            block = attr.nested().map(|(_, b)| b);
        }
        out
    }

    /// Type-check and validate `config` against this block
    pub fn validate_config(&self, path: &str, config: &Value, diags: &mut Diagnostics) {
        let empty = Map::new();
        let object = match config {
            Value::Object(map) => map,
            Value::Null => &empty,
            other if is_unknown(other) => return,
            _ => {
                diags.error_at(path, "expected an object");
                return;
            }
        };

        for key in object.keys() {
            if !self.attributes.contains_key(key) {
                diags.error_at(
                    join(path, key),
                    format!("An argument named \"{}\" is not expected here", key),
                );
            }
        }

        for (name, attr) in &self.attributes {
            let attr_path = join(path, name);
            let value = object.get(name).unwrap_or(&Value::Null);
            let set = !value.is_null();

            if attr.required && !set {
                diags.error_at(&attr_path, format!("The argument \"{}\" is required", name));
                continue;
            }
            if set && !attr.is_settable() {
                diags.error_at(
                    &attr_path,
                    format!("\"{}\" is computed and cannot be set in configuration", name),
                );
                continue;
            }
            if set && let Some(message) = attr.deprecated {
                diags.push(Diagnostic::warning(message).at(&attr_path));
            }

            for other in &attr.conflicts_with {
                if set && object.get(*other).is_some_and(|v| !v.is_null()) {
                    diags.error_at(
                        &attr_path,
                        format!("\"{}\" conflicts with \"{}\"", name, other),
                    );
                }
            }

            if !attr.exactly_one_of.is_empty()
                && attr.exactly_one_of.iter().min() == Some(&name.as_str())
            {
                let count = attr
                    .exactly_one_of
                    .iter()
                    .filter(|n| object.get(**n).is_some_and(|v| !v.is_null()))
                    .count();
                if count != 1 {
                    diags.error_at(
                        &attr_path,
                        format!(
                            "exactly one of [{}] must be specified",
                            attr.exactly_one_of.join(", ")
                        ),
                    );
                }
            }

            if !set || is_unknown(value) {
                continue;
            }
            if !attr.kind.matches(value) {
                diags.error_at(
                    &attr_path,
                    format!("expected a {} value, got {}", attr.kind.name(), value),
                );
                continue;
            }

            if let Some(items) = value.as_array() {
                if let Some(min) = attr.min_items
                    && items.len() < min
                {
                    diags.error_at(&attr_path, format!("at least {} item(s) required", min));
                }
                if let Some(max) = attr.max_items
                    && items.len() > max
                {
                    diags.error_at(&attr_path, format!("no more than {} item(s) allowed", max));
                }
            }

            attr.check_value(&attr_path, value, diags);

            match attr.nested() {
                Some((Nesting::Single, block)) => block.validate_config(&attr_path, value, diags),
                Some((_, block)) => {
                    for (i, item) in value.as_array().into_iter().flatten().enumerate() {
                        block.validate_config(&join(&attr_path, &i.to_string()), item, diags);
                    }
                }
                None => {}
            }
        }
    }

    /// Planned value of this block: config values, then defaults, then for
    /// computed attributes the prior value or unknown when creating
    pub fn plan(&self, config: &Value, prior: Option<&Value>) -> Value {
        let mut out = Map::new();
        for (name, attr) in &self.attributes {
            let cfg = config.get(name).unwrap_or(&Value::Null);
            let prior_value = prior.and_then(|p| p.get(name));
            let planned = match attr.nested() {
                Some((Nesting::Single, block)) if cfg.is_object() => block.plan(cfg, prior_value),
                Some((_, block)) if cfg.is_array() => {
                    let items = cfg.as_array().map(Vec::as_slice).unwrap_or_default();
                    Value::Array(
                        items
                            .iter()
                            .enumerate()
                            .map(|(i, item)| {
                                let prior_item = prior_value.and_then(|p| p.get(i));
                                block.plan(item, prior_item)
                            })
                            .collect(),
                    )
                }
                _ if !cfg.is_null() => cfg.clone(),
                _ => match (&attr.default, attr.computed, prior_value) {
                    (Some(default), _, _) => default.clone(),
                    (None, true, Some(p)) => p.clone(),
                    (None, true, None) if prior.is_none() => unknown(),
                    _ => Value::Null,
                },
            };
            out.insert(name.clone(), planned);
        }
        Value::Object(out)
    }
}

/// Schema for one resource or data source
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub description: Option<&'static str>,
    pub block: Block,
    pub timeouts: Option<Timeouts>,
}

impl Schema {
    /// Resource schema: adds the computed `id` and, when `timeouts` is
    /// given, a `timeouts` block accepting per-operation overrides
    pub fn resource(block: Block, timeouts: Option<Timeouts>) -> Self {
        let mut block = block.attr("id", Attribute::string().computed());
        if timeouts.is_some() {
            let overrides = Block::new()
                .attr("create", Attribute::string().optional())
                .attr("read", Attribute::string().optional())
                .attr("update", Attribute::string().optional())
                .attr("delete", Attribute::string().optional());
            block = block.attr("timeouts", Attribute::single_block(overrides).optional());
        }
        Self {
            version: 0,
            description: None,
            block,
            timeouts,
        }
    }

    /// Data source schema: adds a computed `id` unless the block already
    /// declares one as a filter
    pub fn data_source(block: Block) -> Self {
        let block = if block.get("id").is_some() {
            block
        } else {
            block.attr("id", Attribute::string().computed())
        };
        Self {
            version: 0,
            description: None,
            block,
            timeouts: None,
        }
    }

    /// Provider configuration schema
    pub fn provider(block: Block) -> Self {
        Self {
            version: 0,
            description: None,
            block,
            timeouts: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, text: &'static str) -> Self {
        self.description = Some(text);
        self
    }

    /// Effective timeouts for a config or state carrying a `timeouts` block
    pub fn timeouts_for(&self, value: &Value) -> Result<Timeouts, String> {
        self.timeouts
            .unwrap_or_default()
            .with_overrides(value.get("timeouts").filter(|v| !v.is_null()))
    }

    /// Host-facing description of this schema
    pub fn describe(&self) -> Value {
        json!({
            "version": self.version,
            "description": self.description,
            "block": describe_block(&self.block),
        })
    }
}

fn describe_block(block: &Block) -> Value {
    let mut attributes = Map::new();
    let mut blocks = Map::new();
    for (name, attr) in &block.attributes {
        match attr.nested() {
            Some((nesting, inner)) => {
                let nesting = match nesting {
                    Nesting::List => "list",
                    Nesting::Set => "set",
                    Nesting::Single => "single",
                };
                blocks.insert(
                    name.clone(),
                    json!({
                        "nesting": nesting,
                        "max_items": attr.max_items,
                        "block": describe_block(inner),
                    }),
                );
            }
            None => {
                attributes.insert(
                    name.clone(),
                    json!({
                        "type": describe_type(&attr.kind),
                        "required": attr.required,
                        "optional": attr.optional,
                        "computed": attr.computed,
                        "sensitive": attr.sensitive,
                        "description": attr.description,
                    }),
                );
            }
        }
    }
    json!({"attributes": attributes, "blocks": blocks})
}

fn describe_type(kind: &AttrType) -> Value {
    match kind {
        AttrType::List(elem) => json!(["list", describe_type(elem)]),
        AttrType::Set(elem) => json!(["set", describe_type(elem)]),
        AttrType::Map(elem) => json!(["map", describe_type(elem)]),
        other => json!(other.name()),
    }
}
