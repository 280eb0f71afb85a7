//! Per-operation timeouts
//!
//! Each resource declares defaults; a `timeouts` block in config overrides
//! them with duration strings such as `45m`, `90s` or `1h30m`.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;

const MINUTE: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn key(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    /// 30m create, 10m read, 30m update, 10m delete
    fn default() -> Self {
        Self::minutes(30, 10, 30, 10)
    }
}

impl Timeouts {
    pub const fn minutes(create: u64, read: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * MINUTE),
            read: Duration::from_secs(read * MINUTE),
            update: Duration::from_secs(update * MINUTE),
            delete: Duration::from_secs(delete * MINUTE),
        }
    }

    /// The same duration for every operation
    pub const fn uniform(minutes: u64) -> Self {
        Self::minutes(minutes, minutes, minutes, minutes)
    }

    pub fn get(&self, op: Operation) -> Duration {
        match op {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    /// Apply a `timeouts` block from config or state on top of these defaults
    pub fn with_overrides(mut self, block: Option<&Value>) -> Result<Self, String> {
        let Some(block) = block.and_then(|b| match b {
            Value::Array(items) => items.first(),
            other => Some(other),
        }) else {
            return Ok(self);
        };

        for op in [Operation::Create, Operation::Read, Operation::Update, Operation::Delete] {
            if let Some(raw) = block.get(op.key()).and_then(Value::as_str) {
                let parsed = parse_duration(raw)?;
                match op {
                    Operation::Create => self.create = parsed,
                    Operation::Read => self.read = parsed,
                    Operation::Update => self.update = parsed,
                    Operation::Delete => self.delete = parsed,
                }
            }
        }
        Ok(self)
    }
}

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").expect("valid duration pattern")
    })
}

/// Parse `1h30m`, `45m`, `90s` and similar
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    let invalid = || format!("invalid duration '{}', expected e.g. 45m, 90s or 1h30m", raw);
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let caps = duration_pattern().captures(trimmed).ok_or_else(invalid)?;
    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    Ok(Duration::from_secs(part(1) * 3600 + part(2) * MINUTE + part(3)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("45m").unwrap(), Duration::from_secs(45 * 60));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(90 * 60));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("ten minutes").is_err());
    }

    #[test]
    fn test_overrides_replace_only_named_operations() {
        let defaults = Timeouts::default();
        let block = json!([{"create": "1h"}]);
        let timeouts = defaults.with_overrides(Some(&block)).unwrap();
        assert_eq!(timeouts.create, Duration::from_secs(3600));
        assert_eq!(timeouts.delete, defaults.delete);
    }
}
