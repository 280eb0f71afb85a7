//! Database config rules

use serde_json::Value;
use url::Url;

use crate::host::Diagnostics;
use crate::host::value::{is_null_or_unknown, is_unknown};
use crate::host::walk::{self, join};

pub const REDISEARCH_MODULE: &str = "RediSearch";

/// `query_performance_factor` needs `modules` written out in config and
/// naming RediSearch. Modules may be plain names or `{name = ...}` blocks.
pub fn check_query_performance_factor(config: &Value, path: &str) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let factor_path = join(path, "query_performance_factor");
    if walk::get(config, &factor_path).and_then(Value::as_str).is_none_or(str::is_empty) {
        return diags;
    }

    let modules = walk::lookup(config, &join(path, "modules"));
    let Some(modules) = modules.filter(|m| !m.is_null()) else {
        diags.error_at(
            &factor_path,
            "query_performance_factor requires the 'modules' list to be set explicitly",
        );
        return diags;
    };
    if contains_unknown_module(modules) {
        return diags;
    }

    let has_search = modules.as_array().is_some_and(|items| {
        items.iter().any(|m| {
            m.as_str()
                .or_else(|| m.get("name").and_then(Value::as_str))
                .is_some_and(|name| name == REDISEARCH_MODULE)
        })
    });
    if !has_search {
        diags.error_at(
            &factor_path,
            format!("query_performance_factor is only available with the '{}' module", REDISEARCH_MODULE),
        );
    }
    diags
}

fn contains_unknown_module(modules: &Value) -> bool {
    is_unknown(modules)
        || modules.as_array().is_some_and(|items| {
            items
                .iter()
                .any(|m| is_unknown(m) || m.get("name").is_some_and(is_unknown))
        })
}

/// Exactly one of `memory_limit_in_gb` and `dataset_size_in_gb`
pub fn check_memory_or_dataset(config: &Value, path: &str) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let memory = walk::is_set(config, &join(path, "memory_limit_in_gb"));
    let dataset = walk::is_set(config, &join(path, "dataset_size_in_gb"));
    match (memory, dataset) {
        (true, true) => diags.error_at(
            join(path, "dataset_size_in_gb"),
            "only one of memory_limit_in_gb and dataset_size_in_gb may be set",
        ),
        (false, false) => diags.error_at(
            join(path, "dataset_size_in_gb"),
            "one of memory_limit_in_gb or dataset_size_in_gb must be set",
        ),
        _ => {}
    }
    diags
}

/// TLS can only be switched off alongside client certificates in the legacy
/// single-certificate mode
pub fn check_tls_certificates(config: &Value) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let tls_off = walk::get(config, "enable_tls").and_then(Value::as_bool) == Some(false);
    let certificates = walk::lookup(config, "client_tls_certificates")
        .is_some_and(|v| is_unknown(v) || v.as_array().is_some_and(|items| !items.is_empty()));
    if tls_off && certificates {
        diags.error_at(
            "enable_tls",
            "TLS must be enabled when client_tls_certificates is set; set enable_tls = true or remove the certificates",
        );
    }
    diags
}

/// Replica sources are Redis URIs
pub fn validate_replica_uri(value: &Value) -> Result<(), String> {
    if is_null_or_unknown(value) {
        return Ok(());
    }
    let raw = value.as_str().unwrap_or_default();
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "redis" | "rediss") && url.host_str().is_some() => Ok(()),
        _ => Err(format!(
            "expected a redis:// or rediss:// URI such as redis://endpoint:6379, got '{}'",
            raw
        )),
    }
}
