//! Database tags must be lower case

use serde_json::Value;

use crate::host::Diagnostics;
use crate::host::value::is_unknown;

/// One error per tag whose key or value is not lower case
pub fn check_tags(config: &Value, attribute: &str) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let Some(tags) = config.get(attribute).and_then(Value::as_object) else {
        return diags;
    };
    for (key, value) in tags {
        if is_unknown(value) {
            continue;
        }
        let value = value.as_str().unwrap_or_default();
        if key != &key.to_lowercase() || value != value.to_lowercase() {
            diags.error_at(
                format!("{}.{}", attribute, key),
                format!("tag '{}' = '{}' must be lower case", key, value),
            );
        }
    }
    diags
}
