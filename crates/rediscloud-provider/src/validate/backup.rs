//! Remote backup scheduling rules

use std::collections::BTreeSet;

use chrono::{NaiveTime, Timelike};
use serde_json::Value;

use crate::host::walk::{self, leaf, parent};
use crate::host::{Diagnostics, ResourceDiff, SuppressArgs};

pub const INTERVAL_12_HOURS: &str = "every-12-hours";
pub const INTERVAL_24_HOURS: &str = "every-24-hours";

const TIME_FORMAT: &str = "%H:%M";

/// `time_utc` is only meaningful for 12 and 24 hour intervals. Checks every
/// `remote_backup` block touched by the plan, however deeply nested.
pub fn check_backup_time_utc(diff: &ResourceDiff<'_>) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let blocks: BTreeSet<String> = diff
        .changed_paths()
        .into_iter()
        .filter_map(|path| {
            let block = parent(&path).to_string();
            let container = parent(&block);
            (leaf(container) == "remote_backup" || leaf(&block) == "remote_backup")
                .then_some(block)
        })
        .collect();

    for block in blocks {
        let Some(time_utc) = diff
            .get(&walk::join(&block, "time_utc"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
        else {
            continue;
        };
        let interval = diff
            .get(&walk::join(&block, "interval"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if interval != INTERVAL_12_HOURS && interval != INTERVAL_24_HOURS {
            diags.error_at(
                walk::join(&block, "time_utc"),
                format!(
                    "unexpected value \"{}\" for time_utc. time_utc can only be set when interval is either {} or {}",
                    time_utc, INTERVAL_24_HOURS, INTERVAL_12_HOURS
                ),
            );
        }
    }
    diags
}

/// With a 12 hour interval the API may report either of the two daily run
/// times, so `02:30` and `14:30` are the same schedule
pub fn suppress_twelve_hour_shift(args: &SuppressArgs<'_>) -> bool {
    let interval_path = walk::join(parent(args.path), "interval");
    let interval = walk::get(args.planned, &interval_path).and_then(Value::as_str);
    if interval != Some(INTERVAL_12_HOURS) {
        return false;
    }
    match (args.old.as_str(), args.new.as_str()) {
        (Some(old), Some(new)) => twelve_hours_apart(old, new),
        _ => false,
    }
}

fn twelve_hours_apart(a: &str, b: &str) -> bool {
    match (
        NaiveTime::parse_from_str(a, TIME_FORMAT),
        NaiveTime::parse_from_str(b, TIME_FORMAT),
    ) {
        (Ok(a), Ok(b)) => a.minute() == b.minute() && a.hour() % 12 == b.hour() % 12,
        _ => false,
    }
}
