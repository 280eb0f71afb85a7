//! Plan-time checks
//!
//! Pure functions over raw config or the planned diff. They run before any
//! API call; resources wire them into `validate`, `customize_diff` or a
//! schema attribute's suppress function.

pub mod backup;
pub mod database;
pub mod subscription;
pub mod tags;

pub use backup::{check_backup_time_utc, suppress_twelve_hour_shift};
pub use database::{
    check_memory_or_dataset, check_query_performance_factor, check_tls_certificates,
    validate_replica_uri,
};
pub use subscription::{
    check_allowlist_account, check_cidr_overlap, check_gcp_account, check_payment_method,
    check_unique_region_names, require_creation_plan, suppress_after_create,
};
pub use tags::check_tags;
