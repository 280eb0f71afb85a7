//! Host adapter
//!
//! The typed layer between the infrastructure-as-code host and resource
//! controllers: schemas, config/state values, plan diffs, diagnostics and
//! timeouts.

pub mod data;
pub mod diag;
pub mod diff;
pub mod resource;
pub mod schema;
pub mod timeouts;
pub mod value;
pub mod walk;

pub use data::ResourceData;
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use diff::ResourceDiff;
pub use resource::{DataSource, Resource, import_passthrough};
pub use schema::{
    AttrType, Attribute, Block, Nesting, Schema, SuppressArgs, SuppressFn, Validation,
};
pub use timeouts::{Operation, Timeouts};
pub use value::{UNKNOWN, is_unknown};
