//! Cloud-specific workflows and status sets

pub mod status;
pub mod workflows;

pub use workflows::*;
