//! Human-readable listings of units and compiled plans.
pub mod report;

pub use report::{describe_units, format_plan};
