//! Static analysis run before any plan is compiled: label discovery, sanity
//! rules and parameter dependency resolution. Plan statistics live here too.
pub mod error;
pub mod sets;
pub mod telemetry;
pub mod topology;
pub mod validation;

pub use error::{ValidationError, ValidationErrorType};
pub use sets::{LabelSets, StateOrderMismatch};
pub use telemetry::{PlanReport, TrafficStats};
pub use topology::{DependencyResolver, ResolutionError};
pub use validation::Validator;
