//! Function units and the arena that holds them.
pub mod registry;
pub mod types;
pub mod unit;

pub use registry::Registry;
pub use types::{Inputs, Role, UnitId};
pub use unit::{FunctionUnit, Handler};
