//! Composition engine for ODE systems assembled from small function units.
//!
//! Each unit declares which states and parameters it reads and which
//! derivatives or parameters it produces. A [`Composer`] checks the units,
//! resolves parameter dependencies and compiles two flat plans; the resulting
//! [`Composition`] is a single `f(t, y)` an integrator can call repeatedly.

pub mod analysis;   // label sets, sanity rules, dependency resolution
pub mod compute;    // plan compiler + interpreter
pub mod display;    // unit and plan listings
pub mod store;      // function units and their arena
pub mod system;     // composer, composition, options

pub use compute::{EvalError, HandlerError, Value};
pub use store::{FunctionUnit, Inputs, UnitId};
pub use system::{ArgumentOrder, CallArgs, CompileError, Composer, Composition, CompositionOptions, StateView};
