//! The public composition workflow: register units, compile once, evaluate many times.
pub mod accessor;
pub mod composer;
pub mod composition;
pub mod config;

pub use accessor::StateView;
pub use composer::{CompileError, Composer};
pub use composition::{CallArgs, Composition};
pub use config::{ArgumentOrder, CompositionOptions};
