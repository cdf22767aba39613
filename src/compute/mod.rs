//! Plan compilation and replay.
pub mod bytecode;
pub mod engine;
pub mod ledger;

pub use bytecode::{CompiledPlan, Compiler, Instruction, PlanKind};
pub use engine::Engine;
pub use ledger::{EvalError, HandlerError, IntoOutput, Ledger, Value};
