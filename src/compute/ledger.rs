//! ledger.rs
//! Handler return values, evaluation errors and the per-evaluation scratch buffers.

use crate::analysis::ResolutionError;
use crate::store::UnitId;
use smallvec::SmallVec;
use thiserror::Error;

/// Failure raised by a user handler.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("handler of unit {unit} failed: {source}")]
    Handler { unit: UnitId, source: HandlerError },
    #[error("unit {unit} returned {actual} value(s), declared {expected}")]
    Shape { unit: UnitId, expected: usize, actual: usize },
    #[error("state vector has {actual} entries, the composition has {expected} states")]
    StateLength { expected: usize, actual: usize },
    #[error("arguments given as {given}, composition is configured for {configured}")]
    ArgumentOrder { configured: &'static str, given: &'static str },
    #[error("malformed plan: {msg}")]
    MalformedPlan { msg: String },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// What a handler hands back.
///
/// A bare scalar counts as one element, so a single-output unit may return
/// either form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Vector(SmallVec<[f64; 4]>),
}

impl Value {
    pub fn len(&self) -> usize {
        match self { Value::Scalar(_) => 1, Value::Vector(v) => v.len() }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    #[inline(always)]
    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            Value::Scalar(s) if i == 0 => Some(*s),
            Value::Scalar(_) => None,
            Value::Vector(v) => v.get(i).copied(),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match self { Value::Scalar(s) => vec![*s], Value::Vector(v) => v.to_vec() }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Scalar(v) }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self { Value::Vector(SmallVec::from_vec(v)) }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self { Value::Vector(SmallVec::from_slice(v)) }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(v: [f64; N]) -> Self { Value::Vector(SmallVec::from_slice(&v)) }
}

/// Anything a handler closure may return.
pub trait IntoOutput {
    fn into_output(self) -> Result<Value, HandlerError>;
}

impl IntoOutput for Value {
    fn into_output(self) -> Result<Value, HandlerError> { Ok(self) }
}

impl IntoOutput for f64 {
    fn into_output(self) -> Result<Value, HandlerError> { Ok(Value::Scalar(self)) }
}

impl IntoOutput for Vec<f64> {
    fn into_output(self) -> Result<Value, HandlerError> { Ok(self.into()) }
}

impl<const N: usize> IntoOutput for [f64; N] {
    fn into_output(self) -> Result<Value, HandlerError> { Ok(self.into()) }
}

impl<T: IntoOutput> IntoOutput for Result<T, HandlerError> {
    fn into_output(self) -> Result<Value, HandlerError> {
        self.and_then(IntoOutput::into_output)
    }
}

/// Scratch buffers for one composition.
///
/// Reset before every replay so nothing leaks from one evaluation into the next.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    params: Vec<f64>,
    derivatives: Vec<f64>,
    args: Vec<f64>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(params: usize, states: usize, args: usize) -> Self {
        Self {
            params: Vec::with_capacity(params),
            derivatives: Vec::with_capacity(states),
            args: Vec::with_capacity(args),
        }
    }

    pub fn params(&self) -> &[f64] { &self.params }

    pub fn derivatives(&self) -> &[f64] { &self.derivatives }

    /// Zero the parameter buffer and the argument arena.
    pub(crate) fn reset_params(&mut self, len: usize, arena: usize) {
        reset(&mut self.params, len);
        reset(&mut self.args, arena);
    }

    pub(crate) fn reset_derivatives(&mut self, len: usize, arena: usize) {
        reset(&mut self.derivatives, len);
        reset(&mut self.args, arena);
    }

    pub(crate) fn params_parts(&mut self) -> (&mut Vec<f64>, &mut Vec<f64>) {
        (&mut self.params, &mut self.args)
    }

    pub(crate) fn derivative_parts(&mut self) -> (&[f64], &mut Vec<f64>, &mut Vec<f64>) {
        (&self.params, &mut self.derivatives, &mut self.args)
    }
}

fn reset(buf: &mut Vec<f64>, len: usize) {
    buf.clear();
    buf.resize(len, 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_counts_as_one_element() {
        let v = 3.5_f64.into_output().unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v.get(0), Some(3.5));
        assert_eq!(v.get(1), None);
    }

    #[test]
    fn test_handler_error_passes_through() {
        let r: Result<f64, HandlerError> = Err(HandlerError::new("boom"));
        assert_eq!(r.into_output().unwrap_err().message, "boom");
    }

    #[test]
    fn test_reset_clears_previous_values() {
        let mut ledger = Ledger::new();
        ledger.reset_params(3, 2);
        ledger.params_parts().0[1] = 7.0;
        ledger.reset_params(3, 2);
        assert_eq!(ledger.params(), &[0.0, 0.0, 0.0]);
    }
}
