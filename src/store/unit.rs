//! A single registered computation and its label contract.

use super::types::{Inputs, Role};
use crate::compute::ledger::{HandlerError, IntoOutput, Value};
use std::fmt;

pub type Handler = Box<dyn FnMut(&Inputs<'_>) -> Result<Value, HandlerError>>;

/// Wraps one user handler with its declared input/output labels.
///
/// The order inside each label list is significant: it fixes the positional
/// order of the handler arguments and the positional mapping of its outputs.
pub struct FunctionUnit {
    handler: Handler,
    pub name: Option<String>,
    pub i_state: Vec<String>,
    pub i_param: Vec<String>,
    pub o_state: Vec<String>,
    pub o_param: Vec<String>,
}

impl FunctionUnit {
    pub fn new<F, R>(mut handler: F) -> Self
    where
        F: FnMut(&Inputs<'_>) -> R + 'static,
        R: IntoOutput,
    {
        Self {
            handler: Box::new(move |inputs: &Inputs<'_>| handler(inputs).into_output()),
            name: None,
            i_state: Vec::new(),
            i_param: Vec::new(),
            o_state: Vec::new(),
            o_param: Vec::new(),
        }
    }

    /// Forwards to the handler unchanged. No arity checks happen here.
    #[inline]
    pub fn call(&mut self, inputs: &Inputs<'_>) -> Result<Value, HandlerError> {
        (self.handler)(inputs)
    }

    pub fn set_i_state<I, S>(&mut self, labels: I) where I: IntoIterator<Item = S>, S: Into<String> {
        self.i_state = collect(labels);
    }

    pub fn set_i_param<I, S>(&mut self, labels: I) where I: IntoIterator<Item = S>, S: Into<String> {
        self.i_param = collect(labels);
    }

    pub fn set_o_state<I, S>(&mut self, labels: I) where I: IntoIterator<Item = S>, S: Into<String> {
        self.o_state = collect(labels);
    }

    pub fn set_o_param<I, S>(&mut self, labels: I) where I: IntoIterator<Item = S>, S: Into<String> {
        self.o_param = collect(labels);
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_i_state<I, S>(mut self, labels: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        self.set_i_state(labels);
        self
    }

    pub fn with_i_param<I, S>(mut self, labels: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        self.set_i_param(labels);
        self
    }

    pub fn with_o_state<I, S>(mut self, labels: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        self.set_o_state(labels);
        self
    }

    pub fn with_o_param<I, S>(mut self, labels: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        self.set_o_param(labels);
        self
    }

    /// `None` when the unit declares no outputs, or outputs of both kinds.
    pub fn role(&self) -> Option<Role> {
        match (self.o_state.is_empty(), self.o_param.is_empty()) {
            (false, true) => Some(Role::Derivatives),
            (true, false) => Some(Role::Parameters),
            _ => None,
        }
    }

    pub fn output_count(&self) -> usize { self.o_state.len() + self.o_param.len() }

    pub fn produces(&self, label: &str) -> bool {
        self.o_state.iter().chain(&self.o_param).any(|l| l == label)
    }
}

impl fmt::Debug for FunctionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionUnit")
            .field("name", &self.name)
            .field("i_state", &self.i_state)
            .field("i_param", &self.i_param)
            .field("o_state", &self.o_state)
            .field("o_param", &self.o_param)
            .finish_non_exhaustive()
    }
}

fn collect<I, S>(labels: I) -> Vec<String> where I: IntoIterator<Item = S>, S: Into<String> {
    labels.into_iter().map(Into::into).collect()
}
