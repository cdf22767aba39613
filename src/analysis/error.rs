//! Defines the error types for the sanity verifier.
use crate::store::UnitId;
use std::fmt;

/// The specific category of a sanity violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorType {
    /// An output label is produced by more than one unit.
    DuplicateProducer,
    /// A unit declares no outputs at all.
    NoOutputs,
    /// An input label is never produced.
    UnresolvedInput,
    /// A unit declares both state and parameter outputs.
    MixedOutputs,
    /// Nothing to integrate.
    NoStates,
    /// The same label is used as a state and as a parameter.
    LabelCollision,
}

/// One sanity violation, with enough context to point at the offending unit or label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub error_type: ValidationErrorType,
    pub unit: Option<UnitId>,
    pub label: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(error_type: ValidationErrorType, message: impl Into<String>) -> Self {
        Self { error_type, unit: None, label: None, message: message.into() }
    }

    pub fn at_unit(mut self, unit: UnitId) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn for_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sanity check: {}", self.message)
    }
}
