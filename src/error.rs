//! Error types for datapoint-calc

use thiserror::Error;

/// Result type for datapoint-calc operations
pub type Result<T> = std::result::Result<T, CalcError>;

/// Calculation errors
///
/// Only `Compile` may escape to the caller (a calculator with an
/// uncompilable formula cannot exist). Every other kind is recovered by
/// `Calculator::calculate` / `find_references` and reported through the
/// result's `error` field.
#[derive(Debug, Error, Clone)]
pub enum CalcError {
    /// Formula cannot be parsed by the expression engine
    #[error("Compile error: {0}")]
    Compile(String),

    /// Binding called with inconsistent arguments (e.g. mismatched array lengths)
    #[error("Argument mismatch: {0}")]
    ArgumentMismatch(String),

    /// Token is not a recognized duration unit
    #[error("Invalid duration unit: {0}")]
    InvalidUnit(String),

    /// Selector is not one of "first" / "last"
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Aspect is not one of "at" / "value"
    #[error("Invalid aspect: {0}")]
    InvalidAspect(String),

    /// Source has no sequence with the requested id
    #[error("Unknown sequence: {0}")]
    UnknownSequence(String),

    /// Source has no datapoint with the requested id
    #[error("Unknown datapoint: {0}")]
    UnknownDatapoint(String),

    /// Operation is invalid for the datapoint's declared value type
    #[error("Unsupported value type: {0}")]
    UnsupportedValueType(String),

    /// Computed result does not match the declared output value type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Opaque failure surfaced by the expression engine
    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

impl CalcError {
    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    pub fn argument_mismatch(msg: impl Into<String>) -> Self {
        Self::ArgumentMismatch(msg.into())
    }

    pub fn invalid_unit(msg: impl Into<String>) -> Self {
        Self::InvalidUnit(msg.into())
    }

    pub fn invalid_selector(msg: impl Into<String>) -> Self {
        Self::InvalidSelector(msg.into())
    }

    pub fn invalid_aspect(msg: impl Into<String>) -> Self {
        Self::InvalidAspect(msg.into())
    }

    pub fn unknown_sequence(msg: impl Into<String>) -> Self {
        Self::UnknownSequence(msg.into())
    }

    pub fn unknown_datapoint(msg: impl Into<String>) -> Self {
        Self::UnknownDatapoint(msg.into())
    }

    pub fn unsupported_value_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedValueType(msg.into())
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }
}
