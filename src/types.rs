//! Core data model: datapoints, sequences, states, duration units
//!
//! Definitions are created by configuration and owned by the source layer;
//! this crate only reads them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in epoch milliseconds
pub type Millis = i64;

/// Declared value type of a datapoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    String,
    Boolean,
    Date,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed measurable quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datapoint {
    pub id: String,
    pub name: String,
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_unit: Option<String>,
}

/// A single observation of a datapoint
///
/// Which of `value_num` / `value_string` is meaningful depends on the owning
/// datapoint's declared value type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatapointState {
    pub id: String,
    pub at: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_num: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
}

/// A named, ordered time series of states for one datapoint definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatapointSequence {
    pub id: String,
    pub point: Datapoint,
}

/// Retained observations of a sequence
///
/// Invariant: `data` is ordered by non-decreasing `at`; the first element is
/// the earliest sample, the last is the latest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceState {
    pub id: String,
    pub at: Millis,
    pub data: Vec<DatapointState>,
}

/// Time granularity for duration and integral results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    /// Accepted tokens, in the same order as the variants
    pub const TOKENS: [&'static str; 5] = ["ms", "s", "m", "h", "d"];

    /// Parse a formula-facing token; unrecognized tokens are a validation
    /// error for the caller, never a silent default.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ms" => Some(Self::Milliseconds),
            "s" => Some(Self::Seconds),
            "m" => Some(Self::Minutes),
            "h" => Some(Self::Hours),
            "d" => Some(Self::Days),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }

    /// Milliseconds per one of this unit
    pub fn millis_factor(&self) -> f64 {
        match self {
            Self::Milliseconds => 1.0,
            Self::Seconds => 1_000.0,
            Self::Minutes => 60_000.0,
            Self::Hours => 3_600_000.0,
            Self::Days => 86_400_000.0,
        }
    }
}

/// Result of one calculation
///
/// Exactly one of a value pair or an error is populated; all fields `None`
/// means "no value available", which is a valid outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculatedValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_num: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CalculatedValue {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            error: Some(msg.into()),
            ..Self::default()
        }
    }

    pub fn has_value(&self) -> bool {
        self.value_num.is_some() || self.value_string.is_some()
    }
}
