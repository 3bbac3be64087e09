//! datapoint-calc - Calculated-datapoint engine
//!
//! Evaluates user-authored formulas against live time-series data (datapoints
//! and datapoint sequences) and coerces the result into a declared output
//! type. Also extracts, ahead of evaluation, which datapoints and sequences a
//! formula will read.
//!
//! # Features
//!
//! - **Formula evaluation**: arithmetic, comparison, and logic via evalexpr,
//!   with domain functions injected into the expression scope
//! - **Typed results**: number, string, boolean, and date outputs with strict
//!   coercion; "no value yet" is a valid outcome, never an error
//! - **Dependency extraction**: `find_references` evaluates a formula against
//!   recording stubs to discover the ids it reads, without real data
//!
//! # Example
//!
//! ```rust
//! use datapoint_calc::{
//!     Calculator, CalculatorProps, Datapoint, DatapointState, MemorySource, ValueType,
//! };
//! use std::sync::Arc;
//!
//! let mut source = MemorySource::new();
//! source.insert_datapoint(
//!     Datapoint {
//!         id: "power".to_string(),
//!         name: "Power".to_string(),
//!         value_type: ValueType::Number,
//!         value_unit: Some("W".to_string()),
//!     },
//!     Some(DatapointState {
//!         id: "power".to_string(),
//!         at: 0,
//!         value_num: Some(1000.0),
//!         value_string: None,
//!     }),
//! );
//!
//! let calculator = Calculator::new(CalculatorProps {
//!     datapoint_id: "half-power".to_string(),
//!     name: "Half power".to_string(),
//!     code: r#"get("power") * 0.5"#.to_string(),
//!     value_type: ValueType::Number,
//!     value_unit: Some("W".to_string()),
//!     source: Arc::new(source),
//! })
//! .unwrap();
//!
//! let result = calculator.calculate();
//! assert_eq!(result.value_num, Some(500.0));
//! ```
//!
//! # Formula Functions
//!
//! | Function | Signature | Description |
//! |----------|-----------|-------------|
//! | `isDef` | `isDef(...values)` | True iff no argument is empty or NaN |
//! | `get` | `get(datapointId)` | Current value of a datapoint |
//! | `seqDuration` | `seqDuration(sequenceId, unit)` | Time span of a sequence |
//! | `seqFind` | `seqFind(which, sequenceId, value, aspect)` | First/last matching sample |
//! | `seqIntegral` | `seqIntegral(sequenceId, unit)` | Trapezoidal time integral |
//! | `valueForRange` | `valueForRange(value, limits, values, ifNone)` | Bucket by lower threshold |
//!
//! Duration units: `ms`, `s`, `m`, `h`, `d`.

pub mod bindings;
pub mod calculator;
pub mod error;
mod evaluator;
pub mod range;
pub mod references;
pub mod sequence;
pub mod source;
pub mod types;

// Re-exports for convenience
pub use bindings::{is_defined, DomainBindings, LiveBindings, RecordingBindings};
pub use calculator::{Calculator, CalculatorProps};
pub use error::{CalcError, Result};
pub use references::{find_references, CalcReferences};
pub use sequence::{FindAspect, FindWhich};
pub use source::{CalcSource, DatapointEntry, MemorySource, SequenceEntry};
pub use types::{
    CalculatedValue, Datapoint, DatapointSequence, DatapointState, DurationUnit, Millis,
    SequenceState, ValueType,
};
