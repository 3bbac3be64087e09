//! Calculator: evaluate a formula against a live source and coerce the
//! result into the declared output value type

use crate::bindings::{is_defined, LiveBindings};
use crate::error::{CalcError, Result};
use crate::evaluator::Evaluator;
use crate::source::CalcSource;
use crate::types::{CalculatedValue, Datapoint, ValueType};
use chrono::{TimeZone, Utc};
use evalexpr::Value;
use std::sync::Arc;
use tracing::warn;

/// Construction parameters for [`Calculator`]
pub struct CalculatorProps {
    /// Id of the calculated datapoint the results belong to
    pub datapoint_id: String,
    /// Display name of the calculated datapoint
    pub name: String,
    /// Formula text
    pub code: String,
    /// Declared output value type
    pub value_type: ValueType,
    /// Optional output unit, carried on the datapoint definition
    pub value_unit: Option<String>,
    /// Provider of current datapoint and sequence state
    pub source: Arc<dyn CalcSource>,
}

/// Computes a derived value for one calculated datapoint
///
/// The formula is compiled once at construction; each [`calculate`] call
/// re-reads current state through the source, so the caller may swap data
/// snapshots between calls without reconstructing the calculator.
///
/// [`calculate`]: Calculator::calculate
pub struct Calculator {
    point: Datapoint,
    code: String,
    source: Arc<dyn CalcSource>,
    evaluator: Evaluator,
}

impl std::fmt::Debug for Calculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calculator")
            .field("point", &self.point)
            .field("code", &self.code)
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}

impl Calculator {
    /// Compile the formula and bind it to a source
    ///
    /// Compilation failure is a fatal construction error; a calculator with
    /// an uncompilable formula cannot exist meaningfully.
    pub fn new(props: CalculatorProps) -> Result<Self> {
        let CalculatorProps {
            datapoint_id,
            name,
            code,
            value_type,
            value_unit,
            source,
        } = props;
        let evaluator = Evaluator::compile(&code)?;
        Ok(Self {
            point: Datapoint {
                id: datapoint_id,
                name,
                value_type,
                value_unit,
            },
            code,
            source,
            evaluator,
        })
    }

    /// The calculated datapoint definition the results belong to
    pub fn datapoint(&self) -> &Datapoint {
        &self.point
    }

    /// Replace the data snapshot used by subsequent calculations
    pub fn set_source(&mut self, source: Arc<dyn CalcSource>) {
        self.source = source;
    }

    /// Evaluate once against current state
    ///
    /// Never panics or propagates: every failure after construction is
    /// reported through the result's `error` field. An undefined result
    /// (empty, NaN) yields a value-less result, which is valid — formulas may
    /// intentionally produce "no value yet".
    pub fn calculate(&self) -> CalculatedValue {
        let bindings = Arc::new(LiveBindings::new(Arc::clone(&self.source)));
        let result = match self.evaluator.evaluate(bindings) {
            Ok(value) => value,
            Err(e) => return self.error_result(e),
        };
        if !is_defined(std::slice::from_ref(&result)) {
            return CalculatedValue::default();
        }
        match state_value_for(self.point.value_type, &result) {
            Ok((value_num, value_string)) => CalculatedValue {
                value_num,
                value_string,
                error: None,
            },
            Err(e) => self.error_result(e),
        }
    }

    fn error_result(&self, err: CalcError) -> CalculatedValue {
        warn!(datapoint = %self.point.id, error = %err, "calculation failed");
        CalculatedValue::error(format!(
            "Caught error in calculator. id: {}, code: {}, error: {err}",
            self.point.id, self.code
        ))
    }
}

/// Coerce a computed value into the declared output type
fn state_value_for(
    value_type: ValueType,
    calculated: &Value,
) -> Result<(Option<f64>, Option<String>)> {
    match value_type {
        ValueType::Number => match calculated {
            Value::Float(f) => Ok((Some(*f), None)),
            Value::Int(i) => Ok((Some(*i as f64), None)),
            other => Err(mismatch(value_type, other)),
        },
        ValueType::String => match calculated {
            Value::String(s) => Ok((None, Some(s.clone()))),
            other => Err(mismatch(value_type, other)),
        },
        ValueType::Boolean => match calculated {
            // A computed string is kept verbatim; only "true" maps to 1
            Value::String(s) => Ok((Some((s == "true") as i64 as f64), Some(s.clone()))),
            Value::Float(f) => Ok((Some(*f), Some(bool_text(*f == 1.0)))),
            Value::Int(i) => Ok((Some(*i as f64), Some(bool_text(*i == 1)))),
            Value::Boolean(b) => Ok((Some(*b as i64 as f64), Some(bool_text(*b)))),
            other => Err(mismatch(value_type, other)),
        },
        ValueType::Date => match calculated {
            Value::Float(f) => Ok((Some(*f), Some(format_date(*f as i64)?))),
            Value::Int(i) => Ok((Some(*i as f64), Some(format_date(*i)?))),
            other => Err(mismatch(value_type, other)),
        },
    }
}

fn bool_text(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

fn format_date(millis: i64) -> Result<String> {
    let datetime = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        CalcError::type_mismatch(format!(
            "The calculated result {millis} is not a valid timestamp."
        ))
    })?;
    Ok(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn mismatch(expected: ValueType, actual: &Value) -> CalcError {
    CalcError::type_mismatch(format!(
        "The specified value type is {expected}, but the type of the calculated result is {}.",
        value_kind(actual)
    ))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Float(_) | Value::Int(_) => "number",
        Value::Boolean(_) => "boolean",
        Value::Tuple(_) => "tuple",
        Value::Empty => "empty",
    }
}
