//! Domain function bindings injected into the expression engine
//!
//! Every evaluation runs with six named callables in scope: `isDef`, `get`,
//! `seqDuration`, `seqFind`, `seqIntegral`, `valueForRange`. The first five
//! dispatch through [`DomainBindings`], which has two implementations:
//! [`LiveBindings`] reads the bound source, [`RecordingBindings`] only records
//! the requested ids for dependency extraction.

use crate::error::{CalcError, Result};
use crate::range;
use crate::sequence::{self, FindAspect, FindWhich, FoundValue, MatchValue};
use crate::source::{CalcSource, SequenceEntry};
use crate::types::{DurationUnit, ValueType};
use evalexpr::{
    ContextWithMutableFunctions, EvalexprError, EvalexprResult, Function, HashMapContext, Value,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// True iff every value is neither empty nor NaN
pub fn is_defined(values: &[Value]) -> bool {
    values.iter().all(|value| match value {
        Value::Empty => false,
        Value::Float(f) => !f.is_nan(),
        _ => true,
    })
}

/// Named callables the formula language dispatches through
///
/// `valueForRange` and `isDef` are pure and need no binding; everything that
/// touches datapoint or sequence state goes through here.
pub trait DomainBindings: Send + Sync {
    /// Current value of a datapoint; `Empty` when it has no state
    fn get(&self, key: &str) -> Result<Value>;

    /// Time span covered by a sequence, in `unit`
    fn seq_duration(&self, sequence_id: &str, unit: &str) -> Result<f64>;

    /// First/last sample matching `value`, reported as timestamp or value
    fn seq_find(&self, which: &str, sequence_id: &str, value: &Value, aspect: &str)
        -> Result<Value>;

    /// Trapezoidal integral of a numeric sequence, in `unit`
    fn seq_integral(&self, sequence_id: &str, unit: &str) -> Result<f64>;
}

/// Bindings wired to a live data source
pub struct LiveBindings {
    source: Arc<dyn CalcSource>,
}

impl LiveBindings {
    pub fn new(source: Arc<dyn CalcSource>) -> Self {
        Self { source }
    }

    fn lookup_sequence(&self, sequence_id: &str) -> Result<SequenceEntry> {
        self.source.get_sequence(sequence_id).ok_or_else(|| {
            CalcError::unknown_sequence(format!(
                "The sequence with id {sequence_id} is not available in the context."
            ))
        })
    }
}

fn parse_unit(function: &str, token: &str) -> Result<DurationUnit> {
    DurationUnit::parse(token).ok_or_else(|| {
        CalcError::invalid_unit(format!(
            "The function {function} needs a duration unit as second param. Use one of: {}",
            DurationUnit::TOKENS.join(", ")
        ))
    })
}

impl DomainBindings for LiveBindings {
    fn get(&self, key: &str) -> Result<Value> {
        let entry = self.source.get_datapoint(key).ok_or_else(|| {
            CalcError::unknown_datapoint(format!(
                "The datapoint with id {key} is not available in the context."
            ))
        })?;
        debug!(datapoint = key, "get");
        let Some(state) = entry.state else {
            return Ok(Value::Empty);
        };
        Ok(match entry.point.value_type {
            ValueType::String => state.value_string.map(Value::String).unwrap_or(Value::Empty),
            _ => state.value_num.map(Value::Float).unwrap_or(Value::Empty),
        })
    }

    fn seq_duration(&self, sequence_id: &str, unit: &str) -> Result<f64> {
        let unit = parse_unit("seqDuration", unit)?;
        let entry = self.lookup_sequence(sequence_id)?;
        debug!(sequence = sequence_id, unit = unit.token(), "seqDuration");
        Ok(sequence::duration(&entry.state, unit))
    }

    fn seq_find(
        &self,
        which: &str,
        sequence_id: &str,
        value: &Value,
        aspect: &str,
    ) -> Result<Value> {
        let which = FindWhich::parse(which).ok_or_else(|| {
            CalcError::invalid_selector(
                r#"The function seqFind needs a selector as first param. Use one of: "first", "last"."#,
            )
        })?;
        let aspect = FindAspect::parse(aspect).ok_or_else(|| {
            CalcError::invalid_aspect(
                r#"The function seqFind needs an aspect as fourth param. Use one of: "at", "value"."#,
            )
        })?;
        let match_value = match value {
            Value::String(s) => MatchValue::Text(s.clone()),
            Value::Float(f) => MatchValue::Num(*f),
            Value::Int(i) => MatchValue::Num(*i as f64),
            other => {
                return Err(CalcError::argument_mismatch(format!(
                    "The function seqFind needs a number or a string as match value, got: {other}"
                )))
            }
        };
        let entry = self.lookup_sequence(sequence_id)?;
        debug!(sequence = sequence_id, "seqFind");
        Ok(
            match sequence::find(which, &entry.state, &match_value, aspect) {
                Some(FoundValue::At(at)) => Value::Int(at),
                Some(FoundValue::Num(n)) => Value::Float(n),
                Some(FoundValue::Text(s)) => Value::String(s),
                None => Value::Empty,
            },
        )
    }

    fn seq_integral(&self, sequence_id: &str, unit: &str) -> Result<f64> {
        let unit = parse_unit("seqIntegral", unit)?;
        let entry = self.lookup_sequence(sequence_id)?;
        if entry.sequence.point.value_type == ValueType::String {
            return Err(CalcError::unsupported_value_type(format!(
                "The seqIntegral function can not be computed on string values (sequence id: {sequence_id}). Choose a different sequence."
            )));
        }
        debug!(sequence = sequence_id, unit = unit.token(), "seqIntegral");
        Ok(sequence::integral(&entry.state, unit))
    }
}

/// Bindings that only record requested ids, for dependency extraction
///
/// Lookups return fixed dummy values (1 for numeric results, empty for
/// `seqFind`); the goal is to drive the formula far enough to trigger each
/// lookup call, not to produce a correct result.
#[derive(Debug, Default)]
pub struct RecordingBindings {
    datapoints: Mutex<BTreeSet<String>>,
    sequences: Mutex<BTreeSet<String>>,
}

impl RecordingBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded datapoint ids, sorted and duplicate-free
    pub fn datapoints(&self) -> Vec<String> {
        self.datapoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Recorded sequence ids, sorted and duplicate-free
    pub fn sequences(&self) -> Vec<String> {
        self.sequences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn record_datapoint(&self, id: &str) {
        self.datapoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());
    }

    fn record_sequence(&self, id: &str) {
        self.sequences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());
    }
}

impl DomainBindings for RecordingBindings {
    fn get(&self, key: &str) -> Result<Value> {
        self.record_datapoint(key);
        Ok(Value::Float(1.0))
    }

    fn seq_duration(&self, sequence_id: &str, _unit: &str) -> Result<f64> {
        self.record_sequence(sequence_id);
        Ok(1.0)
    }

    fn seq_find(
        &self,
        _which: &str,
        sequence_id: &str,
        _value: &Value,
        _aspect: &str,
    ) -> Result<Value> {
        self.record_sequence(sequence_id);
        Ok(Value::Empty)
    }

    fn seq_integral(&self, sequence_id: &str, _unit: &str) -> Result<f64> {
        self.record_sequence(sequence_id);
        Ok(1.0)
    }
}

fn custom(err: CalcError) -> EvalexprError {
    EvalexprError::CustomMessage(err.to_string())
}

fn as_str(value: &Value) -> EvalexprResult<&str> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalexprError::expected_string(other.clone())),
    }
}

fn as_f64(value: &Value) -> EvalexprResult<f64> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        other => Err(EvalexprError::expected_number(other.clone())),
    }
}

/// Argument list of a call: a tuple for n-ary calls, a single value otherwise
fn as_args(argument: &Value, expected: usize, function: &str) -> EvalexprResult<Vec<Value>> {
    let values = match argument {
        Value::Tuple(values) => values.clone(),
        other => vec![other.clone()],
    };
    if values.len() != expected {
        return Err(EvalexprError::CustomMessage(format!(
            "The function {function} expects {expected} arguments, got {}.",
            values.len()
        )));
    }
    Ok(values)
}

/// Tuple of numbers unpacked into a plain vector; a single number counts as a
/// one-element array
fn as_number_vec(value: &Value) -> EvalexprResult<Vec<f64>> {
    match value {
        Value::Tuple(values) => values.iter().map(as_f64).collect(),
        other => Ok(vec![as_f64(other)?]),
    }
}

fn as_value_vec(value: &Value) -> Vec<Value> {
    match value {
        Value::Tuple(values) => values.clone(),
        other => vec![other.clone()],
    }
}

fn set(context: &mut HashMapContext, name: &str, function: Function) -> Result<()> {
    context
        .set_function(name.to_string(), function)
        .map_err(|e| CalcError::evaluation(format!("Failed to register {name}: {e}")))
}

/// Register the six domain functions with an evalexpr context
///
/// Binding errors are surfaced as `CustomMessage` engine errors so they
/// propagate to the caller as evaluation failures.
pub fn register_functions(
    context: &mut HashMapContext,
    bindings: Arc<dyn DomainBindings>,
) -> Result<()> {
    // isDef(...values)
    set(
        context,
        "isDef",
        Function::new(|argument| {
            let values = match argument {
                Value::Tuple(values) => values.clone(),
                other => vec![other.clone()],
            };
            Ok(Value::Boolean(is_defined(&values)))
        }),
    )?;

    // get(datapointId)
    let b = Arc::clone(&bindings);
    set(
        context,
        "get",
        Function::new(move |argument| {
            let key = as_str(argument)?;
            b.get(key).map_err(custom)
        }),
    )?;

    // seqDuration(sequenceId, unit)
    let b = Arc::clone(&bindings);
    set(
        context,
        "seqDuration",
        Function::new(move |argument| {
            let args = as_args(argument, 2, "seqDuration")?;
            let sequence_id = as_str(&args[0])?;
            let unit = as_str(&args[1])?;
            b.seq_duration(sequence_id, unit)
                .map(Value::Float)
                .map_err(custom)
        }),
    )?;

    // seqFind(which, sequenceId, value, aspect)
    let b = Arc::clone(&bindings);
    set(
        context,
        "seqFind",
        Function::new(move |argument| {
            let args = as_args(argument, 4, "seqFind")?;
            let which = as_str(&args[0])?;
            let sequence_id = as_str(&args[1])?;
            let aspect = as_str(&args[3])?;
            b.seq_find(which, sequence_id, &args[2], aspect)
                .map_err(custom)
        }),
    )?;

    // seqIntegral(sequenceId, unit)
    let b = Arc::clone(&bindings);
    set(
        context,
        "seqIntegral",
        Function::new(move |argument| {
            let args = as_args(argument, 2, "seqIntegral")?;
            let sequence_id = as_str(&args[0])?;
            let unit = as_str(&args[1])?;
            b.seq_integral(sequence_id, unit)
                .map(Value::Float)
                .map_err(custom)
        }),
    )?;

    // valueForRange(value, limits, values, ifNone)
    set(
        context,
        "valueForRange",
        Function::new(|argument| {
            let args = as_args(argument, 4, "valueForRange")?;
            let value = as_f64(&args[0])?;
            let limits = as_number_vec(&args[1])?;
            let values = as_value_vec(&args[2]);
            range::value_for_range(value, &limits, &values, &args[3]).map_err(custom)
        }),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::types::{Datapoint, DatapointSequence, DatapointState, SequenceState};

    fn point(id: &str, value_type: ValueType) -> Datapoint {
        Datapoint {
            id: id.to_string(),
            name: format!("point {id}"),
            value_type,
            value_unit: None,
        }
    }

    fn num_state(id: &str, at: i64, value: f64) -> DatapointState {
        DatapointState {
            id: id.to_string(),
            at,
            value_num: Some(value),
            value_string: None,
        }
    }

    fn test_source() -> MemorySource {
        let mut source = MemorySource::new();
        source.insert_datapoint(
            point("power", ValueType::Number),
            Some(num_state("power", 0, 1000.0)),
        );
        source.insert_datapoint(
            point("mode", ValueType::String),
            Some(DatapointState {
                id: "mode".to_string(),
                at: 0,
                value_num: None,
                value_string: Some("auto".to_string()),
            }),
        );
        source.insert_datapoint(point("pending", ValueType::Number), None);
        source.insert_sequence(
            DatapointSequence {
                id: "s1".to_string(),
                point: point("power", ValueType::Number),
            },
            SequenceState {
                id: "s1".to_string(),
                at: 7_200_000,
                data: vec![
                    num_state("power", 0, 0.0),
                    num_state("power", 3_600_000, 2.0),
                    num_state("power", 7_200_000, 4.0),
                ],
            },
        );
        source.insert_sequence(
            DatapointSequence {
                id: "labels".to_string(),
                point: point("mode", ValueType::String),
            },
            SequenceState {
                id: "labels".to_string(),
                at: 0,
                data: vec![],
            },
        );
        source
    }

    fn live() -> LiveBindings {
        LiveBindings::new(Arc::new(test_source()))
    }

    #[test]
    fn test_is_defined() {
        assert!(is_defined(&[]));
        assert!(is_defined(&[Value::Int(1), Value::String("x".to_string())]));
        assert!(is_defined(&[Value::Boolean(false), Value::Float(0.0)]));
        assert!(!is_defined(&[Value::Empty]));
        assert!(!is_defined(&[Value::Float(f64::NAN)]));
        assert!(!is_defined(&[Value::Int(1), Value::Empty]));
    }

    #[test]
    fn test_get_by_declared_type() {
        let bindings = live();
        assert_eq!(bindings.get("power").unwrap(), Value::Float(1000.0));
        assert_eq!(
            bindings.get("mode").unwrap(),
            Value::String("auto".to_string())
        );
    }

    #[test]
    fn test_get_without_state_is_empty() {
        assert_eq!(live().get("pending").unwrap(), Value::Empty);
    }

    #[test]
    fn test_get_unknown_datapoint() {
        let err = live().get("nope").unwrap_err();
        assert!(matches!(err, CalcError::UnknownDatapoint(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_seq_duration_validation() {
        let bindings = live();
        let err = bindings.seq_duration("s1", "weeks").unwrap_err();
        assert!(matches!(err, CalcError::InvalidUnit(_)));
        assert!(err.to_string().contains("ms, s, m, h, d"));

        let err = bindings.seq_duration("nope", "h").unwrap_err();
        assert!(matches!(err, CalcError::UnknownSequence(_)));
    }

    #[test]
    fn test_seq_duration_delegates() {
        assert_eq!(live().seq_duration("s1", "h").unwrap(), 2.0);
    }

    #[test]
    fn test_seq_find_validation() {
        let bindings = live();
        let err = bindings
            .seq_find("middle", "s1", &Value::Float(2.0), "at")
            .unwrap_err();
        assert!(matches!(err, CalcError::InvalidSelector(_)));

        let err = bindings
            .seq_find("first", "s1", &Value::Float(2.0), "when")
            .unwrap_err();
        assert!(matches!(err, CalcError::InvalidAspect(_)));

        let err = bindings
            .seq_find("first", "s1", &Value::Boolean(true), "at")
            .unwrap_err();
        assert!(matches!(err, CalcError::ArgumentMismatch(_)));
    }

    #[test]
    fn test_seq_find_delegates() {
        let bindings = live();
        assert_eq!(
            bindings
                .seq_find("first", "s1", &Value::Float(2.0), "at")
                .unwrap(),
            Value::Int(3_600_000)
        );
        assert_eq!(
            bindings
                .seq_find("last", "s1", &Value::Float(9.0), "at")
                .unwrap(),
            Value::Empty
        );
    }

    #[test]
    fn test_seq_integral_rejects_string_sequences() {
        let err = live().seq_integral("labels", "h").unwrap_err();
        assert!(matches!(err, CalcError::UnsupportedValueType(_)));
    }

    #[test]
    fn test_seq_integral_delegates() {
        assert_eq!(live().seq_integral("s1", "h").unwrap(), 4.0);
    }

    #[test]
    fn test_recording_bindings_collect_ids() {
        let bindings = RecordingBindings::new();
        bindings.get("a").unwrap();
        bindings.get("b").unwrap();
        bindings.get("a").unwrap();
        bindings.seq_duration("s2", "h").unwrap();
        bindings.seq_integral("s1", "h").unwrap();
        bindings
            .seq_find("first", "s1", &Value::Float(1.0), "at")
            .unwrap();

        assert_eq!(bindings.datapoints(), vec!["a", "b"]);
        assert_eq!(bindings.sequences(), vec!["s1", "s2"]);
    }

    #[test]
    fn test_recording_bindings_accept_invalid_arguments() {
        // Recording must not validate; it only needs the ids.
        let bindings = RecordingBindings::new();
        bindings.seq_duration("s1", "not-a-unit").unwrap();
        bindings
            .seq_find("sideways", "s2", &Value::Empty, "nope")
            .unwrap();
        assert_eq!(bindings.sequences(), vec!["s1", "s2"]);
    }
}
