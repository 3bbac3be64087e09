//! Static dependency extraction
//!
//! Determines which datapoints and sequences a formula reads, ahead of real
//! evaluation and without real data: the formula is evaluated once against
//! recording stubs that log every requested id and return fixed dummy values.

use crate::bindings::{DomainBindings, RecordingBindings};
use crate::error::Result;
use crate::evaluator::Evaluator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Datapoint and sequence ids a formula depends on
///
/// Ids are sorted and duplicate-free. When `error` is set the id sets are
/// empty and mean "dependencies unknown", not "formula has no dependencies".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcReferences {
    pub datapoints: Vec<String>,
    pub sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Discover the datapoint and sequence ids a formula reads
///
/// Best-effort dynamic approximation of static analysis: the dummy values
/// (1 for lookups, empty for `seqFind`) only need to drive the formula far
/// enough to trigger each lookup call. Conditional branches that are never
/// taken under dummy inputs under-report dependencies.
///
/// Returns `Err` only when the formula does not compile. An evaluation
/// failure (e.g. the dummy values violating a formula's internal assumptions)
/// is reported through the `error` field instead.
pub fn find_references(code: &str) -> Result<CalcReferences> {
    let evaluator = Evaluator::compile(code)?;
    let recorder = Arc::new(RecordingBindings::new());
    let bindings: Arc<dyn DomainBindings> = recorder.clone();
    match evaluator.evaluate(bindings) {
        Ok(_) => Ok(CalcReferences {
            datapoints: recorder.datapoints(),
            sequences: recorder.sequences(),
            error: None,
        }),
        Err(e) => Ok(CalcReferences {
            datapoints: Vec::new(),
            sequences: Vec::new(),
            error: Some(e.to_string()),
        }),
    }
}
