//! Source capability: current datapoint and sequence state
//!
//! The source layer owns data freshness and consistency; this crate takes
//! synchronous snapshots from it during one evaluation. If multiple
//! calculators share one source, its thread-safety is the source's concern.

use crate::types::{Datapoint, DatapointSequence, DatapointState, SequenceState};
use std::collections::HashMap;

/// Current entry for a datapoint
///
/// `state` is `None` for a datapoint that is defined but has no observation
/// yet; lookups on it yield "no value" rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct DatapointEntry {
    pub point: Datapoint,
    pub state: Option<DatapointState>,
}

/// Current entry for a sequence
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    pub sequence: DatapointSequence,
    pub state: SequenceState,
}

/// Provider of current datapoint and sequence state
///
/// Implementations return owned snapshots so that evaluation never holds a
/// borrow into the source between binding calls.
pub trait CalcSource: Send + Sync {
    /// Current entry for a datapoint, `None` if the id is unknown
    fn get_datapoint(&self, id: &str) -> Option<DatapointEntry>;

    /// Current entry for a sequence, `None` if the id is unknown
    fn get_sequence(&self, id: &str) -> Option<SequenceEntry>;
}

/// In-memory source for tests and simple embeddings
///
/// Built up-front with insert calls, then shared immutably (e.g. behind an
/// `Arc`). Swapping snapshots between calculations is done by replacing the
/// whole source on the calculator.
#[derive(Debug, Default)]
pub struct MemorySource {
    datapoints: HashMap<String, DatapointEntry>,
    sequences: HashMap<String, SequenceEntry>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_datapoint(&mut self, point: Datapoint, state: Option<DatapointState>) {
        self.datapoints
            .insert(point.id.clone(), DatapointEntry { point, state });
    }

    pub fn insert_sequence(&mut self, sequence: DatapointSequence, state: SequenceState) {
        self.sequences
            .insert(sequence.id.clone(), SequenceEntry { sequence, state });
    }
}

impl CalcSource for MemorySource {
    fn get_datapoint(&self, id: &str) -> Option<DatapointEntry> {
        self.datapoints.get(id).cloned()
    }

    fn get_sequence(&self, id: &str) -> Option<SequenceEntry> {
        self.sequences.get(id).cloned()
    }
}
