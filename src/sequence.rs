//! Sequence arithmetic: duration, nearest-match search, trapezoidal integral
//!
//! Pure functions over an ordered, timestamped sample sequence. Callers are
//! responsible for validating units and value types before delegating here.

use crate::types::{DatapointState, DurationUnit, Millis, SequenceState};

/// Scan direction for [`find`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindWhich {
    First,
    Last,
}

impl FindWhich {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            _ => None,
        }
    }
}

/// Which field of the matching sample [`find`] returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindAspect {
    At,
    Value,
}

impl FindAspect {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "at" => Some(Self::At),
            "value" => Some(Self::Value),
            _ => None,
        }
    }
}

/// Value to match samples against; selects the sample field to compare
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    Num(f64),
    Text(String),
}

/// Result of a successful [`find`]
#[derive(Debug, Clone, PartialEq)]
pub enum FoundValue {
    At(Millis),
    Num(f64),
    Text(String),
}

/// Time span covered by the sequence, converted into `unit`
///
/// 0 for sequences with fewer than two samples. No rounding is applied.
pub fn duration(state: &SequenceState, unit: DurationUnit) -> f64 {
    let (Some(first), Some(last)) = (state.data.first(), state.data.last()) else {
        return 0.0;
    };
    (last.at - first.at) as f64 / unit.millis_factor()
}

fn find_in_sequence<'a>(
    which: FindWhich,
    data: &'a [DatapointState],
    matches: impl Fn(&DatapointState) -> bool,
) -> Option<&'a DatapointState> {
    match which {
        FindWhich::First => data.iter().find(|sample| matches(sample)),
        FindWhich::Last => data.iter().rev().find(|sample| matches(sample)),
    }
}

/// First sample (in scan direction) whose value equals `value`
///
/// Text match values compare against `value_string`, numeric ones against
/// `value_num`. "First" and "last" refer to scan direction only; the first
/// match encountered in that direction wins.
pub fn find(
    which: FindWhich,
    state: &SequenceState,
    value: &MatchValue,
    aspect: FindAspect,
) -> Option<FoundValue> {
    let found = match value {
        MatchValue::Num(v) => find_in_sequence(which, &state.data, |s| s.value_num == Some(*v)),
        MatchValue::Text(v) => {
            find_in_sequence(which, &state.data, |s| s.value_string.as_deref() == Some(v))
        }
    }?;
    Some(match aspect {
        FindAspect::At => FoundValue::At(found.at),
        FindAspect::Value => match value {
            MatchValue::Num(_) => FoundValue::Num(found.value_num.unwrap_or(f64::NAN)),
            MatchValue::Text(_) => FoundValue::Text(found.value_string.clone().unwrap_or_default()),
        },
    })
}

/// Discrete trapezoidal integral over all adjacent sample pairs, converted
/// into `unit`
///
/// 0 for sequences with fewer than two samples. Requires numeric data; a
/// sample without a numeric value poisons the sum with NaN, which the
/// calculator's defined-guard turns into "no value".
pub fn integral(state: &SequenceState, unit: DurationUnit) -> f64 {
    if state.data.len() < 2 {
        return 0.0;
    }
    let mut sum = 0.0;
    for pair in state.data.windows(2) {
        let dx = (pair[1].at - pair[0].at) as f64;
        let y = (pair[0].value_num.unwrap_or(f64::NAN) + pair[1].value_num.unwrap_or(f64::NAN))
            / 2.0;
        sum += dx * y;
    }
    sum / unit.millis_factor()
}
