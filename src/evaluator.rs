//! Expression evaluation wrapper
//!
//! Compiles a formula once and evaluates it against a fresh context per call,
//! so every evaluation sees the current bindings and a clean set of temporary
//! variables.

use crate::bindings::{register_functions, DomainBindings};
use crate::error::{CalcError, Result};
use evalexpr::{build_operator_tree, HashMapContext, Node, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct Evaluator {
    node: Node,
}

impl Evaluator {
    /// Compile a formula; failure here is fatal for the caller
    pub fn compile(code: &str) -> Result<Self> {
        let node = build_operator_tree(code)
            .map_err(|e| CalcError::compile(format!("Unable to compile formula '{code}': {e}")))?;
        Ok(Self { node })
    }

    /// Evaluate with the given bindings in scope
    ///
    /// The context is mutable so formulas may assign temporary variables
    /// (`tmp = get("a"); tmp * 2`).
    pub fn evaluate(&self, bindings: Arc<dyn DomainBindings>) -> Result<Value> {
        let mut context = HashMapContext::new();
        register_functions(&mut context, bindings)?;
        let result = self
            .node
            .eval_with_context_mut(&mut context)
            .map_err(|e| CalcError::evaluation(e.to_string()))?;
        Ok(unwrap_result_set(result))
    }
}

/// Collapse a multi-statement result set to its last statement's value
fn unwrap_result_set(value: Value) -> Value {
    match value {
        Value::Tuple(mut values) => match values.pop() {
            Some(last) => last,
            None => {
                debug!("formula evaluated to an empty result set");
                Value::Empty
            }
        },
        other => other,
    }
}
