use cel_interpreter::{Context, ExecutionError, FunctionContext, Program, Value};
use std::sync::Arc;

use crate::error::{PluginError, Result};
use crate::measurement::{Metric, Phase};

/// Maps a sample set and a metric's conditions to a phase.
///
/// Implementations only return `Successful`, `Failed` or `Inconclusive`;
/// failures to evaluate are reported as errors.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, result: &[f64], metric: &Metric) -> Result<Phase>;
}

/// Combines the outcomes of the success and failure conditions.
///
/// `None` means the condition was not configured. Without a failure
/// condition an unmet success condition fails, and without a success
/// condition an unmet failure condition succeeds.
pub fn resolve_phase(success: Option<bool>, failure: Option<bool>) -> Phase {
    match (success, failure) {
        (None, None) => Phase::Successful,
        (Some(true), None) | (None, Some(false)) => Phase::Successful,
        (Some(false), None) | (None, Some(true)) => Phase::Failed,
        (_, Some(true)) => Phase::Failed,
        (Some(true), Some(false)) => Phase::Successful,
        (Some(false), Some(false)) => Phase::Inconclusive,
    }
}

/// Default evaluator: each condition is a CEL expression over `result`.
///
/// `result` is bound as a list of doubles. `len(result)` is available next
/// to CEL's own `size`, so `result[len(result)-1] <= 1` reads the last sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    fn build_context(result: &[f64]) -> Context<'static> {
        let mut context = Context::default();
        let samples = result.iter().map(|v| Value::Float(*v)).collect::<Vec<_>>();
        context.add_variable_from_value("result", Value::List(Arc::new(samples)));
        context.add_function("len", len);
        context
    }

    fn eval(condition: &str, context: &Context) -> Result<Option<bool>> {
        if condition.is_empty() {
            return Ok(None);
        }
        let program = Program::compile(condition)
            .map_err(|e| PluginError::Evaluation(format!("{:?}: {}", condition, e)))?;
        match program.execute(context) {
            Ok(Value::Bool(b)) => Ok(Some(b)),
            Ok(other) => Err(PluginError::Evaluation(format!(
                "{:?} did not return a boolean, got '{:?}' instead",
                condition, other
            ))),
            Err(e) => Err(PluginError::Evaluation(format!("{:?}: {}", condition, e))),
        }
    }
}

fn len(ftx: &FunctionContext, value: Value) -> std::result::Result<i64, ExecutionError> {
    match value {
        Value::List(list) => Ok(list.len() as i64),
        other => Err(ftx.error(format!("len() expects a list, got '{:?}'", other))),
    }
}

impl ConditionEvaluator for ExprEvaluator {
    fn evaluate(&self, result: &[f64], metric: &Metric) -> Result<Phase> {
        let context = Self::build_context(result);
        let success = Self::eval(&metric.success_condition, &context)?;
        let failure = Self::eval(&metric.failure_condition, &context)?;
        Ok(resolve_phase(success, failure))
    }
}
