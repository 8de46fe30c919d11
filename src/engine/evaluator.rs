//! Expression evaluation for `cond`, `expect` and config settings.
//!
//! The engine only depends on the [`Evaluator`] trait. [`ExprEvaluator`] is
//! the default implementation; it binds every parameter as a variable, with
//! nested maps flattened into dotted names (`GLOBAL.EXP`).

use evalexpr::{ContextWithMutableVariables, HashMapContext, Value as ExprValue};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::config::Params;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to evaluate '{expression}': {message}")]
pub struct EvalError {
    pub expression: String,
    pub message: String,
}

/// Evaluates an expression against a parameter map.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, expression: &str, params: &Params) -> Result<Value, EvalError>;
}

/// [`Evaluator`] backed by `evalexpr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl Evaluator for ExprEvaluator {
    fn evaluate(&self, expression: &str, params: &Params) -> Result<Value, EvalError> {
        let fail = |message: String| EvalError {
            expression: expression.to_string(),
            message,
        };
        let mut context = HashMapContext::new();
        bind_map(&mut context, "", params.as_map()).map_err(|e| fail(e.to_string()))?;
        evalexpr::eval_with_context(expression, &context)
            .map(to_json)
            .map_err(|e| fail(e.to_string()))
    }
}

fn bind_map(
    context: &mut HashMapContext,
    prefix: &str,
    map: &Map<String, Value>,
) -> Result<(), evalexpr::EvalexprError> {
    for (key, value) in map {
        let name = format!("{prefix}{key}");
        match value {
            Value::Object(nested) => bind_map(context, &format!("{name}."), nested)?,
            other => context.set_value(name, to_expr(other))?,
        }
    }
    Ok(())
}

fn to_expr(value: &Value) -> ExprValue {
    match value {
        Value::Null | Value::Object(_) => ExprValue::Empty,
        Value::Bool(b) => ExprValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ExprValue::Int(i),
            None => ExprValue::Float(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => ExprValue::String(s.clone()),
        Value::Array(items) => ExprValue::Tuple(items.iter().map(to_expr).collect()),
    }
}

fn to_json(value: ExprValue) -> Value {
    match value {
        ExprValue::String(s) => Value::String(s),
        ExprValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ExprValue::Int(i) => Value::from(i),
        ExprValue::Boolean(b) => Value::Bool(b),
        ExprValue::Tuple(items) => Value::Array(items.into_iter().map(to_json).collect()),
        ExprValue::Empty => Value::Null,
    }
}
