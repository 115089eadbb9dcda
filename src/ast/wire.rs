use serde_json::Value;

use crate::ast::{Query, QuerySet};
use crate::error::CompileError;

/// Parse the body of a successful HTTP compile response:
/// `{"result": {"queries": [...]}}`.
///
/// A missing `result` or `queries` key means the evaluator produced no
/// residual queries and parses as an empty query set.
pub fn parse_compile_response(body: &Value) -> Result<QuerySet, CompileError> {
    parse_envelope(body, "result")
}

/// Parse the stdout of `opa eval --partial --format json`:
/// `{"partial": {"queries": [...]}}`.
pub fn parse_partial_output(body: &Value) -> Result<QuerySet, CompileError> {
    parse_envelope(body, "partial")
}

fn parse_envelope(body: &Value, key: &str) -> Result<QuerySet, CompileError> {
    let envelope = match body {
        Value::Object(map) => map,
        other => {
            return Err(CompileError::MalformedEvaluatorOutput(format!(
                "expected a JSON object, found {}",
                json_kind(other)
            )))
        }
    };
    let queries = match envelope.get(key) {
        None | Some(Value::Null) => return Ok(QuerySet::default()),
        Some(Value::Object(inner)) => match inner.get("queries") {
            None | Some(Value::Null) => return Ok(QuerySet::default()),
            Some(queries) => queries,
        },
        Some(other) => {
            return Err(CompileError::MalformedEvaluatorOutput(format!(
                "expected {key} to be an object, found {}",
                json_kind(other)
            )))
        }
    };
    let queries: Vec<Query> = serde_json::from_value(queries.clone())
        .map_err(|e| CompileError::MalformedEvaluatorOutput(e.to_string()))?;
    Ok(QuerySet::new(queries))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
