use std::time::Duration;

use serde_json::{json, Value};

use crate::ast::{wire, QuerySet};
use crate::error::CompileError;
use crate::evaluator::Evaluator;

/// Default compile endpoint of a locally running OPA server.
pub const DEFAULT_COMPILE_URL: &str = "http://localhost:8181/v1/compile";

/// Partial evaluation over OPA's Compile API.
///
/// POSTs `{query, input, unknowns}` to the compile endpoint and parses the
/// `{result: {queries: [...]}}` response body.
pub struct HttpEvaluator {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpEvaluator {
    /// Bind to a compile endpoint with no request timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpEvaluator {
            endpoint: endpoint.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Bind to a compile endpoint with a per-request timeout.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CompileError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompileError::EvaluatorUnavailable(e.to_string()))?;
        Ok(HttpEvaluator {
            endpoint: endpoint.into(),
            client,
        })
    }
}

impl Evaluator for HttpEvaluator {
    fn partial_eval(
        &self,
        query: &str,
        input: &Value,
        unknowns: &[String],
    ) -> Result<QuerySet, CompileError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "query": query,
                "input": input,
                "unknowns": unknowns,
            }))
            .send()
            .map_err(|e| CompileError::EvaluatorUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| CompileError::EvaluatorUnavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(CompileError::EvaluatorFailed {
                status: i32::from(status.as_u16()),
                message: body,
            });
        }

        let body: Value = serde_json::from_str(&body)
            .map_err(|e| CompileError::MalformedEvaluatorOutput(e.to_string()))?;
        wire::parse_compile_response(&body)
    }
}
