/// HTTP binding against a running OPA server.
pub mod http;
/// Local subprocess binding against the `opa` binary.
pub mod process;

use serde_json::Value;

use crate::ast::QuerySet;
use crate::error::CompileError;

pub use http::HttpEvaluator;
pub use process::ProcessEvaluator;

/// The partial-evaluation collaborator.
///
/// Given a policy query, an input document, and the unknown root data paths,
/// return the residual query set, or a transport-level failure. Implemented
/// over HTTP ([`HttpEvaluator`]) and as a local subprocess
/// ([`ProcessEvaluator`]); tests substitute stub implementations.
pub trait Evaluator {
    /// Partially evaluate `query` against `input`, leaving `unknowns`
    /// unresolved.
    fn partial_eval(
        &self,
        query: &str,
        input: &Value,
        unknowns: &[String],
    ) -> Result<QuerySet, CompileError>;
}
