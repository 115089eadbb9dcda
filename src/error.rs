use thiserror::Error;

/// Failure modes of the compile pipeline.
///
/// Every variant is request-scoped and non-retryable: the first error aborts
/// the whole compile with no partial result. Callers must treat any of these
/// as a hard failure (fail closed), never as a legitimate
/// [`NeverDefined`](crate::compile::Decision::NeverDefined) deny.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The evaluator could not be reached or did not complete (transport
    /// error, spawn failure, or timeout).
    #[error("evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    /// The evaluator ran but reported a failure status or exit code.
    #[error("evaluator failed with status {status}: {message}")]
    EvaluatorFailed {
        /// HTTP status code or process exit code.
        status: i32,
        /// Response body or captured stderr.
        message: String,
    },

    /// The evaluator response does not match the expected wire shape.
    #[error("malformed evaluator output: {0}")]
    MalformedEvaluatorOutput(String),

    /// A table reference's row selector is not a plain iteration variable.
    #[error("invalid reference: row identifier type not supported: {0}")]
    InvalidRowIdentifier(String),

    /// One table is bound to two distinct iterator variables in one query.
    #[error("invalid reference: self-joins not supported: table {0}")]
    SelfJoinNotSupported(String),

    /// A relational operator outside the supported mapping.
    #[error("invalid expression: operator not supported: {0}")]
    UnsupportedOperator(String),

    /// A nested call operator outside the supported mapping.
    #[error("invalid call: operator not supported: {0}")]
    UnsupportedCallOperator(String),

    /// A relational or function call with the wrong operand count.
    #[error("invalid expression: operator {operator} expects {expected} operands, found {found}")]
    InvalidArity {
        /// The operator whose call was malformed.
        operator: String,
        /// Number of operands the operator takes.
        expected: usize,
        /// Number of operands actually present.
        found: usize,
    },

    /// A resolved column does not exist in the bound schema.
    #[error("invalid column: column not recognized: {table}.{column}")]
    UnknownColumn {
        /// Table the reference named.
        table: String,
        /// Column the reference named.
        column: String,
    },

    /// A resolved table does not exist in the bound schema.
    #[error("invalid table: table not recognized: {0}")]
    UnknownTable(String),

    /// A term kind the translator cannot resolve into an operand.
    #[error("invalid term: type not supported: {0}")]
    UnsupportedTermType(String),
}
