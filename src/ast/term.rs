use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An ordered disjunction of queries: the policy holds if any query is
/// satisfiable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySet {
    /// The alternative queries, in evaluator output order.
    pub queries: Vec<Query>,
}

impl QuerySet {
    /// Wrap an ordered sequence of queries.
    pub fn new(queries: Vec<Query>) -> Self {
        QuerySet { queries }
    }
}

/// An ordered conjunction of expressions; the scope unit for variable
/// bindings during preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query {
    /// The conjoined expressions, in evaluator output order.
    pub exprs: Vec<Expr>,
}

impl Query {
    /// True when the query holds unconditionally (zero expressions).
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

/// One expression of a query body.
///
/// Only `Call` expressions carry translatable constraints; a `Bare`
/// expression (such as the row binding `data.q[x]`) contributes no
/// constraint of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    /// A lone term, e.g. a row-binding reference.
    Bare(Term),
    /// A built-in call, e.g. `eq(x.b, "foo")`.
    Call {
        /// Built-in operator identifier, e.g. `eq`.
        operator: String,
        /// Ordered operand terms.
        operands: Vec<Term>,
    },
}

/// A term of a partially-evaluated policy expression.
///
/// The wire representation tags each term with a `kind` field; parsing is a
/// closed tagged union, so any unexpected shape fails upfront rather than
/// surfacing later as a translation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Term {
    /// A literal string, number, or boolean.
    Scalar {
        /// The literal value.
        value: Value,
    },
    /// A data reference; canonical form is exactly three segments:
    /// root marker, table name, column name.
    Ref {
        /// Ordered reference segments.
        segments: Vec<Term>,
    },
    /// A variable, meaningful as a row binder or alias target.
    Var {
        /// The variable identifier.
        name: String,
    },
    /// A nested built-in call used in operand position, e.g. `abs(x.a)`.
    Call {
        /// Built-in operator identifier, e.g. `abs`.
        operator: String,
        /// Ordered operand terms.
        operands: Vec<Term>,
    },
}

impl Term {
    /// The wire-level kind tag, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Scalar { .. } => "scalar",
            Term::Ref { .. } => "ref",
            Term::Var { .. } => "var",
            Term::Call { .. } => "call",
        }
    }

    /// The string payload of a name-bearing segment: a string scalar or a
    /// variable. Table and column segments of a reference are resolved
    /// through this.
    pub fn segment_name(&self) -> Option<&str> {
        match self {
            Term::Scalar {
                value: Value::String(s),
            } => Some(s),
            Term::Var { name } => Some(name),
            _ => None,
        }
    }
}
