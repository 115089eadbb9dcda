#![allow(dead_code)]

use std::cell::RefCell;

use serde_json::Value;

use opa2sql::ast::{Expr, Query, QuerySet, Term};
use opa2sql::error::CompileError;
use opa2sql::evaluator::Evaluator;

pub fn var(name: &str) -> Term {
    Term::Var {
        name: name.to_string(),
    }
}

pub fn scalar(value: Value) -> Term {
    Term::Scalar { value }
}

/// A pre-normalization column access: `data.<table>[<iterator>].<column>`.
pub fn table_column(table: &str, iterator: &str, column: &str) -> Term {
    Term::Ref {
        segments: vec![
            var("data"),
            scalar(Value::String(table.to_string())),
            var(iterator),
            scalar(Value::String(column.to_string())),
        ],
    }
}

/// A bare row binding: `data.<table>[<iterator>]`.
pub fn row_binding(table: &str, iterator: &str) -> Expr {
    Expr::Bare(Term::Ref {
        segments: vec![
            var("data"),
            scalar(Value::String(table.to_string())),
            var(iterator),
        ],
    })
}

/// A bound-variable dereference: `<variable>.<column>`.
pub fn deref(variable: &str, column: &str) -> Term {
    Term::Ref {
        segments: vec![var(variable), scalar(Value::String(column.to_string()))],
    }
}

pub fn call(operator: &str, left: Term, right: Term) -> Expr {
    Expr::Call {
        operator: operator.to_string(),
        operands: vec![left, right],
    }
}

pub fn query(exprs: Vec<Expr>) -> Query {
    Query { exprs }
}

/// An evaluator stub returning a canned query set and recording the unknowns
/// it was asked to leave unresolved.
pub struct StubEvaluator {
    queries: Vec<Query>,
    pub seen_unknowns: RefCell<Vec<String>>,
}

impl StubEvaluator {
    pub fn returning(queries: Vec<Query>) -> Self {
        StubEvaluator {
            queries,
            seen_unknowns: RefCell::new(Vec::new()),
        }
    }
}

impl Evaluator for StubEvaluator {
    fn partial_eval(
        &self,
        _query: &str,
        _input: &Value,
        unknowns: &[String],
    ) -> Result<QuerySet, CompileError> {
        *self.seen_unknowns.borrow_mut() = unknowns.to_vec();
        Ok(QuerySet::new(self.queries.clone()))
    }
}

/// An evaluator stub that always reports a transport failure.
pub struct UnavailableEvaluator;

impl Evaluator for UnavailableEvaluator {
    fn partial_eval(
        &self,
        _query: &str,
        _input: &Value,
        _unknowns: &[String],
    ) -> Result<QuerySet, CompileError> {
        Err(CompileError::EvaluatorUnavailable(
            "connection refused".to_string(),
        ))
    }
}
