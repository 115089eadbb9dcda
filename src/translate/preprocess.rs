//! Reference preprocessing.
//!
//! Partial evaluation leaves table accesses in iterator form, e.g.
//! `data.posts[x].author`, and may bind rows to intermediate variables that
//! are dereferenced later (`data.posts[x]; x.author`). This pass rewrites
//! every reference in place to the canonical three-segment form
//! `data.<table>.<column>` so the translator never deals with variables.
//! It is purely structural: no schema lookups.

use std::collections::HashMap;

use crate::ast::{Expr, QuerySet, Term};
use crate::error::CompileError;

/// Variable-binding state for one query. Bindings never cross query
/// boundaries.
#[derive(Default)]
struct QueryScope {
    /// Variable name -> the two-segment table prefix it stands for.
    table_vars: HashMap<String, Vec<Term>>,
    /// Table name -> the iterator variable bound to it (self-join detection).
    table_iters: HashMap<String, String>,
}

/// Rewrite every reference in the query set to canonical form, or fail with
/// the first offending reference.
pub fn preprocess(query_set: &mut QuerySet) -> Result<(), CompileError> {
    for query in &mut query_set.queries {
        let mut scope = QueryScope::default();
        for expr in &mut query.exprs {
            match expr {
                // The operator position is a plain identifier, never a term.
                Expr::Call { operands, .. } => {
                    for operand in operands {
                        rewrite_term(operand, &mut scope)?;
                    }
                }
                Expr::Bare(term) => rewrite_term(term, &mut scope)?,
            }
        }
    }
    Ok(())
}

fn rewrite_term(term: &mut Term, scope: &mut QueryScope) -> Result<(), CompileError> {
    match term {
        Term::Ref { segments } => rewrite_ref(segments, scope),
        Term::Call { operands, .. } => {
            for operand in operands {
                rewrite_term(operand, scope)?;
            }
            Ok(())
        }
        Term::Scalar { .. } | Term::Var { .. } => Ok(()),
    }
}

fn rewrite_ref(segments: &mut Vec<Term>, scope: &mut QueryScope) -> Result<(), CompileError> {
    // A head naming a bound variable is an alias dereference: splice the
    // table prefix in and keep the remaining segments. E.g. with
    // "data.posts[x]" bound, "x.author" becomes "data.posts.author".
    if let Some(Term::Var { name }) = segments.first() {
        if let Some(prefix) = scope.table_vars.get(name) {
            let tail: Vec<Term> = segments.split_off(1);
            let mut spliced = prefix.clone();
            spliced.extend(tail);
            *segments = spliced;
            return Ok(());
        }
    }

    // Otherwise the ref must be of the form data.<table>[<iterator>]...,
    // with a plain variable selecting the row.
    let iterator = match segments.get(2) {
        Some(Term::Var { name }) => name.clone(),
        Some(other) => return Err(CompileError::InvalidRowIdentifier(other.kind().to_string())),
        None => {
            return Err(CompileError::InvalidRowIdentifier(
                "missing row selector".to_string(),
            ))
        }
    };
    let table = segments
        .get(1)
        .and_then(Term::segment_name)
        .map(str::to_string)
        .ok_or_else(|| CompileError::UnsupportedTermType(segments[1].kind().to_string()))?;

    let prefix: Vec<Term> = segments[..2].to_vec();
    scope.table_vars.insert(iterator.clone(), prefix.clone());

    // One iterator per table per query; a second one would need SQL aliasing
    // this compiler does not generate.
    match scope.table_iters.get(&table) {
        Some(bound) if *bound != iterator => {
            return Err(CompileError::SelfJoinNotSupported(table))
        }
        _ => {
            scope.table_iters.insert(table, iterator);
        }
    }

    // Drop the iterator segment: data.posts[x].author -> data.posts.author.
    let tail: Vec<Term> = segments.split_off(3);
    *segments = prefix;
    segments.extend(tail);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Query;
    use serde_json::json;

    fn var(name: &str) -> Term {
        Term::Var {
            name: name.to_string(),
        }
    }

    fn scalar(value: serde_json::Value) -> Term {
        Term::Scalar { value }
    }

    fn data_ref(segments: Vec<Term>) -> Term {
        Term::Ref { segments }
    }

    fn eq(left: Term, right: Term) -> Expr {
        Expr::Call {
            operator: "eq".to_string(),
            operands: vec![left, right],
        }
    }

    fn query_set(exprs: Vec<Expr>) -> QuerySet {
        QuerySet::new(vec![Query { exprs }])
    }

    fn canonical(table: &str, column: &str) -> Term {
        data_ref(vec![var("data"), scalar(json!(table)), scalar(json!(column))])
    }

    #[test]
    fn iterator_segment_is_dropped() {
        // data.q[x].b = "foo"
        let mut qs = query_set(vec![eq(
            data_ref(vec![
                var("data"),
                scalar(json!("q")),
                var("x"),
                scalar(json!("b")),
            ]),
            scalar(json!("foo")),
        )]);
        preprocess(&mut qs).unwrap();
        assert_eq!(
            qs.queries[0].exprs[0],
            eq(canonical("q", "b"), scalar(json!("foo")))
        );
    }

    #[test]
    fn bound_variable_dereference_is_spliced() {
        // data.q[x]; x.b = "foo"
        let mut qs = query_set(vec![
            Expr::Bare(data_ref(vec![var("data"), scalar(json!("q")), var("x")])),
            eq(
                data_ref(vec![var("x"), scalar(json!("b"))]),
                scalar(json!("foo")),
            ),
        ]);
        preprocess(&mut qs).unwrap();
        assert_eq!(
            qs.queries[0].exprs[1],
            eq(canonical("q", "b"), scalar(json!("foo")))
        );
        // The bare binding itself is reduced to the table prefix.
        assert_eq!(
            qs.queries[0].exprs[0],
            Expr::Bare(data_ref(vec![var("data"), scalar(json!("q"))]))
        );
    }

    #[test]
    fn nested_call_operands_are_rewritten() {
        // abs(data.q[x].a) > 1
        let mut qs = query_set(vec![Expr::Call {
            operator: "gt".to_string(),
            operands: vec![
                Term::Call {
                    operator: "abs".to_string(),
                    operands: vec![data_ref(vec![
                        var("data"),
                        scalar(json!("q")),
                        var("x"),
                        scalar(json!("a")),
                    ])],
                },
                scalar(json!(1)),
            ],
        }]);
        preprocess(&mut qs).unwrap();
        match &qs.queries[0].exprs[0] {
            Expr::Call { operands, .. } => match &operands[0] {
                Term::Call { operands, .. } => {
                    assert_eq!(operands[0], canonical("q", "a"));
                }
                other => panic!("expected nested call, got {other:?}"),
            },
            other => panic!("expected call expr, got {other:?}"),
        }
    }

    #[test]
    fn two_iterators_over_one_table_are_a_self_join() {
        // data.q[x].a = 10; data.q[y].b = 20
        let mut qs = query_set(vec![
            eq(
                data_ref(vec![
                    var("data"),
                    scalar(json!("q")),
                    var("x"),
                    scalar(json!("a")),
                ]),
                scalar(json!(10)),
            ),
            eq(
                data_ref(vec![
                    var("data"),
                    scalar(json!("q")),
                    var("y"),
                    scalar(json!("b")),
                ]),
                scalar(json!(20)),
            ),
        ]);
        let err = preprocess(&mut qs).unwrap_err();
        assert!(matches!(err, CompileError::SelfJoinNotSupported(t) if t == "q"));
    }

    #[test]
    fn one_iterator_reused_across_expressions_is_fine() {
        // data.q[x].a = 10; data.q[x].b = 20
        let mut qs = query_set(vec![
            eq(
                data_ref(vec![
                    var("data"),
                    scalar(json!("q")),
                    var("x"),
                    scalar(json!("a")),
                ]),
                scalar(json!(10)),
            ),
            eq(
                data_ref(vec![
                    var("data"),
                    scalar(json!("q")),
                    var("x"),
                    scalar(json!("b")),
                ]),
                scalar(json!(20)),
            ),
        ]);
        preprocess(&mut qs).unwrap();
        assert_eq!(
            qs.queries[0].exprs[1],
            eq(canonical("q", "b"), scalar(json!(20)))
        );
    }

    #[test]
    fn bindings_reset_at_query_boundaries() {
        // Query 1: data.q[x].a = 1  /  Query 2: data.q[y].a = 2
        // Different iterators over q, but in different queries.
        let mut qs = QuerySet::new(vec![
            Query {
                exprs: vec![eq(
                    data_ref(vec![
                        var("data"),
                        scalar(json!("q")),
                        var("x"),
                        scalar(json!("a")),
                    ]),
                    scalar(json!(1)),
                )],
            },
            Query {
                exprs: vec![eq(
                    data_ref(vec![
                        var("data"),
                        scalar(json!("q")),
                        var("y"),
                        scalar(json!("a")),
                    ]),
                    scalar(json!(2)),
                )],
            },
        ]);
        preprocess(&mut qs).unwrap();
        assert_eq!(
            qs.queries[1].exprs[0],
            eq(canonical("q", "a"), scalar(json!(2)))
        );
    }

    #[test]
    fn non_variable_row_selector_is_rejected() {
        // data.q.foo.bar = 10 -- "foo" selects the row, not an iterator.
        let mut qs = query_set(vec![eq(
            data_ref(vec![
                var("data"),
                scalar(json!("q")),
                scalar(json!("foo")),
                scalar(json!("bar")),
            ]),
            scalar(json!(10)),
        )]);
        let err = preprocess(&mut qs).unwrap_err();
        assert!(matches!(err, CompileError::InvalidRowIdentifier(k) if k == "scalar"));
    }

    #[test]
    fn two_segment_unbound_ref_is_rejected() {
        // y.b where y was never bound.
        let mut qs = query_set(vec![eq(
            data_ref(vec![var("y"), scalar(json!("b"))]),
            scalar(json!(1)),
        )]);
        let err = preprocess(&mut qs).unwrap_err();
        assert!(matches!(err, CompileError::InvalidRowIdentifier(_)));
    }
}
