//! Query-set translation.
//!
//! Consumes a preprocessed [`QuerySet`] and produces a [`Union`] of SQL
//! clauses with the same boolean meaning: queries become conjunctions,
//! the query set becomes their disjunction, and a conjunction that touches
//! more than one table becomes an inner-join chain rooted at the from-table.
//!
//! Accumulator state lives in per-call locals threaded through the recursion,
//! so one configured [`Translator`] can serve concurrent requests.

use std::collections::BTreeSet;

use crate::ast::{Expr, QuerySet, Term};
use crate::error::CompileError;
use crate::sql::clause::{Clause, Condition, Operand, RelationOp, Union};
use crate::sql::schema::ColumnResolver;

/// Map a policy relational operator onto its SQL counterpart.
fn relation_operator(operator: &str) -> Result<RelationOp, CompileError> {
    match operator {
        "eq" | "equal" => Ok(RelationOp::Eq),
        "neq" => Ok(RelationOp::Neq),
        "lt" => Ok(RelationOp::Lt),
        "gt" => Ok(RelationOp::Gt),
        "lte" => Ok(RelationOp::Lte),
        "gte" => Ok(RelationOp::Gte),
        other => Err(CompileError::UnsupportedOperator(other.to_string())),
    }
}

/// Map a policy call operator onto its SQL function.
fn call_function(operator: &str) -> Result<&'static str, CompileError> {
    match operator {
        "abs" => Ok("abs"),
        other => Err(CompileError::UnsupportedCallOperator(other.to_string())),
    }
}

/// Translates preprocessed query sets against one from-table and one
/// column-resolution backend.
pub struct Translator<'a, R: ColumnResolver> {
    from_table: &'a str,
    resolver: &'a R,
}

impl<'a, R: ColumnResolver> Translator<'a, R> {
    /// Configure a translator for one from-table and backend.
    pub fn new(from_table: &'a str, resolver: &'a R) -> Self {
        Translator {
            from_table,
            resolver,
        }
    }

    /// Translate a preprocessed query set into a clause union.
    pub fn translate(&self, query_set: &QuerySet) -> Result<Union, CompileError> {
        let mut where_conjunctions: Vec<Condition> = Vec::new();
        let mut joins: Vec<(Vec<String>, Condition)> = Vec::new();

        for query in &query_set.queries {
            let mut tables: BTreeSet<String> = BTreeSet::new();
            let mut relations: Vec<Condition> = Vec::new();
            for expr in &query.exprs {
                // Bare expressions (row bindings) carry no constraint.
                if let Expr::Call { operator, operands } = expr {
                    relations.push(self.relation(operator, operands, &mut tables)?);
                }
            }
            let conjunction = Condition::Conjunction(relations);
            if tables.len() > 1 {
                // The whole conjunction doubles as the ON-condition; partial
                // evaluation expresses cross-table equality this way.
                tables.remove(self.from_table);
                joins.push((tables.into_iter().collect(), conjunction));
            } else {
                where_conjunctions.push(conjunction);
            }
        }

        let mut clauses = Vec::new();
        if !where_conjunctions.is_empty() {
            clauses.push(Clause::Where(Condition::Disjunction(where_conjunctions)));
        }
        for (tables, on) in joins {
            clauses.push(Clause::InnerJoin { tables, on });
        }
        Ok(Union::new(clauses))
    }

    fn relation(
        &self,
        operator: &str,
        operands: &[Term],
        tables: &mut BTreeSet<String>,
    ) -> Result<Condition, CompileError> {
        if operands.len() != 2 {
            return Err(CompileError::InvalidArity {
                operator: operator.to_string(),
                expected: 2,
                found: operands.len(),
            });
        }
        let op = relation_operator(operator)?;
        let left = self.operand(&operands[0], tables)?;
        let right = self.operand(&operands[1], tables)?;
        // Cosmetic: when a constant ended up on the left of a column-bearing
        // operand, present the column first. The operator is not flipped,
        // matching the original translator.
        let (left, right) = if !left.is_column_bearing() && right.is_column_bearing() {
            (right, left)
        } else {
            (left, right)
        };
        Ok(Condition::Relation { op, left, right })
    }

    fn operand(&self, term: &Term, tables: &mut BTreeSet<String>) -> Result<Operand, CompileError> {
        match term {
            Term::Scalar { value } => Ok(Operand::Constant(value.clone())),
            Term::Ref { segments } if segments.len() == 3 => {
                let table = segments[1]
                    .segment_name()
                    .ok_or_else(|| CompileError::UnsupportedTermType(segments[1].kind().into()))?;
                let column = segments[2]
                    .segment_name()
                    .ok_or_else(|| CompileError::UnsupportedTermType(segments[2].kind().into()))?;
                let column = self.resolver.resolve(table, column)?;
                tables.insert(column.table.clone());
                Ok(Operand::Column(column))
            }
            Term::Call { operator, operands } => {
                let function = call_function(operator)?;
                if operands.len() != 1 {
                    return Err(CompileError::InvalidArity {
                        operator: operator.clone(),
                        expected: 1,
                        found: operands.len(),
                    });
                }
                let inner = self.operand(&operands[0], tables)?;
                Ok(Operand::Call {
                    function: function.to_string(),
                    operands: vec![inner],
                })
            }
            other => Err(CompileError::UnsupportedTermType(other.kind().to_string())),
        }
    }
}
