//! Output clause model.
//!
//! The translator produces a [`Union`] of clauses; each clause renders to a
//! SQL text fragment intended for direct concatenation after a
//! caller-supplied `SELECT ... FROM ...` prefix, with union members joined by
//! `UNION`. Variants are data-only; all rendering lives in the `Display`
//! impls so both resolution backends share one model.

use std::fmt;

use serde_json::Value;

/// An ordered union of clauses: the top-level OR across differently-shaped
/// rule bodies. Each member is an alternative access path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Union {
    clauses: Vec<Clause>,
}

impl Union {
    /// Wrap an ordered sequence of clauses.
    pub fn new(clauses: Vec<Clause>) -> Self {
        Union { clauses }
    }

    /// The union members, in emission order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// True when no clause was generated.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// One union member: a single-table filter or a cross-table access path.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// A filter over the from-table only.
    Where(Condition),
    /// An inner-join chain from the from-table through `tables`, with the
    /// query's full conjunction as the ON-condition of every hop.
    InnerJoin {
        /// Joined table names, in stable sorted order.
        tables: Vec<String>,
        /// The ON-condition shared by every hop.
        on: Condition,
    },
}

impl Clause {
    /// Render this clause to its SQL text fragment.
    pub fn sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Where(condition) => write!(f, "WHERE {condition}"),
            Clause::InnerJoin { tables, on } => {
                for (i, table) in tables.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "INNER JOIN {table} ON {on}")?;
                }
                Ok(())
            }
        }
    }
}

/// A boolean condition over operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// All members must hold. Empty renders as `TRUE`.
    Conjunction(Vec<Condition>),
    /// At least one member must hold; members render parenthesized.
    /// Empty renders as `FALSE`.
    Disjunction(Vec<Condition>),
    /// A binary relation between two operands.
    Relation {
        /// The relational operator.
        op: RelationOp,
        /// Left operand, column-first when the pair was reordered.
        left: Operand,
        /// Right operand.
        right: Operand,
    },
    /// A boolean-valued function call.
    Call {
        /// SQL function name.
        function: String,
        /// Ordered call arguments.
        operands: Vec<Operand>,
    },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Conjunction(parts) => {
                if parts.is_empty() {
                    return write!(f, "TRUE");
                }
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    // AND binds tighter than OR; a nested disjunction keeps
                    // its own parens.
                    if matches!(part, Condition::Disjunction(_)) {
                        write!(f, "({part})")?;
                    } else {
                        write!(f, "{part}")?;
                    }
                }
                Ok(())
            }
            Condition::Disjunction(parts) => {
                if parts.is_empty() {
                    return write!(f, "FALSE");
                }
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "({part})")?;
                }
                Ok(())
            }
            Condition::Relation { op, left, right } => write!(f, "{left} {op} {right}"),
            Condition::Call { function, operands } => write_call(f, function, operands),
        }
    }
}

/// A relational operator in the supported mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOp {
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
}

impl fmt::Display for RelationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RelationOp::Eq => "=",
            RelationOp::Neq => "!=",
            RelationOp::Lt => "<",
            RelationOp::Gt => ">",
            RelationOp::Lte => "<=",
            RelationOp::Gte => ">=",
        };
        write!(f, "{text}")
    }
}

/// One side of a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A resolved table column.
    Column(Column),
    /// A literal value.
    Constant(Value),
    /// A function applied to operands, e.g. `abs(q.a)`.
    Call {
        /// SQL function name.
        function: String,
        /// Ordered call arguments.
        operands: Vec<Operand>,
    },
}

impl Operand {
    /// True for operands that carry a column reference (directly or through
    /// a call); used for the cosmetic column-first ordering.
    pub fn is_column_bearing(&self) -> bool {
        match self {
            Operand::Column(_) => true,
            Operand::Constant(_) => false,
            Operand::Call { operands, .. } => operands.iter().any(Operand::is_column_bearing),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(column) => write!(f, "{column}"),
            Operand::Constant(value) => write_constant(f, value),
            Operand::Call { function, operands } => write_call(f, function, operands),
        }
    }
}

/// A table-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    /// Table the column belongs to.
    pub table: String,
    /// Column name.
    pub name: String,
}

impl Column {
    /// Build a column reference.
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Column {
            table: table.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

fn write_call(f: &mut fmt::Formatter<'_>, function: &str, operands: &[Operand]) -> fmt::Result {
    write!(f, "{function}(")?;
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{operand}")?;
    }
    write!(f, ")")
}

fn write_constant(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        Value::Number(n) => write!(f, "{n}"),
        Value::Bool(true) => write!(f, "TRUE"),
        Value::Bool(false) => write!(f, "FALSE"),
        Value::Null => write!(f, "NULL"),
        // Composite scalars never survive translation; render JSON verbatim.
        other => write!(f, "{other}"),
    }
}
