/// Query-set, query, expression, and term types.
pub mod term;
/// Parsing of evaluator response envelopes into the intermediate model.
pub mod wire;

pub use term::{Expr, Query, QuerySet, Term};
