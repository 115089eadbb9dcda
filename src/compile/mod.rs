//! The per-request pipeline: evaluator, preprocessor, translator.

use serde_json::Value;

use crate::error::CompileError;
use crate::evaluator::Evaluator;
use crate::sql::clause::Union;
use crate::sql::schema::ColumnResolver;
use crate::translate::{preprocess, Translator};

/// The three-way outcome of a compile call.
///
/// Deliberately not a boolean: callers must branch on all three.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The policy query is never defined for this input: categorical deny.
    NeverDefined,
    /// The policy query is always defined for this input: unconditional
    /// allow, no filter needed.
    AlwaysDefined,
    /// The policy query is conditionally defined: allow rows matching the
    /// filter.
    Defined(Union),
}

impl Decision {
    /// True unless the query is never defined.
    pub fn is_defined(&self) -> bool {
        !matches!(self, Decision::NeverDefined)
    }

    /// The generated filter, when one applies.
    pub fn filter(&self) -> Option<&Union> {
        match self {
            Decision::Defined(union) => Some(union),
            _ => None,
        }
    }
}

/// Run the full pipeline for one request.
///
/// `unknowns` are bare table roots; each is surfaced to the evaluator as
/// `data.<root>`. The pipeline retains no state across calls and is a pure
/// function of its arguments plus the resolver's schema.
pub fn compile<E, R>(
    query: &str,
    input: &Value,
    unknowns: &[String],
    from_table: &str,
    evaluator: &E,
    resolver: &R,
) -> Result<Decision, CompileError>
where
    E: Evaluator,
    R: ColumnResolver,
{
    let unknowns: Vec<String> = unknowns.iter().map(|u| format!("data.{u}")).collect();
    let mut query_set = evaluator.partial_eval(query, input, &unknowns)?;

    if query_set.queries.is_empty() {
        return Ok(Decision::NeverDefined);
    }
    // One unconditional body makes the whole disjunction unconditional.
    if query_set.queries.iter().any(|query| query.is_empty()) {
        return Ok(Decision::AlwaysDefined);
    }

    preprocess(&mut query_set)?;
    let filter = Translator::new(from_table, resolver).translate(&query_set)?;
    Ok(Decision::Defined(filter))
}
