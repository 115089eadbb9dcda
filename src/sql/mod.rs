/// Clause tree types and SQL text rendering.
pub mod clause;
/// Schema catalog and column-resolution backends.
pub mod schema;

pub use clause::{Clause, Column, Condition, Operand, RelationOp, Union};
pub use schema::{ColumnResolver, SchemaCatalog, SqlType, Unchecked};
