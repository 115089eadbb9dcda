//! Compile OPA partial-evaluation results into SQL row-filter clauses.
//!
//! A data-serving application can enforce row-level access control by asking
//! OPA to partially evaluate its policy against the known request context,
//! then appending the clauses generated here to its own queries:
//!
//! ```rust,ignore
//! use opa2sql::compile::{compile, Decision};
//! use opa2sql::evaluator::http::HttpEvaluator;
//! use opa2sql::sql::schema::Unchecked;
//!
//! let evaluator = HttpEvaluator::new("http://localhost:8181/v1/compile");
//! let input = serde_json::json!({"method": "GET", "path": ["posts"], "user": "bob"});
//! let decision = compile(
//!     "data.example.allow == true",
//!     &input,
//!     &["posts".to_string()],
//!     "posts",
//!     &evaluator,
//!     &Unchecked,
//! )?;
//!
//! match decision {
//!     Decision::NeverDefined => deny(),
//!     Decision::AlwaysDefined => allow_unfiltered(),
//!     Decision::Defined(filter) => {
//!         for clause in filter.clauses() {
//!             // e.g. "WHERE (posts.author = 'bob')"
//!             println!("{}", clause.sql());
//!         }
//!     }
//! }
//! ```
#![warn(missing_docs)]

/// Intermediate model for partially-evaluated policy queries and its wire parsing.
pub mod ast;
/// The compile entry point and its three-way decision.
pub mod compile;
/// Error taxonomy shared by the whole pipeline.
pub mod error;
/// Bindings to the external OPA evaluator (HTTP and local subprocess).
pub mod evaluator;
/// SQL clause model, text rendering, and column-resolution backends.
pub mod sql;
/// Reference preprocessing and query-set translation.
pub mod translate;
