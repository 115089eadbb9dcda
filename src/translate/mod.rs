/// In-place canonicalization of table references.
pub mod preprocess;
/// Translation of a preprocessed query set into a clause union.
pub mod translator;

pub use preprocess::preprocess;
pub use translator::Translator;
