pub mod corpus;
pub mod engine;
pub mod index;
pub mod persist;
pub mod query;
pub mod score;
pub mod tokenizer;

pub use index::{aggregate, process_document, DocId, InvertedIndex, TermCounts};
pub use query::Query;
