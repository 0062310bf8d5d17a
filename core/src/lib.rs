//! Inverted index and weighted multi-field ranked search over movie metadata.
//!
//! Documents are indexed in batches through an [`IndexWriter`] and become
//! visible to readers atomically on commit. Queries are parsed into a boolean
//! tree ([`query::parse`]) and scored with per-field boosted TF-IDF
//! ([`search::search`]). [`Engine`] ties the pieces together for the HTTP
//! server and the indexer CLI.

pub mod engine;
pub mod error;
mod index;
pub mod persist;
pub mod query;
pub mod record;
pub mod schema;
pub mod search;
pub mod tokenizer;
pub mod writer;

pub use engine::{Engine, IndexStats, IngestReport, MovieHit};
pub use error::{Error, Result};
pub use index::*;
pub use schema::{FieldBoosts, Schema};
pub use writer::IndexWriter;
