use crate::DocId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by the indexing and search core.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A record in an ingestion batch lacks a required field.
    #[error("document {index} is missing required field `{field}`")]
    MalformedDocument { index: usize, field: String },
    /// The query string could not be parsed.
    #[error("query syntax error at {position}: {message}")]
    QuerySyntax { position: usize, message: String },
    /// No stored document has this id.
    #[error("document {0} not found")]
    NotFound(DocId),
    /// Field boosts must be positive finite numbers.
    #[error("invalid boost {boost} for field `{field}`")]
    InvalidBoost { field: String, boost: f32 },
    /// The uploaded payload is not a usable JSON document list.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// Reading or writing an index snapshot failed.
    #[error("snapshot error: {0}")]
    Persist(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Error::QuerySyntax { position, message: message.into() }
    }
}
