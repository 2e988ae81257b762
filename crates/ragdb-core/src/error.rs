use thiserror::Error;

/// Retrieval errors, tagged by the stage that failed so callers and tests
/// can tell an unreachable collaborator apart from a legitimately empty
/// result set.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("vector index error: {0}")]
    VectorIndex(String),

    #[error("lexical index error: {0}")]
    Lexical(String),
}

pub type Result<T> = std::result::Result<T, Error>;
