use thiserror::Error;

/// Engine failure modes. Arithmetic edge cases (empty documents, zero-norm
/// vectors, unseen query terms) are normalized to zero inside the ranker
/// and never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot index an empty document collection")]
    EmptyCollection,

    #[error("malformed posting list: {0}")]
    MalformedPostingList(String),

    #[error("top-k bound must be at least 1 (got {0})")]
    InvalidK(usize),

    #[error("corrupt persisted state in {file}, record {record}: {reason}")]
    CorruptPersistedState {
        file: String,
        record: usize,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] bincode::Error),

    #[error("metadata encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
