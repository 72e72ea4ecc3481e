//! Error types for the civ-agents crate.

/// Errors raised by embedders and vector stores.
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    /// The embedder could not produce a vector for the text.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A vector's length did not match the store's dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of vectors already in the store.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// The backing store rejected the operation.
    #[error("vector store error: {0}")]
    Store(String),
}
