use thiserror::Error;

/// Failure of a single `find_match` call. The reference set stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("reference {index} has dimension {found}, query has dimension {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Rejected input when building matcher values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("embedding has no components")]
    EmptyEmbedding,
    #[error("threshold must be finite and greater than zero, got {0}")]
    InvalidThreshold(f32),
}
