pub mod embedding;
pub mod error;
pub mod matcher;

// Re-export commonly used types
pub use embedding::Embedding;
pub use error::{InputError, MatchError};
pub use matcher::{confidence, find_match, Identity, MatchResult, Reference, Threshold};
