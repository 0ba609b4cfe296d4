pub mod catalog;
pub mod config;
pub mod session;
pub mod source;

// Re-export matcher types for convenience
pub use facematch_core::{
    confidence, find_match, Embedding, Identity, MatchError, MatchResult, Reference, Threshold,
};
