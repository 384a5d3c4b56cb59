//! Note-taking application library
//!
//! This library provides a note and folder store with tag filtering,
//! persisted to a local key-value store, plus optional assistant-backed tag
//! suggestion and summarization.

mod assistant;
mod cli;
mod config;
mod errors;
mod helper;
mod note;
mod storage;
mod store;
mod types;

// Re-export key components
pub use assistant::*;
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use storage::*;
pub use store::*;
pub use types::*;
