//! Command-line presentation layer over the note store.
mod app;
mod args;

pub use app::*;
pub use args::*;
