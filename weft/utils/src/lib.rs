//! Shared utilities for the weft translator.
mod errors;
mod id;
mod out_file;

pub use errors::{Error, WeftResult};
pub use id::Id;
pub use out_file::OutputFile;
