//! SRS Binary Format and Decoder
//!
//! This module provides the binary format specification and the decoder
//! for compiled rule-set files. The encoder lives in `srs-compiler`.

mod format;
mod reader;

pub use format::*;
pub use reader::*;
