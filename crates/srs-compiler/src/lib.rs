//! srsgen Rule-Set Compiler
//!
//! This crate turns clash-style domain lists into compat rule-set documents
//! and compiles compat documents into the SRS binary format.

pub mod builder;
pub mod compile;
pub mod error;
pub mod writer;

pub use builder::{build_compat, build_rule_set_source, normalize_domain_suffix};
pub use compile::{compile_rule_set, CompileSummary};
pub use error::CompileError;
pub use writer::{encode_rule_set, write_rule_set, EncodeError};
