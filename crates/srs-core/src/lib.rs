//! srsgen Core Library
//!
//! This crate provides the rule model shared by the compiler and the CLI,
//! and the binary rule-set (SRS) format definition with its decoder.
//!
//! # Architecture
//!
//! Rule-sets exist in two shapes. The compat shape (`RuleSetCompat`) is the
//! versioned, human-editable JSON document. The internal shape (`RuleSet`) is
//! what the binary encoder consumes; it is only reachable through
//! `RuleSetCompat::upgrade`, which walks the per-version upgrade chain.
//!
//! # Modules
//!
//! - `rule`: compat and internal rule-set types, upgrade chain
//! - `compat`: extended JSON decoding and canonical encoding of the compat shape
//! - `binary`: SRS binary format constants and decoder

pub mod binary;
pub mod compat;
pub mod rule;

// Re-export commonly used types
pub use binary::{decode_rule_set, read_rule_set, SrsError};
pub use compat::{decode_compat, encode_compat, DecodeError};
pub use rule::{
    CompatRule, HeadlessRule, Listable, RuleField, RuleSet, RuleSetCompat, UpgradeError,
    RULE_SET_VERSION_CURRENT,
};
