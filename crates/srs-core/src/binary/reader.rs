//! SRS Rule-Set Decoder

use std::io::Read;

use super::format::*;
use crate::rule::{HeadlessRule, RuleField, RuleSet};

/// Error type for rule-set decoding.
#[derive(Debug, thiserror::Error)]
pub enum SrsError {
    #[error("Invalid magic bytes")]
    InvalidMagic,
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("Data too short")]
    DataTooShort,
    #[error("Unexpected end of data at offset {0}")]
    Truncated(usize),
    #[error("Varint overflow at offset {0}")]
    VarintOverflow(usize),
    #[error("Rule {rule}: unknown field mask bits {mask:#04x}")]
    InvalidFieldMask { rule: usize, mask: u8 },
    #[error("Rule {rule}: field {field} is flagged present but has no items")]
    EmptyField { rule: usize, field: RuleField },
    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),
    #[error("{0} trailing bytes after the last rule")]
    TrailingData(usize),
    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrsHeader {
    pub version: u8,
}

/// Validate and parse the header.
pub fn read_header(data: &[u8]) -> Result<SrsHeader, SrsError> {
    if data.len() < HEADER_SIZE {
        return Err(SrsError::DataTooShort);
    }

    if !validate_magic(data) {
        return Err(SrsError::InvalidMagic);
    }

    let version = data[header::VERSION];
    if version != SRS_VERSION {
        return Err(SrsError::UnsupportedVersion(version));
    }

    Ok(SrsHeader { version })
}

/// Decode a complete rule-set file.
pub fn decode_rule_set(data: &[u8]) -> Result<RuleSet, SrsError> {
    read_header(data)?;

    let mut cursor = ByteCursor::new(data, HEADER_SIZE);
    let rule_count = cursor.read_varint()? as usize;
    // Every rule takes at least its mask byte.
    let mut rules = Vec::with_capacity(rule_count.min(cursor.remaining()));

    for rule_index in 0..rule_count {
        let mask_raw = cursor.read_u8()?;
        let mask = FieldMask::from_bits(mask_raw).ok_or(SrsError::InvalidFieldMask {
            rule: rule_index,
            mask: mask_raw,
        })?;

        let mut rule = HeadlessRule::default();
        for field in mask.fields() {
            let item_count = cursor.read_varint()? as usize;
            if item_count == 0 {
                return Err(SrsError::EmptyField { rule: rule_index, field });
            }

            let items = rule.field_mut(field);
            items.reserve(item_count.min(cursor.remaining()));
            for _ in 0..item_count {
                items.push(cursor.read_string()?);
            }
        }
        rules.push(rule);
    }

    if cursor.remaining() > 0 {
        return Err(SrsError::TrailingData(cursor.remaining()));
    }

    log::debug!("decoded rule-set: {} rules, {} bytes", rules.len(), data.len());

    Ok(RuleSet { rules })
}

/// Read a complete rule-set file from a reader.
pub fn read_rule_set<R: Read>(mut reader: R) -> Result<RuleSet, SrsError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode_rule_set(&data)
}

// =============================================================================
// Byte Cursor
// =============================================================================

struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_u8(&mut self) -> Result<u8, SrsError> {
        let byte = *self.data.get(self.pos).ok_or(SrsError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Decode a single unsigned LEB128 varint.
    fn read_varint(&mut self) -> Result<u32, SrsError> {
        let start = self.pos;
        let mut result: u32 = 0;

        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            let payload = (byte & 0x7f) as u32;
            // The fifth byte may only carry the top 4 bits.
            if i == MAX_VARINT_LEN - 1 && payload > 0x0f {
                return Err(SrsError::VarintOverflow(start));
            }
            result |= payload << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }

        Err(SrsError::VarintOverflow(start))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], SrsError> {
        if len > self.remaining() {
            return Err(SrsError::Truncated(self.data.len()));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_string(&mut self) -> Result<String, SrsError> {
        let len = self.read_varint()? as usize;
        let offset = self.pos;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| SrsError::InvalidUtf8(offset))
    }
}
