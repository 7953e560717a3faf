//! SRS Format v1 Constants
//!
//! Layout:
//!
//! ```text
//! [u8;4 magic "SRSB"][u8 version][varint rule_count]
//!   per rule: [u8 field_mask]
//!     per set bit, ascending: [varint item_count] { [varint len][bytes] }
//! ```
//!
//! Varints are unsigned LEB128, at most 32 bits of payload.

use crate::rule::RuleField;

/// Magic bytes: "SRSB"
pub const SRS_MAGIC: [u8; 4] = [0x53, 0x52, 0x53, 0x42];

/// Current format version
pub const SRS_VERSION: u8 = 1;

/// Magic plus version byte
pub const HEADER_SIZE: usize = 5;

/// Maximum encoded length of a u32 varint
pub const MAX_VARINT_LEN: usize = 5;

/// Header field byte offsets.
pub mod header {
    /// u8[4] magic = "SRSB"
    pub const MAGIC: usize = 0;
    /// u8 version
    pub const VERSION: usize = 4;
}

// =============================================================================
// Field Mask
// =============================================================================

bitflags::bitflags! {
    /// Match lists present in a rule.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldMask: u8 {
        const DOMAIN = 1 << 0;
        const DOMAIN_SUFFIX = 1 << 1;
        const DOMAIN_KEYWORD = 1 << 2;
        const DOMAIN_REGEX = 1 << 3;
        const IP_CIDR = 1 << 4;
    }
}

impl FieldMask {
    /// Bit for a single field.
    pub const fn of(field: RuleField) -> Self {
        match field {
            RuleField::Domain => Self::DOMAIN,
            RuleField::DomainSuffix => Self::DOMAIN_SUFFIX,
            RuleField::DomainKeyword => Self::DOMAIN_KEYWORD,
            RuleField::DomainRegex => Self::DOMAIN_REGEX,
            RuleField::IpCidr => Self::IP_CIDR,
        }
    }

    /// Fields present in the mask, in encoding order.
    pub fn fields(self) -> impl Iterator<Item = RuleField> {
        RuleField::ALL
            .into_iter()
            .filter(move |&field| self.contains(Self::of(field)))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Validate magic bytes.
#[inline]
pub fn validate_magic(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == SRS_MAGIC
}

/// Append an unsigned LEB128 varint.
pub fn encode_varint(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        } else {
            buf.push(byte | 0x80);
        }
    }
}
