//! SRS Rule-Set Encoder

use std::io::{self, Write};

use srs_core::binary::{encode_varint, FieldMask, SRS_MAGIC, SRS_VERSION};
use srs_core::{RuleField, RuleSet};

/// Error type for rule-set encoding.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("rule {rule}: empty {field} item at index {index}")]
    EmptyItem {
        rule: usize,
        field: RuleField,
        index: usize,
    },
    #[error("{what} count {count} exceeds the format limit")]
    CountOverflow { what: &'static str, count: usize },
    #[error("rule {rule}: {field} item of {len} bytes exceeds the format limit")]
    ItemTooLong {
        rule: usize,
        field: RuleField,
        len: usize,
    },
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Encode a rule-set into a fresh buffer.
pub fn encode_rule_set(rule_set: &RuleSet) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    write_rule_set(&mut buffer, rule_set)?;
    Ok(buffer)
}

/// Stream a rule-set to `writer`, one rule at a time.
///
/// Returns the number of bytes written. On error the writer may hold a
/// partial encoding.
pub fn write_rule_set<W: Write>(writer: &mut W, rule_set: &RuleSet) -> Result<usize, EncodeError> {
    let mut scratch = Vec::with_capacity(64);
    scratch.extend_from_slice(&SRS_MAGIC);
    scratch.push(SRS_VERSION);
    encode_varint(&mut scratch, to_u32("rule", rule_set.rules.len())?);
    writer.write_all(&scratch)?;
    let mut written = scratch.len();

    for (rule_index, rule) in rule_set.rules.iter().enumerate() {
        scratch.clear();

        let mask = RuleField::ALL
            .into_iter()
            .filter(|&field| !rule.field(field).is_empty())
            .fold(FieldMask::empty(), |mask, field| mask | FieldMask::of(field));
        scratch.push(mask.bits());

        for field in mask.fields() {
            let items = rule.field(field);
            encode_varint(&mut scratch, to_u32("item", items.len())?);

            for (index, item) in items.iter().enumerate() {
                if item.is_empty() {
                    return Err(EncodeError::EmptyItem {
                        rule: rule_index,
                        field,
                        index,
                    });
                }
                let len = u32::try_from(item.len()).map_err(|_| EncodeError::ItemTooLong {
                    rule: rule_index,
                    field,
                    len: item.len(),
                })?;
                encode_varint(&mut scratch, len);
                scratch.extend_from_slice(item.as_bytes());
            }
        }

        writer.write_all(&scratch)?;
        written += scratch.len();
    }

    Ok(written)
}

fn to_u32(what: &'static str, count: usize) -> Result<u32, EncodeError> {
    u32::try_from(count).map_err(|_| EncodeError::CountOverflow { what, count })
}

#[cfg(test)]
mod tests {
    use srs_core::binary::decode_rule_set;
    use srs_core::{decode_compat, HeadlessRule};

    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn encodes_expected_bytes() {
        let rule_set = RuleSet {
            rules: vec![HeadlessRule {
                domain_suffix: strings(&[".ads.example", "tracker.example"]),
                ..HeadlessRule::default()
            }],
        };

        let bytes = encode_rule_set(&rule_set).expect("should encode");

        let mut expected = b"SRSB\x01\x01\x02\x02".to_vec();
        expected.push(12);
        expected.extend_from_slice(b".ads.example");
        expected.push(15);
        expected.extend_from_slice(b"tracker.example");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn round_trips_through_decoder() {
        let rule_set = RuleSet {
            rules: vec![
                HeadlessRule {
                    domain: strings(&["exact.example"]),
                    domain_suffix: strings(&[".a.example", "b.example", ".a.example"]),
                    ..HeadlessRule::default()
                },
                HeadlessRule::default(),
                HeadlessRule {
                    domain_keyword: strings(&["track"]),
                    domain_regex: strings(&["^ad[0-9]+\\.example$"]),
                    ip_cidr: strings(&["192.168.0.0/16", "fd00::/8"]),
                    ..HeadlessRule::default()
                },
            ],
        };

        let bytes = encode_rule_set(&rule_set).expect("should encode");
        let decoded = decode_rule_set(&bytes).expect("should decode");
        assert_eq!(decoded, rule_set);
    }

    #[test]
    fn round_trips_long_and_unicode_items() {
        let long = "a".repeat(300) + ".example";
        let rule_set = RuleSet {
            rules: vec![HeadlessRule {
                domain_suffix: vec![long, "bücher.example".to_string()],
                ..HeadlessRule::default()
            }],
        };

        let bytes = encode_rule_set(&rule_set).expect("should encode");
        assert_eq!(decode_rule_set(&bytes).expect("should decode"), rule_set);
    }

    #[test]
    fn round_trips_upgraded_document() {
        let compat = decode_compat(
            br#"{"version":1,"rules":[{"domain_suffix":[".ads.example","tracker.example"]}]}"#,
        )
        .unwrap();
        let rule_set = compat.upgrade().unwrap();

        let decoded = decode_rule_set(&encode_rule_set(&rule_set).unwrap()).unwrap();
        assert_eq!(decoded.rules.len(), 1);
        assert_eq!(decoded.rules[0].domain_suffix, [".ads.example", "tracker.example"]);
    }

    #[test]
    fn rejects_empty_items() {
        let rule_set = RuleSet {
            rules: vec![HeadlessRule {
                domain_suffix: strings(&["ok.example", ""]),
                ..HeadlessRule::default()
            }],
        };

        let err = encode_rule_set(&rule_set).expect_err("should fail");
        assert!(matches!(
            err,
            EncodeError::EmptyItem {
                rule: 0,
                field: RuleField::DomainSuffix,
                index: 1
            }
        ));
    }

    #[test]
    fn reports_written_length() {
        let rule_set = RuleSet {
            rules: vec![HeadlessRule {
                domain: strings(&["x"]),
                ..HeadlessRule::default()
            }],
        };

        let mut sink = Vec::new();
        let written = write_rule_set(&mut sink, &rule_set).expect("should write");
        assert_eq!(written, sink.len());
    }
}
