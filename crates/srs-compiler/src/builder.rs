use log::debug;
use serde_yaml::Value;

use srs_core::{encode_compat, CompatRule, RuleSetCompat};

use crate::error::CompileError;

/// Wildcard prefix marker used by clash domain lists (`+.example.com`).
pub const WILDCARD_MARKER: char = '+';

const PAYLOAD_KEY: &str = "payload";

/// Build the canonical compat JSON for a clash domain list document.
pub fn build_rule_set_source(document: &[u8]) -> Result<Vec<u8>, CompileError> {
    let compat = build_compat(document)?;
    encode_compat(&compat).map_err(CompileError::Render)
}

/// Build a single-rule compat document from the document's `payload` list.
pub fn build_compat(document: &[u8]) -> Result<RuleSetCompat, CompileError> {
    let payload = read_payload(document)?;
    let total = payload.len();

    let suffixes: Vec<String> = payload
        .iter()
        .filter_map(|raw| {
            let suffix = normalize_domain_suffix(raw);
            if suffix.is_empty() {
                debug!("dropping payload entry {:?}: empty after normalization", raw);
                None
            } else {
                Some(suffix)
            }
        })
        .collect();

    debug!("built domain_suffix list: {} of {} payload entries kept", suffixes.len(), total);

    Ok(RuleSetCompat::new(vec![CompatRule::with_domain_suffix(suffixes)]))
}

/// Strip every wildcard marker, keeping the other characters in order.
pub fn normalize_domain_suffix(raw: &str) -> String {
    raw.chars().filter(|&c| c != WILDCARD_MARKER).collect()
}

fn read_payload(document: &[u8]) -> Result<Vec<String>, CompileError> {
    let root: Value = serde_yaml::from_slice(document)?;

    let mapping = root.as_mapping().ok_or_else(|| {
        CompileError::Shape(format!("document root is {}, expected a mapping", describe(&root)))
    })?;

    let payload = mapping
        .get(PAYLOAD_KEY)
        .ok_or_else(|| CompileError::Shape(format!("missing '{PAYLOAD_KEY}' field")))?;

    let items = payload.as_sequence().ok_or_else(|| {
        CompileError::Shape(format!(
            "'{PAYLOAD_KEY}' is {}, expected a sequence of strings",
            describe(payload)
        ))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str().map(str::to_owned).ok_or_else(|| {
                CompileError::Shape(format!(
                    "'{PAYLOAD_KEY}' item {index} is {}, expected a string",
                    describe(item)
                ))
            })
        })
        .collect()
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes(compat: &RuleSetCompat) -> Vec<String> {
        compat.rules[0].domain_suffix.as_slice().to_vec()
    }

    #[test]
    fn builds_expected_document() {
        let bytes = build_rule_set_source(br#"{"payload": ["+.ads.example", "tracker.example"]}"#)
            .expect("should build");

        let actual: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let expected: serde_json::Value = serde_json::from_str(
            r#"{"version":1,"rules":[{"domain_suffix":[".ads.example","tracker.example"]}]}"#,
        )
        .unwrap();
        assert_eq!(actual, expected);
        assert!(bytes.starts_with(b"{\n    \"version\": 1,"));
    }

    #[test]
    fn builds_from_clash_yaml() {
        let document = b"payload:\n  - '+.google.com'\n  - 'example.org'\n  - \"+.cdn.example.net\"\n";
        let compat = build_compat(document).expect("should build");

        assert_eq!(compat.version, 1);
        assert_eq!(compat.rules.len(), 1);
        assert_eq!(suffixes(&compat), [".google.com", "example.org", ".cdn.example.net"]);
        assert!(compat.rules[0].domain.is_empty());
    }

    #[test]
    fn strips_every_wildcard_marker() {
        let cases = [
            ("+.example.com", ".example.com"),
            ("a+b.example", "ab.example"),
            ("+.+.nested.example", "..nested.example"),
            ("plain.example", "plain.example"),
        ];
        for (raw, expected) in cases {
            let normalized = normalize_domain_suffix(raw);
            assert_eq!(normalized, expected);
            assert!(!normalized.contains(WILDCARD_MARKER));
        }
    }

    #[test]
    fn drops_entries_that_normalize_to_nothing() {
        let compat = build_compat(b"payload: ['+', 'kept.example', '++']").expect("should build");
        assert_eq!(suffixes(&compat), ["kept.example"]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = build_compat(b"payload: ['+.a.example', 'b.example', '+.c+d.example']")
            .expect("should build");

        let again = serde_json::json!({ "payload": suffixes(&first) }).to_string();
        let second = build_compat(again.as_bytes()).expect("should rebuild");
        assert_eq!(suffixes(&first), suffixes(&second));
    }

    #[test]
    fn output_is_byte_stable() {
        let document = b"payload:\n  - '+.x.example'\n  - 'y.example'\n";
        let first = build_rule_set_source(document).unwrap();
        let second = build_rule_set_source(document).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_payload_builds_empty_rule() {
        let compat = build_compat(b"payload: []").expect("should build");
        assert_eq!(compat.rules.len(), 1);
        assert!(compat.rules[0].domain_suffix.is_empty());
    }

    #[test]
    fn reports_shape_errors() {
        let cases = [
            ("other: []", "missing 'payload'"),
            ("payload: 3", "'payload' is a number"),
            ("payload: {a: b}", "'payload' is a mapping"),
            ("payload: ['a.example', 7]", "item 1 is a number"),
            ("- a.example\n- b.example\n", "document root is a sequence"),
        ];
        for (document, fragment) in cases {
            match build_compat(document.as_bytes()) {
                Err(CompileError::Shape(message)) => {
                    assert!(message.contains(fragment), "{message:?} should mention {fragment:?}");
                }
                other => panic!("expected shape error for {document:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn reports_parse_errors() {
        let err = build_compat(b"payload: [unclosed").expect_err("should fail");
        assert!(matches!(err, CompileError::Parse(_)));
        assert_eq!(err.stage(), "build");
    }
}
