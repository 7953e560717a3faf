//! Rule-set data model
//!
//! `RuleSetCompat` is the versioned document shape read from and written to
//! JSON. `RuleSet` is the internal shape consumed by the binary encoder.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// First compat schema version.
pub const RULE_SET_VERSION_1: u8 = 1;

/// Schema version `RuleSet` corresponds to.
pub const RULE_SET_VERSION_CURRENT: u8 = RULE_SET_VERSION_1;

/// Rewrites the rules of one compat version into the next version's shape.
type UpgradeStep = fn(Vec<CompatRule>) -> Vec<CompatRule>;

/// `UPGRADE_CHAIN[n]` lifts version `n + 1` to `n + 2`.
/// Length must stay `RULE_SET_VERSION_CURRENT - 1`.
const UPGRADE_CHAIN: &[UpgradeStep] = &[];

/// Error type for schema upgrades.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpgradeError {
    #[error("unsupported rule-set version: {0}")]
    UnsupportedVersion(i64),
}

// =============================================================================
// Rule Fields
// =============================================================================

/// Match list kinds known to the schema, in serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RuleField {
    Domain = 0,
    DomainSuffix = 1,
    DomainKeyword = 2,
    DomainRegex = 3,
    IpCidr = 4,
}

impl RuleField {
    /// All fields in serialization order.
    pub const ALL: [RuleField; 5] = [
        RuleField::Domain,
        RuleField::DomainSuffix,
        RuleField::DomainKeyword,
        RuleField::DomainRegex,
        RuleField::IpCidr,
    ];

    /// JSON key of the field.
    pub const fn name(self) -> &'static str {
        match self {
            RuleField::Domain => "domain",
            RuleField::DomainSuffix => "domain_suffix",
            RuleField::DomainKeyword => "domain_keyword",
            RuleField::DomainRegex => "domain_regex",
            RuleField::IpCidr => "ip_cidr",
        }
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Listable
// =============================================================================

/// String list that also deserializes from a single bare string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listable(pub Vec<String>);

impl Listable {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Listable {
    fn from(items: Vec<String>) -> Self {
        Self(items)
    }
}

impl FromIterator<String> for Listable {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Listable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Listable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(item) => Self(vec![item]),
            OneOrMany::Many(items) => Self(items),
        })
    }
}

// =============================================================================
// Compat Shape
// =============================================================================

/// One rule entry of the compat document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompatRule {
    #[serde(default, skip_serializing_if = "Listable::is_empty")]
    pub domain: Listable,
    #[serde(default, skip_serializing_if = "Listable::is_empty")]
    pub domain_suffix: Listable,
    #[serde(default, skip_serializing_if = "Listable::is_empty")]
    pub domain_keyword: Listable,
    #[serde(default, skip_serializing_if = "Listable::is_empty")]
    pub domain_regex: Listable,
    #[serde(default, skip_serializing_if = "Listable::is_empty")]
    pub ip_cidr: Listable,
}

impl CompatRule {
    /// Rule matching only on domain suffixes.
    pub fn with_domain_suffix(suffixes: Vec<String>) -> Self {
        Self {
            domain_suffix: Listable(suffixes),
            ..Self::default()
        }
    }
}

/// Versioned compat document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetCompat {
    pub version: i64,
    #[serde(default)]
    pub rules: Vec<CompatRule>,
}

impl RuleSetCompat {
    /// Create a document at the current schema version.
    pub fn new(rules: Vec<CompatRule>) -> Self {
        Self {
            version: i64::from(RULE_SET_VERSION_CURRENT),
            rules,
        }
    }

    /// Lift this document to the internal schema.
    ///
    /// Versions older than current pass through every upgrade step between
    /// their version and the current one, in order.
    pub fn upgrade(self) -> Result<RuleSet, UpgradeError> {
        let version = self.version;
        let steps = upgrade_steps(version).ok_or(UpgradeError::UnsupportedVersion(version))?;

        let mut rules = self.rules;
        for step in steps {
            rules = step(rules);
        }

        log::debug!(
            "upgraded rule-set from version {} to {} ({} rules)",
            version,
            RULE_SET_VERSION_CURRENT,
            rules.len()
        );

        Ok(RuleSet {
            rules: rules.into_iter().map(HeadlessRule::from).collect(),
        })
    }
}

impl From<&RuleSet> for RuleSetCompat {
    fn from(rule_set: &RuleSet) -> Self {
        let rules = rule_set
            .rules
            .iter()
            .map(|rule| CompatRule {
                domain: Listable(rule.domain.clone()),
                domain_suffix: Listable(rule.domain_suffix.clone()),
                domain_keyword: Listable(rule.domain_keyword.clone()),
                domain_regex: Listable(rule.domain_regex.clone()),
                ip_cidr: Listable(rule.ip_cidr.clone()),
            })
            .collect();
        Self::new(rules)
    }
}

/// Whether `version` can be upgraded to the internal schema.
pub fn is_supported_version(version: i64) -> bool {
    upgrade_steps(version).is_some()
}

/// Steps lifting `version` to current, `None` outside `1..=RULE_SET_VERSION_CURRENT`.
/// Relies on the chain holding exactly one step per older version.
fn upgrade_steps(version: i64) -> Option<&'static [UpgradeStep]> {
    let start = version.checked_sub(i64::from(RULE_SET_VERSION_1))?;
    UPGRADE_CHAIN.get(usize::try_from(start).ok()?..)
}

// =============================================================================
// Internal Shape
// =============================================================================

/// Rule of the internal schema. An empty list means the field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessRule {
    pub domain: Vec<String>,
    pub domain_suffix: Vec<String>,
    pub domain_keyword: Vec<String>,
    pub domain_regex: Vec<String>,
    pub ip_cidr: Vec<String>,
}

impl HeadlessRule {
    pub fn field(&self, field: RuleField) -> &[String] {
        match field {
            RuleField::Domain => &self.domain,
            RuleField::DomainSuffix => &self.domain_suffix,
            RuleField::DomainKeyword => &self.domain_keyword,
            RuleField::DomainRegex => &self.domain_regex,
            RuleField::IpCidr => &self.ip_cidr,
        }
    }

    pub fn field_mut(&mut self, field: RuleField) -> &mut Vec<String> {
        match field {
            RuleField::Domain => &mut self.domain,
            RuleField::DomainSuffix => &mut self.domain_suffix,
            RuleField::DomainKeyword => &mut self.domain_keyword,
            RuleField::DomainRegex => &mut self.domain_regex,
            RuleField::IpCidr => &mut self.ip_cidr,
        }
    }

    /// Total number of match items across all fields.
    pub fn item_count(&self) -> usize {
        RuleField::ALL.iter().map(|&field| self.field(field).len()).sum()
    }
}

impl From<CompatRule> for HeadlessRule {
    fn from(rule: CompatRule) -> Self {
        Self {
            domain: rule.domain.into_vec(),
            domain_suffix: rule.domain_suffix.into_vec(),
            domain_keyword: rule.domain_keyword.into_vec(),
            domain_regex: rule.domain_regex.into_vec(),
            ip_cidr: rule.ip_cidr.into_vec(),
        }
    }
}

/// Rule-set in the internal schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub rules: Vec<HeadlessRule>,
}

impl RuleSet {
    pub fn item_count(&self) -> usize {
        self.rules.iter().map(HeadlessRule::item_count).sum()
    }
}
