use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_OUTPUT_DIR: &str = "rule-set";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const DEFAULT_SOURCES: [(&str, &str); 2] = [
    (
        "gfw.srs",
        "https://raw.githubusercontent.com/Loyalsoldier/clash-rules/release/gfw.txt",
    ),
    (
        "ads.srs",
        "https://raw.githubusercontent.com/Loyalsoldier/clash-rules/release/reject.txt",
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid source '{0}': expected NAME=LOCATION")]
    SourceSpec(String),
    #[error("invalid rule-set name '{0}': must be a plain file name")]
    InvalidName(String),
    #[error("duplicate rule-set name '{0}'")]
    DuplicateName(String),
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// One named rule source: output file name and where to read the list from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSource {
    pub name: String,
    pub location: String,
}

impl RuleSource {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }

    /// Parse a `NAME=LOCATION` command-line value.
    pub fn parse_spec(spec: &str) -> Result<Self, ConfigError> {
        match spec.split_once('=') {
            Some((name, location)) if !name.trim().is_empty() && !location.trim().is_empty() => {
                Ok(Self::new(name.trim(), location.trim()))
            }
            _ => Err(ConfigError::SourceSpec(spec.to_string())),
        }
    }
}

/// Settings for a `generate` run. Every field may be omitted from the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateConfig {
    pub output_dir: PathBuf,
    pub timeout_secs: u64,
    pub sources: Vec<RuleSource>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sources: default_sources(),
        }
    }
}

impl GenerateConfig {
    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check names and limits before any file is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !is_plain_file_name(&source.name) {
                return Err(ConfigError::InvalidName(source.name.clone()));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateName(source.name.clone()));
            }
        }
        Ok(())
    }
}

pub fn default_sources() -> Vec<RuleSource> {
    DEFAULT_SOURCES
        .iter()
        .map(|&(name, location)| RuleSource::new(name, location))
        .collect()
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some_and(|file_name| file_name == name)
}
