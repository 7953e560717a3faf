use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use reqwest::Client;

use srs_compiler::{build_rule_set_source, compile_rule_set, CompileError, CompileSummary};

use crate::config::{ConfigError, GenerateConfig, RuleSource};
use crate::fetch::{build_client, load_source};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create output directory '{}': {source}", .path.display())]
    OutputDir { path: PathBuf, source: io::Error },
    #[error("failed to initialize HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("rule-set '{name}': {} stage failed: {source}", .source.stage())]
    Source { name: String, source: CompileError },
}

/// A rule-set file written by a `generate` run.
#[derive(Debug, Clone)]
pub struct GeneratedRuleSet {
    pub name: String,
    pub path: PathBuf,
    pub summary: CompileSummary,
}

/// Fetch, build and compile every configured source in order.
///
/// Stops at the first failure; files written for earlier sources stay in place.
pub async fn generate(config: &GenerateConfig) -> Result<Vec<GeneratedRuleSet>, GenerateError> {
    config.validate()?;

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|source| GenerateError::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;

    let client = build_client(config.timeout()).map_err(GenerateError::Client)?;

    let mut generated = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let path = config.output_dir.join(&source.name);
        let summary = generate_one(&client, source, &path)
            .await
            .map_err(|err| GenerateError::Source {
                name: source.name.clone(),
                source: err,
            })?;

        info!(
            "generated '{}': {} domain rules, {} bytes",
            path.display(),
            summary.items,
            summary.bytes
        );
        generated.push(GeneratedRuleSet {
            name: source.name.clone(),
            path,
            summary,
        });
    }

    Ok(generated)
}

async fn generate_one(
    client: &Client,
    source: &RuleSource,
    output: &Path,
) -> Result<CompileSummary, CompileError> {
    debug!("processing '{}' from {}", source.name, source.location);
    let raw = load_source(client, &source.location).await?;
    let compat = build_rule_set_source(&raw)?;
    compile_rule_set(&compat, output)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use srs_core::decode_rule_set;

    use super::*;

    fn config_for(dir: &Path, sources: Vec<RuleSource>) -> GenerateConfig {
        GenerateConfig {
            output_dir: dir.join("nested").join("rule-set"),
            timeout_secs: 5,
            sources,
        }
    }

    fn write_list(dir: &Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn generates_every_source() {
        let dir = tempfile::tempdir().unwrap();
        let gfw = write_list(dir.path(), "gfw.yaml", "payload:\n  - '+.blocked.example'\n");
        let ads = write_list(
            dir.path(),
            "ads.json",
            r#"{"payload": ["+.ads.example", "tracker.example"]}"#,
        );
        let config = config_for(
            dir.path(),
            vec![RuleSource::new("gfw.srs", gfw), RuleSource::new("ads.srs", ads)],
        );

        let generated = generate(&config).await.expect("should generate");
        assert_eq!(generated.len(), 2);
        assert_eq!(generated[1].summary.items, 2);

        let ads_rules = decode_rule_set(&fs::read(config.output_dir.join("ads.srs")).unwrap()).unwrap();
        assert_eq!(ads_rules.rules[0].domain_suffix, [".ads.example", "tracker.example"]);

        let gfw_rules = decode_rule_set(&fs::read(&generated[0].path).unwrap()).unwrap();
        assert_eq!(gfw_rules.rules[0].domain_suffix, [".blocked.example"]);
    }

    #[tokio::test]
    async fn stops_at_first_failing_source() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_list(dir.path(), "good.yaml", "payload: ['+.one.example']");
        let bad = write_list(dir.path(), "bad.yaml", "payload: 42");
        let never = write_list(dir.path(), "never.yaml", "payload: ['two.example']");
        let config = config_for(
            dir.path(),
            vec![
                RuleSource::new("first.srs", good),
                RuleSource::new("second.srs", bad),
                RuleSource::new("third.srs", never),
            ],
        );

        let err = generate(&config).await.expect_err("should fail");
        let message = err.to_string();
        assert!(message.contains("second.srs"), "{message}");
        assert!(message.contains("build stage failed"), "{message}");

        let first = decode_rule_set(&fs::read(config.output_dir.join("first.srs")).unwrap());
        assert!(first.is_ok());
        assert!(!config.output_dir.join("second.srs").exists());
        assert!(!config.output_dir.join("third.srs").exists());
    }

    #[tokio::test]
    async fn reports_fetch_stage_for_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml").to_string_lossy().into_owned();
        let config = config_for(dir.path(), vec![RuleSource::new("gone.srs", missing)]);

        match generate(&config).await {
            Err(GenerateError::Source { name, source }) => {
                assert_eq!(name, "gone.srs");
                assert_eq!(source.stage(), "fetch");
            }
            other => panic!("expected source error, got {other:?}"),
        }
        assert!(!config.output_dir.join("gone.srs").exists());
    }

    #[tokio::test]
    async fn invalid_config_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), vec![RuleSource::new("../escape.srs", "x.yaml")]);

        let err = generate(&config).await.expect_err("should fail");
        assert!(matches!(err, GenerateError::Config(ConfigError::InvalidName(_))));
        assert!(!config.output_dir.exists());
    }
}
