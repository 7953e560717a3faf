//! srsgen CLI
//!
//! Converts clash domain lists into SRS rule-set files and inspects the results.

mod config;
mod fetch;
mod generate;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use srs_compiler::compile_rule_set;
use srs_core::binary::read_header;
use srs_core::{decode_rule_set, encode_compat, RuleField, RuleSetCompat};

use crate::config::{GenerateConfig, RuleSource};
use crate::generate::generate;

#[derive(Parser)]
#[command(name = "srsgen")]
#[command(about = "Clash domain list to SRS rule-set compiler and tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every configured source and write its rule-set (default)
    Generate(GenerateArgs),

    /// Compile a rule-set source (JSON) into an SRS file
    Compile {
        /// Rule-set source file
        #[arg(short, long)]
        input: PathBuf,

        /// Output SRS file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Decode an SRS file back into rule-set source JSON
    Decompile {
        /// SRS file to decode
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dump SRS file info
    Info {
        /// SRS file to inspect
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Args, Default)]
struct GenerateArgs {
    /// JSON config file with output_dir, timeout_secs and sources
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving the rule-set files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Rule source, replaces the configured list (repeatable)
    #[arg(short, long = "source", value_name = "NAME=LOCATION")]
    sources: Vec<String>,

    /// Fetch timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Generate(GenerateArgs::default()));

    let result = match command {
        Commands::Generate(args) => cmd_generate(args).await,
        Commands::Compile { input, output } => cmd_compile(&input, &output),
        Commands::Decompile { input, output } => cmd_decompile(&input, output.as_deref()),
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(args: GenerateArgs) -> Result<GenerateConfig, String> {
    let mut config = match &args.config {
        Some(path) => GenerateConfig::load(path).map_err(|e| e.to_string())?,
        None => GenerateConfig::default(),
    };

    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if !args.sources.is_empty() {
        config.sources = args
            .sources
            .iter()
            .map(|spec| RuleSource::parse_spec(spec))
            .collect::<Result<_, _>>()
            .map_err(|e| e.to_string())?;
    }

    Ok(config)
}

async fn cmd_generate(args: GenerateArgs) -> Result<(), String> {
    let config = resolve_config(args)?;
    let generated = generate(&config).await.map_err(|e| e.to_string())?;
    for rule_set in &generated {
        log::debug!(
            "{} -> '{}' ({} rules, {} bytes)",
            rule_set.name,
            rule_set.path.display(),
            rule_set.summary.rules,
            rule_set.summary.bytes
        );
    }
    Ok(())
}

fn cmd_compile(input: &Path, output: &Path) -> Result<(), String> {
    let source = fs::read(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;

    compile_rule_set(&source, output)
        .map_err(|e| format!("Failed to compile '{}': {}", input.display(), e))?;

    Ok(())
}

fn cmd_decompile(input: &Path, output: Option<&Path>) -> Result<(), String> {
    let bytes = fs::read(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;

    let rule_set = decode_rule_set(&bytes)
        .map_err(|e| format!("Invalid rule-set '{}': {}", input.display(), e))?;

    let mut json = encode_compat(&RuleSetCompat::from(&rule_set))
        .map_err(|e| format!("Failed to render rule-set source: {}", e))?;
    json.push(b'\n');

    match output {
        Some(path) => fs::write(path, &json)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?,
        None => std::io::stdout()
            .write_all(&json)
            .map_err(|e| format!("Failed to write to stdout: {}", e))?,
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), String> {
    let bytes = fs::read(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;

    let header = read_header(&bytes)
        .map_err(|e| format!("Invalid rule-set: {}", e))?;
    let rule_set = decode_rule_set(&bytes)
        .map_err(|e| format!("Invalid rule-set: {}", e))?;

    println!("Rule-set: {}", input.display());
    println!("  Magic:       SRSB");
    println!("  Version:     {}", header.version);
    println!("  Total size:  {} bytes ({:.1} KB)", bytes.len(), bytes.len() as f64 / 1024.0);
    println!();

    println!("Rules:");
    println!("  Count:       {}", rule_set.rules.len());
    for field in RuleField::ALL {
        let count: usize = rule_set.rules.iter().map(|rule| rule.field(field).len()).sum();
        if count > 0 {
            println!("  {:<15} {}", format!("{}:", field), count);
        }
    }

    Ok(())
}
