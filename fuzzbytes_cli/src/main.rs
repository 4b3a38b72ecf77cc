use fuzzbytes_core::config::{DecodeSettings, FuzzBytesConfig, OutputFormat};
use fuzzbytes_core::{DecodedEntry, SeedMode, ValueGenerator, decode_plan, parse_plan};

use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "fuzzbytes.toml";

/// Replays a saved fuzzer input through a plan of typed accessors.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Input blob, e.g. a crash file written by the fuzzing engine.
    input: PathBuf,
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Accessor tokens such as `int64,bool,text:4`. Repeatable.
    #[clap(short, long)]
    plan: Vec<String>,
    #[clap(long, value_enum)]
    seed_mode: Option<SeedModeArg>,
    /// Print the report as JSON.
    #[clap(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SeedModeArg {
    Peek,
    Consume,
}

impl From<SeedModeArg> for SeedMode {
    fn from(arg: SeedModeArg) -> Self {
        match arg {
            SeedModeArg::Peek => SeedMode::Peek,
            SeedModeArg::Consume => SeedMode::Consume,
        }
    }
}

#[derive(Serialize, Debug)]
struct Report<'a> {
    input: &'a Path,
    length: usize,
    md5: String,
    seed: i64,
    seed_mode: SeedMode,
    values: Vec<DecodedEntry>,
    consumed: usize,
    fallback_bytes: u64,
}

fn load_config(path: Option<PathBuf>) -> Result<FuzzBytesConfig, anyhow::Error> {
    match path {
        Some(config_path) => {
            log::info!("Loading configuration from specified path: {config_path:?}");
            FuzzBytesConfig::load_from_file(&config_path)
        }
        None => {
            let default_config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_config_path.exists() {
                log::info!(
                    "No config file specified via CLI, loading default: {default_config_path:?}"
                );
                FuzzBytesConfig::load_from_file(&default_config_path)
            } else {
                log::debug!(
                    "No config file specified and default '{DEFAULT_CONFIG_FILE}' not found, using built-in defaults."
                );
                Ok(FuzzBytesConfig::default())
            }
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = load_config(cli.config_file)?;

    if let Some(seed_mode) = cli.seed_mode {
        config.source.seed_mode = seed_mode.into();
    }
    let decode = config.decode.get_or_insert_with(DecodeSettings::default);
    if !cli.plan.is_empty() {
        decode.plan = cli.plan;
    }
    if cli.json {
        decode.output = OutputFormat::Json;
    }
    let plan = parse_plan(decode.plan.as_slice())?;
    let output = decode.output;
    log::debug!("Effective configuration: {config:#?}");

    let data = std::fs::read(&cli.input)
        .map_err(|e| anyhow::anyhow!("Failed to read input {:?}: {}", cli.input, e))?;
    let mut values = ValueGenerator::with_config(&data, &config.source)
        .map_err(|e| anyhow::anyhow!("Cannot replay {:?}: {}", cli.input, e))?;

    let decoded = decode_plan(&mut values, &plan);
    let source = values.source();
    let report = Report {
        input: &cli.input,
        length: data.len(),
        md5: format!("{:x}", md5::compute(&data)),
        seed: source.seed(),
        seed_mode: config.source.seed_mode,
        values: decoded,
        consumed: source.position(),
        fallback_bytes: source.fallback_drawn(),
    };

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn print_text(report: &Report<'_>) {
    println!(
        "Input: {:?} ({} bytes, md5 {})",
        report.input, report.length, report.md5
    );
    println!("Seed: {:#018x} ({:?})", report.seed, report.seed_mode);
    for entry in &report.values {
        println!("  {} = {}", entry.accessor, entry.value);
    }
    println!(
        "Consumed {} of {} input bytes, {} fallback bytes",
        report.consumed, report.length, report.fallback_bytes
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_collects_repeated_plans_and_overrides() {
        let cli = Cli::try_parse_from([
            "fuzzbytes",
            "crash-1234",
            "-p",
            "int64,bool",
            "--plan",
            "text:3",
            "--seed-mode",
            "consume",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("crash-1234"));
        assert_eq!(cli.plan, vec!["int64,bool", "text:3"]);
        assert_eq!(
            cli.seed_mode.map(SeedMode::from),
            Some(SeedMode::Consume)
        );
        assert!(cli.json);
        assert!(parse_plan(cli.plan.as_slice()).is_ok());
    }

    #[test]
    fn cli_requires_an_input() {
        assert!(Cli::try_parse_from(["fuzzbytes"]).is_err());
    }
}
