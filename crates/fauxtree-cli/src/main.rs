mod config;
mod logging;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fauxtree_generate::{GenerationEngine, GenerationError, MediaPool, prepare_run_dir};
use thiserror::Error;

use config::Overrides;
use logging::{init_console_logging, init_run_logging};

#[derive(Debug, Error)]
enum CliError {
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("config render error: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("logging error: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "fauxtree", version, about = "Synthetic genealogy generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a family tree into a new run directory.
    Generate(GenerateArgs),
    /// Print the default configuration as TOML.
    Config,
    /// Print the media pool inventory of an image directory.
    ScanMedia(ScanMediaArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Args, Debug)]
struct ScanMediaArgs {
    /// Root of the `{people|family|wedding}/{color|grayscale}` image tree.
    #[arg(value_name = "DIR")]
    dir: PathBuf,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Config => {
            print!("{}", config::render_default()?);
            Ok(())
        }
        Command::ScanMedia(args) => run_scan_media(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let mut options = config::load_options(args.config.as_deref())?;
    args.overrides.apply(&mut options)?;

    let (run_id, run_dir) = prepare_run_dir(&options.out_dir)?;
    init_run_logging(&run_dir.join("logs.jsonl"))?;
    tracing::info!(event = "run_started", run_id = %run_id, run_dir = %run_dir.display());

    let engine = GenerationEngine::new(options);
    let result = engine.run_in(run_id, run_dir)?;

    println!("run_dir={}", result.run_dir.display());
    println!("anchor={}", result.anchor);
    println!(
        "people={} families={} generations={}",
        result.report.records.people, result.report.records.families, result.report.generations
    );
    Ok(())
}

fn run_scan_media(args: ScanMediaArgs) -> Result<(), CliError> {
    init_console_logging()?;
    let pool = MediaPool::scan(&args.dir)?;
    for (folder, count) in pool.inventory() {
        println!("{folder}\t{count}");
    }
    println!("total\t{}", pool.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fauxtree_generate::ExportFormat;

    #[test]
    fn generate_flags_parse_into_overrides() {
        let cli = Cli::try_parse_from([
            "fauxtree",
            "generate",
            "--seed",
            "17",
            "--country",
            "DE",
            "--locale",
            "de_DE",
            "--format",
            "json",
            "--no-media",
        ])
        .expect("parse args");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate command");
        };
        let mut options = fauxtree_generate::GenerateOptions::default();
        args.overrides.apply(&mut options).expect("apply");
        assert_eq!(options.seed, 17);
        assert_eq!(options.country_code, "DE");
        assert_eq!(options.locale, "de_DE");
        assert_eq!(options.format, ExportFormat::Json);
        assert!(!options.features.media);
    }

    #[test]
    fn scan_media_requires_a_directory() {
        assert!(Cli::try_parse_from(["fauxtree", "scan-media"]).is_err());
        let cli = Cli::try_parse_from(["fauxtree", "scan-media", "photos"]).expect("parse");
        assert!(matches!(cli.command, Command::ScanMedia(_)));
    }
}
