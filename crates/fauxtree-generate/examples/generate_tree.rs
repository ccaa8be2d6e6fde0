use std::env;
use std::path::PathBuf;

use fauxtree_generate::{ExportFormat, GenerateOptions, GenerationEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut options = GenerateOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let value = args.next().ok_or("missing --seed value")?;
                options.seed = value.parse()?;
            }
            "--media" => options.media_dir = args.next().map(PathBuf::from),
            "--out" => {
                options.out_dir = args.next().map(PathBuf::from).ok_or("missing --out path")?;
            }
            "--format" => {
                let value = args.next().ok_or("missing --format value")?;
                options.format = value.parse::<ExportFormat>()?;
            }
            other => return Err(format!("unexpected argument '{other}'").into()),
        }
    }

    let engine = GenerationEngine::new(options);
    let result = engine.run()?;

    println!("run_dir={}", result.run_dir.display());
    println!("anchor={}", result.anchor);
    Ok(())
}
