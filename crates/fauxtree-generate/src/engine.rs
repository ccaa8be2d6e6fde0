use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Instant;

use fauxtree_core::{Handle, MemoryStore, StoreStats, ancestor_generations, validate_graph};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::assets::assets_loader;
use crate::builder::{BuildStats, TreeBuilder};
use crate::errors::GenerationError;
use crate::locale::FakerLocale;
use crate::model::{GenerateOptions, GenerationReport};
use crate::output::{Artifact, export};
use crate::pools::{MediaPool, Resources};

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub run_dir: PathBuf,
    pub anchor: Handle,
    pub report: GenerationReport,
    pub store: MemoryStore,
}

/// A validated in-memory tree.
#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub store: MemoryStore,
    pub anchor: Handle,
    pub stats: BuildStats,
    /// Media items left unclaimed in the pool.
    pub media_remaining: usize,
}

/// Entry point for generating a genealogy from options.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    options: GenerateOptions,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    /// Build and validate a tree without touching the output directory.
    pub fn build(&self) -> Result<BuiltTree, GenerationError> {
        let options = &self.options;
        options.validate()?;

        let locale = FakerLocale::load(
            options.locale_key()?,
            &options.country_code,
            assets_loader(),
        )?;
        let media = match &options.media_dir {
            Some(dir) if options.features.media => MediaPool::scan(dir)?,
            _ => MediaPool::empty(),
        };
        debug!(media_items = media.len(), "media pool ready");
        let mut resources = Resources::new(media);
        let mut store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);

        let (anchor, stats) = {
            let mut builder =
                TreeBuilder::new(options, &locale, &mut resources, &mut store, &mut rng);
            let anchor = builder.build()?;
            (anchor, builder.into_stats())
        };
        validate_graph(&store, &options.graph_rules())?;

        Ok(BuiltTree {
            store,
            anchor,
            stats,
            media_remaining: resources.media().len(),
        })
    }

    /// Generate into a fresh run directory under `out_dir`.
    pub fn run(&self) -> Result<GenerationResult, GenerationError> {
        let (run_id, run_dir) = prepare_run_dir(&self.options.out_dir)?;
        self.run_in(run_id, run_dir)
    }

    /// Generate into a run directory created by [`prepare_run_dir`].
    pub fn run_in(
        &self,
        run_id: String,
        run_dir: PathBuf,
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let options_path = run_dir.join("options.json");
        std::fs::write(&options_path, serde_json::to_vec_pretty(&self.options)?)?;

        let mut report = GenerationReport::new(run_id.clone(), &self.options);
        info!(
            run_id = %run_id,
            seed = self.options.seed,
            locale = %self.options.locale,
            max_generations = self.options.max_generations,
            format = %self.options.format,
            "generation started"
        );

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
            || -> Result<(BuiltTree, Vec<Artifact>), GenerationError> {
                let built = self.build()?;
                let artifacts = export(&built.store, self.options.format, &run_dir)?;
                Ok((built, artifacts))
            },
        ));

        report.duration_ms = start.elapsed().as_millis() as u64;
        let report_path = run_dir.join("generation_report.json");
        let write_report = |report: &GenerationReport| -> Result<(), GenerationError> {
            std::fs::write(&report_path, serde_json::to_vec_pretty(report)?)?;
            Ok(())
        };

        match outcome {
            Ok(Ok((built, artifacts))) => {
                fill_report(&mut report, &built, &artifacts)?;
                write_report(&report)?;
                info!(
                    run_id = %run_id,
                    people = report.records.people,
                    families = report.records.families,
                    generations = report.generations,
                    duration_ms = report.duration_ms,
                    bytes_written = report.bytes_written,
                    "generation completed"
                );
                Ok(GenerationResult {
                    run_dir,
                    anchor: built.anchor,
                    report,
                    store: built.store,
                })
            }
            Ok(Err(err)) => {
                report.record_error(err.to_string());
                write_report(&report)?;
                warn!(run_id = %run_id, error = %err, "generation failed");
                Err(err)
            }
            Err(panic) => {
                report.record_error(panic_message(panic));
                write_report(&report)?;
                warn!(run_id = %run_id, "generation panicked");
                Err(GenerationError::Failed(Box::new(report)))
            }
        }
    }
}

/// Create `<out_dir>/<timestamp>__run_<id>` and return the id with the path.
pub fn prepare_run_dir(out_dir: &Path) -> Result<(String, PathBuf), GenerationError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let run_dir = out_dir.join(format!("{timestamp}__run_{run_id}"));
    std::fs::create_dir_all(&run_dir)?;
    Ok((run_id, run_dir))
}

fn fill_report(
    report: &mut GenerationReport,
    built: &BuiltTree,
    artifacts: &[Artifact],
) -> Result<(), GenerationError> {
    report.anchor = Some(built.anchor.to_string());
    report.records = StoreStats::from_store(&built.store);
    report.generations = ancestor_generations(&built.store, &built.anchor)? as u64;
    report.families_expanded = built.stats.families;
    report.siblings = built.stats.siblings;
    report.unmarried = built.stats.unmarried;
    report.relocations = built.stats.relocations;
    report.media_claimed = built.stats.media_claimed.clone();
    report.pool_misses = built.stats.pool_misses.clone();
    report.media_pool_remaining = built.media_remaining as u64;
    report.transactions = built.store.transactions();
    report.artifacts = artifacts.iter().map(|a| a.file_name.clone()).collect();
    report.bytes_written = artifacts.iter().map(|a| a.bytes).sum();
    Ok(())
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during generation".to_string()
    }
}
