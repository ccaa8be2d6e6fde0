//! Constrained random genealogy generator for fauxtree.
//!
//! This crate grows a multi-generation family tree from a single anchor
//! person into a record store, drawing names, places and portraits from
//! seeded sources, and exports the finished store as Gramps XML, JSON or CSV.

pub mod assets;
pub mod builder;
pub mod engine;
pub mod errors;
pub mod factory;
pub mod locale;
pub mod model;
pub mod output;
pub mod pools;
pub mod primitives;

pub use builder::{BuildStats, TreeBuilder};
pub use engine::{BuiltTree, GenerationEngine, GenerationResult, prepare_run_dir};
pub use errors::{GenerationError, PoolExhausted};
pub use model::{
    Band, EraThresholds, Eras, ExportFormat, Features, GenerateOptions, GenerationReport,
};
pub use locale::{FakerLocale, Locale, LocaleKey, PlaceSeed};
pub use output::{Artifact, export};
pub use pools::{MediaAsset, MediaPool, MediaQuery, PlacePool, Resources};
