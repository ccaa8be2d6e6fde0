//! Core contracts for fauxtree.
//!
//! This crate defines the genealogy record types, the record store contract
//! with its in-memory implementation, and the graph validation helpers shared
//! by the generator, the exporters and the CLI.

pub mod error;
pub mod handle;
pub mod model;
pub mod snapshot;
pub mod store;
pub mod validation;

pub use error::{Error, Result};
pub use handle::Handle;
pub use model::{
    Date, Event, EventKind, Family, Gender, Media, MediaCategory, Name, Note, Person, Place,
    PlaceType, Record, RecordKind, Relationship, Tone,
};
pub use snapshot::{GraphSnapshot, StoreStats};
pub use store::{Batch, MemoryStore, RecordStore, Staged, Transaction};
pub use validation::{GraphRules, ancestor_generations, validate_graph};

/// Current contract version for `graph.json` snapshots.
pub const SNAPSHOT_VERSION: &str = "0.1";
