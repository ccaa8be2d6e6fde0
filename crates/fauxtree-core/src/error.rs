use thiserror::Error;

use crate::handle::Handle;
use crate::model::RecordKind;

/// Core error type shared across fauxtree crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A record with this handle already exists in the store or the batch.
    #[error("duplicate handle: {0}")]
    DuplicateHandle(Handle),
    /// A record references a handle that is absent from the store.
    #[error("record {from} references missing handle {to}")]
    ReferenceNotFound { from: Handle, to: Handle },
    /// Lookup of an unknown handle.
    #[error("record not found: {0}")]
    NotFound(Handle),
    /// The handle exists but points to a different record kind.
    #[error("record {handle} is a {found}, expected {expected}")]
    KindMismatch {
        handle: Handle,
        expected: RecordKind,
        found: RecordKind,
    },
    /// The generated graph breaks one of its invariants.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Convenience alias for results returned by fauxtree crates.
pub type Result<T> = std::result::Result<T, Error>;
