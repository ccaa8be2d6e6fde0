//! Export adapters for a finished store.

mod csv;
mod gramps;
mod json;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use fauxtree_core::{Handle, Record, RecordKind, RecordStore};

use crate::errors::GenerationError;
use crate::model::ExportFormat;

pub use self::csv::write_tables;
pub use self::gramps::write_gramps;
pub use self::json::write_snapshot;

/// A file written into the run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: u64,
}

/// Write `store` in `format` under `run_dir`.
pub fn export<S: RecordStore + ?Sized>(
    store: &S,
    format: ExportFormat,
    run_dir: &Path,
) -> Result<Vec<Artifact>, GenerationError> {
    match format {
        ExportFormat::Gramps => {
            let file_name = "tree.gramps";
            let bytes = write_gramps(store, &run_dir.join(file_name))?;
            Ok(vec![Artifact {
                file_name: file_name.to_string(),
                bytes,
            }])
        }
        ExportFormat::Json => {
            let file_name = "graph.json";
            let bytes = write_snapshot(store, &run_dir.join(file_name))?;
            Ok(vec![Artifact {
                file_name: file_name.to_string(),
                bytes,
            }])
        }
        ExportFormat::Csv => write_tables(store, run_dir),
    }
}

/// Gramps-style ids (`I0000`, `F0000`, ...) in store insertion order.
#[derive(Debug, Default)]
pub(crate) struct RecordIds {
    ids: BTreeMap<Handle, String>,
}

impl RecordIds {
    pub(crate) fn assign<S: RecordStore + ?Sized>(store: &S) -> Self {
        let mut counters: BTreeMap<RecordKind, usize> = BTreeMap::new();
        let mut ids = BTreeMap::new();
        for record in store.records() {
            let kind = record.kind();
            let counter = counters.entry(kind).or_insert(0);
            ids.insert(
                record.handle().clone(),
                format!("{}{:04}", id_prefix(kind), counter),
            );
            *counter += 1;
        }
        Self { ids }
    }

    pub(crate) fn get(&self, handle: &Handle) -> &str {
        self.ids.get(handle).map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn of(&self, record: &Record) -> &str {
        self.get(record.handle())
    }
}

fn id_prefix(kind: RecordKind) -> char {
    match kind {
        RecordKind::Person => 'I',
        RecordKind::Family => 'F',
        RecordKind::Event => 'E',
        RecordKind::Place => 'P',
        RecordKind::Media => 'O',
        RecordKind::Note => 'N',
    }
}

pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fauxtree_core::{MemoryStore, Note};

    #[test]
    fn ids_follow_insertion_order_per_kind() {
        let mut store = MemoryStore::new();
        store
            .transact("Add notes", |txn| {
                for handle in ["n-b", "n-a"] {
                    txn.add(Note {
                        handle: Handle::new(handle),
                        text: String::new(),
                    })?;
                }
                Ok::<(), fauxtree_core::Error>(())
            })
            .expect("store notes");

        let ids = RecordIds::assign(&store);
        assert_eq!(ids.get(&Handle::new("n-b")), "N0000");
        assert_eq!(ids.get(&Handle::new("n-a")), "N0001");
        assert_eq!(ids.get(&Handle::new("missing")), "");
    }
}
