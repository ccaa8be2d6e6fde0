use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use fauxtree_core::{GraphSnapshot, RecordStore};

use super::CountingWriter;
use crate::errors::GenerationError;

/// Write the whole store as a pretty-printed [`GraphSnapshot`].
pub fn write_snapshot<S: RecordStore + ?Sized>(
    store: &S,
    path: &Path,
) -> Result<u64, GenerationError> {
    let snapshot = GraphSnapshot::from_store(store);
    let mut writer = CountingWriter::new(BufWriter::new(File::create(path)?));
    serde_json::to_writer_pretty(&mut writer, &snapshot)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(writer.bytes_written())
}
