use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use fauxtree_core::{Gender, Handle, Record, RecordStore, Relationship};

use super::{Artifact, CountingWriter, RecordIds};
use crate::errors::GenerationError;

const PEOPLE_HEADER: &[&str] = &[
    "id",
    "handle",
    "gender",
    "first_name",
    "surname",
    "birth_date",
    "death_date",
    "parent_family",
    "families",
];
const FAMILIES_HEADER: &[&str] = &[
    "id",
    "handle",
    "father",
    "mother",
    "relationship",
    "union_year",
    "children",
];
const EVENTS_HEADER: &[&str] = &["id", "handle", "kind", "date", "place", "note", "media"];

/// Write `people.csv`, `families.csv` and `events.csv`.
///
/// References are written as record ids; multi-valued columns are joined
/// with `;`.
pub fn write_tables<S: RecordStore + ?Sized>(
    store: &S,
    run_dir: &Path,
) -> Result<Vec<Artifact>, GenerationError> {
    let ids = RecordIds::assign(store);
    let mut people = Vec::new();
    let mut families = Vec::new();
    let mut events = Vec::new();

    for record in store.records() {
        match record {
            Record::Person(person) => {
                people.push(vec![
                    ids.of(record).to_string(),
                    person.handle.to_string(),
                    match person.gender {
                        Gender::Male => "M".to_string(),
                        Gender::Female => "F".to_string(),
                    },
                    person.name.first_name.clone(),
                    person.name.surname.clone(),
                    event_date(store, person.birth_ref.as_ref())?,
                    event_date(store, person.death_ref.as_ref())?,
                    optional_id(&ids, person.parent_family.as_ref()),
                    joined_ids(&ids, &person.families),
                ]);
            }
            Record::Family(family) => families.push(vec![
                ids.of(record).to_string(),
                family.handle.to_string(),
                optional_id(&ids, family.father.as_ref()),
                optional_id(&ids, family.mother.as_ref()),
                match family.relationship {
                    Relationship::Married => "Married".to_string(),
                    Relationship::Unmarried => "Unmarried".to_string(),
                },
                family
                    .union_year
                    .map(|year| year.to_string())
                    .unwrap_or_default(),
                joined_ids(&ids, &family.children),
            ]),
            Record::Event(event) => events.push(vec![
                ids.of(record).to_string(),
                event.handle.to_string(),
                event.kind.as_str().to_string(),
                event.date.to_string(),
                optional_id(&ids, event.place.as_ref()),
                optional_id(&ids, event.note.as_ref()),
                joined_ids(&ids, &event.media_refs),
            ]),
            _ => {}
        }
    }

    let mut artifacts = Vec::new();
    for (file_name, header, rows) in [
        ("people.csv", PEOPLE_HEADER, people),
        ("families.csv", FAMILIES_HEADER, families),
        ("events.csv", EVENTS_HEADER, events),
    ] {
        let bytes = write_table(&run_dir.join(file_name), header, &rows)?;
        artifacts.push(Artifact {
            file_name: file_name.to_string(),
            bytes,
        });
    }
    Ok(artifacts)
}

fn write_table(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

fn event_date<S: RecordStore + ?Sized>(
    store: &S,
    handle: Option<&Handle>,
) -> Result<String, GenerationError> {
    match handle {
        Some(handle) => Ok(store.event(handle)?.date.to_string()),
        None => Ok(String::new()),
    }
}

fn optional_id(ids: &RecordIds, handle: Option<&Handle>) -> String {
    handle.map(|h| ids.get(h).to_string()).unwrap_or_default()
}

fn joined_ids(ids: &RecordIds, handles: &[Handle]) -> String {
    handles
        .iter()
        .map(|handle| ids.get(handle))
        .collect::<Vec<_>>()
        .join(";")
}
