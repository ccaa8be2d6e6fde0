use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::handle::Handle;
use crate::model::{Event, Family, Media, Note, Person, Place, Record};
use crate::store::RecordStore;

/// Serializable view of a whole store, grouped by record kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GraphSnapshot {
    /// Contract version for this snapshot format.
    pub snapshot_version: String,
    /// Handle of the anchor person.
    pub default_person: Option<Handle>,
    pub people: Vec<Person>,
    pub families: Vec<Family>,
    pub events: Vec<Event>,
    pub places: Vec<Place>,
    pub media: Vec<Media>,
    pub notes: Vec<Note>,
}

impl GraphSnapshot {
    pub fn from_store<S: RecordStore + ?Sized>(store: &S) -> Self {
        let mut snapshot = Self {
            snapshot_version: crate::SNAPSHOT_VERSION.to_string(),
            default_person: store.default_person().cloned(),
            people: Vec::new(),
            families: Vec::new(),
            events: Vec::new(),
            places: Vec::new(),
            media: Vec::new(),
            notes: Vec::new(),
        };
        for record in store.records() {
            match record {
                Record::Person(person) => snapshot.people.push(person.clone()),
                Record::Family(family) => snapshot.families.push(family.clone()),
                Record::Event(event) => snapshot.events.push(event.clone()),
                Record::Place(place) => snapshot.places.push(place.clone()),
                Record::Media(media) => snapshot.media.push(media.clone()),
                Record::Note(note) => snapshot.notes.push(note.clone()),
            }
        }
        snapshot
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            people: self.people.len() as u64,
            families: self.families.len() as u64,
            events: self.events.len() as u64,
            places: self.places.len() as u64,
            media: self.media.len() as u64,
            notes: self.notes.len() as u64,
        }
    }
}

/// Record counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoreStats {
    pub people: u64,
    pub families: u64,
    pub events: u64,
    pub places: u64,
    pub media: u64,
    pub notes: u64,
}

impl StoreStats {
    pub fn from_store<S: RecordStore + ?Sized>(store: &S) -> Self {
        let mut stats = Self::default();
        for record in store.records() {
            match record {
                Record::Person(_) => stats.people += 1,
                Record::Family(_) => stats.families += 1,
                Record::Event(_) => stats.events += 1,
                Record::Place(_) => stats.places += 1,
                Record::Media(_) => stats.media += 1,
                Record::Note(_) => stats.notes += 1,
            }
        }
        stats
    }
}
