use std::fmt;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::handle::Handle;

/// Binary gender as recorded on a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Primary name of a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Name {
    pub first_name: String,
    pub surname: String,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.surname)
    }
}

/// Calendar date. The year is always present; month and day only when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Date {
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl Date {
    pub fn year_only(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
        }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.month, self.day) {
            (Some(month), Some(day)) => write!(f, "{:04}-{:02}-{:02}", self.year, month, day),
            (Some(month), None) => write!(f, "{:04}-{:02}", self.year, month),
            _ => write!(f, "{:04}", self.year),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Birth,
    Death,
    Marriage,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Birth => "Birth",
            Self::Death => "Death",
            Self::Marriage => "Marriage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlaceType {
    City,
    Hamlet,
    Locality,
    Municipality,
    Village,
    Town,
}

impl PlaceType {
    pub const ALL: [PlaceType; 6] = [
        PlaceType::City,
        PlaceType::Hamlet,
        PlaceType::Locality,
        PlaceType::Municipality,
        PlaceType::Village,
        PlaceType::Town,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::City => "City",
            Self::Hamlet => "Hamlet",
            Self::Locality => "Locality",
            Self::Municipality => "Municipality",
            Self::Village => "Village",
            Self::Town => "Town",
        }
    }
}

/// What a media item depicts. Maps to the pool's top-level folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    PersonPortrait,
    FamilyPortrait,
    WeddingPortrait,
}

impl MediaCategory {
    pub const ALL: [MediaCategory; 3] = [
        MediaCategory::PersonPortrait,
        MediaCategory::FamilyPortrait,
        MediaCategory::WeddingPortrait,
    ];

    pub fn folder(self) -> &'static str {
        match self {
            Self::PersonPortrait => "people",
            Self::FamilyPortrait => "family",
            Self::WeddingPortrait => "wedding",
        }
    }

    pub fn from_folder(value: &str) -> Option<Self> {
        match value {
            "people" => Some(Self::PersonPortrait),
            "family" => Some(Self::FamilyPortrait),
            "wedding" => Some(Self::WeddingPortrait),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Color,
    Grayscale,
}

impl Tone {
    pub fn folder(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Grayscale => "grayscale",
        }
    }

    pub fn from_folder(value: &str) -> Option<Self> {
        match value {
            "color" => Some(Self::Color),
            "grayscale" => Some(Self::Grayscale),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Married,
    Unmarried,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Person {
    pub handle: Handle,
    pub gender: Gender,
    pub name: Name,
    /// Ordered event references; birth and death are designated below.
    pub event_refs: Vec<Handle>,
    pub birth_ref: Option<Handle>,
    pub death_ref: Option<Handle>,
    pub parent_family: Option<Handle>,
    /// Families in which this person is a parent.
    pub families: Vec<Handle>,
    pub media_refs: Vec<Handle>,
    pub note_refs: Vec<Handle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Family {
    pub handle: Handle,
    pub father: Option<Handle>,
    pub mother: Option<Handle>,
    pub relationship: Relationship,
    /// Year the union began. Set for unmarried couples too, where no
    /// marriage event exists.
    pub union_year: Option<i32>,
    /// Children in insertion order. The first child is the one the family
    /// was created for.
    pub children: Vec<Handle>,
    pub event_refs: Vec<Handle>,
    pub media_refs: Vec<Handle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    pub handle: Handle,
    pub kind: EventKind,
    pub date: Date,
    pub place: Option<Handle>,
    pub note: Option<Handle>,
    pub media_refs: Vec<Handle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Place {
    pub handle: Handle,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub place_type: PlaceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Media {
    pub handle: Handle,
    pub path: PathBuf,
    /// Hex-encoded SHA-256 of the file contents.
    pub checksum: String,
    pub mime_type: String,
    pub category: MediaCategory,
    pub tone: Tone,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Note {
    pub handle: Handle,
    pub text: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Person,
    Family,
    Event,
    Place,
    Media,
    Note,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Family => "family",
            Self::Event => "event",
            Self::Place => "place",
            Self::Media => "media",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any record the store can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Person(Person),
    Family(Family),
    Event(Event),
    Place(Place),
    Media(Media),
    Note(Note),
}

impl Record {
    pub fn handle(&self) -> &Handle {
        match self {
            Record::Person(person) => &person.handle,
            Record::Family(family) => &family.handle,
            Record::Event(event) => &event.handle,
            Record::Place(place) => &place.handle,
            Record::Media(media) => &media.handle,
            Record::Note(note) => &note.handle,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Person(_) => RecordKind::Person,
            Record::Family(_) => RecordKind::Family,
            Record::Event(_) => RecordKind::Event,
            Record::Place(_) => RecordKind::Place,
            Record::Media(_) => RecordKind::Media,
            Record::Note(_) => RecordKind::Note,
        }
    }

    /// Every handle this record points at, with the kind it must resolve to.
    pub fn references(&self) -> Vec<(&Handle, RecordKind)> {
        let mut refs = Vec::new();
        match self {
            Record::Person(person) => {
                refs.extend(person.event_refs.iter().map(|h| (h, RecordKind::Event)));
                refs.extend(person.birth_ref.iter().map(|h| (h, RecordKind::Event)));
                refs.extend(person.death_ref.iter().map(|h| (h, RecordKind::Event)));
                refs.extend(person.parent_family.iter().map(|h| (h, RecordKind::Family)));
                refs.extend(person.families.iter().map(|h| (h, RecordKind::Family)));
                refs.extend(person.media_refs.iter().map(|h| (h, RecordKind::Media)));
                refs.extend(person.note_refs.iter().map(|h| (h, RecordKind::Note)));
            }
            Record::Family(family) => {
                refs.extend(family.father.iter().map(|h| (h, RecordKind::Person)));
                refs.extend(family.mother.iter().map(|h| (h, RecordKind::Person)));
                refs.extend(family.children.iter().map(|h| (h, RecordKind::Person)));
                refs.extend(family.event_refs.iter().map(|h| (h, RecordKind::Event)));
                refs.extend(family.media_refs.iter().map(|h| (h, RecordKind::Media)));
            }
            Record::Event(event) => {
                refs.extend(event.place.iter().map(|h| (h, RecordKind::Place)));
                refs.extend(event.note.iter().map(|h| (h, RecordKind::Note)));
                refs.extend(event.media_refs.iter().map(|h| (h, RecordKind::Media)));
            }
            Record::Place(_) | Record::Media(_) | Record::Note(_) => {}
        }
        refs
    }

    /// Media handles owned by this record (each may be owned only once).
    pub fn media_refs(&self) -> &[Handle] {
        match self {
            Record::Person(person) => &person.media_refs,
            Record::Family(family) => &family.media_refs,
            Record::Event(event) => &event.media_refs,
            Record::Place(_) | Record::Media(_) | Record::Note(_) => &[],
        }
    }
}

macro_rules! record_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Record {
                fn from(value: $variant) -> Self {
                    Record::$variant(value)
                }
            }
        )*
    };
}

record_from!(Person, Family, Event, Place, Media, Note);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_display_pads_components() {
        assert_eq!(Date::ymd(1901, 3, 7).to_string(), "1901-03-07");
        assert_eq!(Date::year_only(812).to_string(), "0812");
    }

    #[test]
    fn family_references_cover_parents_and_children() {
        let family = Family {
            handle: Handle::new("f"),
            father: Some(Handle::new("dad")),
            mother: None,
            relationship: Relationship::Married,
            union_year: Some(1950),
            children: vec![Handle::new("kid")],
            event_refs: vec![Handle::new("wed")],
            media_refs: Vec::new(),
        };
        let record = Record::from(family);
        let refs: Vec<_> = record
            .references()
            .into_iter()
            .map(|(handle, kind)| (handle.as_str().to_string(), kind))
            .collect();
        assert_eq!(
            refs,
            vec![
                ("dad".to_string(), RecordKind::Person),
                ("kid".to_string(), RecordKind::Person),
                ("wed".to_string(), RecordKind::Event),
            ]
        );
    }

    #[test]
    fn media_category_round_trips_folder_names() {
        for category in MediaCategory::ALL {
            assert_eq!(MediaCategory::from_folder(category.folder()), Some(category));
        }
        assert_eq!(MediaCategory::from_folder("pets"), None);
    }
}
