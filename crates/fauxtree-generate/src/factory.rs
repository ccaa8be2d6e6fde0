use fauxtree_core::{
    Date, Event, EventKind, Family, Gender, Handle, Media, Name, Note, Person, Place, PlaceType,
    Relationship,
};
use rand::RngCore;

use crate::locale::PlaceSeed;
use crate::pools::MediaAsset;
use crate::primitives::random_handle;

/// Mints records with fresh handles. Never touches the store.
pub struct EntityFactory;

impl EntityFactory {
    pub fn person(rng: &mut dyn RngCore, gender: Gender, name: Name) -> Person {
        Person {
            handle: random_handle(rng),
            gender,
            name,
            event_refs: Vec::new(),
            birth_ref: None,
            death_ref: None,
            parent_family: None,
            families: Vec::new(),
            media_refs: Vec::new(),
            note_refs: Vec::new(),
        }
    }

    pub fn family(rng: &mut dyn RngCore, relationship: Relationship) -> Family {
        Family {
            handle: random_handle(rng),
            father: None,
            mother: None,
            relationship,
            union_year: None,
            children: Vec::new(),
            event_refs: Vec::new(),
            media_refs: Vec::new(),
        }
    }

    pub fn event(
        rng: &mut dyn RngCore,
        kind: EventKind,
        date: Date,
        place: Option<Handle>,
    ) -> Event {
        Event {
            handle: random_handle(rng),
            kind,
            date,
            place,
            note: None,
            media_refs: Vec::new(),
        }
    }

    pub fn note(rng: &mut dyn RngCore, text: String) -> Note {
        Note {
            handle: random_handle(rng),
            text,
        }
    }

    pub fn media(rng: &mut dyn RngCore, asset: MediaAsset, caption: String) -> Media {
        Media {
            handle: random_handle(rng),
            path: asset.path,
            checksum: asset.checksum,
            mime_type: asset.mime_type,
            category: asset.category,
            tone: asset.tone,
            caption,
        }
    }

    pub fn place(rng: &mut dyn RngCore, seed: PlaceSeed, place_type: PlaceType) -> Place {
        Place {
            handle: random_handle(rng),
            name: seed.name,
            latitude: seed.latitude,
            longitude: seed.longitude,
            place_type,
        }
    }
}

pub fn push_event(person: &mut Person, event: &Event) {
    person.event_refs.push(event.handle.clone());
}

pub fn set_birth(person: &mut Person, event: &Event) {
    push_event(person, event);
    person.birth_ref = Some(event.handle.clone());
}

pub fn set_death(person: &mut Person, event: &Event) {
    push_event(person, event);
    person.death_ref = Some(event.handle.clone());
}

/// Append `child` to the family and point the child back at it.
pub fn add_child(family: &mut Family, child: &mut Person) {
    family.children.push(child.handle.clone());
    child.parent_family = Some(family.handle.clone());
}

pub fn set_father(family: &mut Family, father: &mut Person) {
    family.father = Some(father.handle.clone());
    father.families.push(family.handle.clone());
}

pub fn set_mother(family: &mut Family, mother: &mut Person) {
    family.mother = Some(mother.handle.clone());
    mother.families.push(family.handle.clone());
}

pub fn add_family_event(family: &mut Family, event: &Event) {
    family.event_refs.push(event.handle.clone());
}

pub fn add_note(person: &mut Person, note: &Note) {
    person.note_refs.push(note.handle.clone());
}

/// Records that can carry media references.
pub trait MediaOwner {
    fn media_refs_mut(&mut self) -> &mut Vec<Handle>;
}

impl MediaOwner for Person {
    fn media_refs_mut(&mut self) -> &mut Vec<Handle> {
        &mut self.media_refs
    }
}

impl MediaOwner for Family {
    fn media_refs_mut(&mut self) -> &mut Vec<Handle> {
        &mut self.media_refs
    }
}

impl MediaOwner for Event {
    fn media_refs_mut(&mut self) -> &mut Vec<Handle> {
        &mut self.media_refs
    }
}

pub fn add_media(owner: &mut impl MediaOwner, media: &Media) {
    owner.media_refs_mut().push(media.handle.clone());
}
