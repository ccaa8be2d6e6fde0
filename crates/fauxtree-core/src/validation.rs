use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::model::{EventKind, Family, Person, Record};
use crate::store::RecordStore;

/// Demographic bounds a graph is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphRules {
    /// Minimum parent age at the start of a union.
    pub age_of_majority: i32,
    /// Years after the mother's birth during which children may be born.
    pub fertility_span: i32,
}

impl Default for GraphRules {
    fn default() -> Self {
        Self {
            age_of_majority: 18,
            fertility_span: 40,
        }
    }
}

/// Validate the chronological and referential invariants of a graph.
///
/// This checks:
/// - every reference resolves to a record of the right kind
/// - each person has one birth event and at most one death event, in order
/// - marriages happen after both parents reach majority and before the
///   family's first child is born
/// - every child is born inside the union's fertile window
/// - no media item is owned by more than one record
pub fn validate_graph<S: RecordStore + ?Sized>(store: &S, rules: &GraphRules) -> Result<()> {
    let mut media_owners: BTreeMap<&Handle, &Handle> = BTreeMap::new();
    let mut media_paths = BTreeSet::new();

    for record in store.records() {
        for (target, expected) in record.references() {
            let found = store.get(target).ok_or_else(|| Error::ReferenceNotFound {
                from: record.handle().clone(),
                to: target.clone(),
            })?;
            if found.kind() != expected {
                return Err(Error::KindMismatch {
                    handle: target.clone(),
                    expected,
                    found: found.kind(),
                });
            }
        }

        for media in record.media_refs() {
            if let Some(owner) = media_owners.insert(media, record.handle()) {
                return Err(Error::Invariant(format!(
                    "media {} claimed by both {} and {}",
                    media,
                    owner,
                    record.handle()
                )));
            }
        }

        match record {
            Record::Person(person) => check_person(store, person)?,
            Record::Family(family) => check_family(store, family, rules)?,
            Record::Media(media) => {
                if !media_paths.insert(media.path.clone()) {
                    return Err(Error::Invariant(format!(
                        "media file {} used by more than one record",
                        media.path.display()
                    )));
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn check_person<S: RecordStore + ?Sized>(store: &S, person: &Person) -> Result<()> {
    let mut births = 0;
    let mut deaths = 0;
    for event in &person.event_refs {
        match store.event(event)?.kind {
            EventKind::Birth => births += 1,
            EventKind::Death => deaths += 1,
            EventKind::Marriage => {}
        }
    }
    if births != 1 || deaths > 1 {
        return Err(Error::Invariant(format!(
            "person {} has {} birth and {} death events",
            person.handle, births, deaths
        )));
    }

    let birth_year = birth_year(store, person)?;
    match &person.death_ref {
        Some(death) => {
            let death_event = store.event(death)?;
            if death_event.kind != EventKind::Death || !person.event_refs.contains(death) {
                return Err(Error::Invariant(format!(
                    "person {} death reference is not one of its death events",
                    person.handle
                )));
            }
            if death_event.date.year < birth_year {
                return Err(Error::Invariant(format!(
                    "person {} dies in {} before birth in {}",
                    person.handle, death_event.date.year, birth_year
                )));
            }
        }
        None if deaths > 0 => {
            return Err(Error::Invariant(format!(
                "person {} has a death event but no death reference",
                person.handle
            )));
        }
        None => {}
    }
    Ok(())
}

fn check_family<S: RecordStore + ?Sized>(
    store: &S,
    family: &Family,
    rules: &GraphRules,
) -> Result<()> {
    let father = family.father.as_ref().map(|h| store.person(h)).transpose()?;
    let mother = family.mother.as_ref().map(|h| store.person(h)).transpose()?;

    let marriage_year = family
        .event_refs
        .iter()
        .map(|h| store.event(h))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .find(|event| event.kind == EventKind::Marriage)
        .map(|event| event.date.year);

    if let (Some(father), Some(mother), Some(year)) = (father, mother, marriage_year) {
        let floor = birth_year(store, father)?.max(birth_year(store, mother)?) + rules.age_of_majority;
        if year < floor {
            return Err(Error::Invariant(format!(
                "family {} married in {} before both parents reached majority ({})",
                family.handle, year, floor
            )));
        }
        if let Some(first) = family.children.first() {
            let first_birth = birth_year(store, store.person(first)?)?;
            if year >= first_birth {
                return Err(Error::Invariant(format!(
                    "family {} married in {} but first child was born in {}",
                    family.handle, year, first_birth
                )));
            }
        }
    }

    let union_year = family.union_year.or(marriage_year);
    let mut ceiling = i32::MAX;
    if let Some(mother) = mother {
        ceiling = ceiling.min(birth_year(store, mother)? + rules.fertility_span);
        if let Some(death) = death_year(store, mother)? {
            ceiling = ceiling.min(death - 2);
        }
    }
    if let Some(father) = father {
        if let Some(death) = death_year(store, father)? {
            ceiling = ceiling.min(death - 1);
        }
    }

    for child in &family.children {
        let child = store.person(child)?;
        if child.parent_family.as_ref() != Some(&family.handle) {
            return Err(Error::Invariant(format!(
                "child {} of family {} does not point back to it",
                child.handle, family.handle
            )));
        }
        let year = birth_year(store, child)?;
        if let Some(union_year) = union_year
            && year < union_year + 1
        {
            return Err(Error::Invariant(format!(
                "child {} born in {} before union of family {} in {}",
                child.handle, year, family.handle, union_year
            )));
        }
        if year > ceiling {
            return Err(Error::Invariant(format!(
                "child {} born in {} after family {} limit {}",
                child.handle, year, family.handle, ceiling
            )));
        }
    }

    Ok(())
}

fn birth_year<S: RecordStore + ?Sized>(store: &S, person: &Person) -> Result<i32> {
    let birth = person.birth_ref.as_ref().ok_or_else(|| {
        Error::Invariant(format!("person {} has no birth reference", person.handle))
    })?;
    let event = store.event(birth)?;
    if event.kind != EventKind::Birth {
        return Err(Error::Invariant(format!(
            "person {} birth reference points to a {} event",
            person.handle,
            event.kind.as_str()
        )));
    }
    Ok(event.date.year)
}

fn death_year<S: RecordStore + ?Sized>(store: &S, person: &Person) -> Result<Option<i32>> {
    person
        .death_ref
        .as_ref()
        .map(|death| store.event(death).map(|event| event.date.year))
        .transpose()
}

/// Number of ancestor generations recorded above `handle`.
pub fn ancestor_generations<S: RecordStore + ?Sized>(store: &S, handle: &Handle) -> Result<usize> {
    let person = store.person(handle)?;
    let Some(family) = &person.parent_family else {
        return Ok(0);
    };
    let family = store.family(family)?;
    let mut deepest = 0;
    for parent in family.father.iter().chain(family.mother.iter()) {
        deepest = deepest.max(ancestor_generations(store, parent)?);
    }
    Ok(deepest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Date, Event, Gender, Name, Relationship};
    use crate::store::MemoryStore;

    fn event(handle: &str, kind: EventKind, year: i32) -> Event {
        Event {
            handle: Handle::new(handle),
            kind,
            date: Date::year_only(year),
            place: None,
            note: None,
            media_refs: Vec::new(),
        }
    }

    fn person(handle: &str, gender: Gender, birth: &str, death: Option<&str>) -> Person {
        let mut event_refs = vec![Handle::new(birth)];
        event_refs.extend(death.map(Handle::new));
        Person {
            handle: Handle::new(handle),
            gender,
            name: Name {
                first_name: handle.to_string(),
                surname: "Doe".to_string(),
            },
            event_refs,
            birth_ref: Some(Handle::new(birth)),
            death_ref: death.map(Handle::new),
            parent_family: None,
            families: Vec::new(),
            media_refs: Vec::new(),
            note_refs: Vec::new(),
        }
    }

    fn family_store(marriage_year: i32, child_year: i32) -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .transact("Add family", |txn| {
                txn.add(event("eb_dad", EventKind::Birth, 1900))?;
                txn.add(event("ed_dad", EventKind::Death, 1970))?;
                txn.add(event("eb_mom", EventKind::Birth, 1902))?;
                txn.add(event("ed_mom", EventKind::Death, 1975))?;
                txn.add(event("eb_kid", EventKind::Birth, child_year))?;
                txn.add(event("em", EventKind::Marriage, marriage_year))?;
                let mut dad = person("dad", Gender::Male, "eb_dad", Some("ed_dad"));
                dad.families.push(Handle::new("fam"));
                let mut mom = person("mom", Gender::Female, "eb_mom", Some("ed_mom"));
                mom.families.push(Handle::new("fam"));
                let mut kid = person("kid", Gender::Female, "eb_kid", None);
                kid.parent_family = Some(Handle::new("fam"));
                txn.add(dad)?;
                txn.add(mom)?;
                txn.add(kid)?;
                txn.add(Family {
                    handle: Handle::new("fam"),
                    father: Some(Handle::new("dad")),
                    mother: Some(Handle::new("mom")),
                    relationship: Relationship::Married,
                    union_year: Some(marriage_year),
                    children: vec![Handle::new("kid")],
                    event_refs: vec![Handle::new("em")],
                    media_refs: Vec::new(),
                })
            })
            .expect("build store");
        store
    }

    #[test]
    fn accepts_consistent_family() {
        let store = family_store(1925, 1930);
        validate_graph(&store, &GraphRules::default()).expect("valid graph");
        assert_eq!(
            ancestor_generations(&store, &Handle::new("kid")).expect("depth"),
            1
        );
    }

    #[test]
    fn rejects_marriage_before_majority() {
        let store = family_store(1915, 1930);
        let err = validate_graph(&store, &GraphRules::default()).expect_err("invalid");
        assert!(err.to_string().contains("majority"), "{err}");
    }

    #[test]
    fn rejects_child_after_fertility_window() {
        let store = family_store(1925, 1943);
        let err = validate_graph(&store, &GraphRules::default()).expect_err("invalid");
        assert!(err.to_string().contains("limit"), "{err}");
    }

    #[test]
    fn rejects_first_child_before_marriage() {
        let store = family_store(1930, 1930);
        assert!(validate_graph(&store, &GraphRules::default()).is_err());
    }
}
