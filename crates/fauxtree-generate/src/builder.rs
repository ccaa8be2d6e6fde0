//! Recursive ancestor expansion.
//!
//! The builder starts from one anchor person and walks upwards: every
//! expansion creates the person's parents, their union and a run of siblings,
//! then recurses into each parent with a probability that decays with depth.
//! Each logical step lands in the store as one transaction.

use std::collections::BTreeMap;

use fauxtree_core::{
    Date, Event, EventKind, Family, Gender, Handle, MediaCategory, Name, Note, Person, Record,
    RecordStore, Relationship, Tone,
};
use rand::{Rng, RngCore};
use tracing::debug;

use crate::errors::GenerationError;
use crate::factory::{self, EntityFactory, MediaOwner};
use crate::locale::Locale;
use crate::model::{Band, GenerateOptions};
use crate::pools::{MediaQuery, Resources};
use crate::primitives::{generation_decay, random_age, random_bool, random_gender, random_year};

/// Counters collected while building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub families: u64,
    pub siblings: u64,
    pub unmarried: u64,
    pub relocations: u64,
    pub media_claimed: BTreeMap<String, u64>,
    pub pool_misses: BTreeMap<String, u64>,
    /// Deepest ancestor generation created above the anchor.
    pub deepest: u32,
}

/// Records staged for the next transaction, in insertion order.
#[derive(Debug, Default)]
struct Pending {
    records: Vec<Record>,
}

impl Pending {
    fn push(&mut self, record: impl Into<Record>) {
        self.records.push(record.into());
    }

    fn into_records(self) -> Vec<Record> {
        self.records
    }
}

pub struct TreeBuilder<'a, S: RecordStore> {
    options: &'a GenerateOptions,
    locale: &'a dyn Locale,
    resources: &'a mut Resources,
    store: &'a mut S,
    rng: &'a mut dyn RngCore,
    current_year: i32,
    stats: BuildStats,
}

impl<'a, S: RecordStore> TreeBuilder<'a, S> {
    pub fn new(
        options: &'a GenerateOptions,
        locale: &'a dyn Locale,
        resources: &'a mut Resources,
        store: &'a mut S,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            options,
            locale,
            resources,
            store,
            rng,
            current_year: options.resolved_current_year(),
            stats: BuildStats::default(),
        }
    }

    pub fn into_stats(self) -> BuildStats {
        self.stats
    }

    /// Seed places, create the anchor and expand its ancestry.
    pub fn build(&mut self) -> Result<Handle, GenerationError> {
        if self.options.features.places {
            let count = self.options.num_places;
            let places = self
                .resources
                .seed_places(self.locale, count, &mut *self.rng);
            if !places.is_empty() {
                let records = places.into_iter().map(Record::from).collect();
                self.apply("Add places", records, Vec::new())?;
            }
            debug!(places = self.resources.places().len(), "place pool seeded");
        }

        let anchor = self.build_start_person()?;
        if self.options.max_generations >= 1 {
            self.expand_family(&anchor, 0)?;
        }
        Ok(anchor)
    }

    /// Create the anchor person and make it the store's default person.
    pub fn build_start_person(&mut self) -> Result<Handle, GenerationError> {
        let mut pending = Pending::default();
        let gender = random_gender(&mut *self.rng);
        let name = Name {
            first_name: self.locale.first_name(gender, &mut *self.rng),
            surname: self.locale.surname(&mut *self.rng),
        };
        let mut person = EntityFactory::person(&mut *self.rng, gender, name);

        let band = self.options.anchor_birth_years;
        let year = random_year(&mut *self.rng, "anchor_birth_years", band.min, band.max)?;
        let place = self.resources.pick_place(&mut *self.rng);
        let birth = self.life_event(EventKind::Birth, year, place, &mut pending)?;
        factory::set_birth(&mut person, &birth);
        pending.push(birth);

        if self.options.features.notes {
            let note = self.note()?;
            factory::add_note(&mut person, &note);
            pending.push(note);
        }
        let caption = person.name.to_string();
        self.attach_media(
            &mut person,
            MediaCategory::PersonPortrait,
            Some(Tone::Color),
            caption,
            &mut pending,
        );

        let handle = person.handle.clone();
        pending.push(person);
        self.apply("Add start person", pending.into_records(), Vec::new())?;
        self.store.set_default_person(handle.clone())?;
        debug!(anchor = %handle, birth_year = year, "start person created");
        Ok(handle)
    }

    /// Create the parents, union and siblings of `handle`, then recurse.
    pub fn expand_family(&mut self, handle: &Handle, depth: u32) -> Result<(), GenerationError> {
        let mut person = self.store.person(handle)?.clone();
        if person.parent_family.is_some() {
            return Err(GenerationError::InvalidState(format!(
                "person {handle} already has a parental family"
            )));
        }
        let (child_year, inherited) = {
            let birth = person.birth_ref.as_ref().ok_or_else(|| {
                GenerationError::InvalidState(format!("person {handle} has no birth event"))
            })?;
            let birth = self.store.event(birth)?;
            (birth.date.year, birth.place.clone())
        };

        let options = self.options;
        let mut pending = Pending::default();
        let mut family = EntityFactory::family(&mut *self.rng, Relationship::Married);
        factory::add_child(&mut family, &mut person);

        let parent_age = options.parent_age;
        let surname = person.name.surname.clone();
        let father_birth = random_year(
            &mut *self.rng,
            "father birth year",
            child_year - parent_age.max,
            child_year - parent_age.min,
        )?;
        let mut father = self.parent(
            Gender::Male,
            surname.clone(),
            father_birth,
            inherited.clone(),
            &mut pending,
        )?;

        let mother_surname = self.locale.surname(&mut *self.rng);
        let mother_birth = random_year(
            &mut *self.rng,
            "mother birth year",
            child_year - parent_age.max,
            child_year - parent_age.min,
        )?;
        let mut mother = self.parent(
            Gender::Female,
            mother_surname,
            mother_birth,
            inherited.clone(),
            &mut pending,
        )?;

        let marriage_year = random_year(
            &mut *self.rng,
            "marriage year",
            father_birth.max(mother_birth) + options.age_of_majority,
            child_year - 1,
        )?;
        let unmarried = random_bool(&mut *self.rng, options.prob_unmarried)?;
        family.union_year = Some(marriage_year);
        if unmarried {
            family.relationship = Relationship::Unmarried;
            self.stats.unmarried += 1;
        }

        // Both parents outlive the anchor child's birth, so the child always
        // fits under the sibling ceilings.
        let father_death = father_birth
            + self.death_age(
                "father death age",
                (marriage_year - father_birth + 1).max(child_year + 1 - father_birth),
            )?;
        let mother_death = mother_birth
            + self.death_age(
                "mother death age",
                (marriage_year - mother_birth + 1).max(child_year + 2 - mother_birth),
            )?;
        for (parent, year) in [(&mut father, father_death), (&mut mother, mother_death)] {
            let death = self.life_event(EventKind::Death, year, inherited.clone(), &mut pending)?;
            factory::set_death(parent, &death);
            pending.push(death);
        }

        factory::set_father(&mut family, &mut father);
        factory::set_mother(&mut family, &mut mother);

        let family_caption = format!("{} & {}", father.name, mother.name);
        self.attach_media(
            &mut family,
            MediaCategory::FamilyPortrait,
            options.eras.family.tone_for(marriage_year),
            family_caption,
            &mut pending,
        );

        if !unmarried {
            let mut marriage =
                self.life_event(EventKind::Marriage, marriage_year, None, &mut pending)?;
            let caption = format!("Wedding of {} and {}", father.name, mother.name);
            self.attach_media(
                &mut marriage,
                MediaCategory::WeddingPortrait,
                options.eras.wedding.tone_for(marriage_year),
                caption,
                &mut pending,
            );
            factory::add_family_event(&mut family, &marriage);
            pending.push(marriage);
        }

        let father_handle = father.handle.clone();
        let mother_handle = mother.handle.clone();
        pending.push(father);
        pending.push(mother);
        pending.push(family.clone());
        self.apply(
            "Add parents",
            pending.into_records(),
            vec![Record::from(person)],
        )?;
        self.stats.families += 1;
        self.stats.deepest = self.stats.deepest.max(depth + 1);

        let siblings = self.add_siblings(
            &mut family,
            &surname,
            child_year,
            inherited,
            SiblingLimits {
                marriage_year,
                mother_fertile_until: mother_birth + options.fertility_span,
                mother_death,
                father_death,
            },
        )?;

        debug!(
            depth,
            person = %handle,
            family = %family.handle,
            marriage_year,
            unmarried,
            siblings,
            "family expanded"
        );

        let next = generation_decay(depth + 1, options.max_generations);
        for parent in [father_handle, mother_handle] {
            if random_bool(&mut *self.rng, next)? {
                self.expand_family(&parent, depth + 1)?;
            }
        }
        Ok(())
    }

    /// Sibling loop. Returns the number of siblings added.
    fn add_siblings(
        &mut self,
        family: &mut Family,
        surname: &str,
        anchor_year: i32,
        inherited: Option<Handle>,
        limits: SiblingLimits,
    ) -> Result<u32, GenerationError> {
        let options = self.options;
        let draws = self.rng.random_range(0..=options.max_siblings);
        let spacing = options.sibling_spacing;
        let mut year = limits.marriage_year + 1;
        let mut added = 0;

        for _ in 0..draws {
            year += random_year(&mut *self.rng, "sibling_spacing", spacing.min, spacing.max)?;
            if (year - anchor_year).abs() < options.anchor_spacing {
                continue;
            }
            if limits.exceeded(year) {
                break;
            }

            let mut pending = Pending::default();
            let gender = random_gender(&mut *self.rng);
            let name = Name {
                first_name: self.locale.first_name(gender, &mut *self.rng),
                surname: surname.to_string(),
            };
            let mut sibling = EntityFactory::person(&mut *self.rng, gender, name);
            let birth = self.life_event(EventKind::Birth, year, inherited.clone(), &mut pending)?;
            factory::set_birth(&mut sibling, &birth);
            pending.push(birth);

            let death_year = year + random_age(&mut *self.rng, options.death_age)?;
            if death_year < self.current_year {
                let place = self.relocated_or(inherited.clone())?;
                let death = self.life_event(EventKind::Death, death_year, place, &mut pending)?;
                factory::set_death(&mut sibling, &death);
                pending.push(death);
            }
            self.maybe_person_note(&mut sibling, &mut pending)?;

            factory::add_child(family, &mut sibling);
            pending.push(sibling);
            self.apply(
                "Add children",
                pending.into_records(),
                vec![Record::from(family.clone())],
            )?;
            self.stats.siblings += 1;
            added += 1;
        }
        Ok(added)
    }

    /// A parent with birth event, optional note and era portrait.
    fn parent(
        &mut self,
        gender: Gender,
        surname: String,
        birth_year: i32,
        inherited: Option<Handle>,
        pending: &mut Pending,
    ) -> Result<Person, GenerationError> {
        let name = Name {
            first_name: self.locale.first_name(gender, &mut *self.rng),
            surname,
        };
        let mut parent = EntityFactory::person(&mut *self.rng, gender, name);
        let place = self.relocated_or(inherited)?;
        let birth = self.life_event(EventKind::Birth, birth_year, place, pending)?;
        factory::set_birth(&mut parent, &birth);
        pending.push(birth);

        self.maybe_person_note(&mut parent, pending)?;
        let caption = parent.name.to_string();
        let tone = self.options.eras.portrait.tone_for(birth_year);
        self.attach_media(
            &mut parent,
            MediaCategory::PersonPortrait,
            tone,
            caption,
            pending,
        );
        Ok(parent)
    }

    /// Death age whose floor is raised to `floor` years.
    fn death_age(&mut self, what: &str, floor: i32) -> Result<i32, GenerationError> {
        let band = self.options.death_age;
        let floor = band.min.max(floor);
        if floor > band.max {
            return Err(GenerationError::range(what, floor as i64, band.max as i64));
        }
        random_age(&mut *self.rng, Band::new(floor, band.max))
    }

    /// Dated event with an optional event note staged in `pending`.
    fn life_event(
        &mut self,
        kind: EventKind,
        year: i32,
        place: Option<Handle>,
        pending: &mut Pending,
    ) -> Result<Event, GenerationError> {
        let (month, day) = self.locale.calendar_day(year, &mut *self.rng);
        let date = Date::ymd(year, month, day);
        let mut event = EntityFactory::event(&mut *self.rng, kind, date, place);
        if self.options.features.notes
            && random_bool(&mut *self.rng, self.options.prob_event_note)?
        {
            let note = self.note()?;
            event.note = Some(note.handle.clone());
            pending.push(note);
        }
        Ok(event)
    }

    fn maybe_person_note(
        &mut self,
        person: &mut Person,
        pending: &mut Pending,
    ) -> Result<(), GenerationError> {
        if self.options.features.notes
            && random_bool(&mut *self.rng, self.options.prob_person_note)?
        {
            let note = self.note()?;
            factory::add_note(person, &note);
            pending.push(note);
        }
        Ok(())
    }

    fn note(&mut self) -> Result<Note, GenerationError> {
        let band = self.options.note_length;
        let chars = random_year(&mut *self.rng, "note_length", band.min, band.max)?;
        let text = self.locale.note_text(chars.max(0) as usize, &mut *self.rng);
        Ok(EntityFactory::note(&mut *self.rng, text))
    }

    /// The inherited place, or a fresh pool place when a relocation draw hits.
    fn relocated_or(
        &mut self,
        inherited: Option<Handle>,
    ) -> Result<Option<Handle>, GenerationError> {
        if !self.options.features.places {
            return Ok(inherited);
        }
        if random_bool(&mut *self.rng, self.options.prob_relocated)? {
            self.stats.relocations += 1;
            return Ok(self.resources.pick_place(&mut *self.rng));
        }
        Ok(inherited)
    }

    /// Claim a matching pool item for `owner`. Pool misses are counted and
    /// otherwise ignored.
    fn attach_media<O: MediaOwner>(
        &mut self,
        owner: &mut O,
        category: MediaCategory,
        tone: Option<Tone>,
        caption: String,
        pending: &mut Pending,
    ) {
        let Some(tone) = tone else {
            return;
        };
        if !self.options.features.media {
            return;
        }
        let query = MediaQuery::new(category, tone);
        match self.resources.claim_media(query, &mut *self.rng) {
            Ok(asset) => {
                let media = EntityFactory::media(&mut *self.rng, asset, caption);
                factory::add_media(owner, &media);
                pending.push(media);
                *self.stats.media_claimed.entry(query.label()).or_insert(0) += 1;
            }
            Err(exhausted) => {
                debug!(%exhausted, "media attachment skipped");
                *self.stats.pool_misses.entry(query.label()).or_insert(0) += 1;
            }
        }
    }

    fn apply(
        &mut self,
        label: &str,
        adds: Vec<Record>,
        commits: Vec<Record>,
    ) -> Result<(), GenerationError> {
        self.store.transact(label, |txn| {
            for record in adds {
                txn.add(record)?;
            }
            for record in commits {
                txn.commit(record)?;
            }
            Ok::<(), GenerationError>(())
        })
    }
}

/// Years past which no further sibling can be born.
#[derive(Debug, Clone, Copy)]
struct SiblingLimits {
    marriage_year: i32,
    mother_fertile_until: i32,
    mother_death: i32,
    father_death: i32,
}

impl SiblingLimits {
    fn exceeded(&self, year: i32) -> bool {
        year > self.mother_fertile_until
            || year > self.mother_death - 2
            || year > self.father_death - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::assets_loader;
    use crate::locale::{FakerLocale, LocaleKey};
    use crate::pools::{MediaAsset, MediaPool};
    use fauxtree_core::{MemoryStore, validate_graph};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::path::PathBuf;

    fn locale() -> FakerLocale {
        FakerLocale::load(LocaleKey::EnUs, "US", assets_loader()).expect("locale")
    }

    fn options() -> GenerateOptions {
        GenerateOptions {
            current_year: Some(2024),
            num_places: 10,
            ..GenerateOptions::default()
        }
    }

    fn media_pool(per_folder: usize) -> MediaPool {
        let mut items = Vec::new();
        for category in MediaCategory::ALL {
            for tone in [Tone::Color, Tone::Grayscale] {
                for index in 0..per_folder {
                    let path = PathBuf::from(format!(
                        "{}/{}/{index:03}.jpg",
                        category.folder(),
                        tone.folder()
                    ));
                    items.push(MediaAsset {
                        checksum: path.display().to_string(),
                        path,
                        mime_type: "image/jpeg".to_string(),
                        category,
                        tone,
                    });
                }
            }
        }
        MediaPool::new(items)
    }

    fn build(
        options: &GenerateOptions,
        resources: &mut Resources,
        seed: u64,
    ) -> Result<(MemoryStore, Handle, BuildStats), GenerationError> {
        let locale = locale();
        let mut store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut builder = TreeBuilder::new(options, &locale, resources, &mut store, &mut rng);
        let anchor = builder.build()?;
        let stats = builder.into_stats();
        Ok((store, anchor, stats))
    }

    #[test]
    fn built_tree_satisfies_graph_rules() {
        let options = options();
        for seed in 0..20 {
            let mut resources = Resources::new(media_pool(3));
            let (store, anchor, stats) = build(&options, &mut resources, seed).expect("build");
            validate_graph(&store, &options.graph_rules()).expect("valid graph");
            assert_eq!(store.default_person(), Some(&anchor));
            assert!(stats.deepest <= options.max_generations);
        }
    }

    #[test]
    fn zero_generations_keeps_only_the_anchor() {
        let options = GenerateOptions {
            max_generations: 0,
            ..options()
        };
        let mut resources = Resources::new(MediaPool::empty());
        let (store, anchor, stats) = build(&options, &mut resources, 3).expect("build");
        let person = store.person(&anchor).expect("anchor");
        assert!(person.parent_family.is_none());
        assert_eq!(stats.families, 0);
    }

    #[test]
    fn expanding_twice_is_invalid_state() {
        let options = GenerateOptions {
            max_generations: 1,
            ..options()
        };
        let locale = locale();
        let mut resources = Resources::new(MediaPool::empty());
        let mut store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut builder = TreeBuilder::new(&options, &locale, &mut resources, &mut store, &mut rng);
        let anchor = builder.build().expect("build");
        let err = builder.expand_family(&anchor, 0).expect_err("second expansion");
        assert!(matches!(err, GenerationError::InvalidState(_)));
    }

    #[test]
    fn inverted_anchor_window_aborts_without_records() {
        let options = GenerateOptions {
            anchor_birth_years: Band::new(2000, 1970),
            features: crate::model::Features {
                places: false,
                ..Default::default()
            },
            ..options()
        };
        let mut resources = Resources::new(MediaPool::empty());
        let locale = locale();
        let mut store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut builder = TreeBuilder::new(&options, &locale, &mut resources, &mut store, &mut rng);
        let err = builder.build().expect_err("inverted window");
        assert!(matches!(err, GenerationError::InvalidRange { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn claimed_media_leaves_the_pool() {
        let options = options();
        let mut resources = Resources::new(media_pool(2));
        let before = resources.media().len();
        let (store, _, stats) = build(&options, &mut resources, 6).expect("build");
        let claimed: u64 = stats.media_claimed.values().sum();
        let stored = store
            .records()
            .filter(|record| matches!(record, Record::Media(_)))
            .count() as u64;
        assert_eq!(claimed, stored);
        assert_eq!(resources.media().len() as u64, before as u64 - claimed);
    }

    #[test]
    fn disabled_features_leave_no_places_media_or_notes() {
        let options = GenerateOptions {
            features: crate::model::Features {
                places: false,
                media: false,
                notes: false,
            },
            ..options()
        };
        let mut resources = Resources::new(media_pool(2));
        let (store, _, stats) = build(&options, &mut resources, 7).expect("build");
        assert!(store.records().all(|record| matches!(
            record,
            Record::Person(_) | Record::Family(_) | Record::Event(_)
        )));
        assert_eq!(stats.relocations, 0);
        assert!(stats.media_claimed.is_empty());
    }

    #[test]
    fn siblings_keep_clear_of_the_anchor_year() {
        let options = GenerateOptions {
            max_generations: 1,
            max_siblings: 12,
            ..options()
        };
        for seed in 0..10 {
            let mut resources = Resources::new(MediaPool::empty());
            let (store, anchor, _) = build(&options, &mut resources, seed).expect("build");
            let person = store.person(&anchor).expect("anchor");
            let anchor_year = birth_year(&store, person);
            let family = store
                .family(person.parent_family.as_ref().expect("family"))
                .expect("family");
            assert_eq!(family.children.first(), Some(&anchor));
            for child in family.children.iter().skip(1) {
                let year = birth_year(&store, store.person(child).expect("child"));
                assert!((year - anchor_year).abs() >= options.anchor_spacing);
            }
        }
    }

    #[test]
    fn without_relocation_every_place_is_the_anchor_birthplace() {
        let options = GenerateOptions {
            prob_relocated: 0.0,
            ..options()
        };
        for seed in 0..10 {
            let mut resources = Resources::new(MediaPool::empty());
            let (store, anchor, stats) = build(&options, &mut resources, seed).expect("build");
            let person = store.person(&anchor).expect("anchor");
            let birth = store
                .event(person.birth_ref.as_ref().expect("birth"))
                .expect("event");
            let home = birth.place.clone().expect("anchor place");
            assert_eq!(stats.relocations, 0);
            for record in store.records() {
                if let Record::Event(event) = record
                    && event.kind != EventKind::Marriage
                {
                    assert_eq!(event.place.as_ref(), Some(&home));
                }
            }
        }
    }

    #[test]
    fn certain_relocation_moves_every_parent() {
        let options = GenerateOptions {
            prob_relocated: 1.0,
            ..options()
        };
        for seed in 0..10 {
            let mut resources = Resources::new(MediaPool::empty());
            let (store, _, stats) = build(&options, &mut resources, seed).expect("build");
            assert!(stats.relocations >= 2 * stats.families);
            for record in store.records() {
                if let Record::Event(event) = record
                    && event.kind == EventKind::Birth
                {
                    assert!(event.place.is_some());
                }
            }
        }
    }

    #[test]
    fn family_portraits_name_both_parents() {
        let options = GenerateOptions {
            max_generations: 2,
            ..options()
        };
        let mut resources = Resources::new(media_pool(4));
        let (store, _, _) = build(&options, &mut resources, 8).expect("build");
        let mut checked = 0;
        for record in store.records() {
            let Record::Family(family) = record else {
                continue;
            };
            let father = store.person(family.father.as_ref().expect("father")).expect("father");
            let mother = store.person(family.mother.as_ref().expect("mother")).expect("mother");
            for media in &family.media_refs {
                let media = store.media(media).expect("media");
                assert_eq!(media.category, MediaCategory::FamilyPortrait);
                assert_eq!(media.caption, format!("{} & {}", father.name, mother.name));
                checked += 1;
            }
        }
        assert!(checked > 0);
    }

    fn birth_year(store: &MemoryStore, person: &Person) -> i32 {
        store
            .event(person.birth_ref.as_ref().expect("birth"))
            .expect("event")
            .date
            .year
    }
}
