use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::model::{Event, Family, Media, Note, Person, Place, Record, RecordKind};

/// A staged change inside a transaction.
#[derive(Debug, Clone)]
pub enum Staged {
    /// Insert a record whose handle is new to the store.
    Add(Record),
    /// Replace an existing record with a mutated copy.
    Commit(Record),
}

impl Staged {
    pub fn record(&self) -> &Record {
        match self {
            Staged::Add(record) | Staged::Commit(record) => record,
        }
    }
}

/// A validated group of changes handed to [`RecordStore::apply`].
#[derive(Debug, Clone)]
pub struct Batch {
    pub label: String,
    pub changes: Vec<Staged>,
}

/// Append-only record store.
///
/// Writes only happen through [`Transaction`]s; `apply` receives batches that
/// already passed duplicate and reference checks and must apply them whole.
pub trait RecordStore {
    fn get(&self, handle: &Handle) -> Option<&Record>;

    fn apply(&mut self, batch: Batch) -> Result<()>;

    /// Records in insertion order.
    fn records(&self) -> Box<dyn Iterator<Item = &Record> + '_>;

    fn default_person(&self) -> Option<&Handle>;

    fn set_default_person(&mut self, handle: Handle) -> Result<()>;

    fn contains(&self, handle: &Handle) -> bool {
        self.get(handle).is_some()
    }

    fn lookup(&self, handle: &Handle) -> Result<&Record> {
        self.get(handle)
            .ok_or_else(|| Error::NotFound(handle.clone()))
    }

    fn person(&self, handle: &Handle) -> Result<&Person> {
        match self.lookup(handle)? {
            Record::Person(person) => Ok(person),
            other => Err(mismatch(handle, RecordKind::Person, other)),
        }
    }

    fn family(&self, handle: &Handle) -> Result<&Family> {
        match self.lookup(handle)? {
            Record::Family(family) => Ok(family),
            other => Err(mismatch(handle, RecordKind::Family, other)),
        }
    }

    fn event(&self, handle: &Handle) -> Result<&Event> {
        match self.lookup(handle)? {
            Record::Event(event) => Ok(event),
            other => Err(mismatch(handle, RecordKind::Event, other)),
        }
    }

    fn place(&self, handle: &Handle) -> Result<&Place> {
        match self.lookup(handle)? {
            Record::Place(place) => Ok(place),
            other => Err(mismatch(handle, RecordKind::Place, other)),
        }
    }

    fn media(&self, handle: &Handle) -> Result<&Media> {
        match self.lookup(handle)? {
            Record::Media(media) => Ok(media),
            other => Err(mismatch(handle, RecordKind::Media, other)),
        }
    }

    fn note(&self, handle: &Handle) -> Result<&Note> {
        match self.lookup(handle)? {
            Record::Note(note) => Ok(note),
            other => Err(mismatch(handle, RecordKind::Note, other)),
        }
    }

    fn begin(&mut self, label: &str) -> Transaction<'_, Self>
    where
        Self: Sized,
    {
        Transaction::new(self, label)
    }

    /// Run `f` inside a transaction. The batch is applied only if `f`
    /// returns `Ok`; any other exit discards it.
    fn transact<T, E, F>(&mut self, label: &str, f: F) -> std::result::Result<T, E>
    where
        Self: Sized,
        E: From<Error>,
        F: FnOnce(&mut Transaction<'_, Self>) -> std::result::Result<T, E>,
    {
        let mut txn = self.begin(label);
        let value = f(&mut txn)?;
        txn.finish()?;
        Ok(value)
    }
}

fn mismatch(handle: &Handle, expected: RecordKind, found: &Record) -> Error {
    Error::KindMismatch {
        handle: handle.clone(),
        expected,
        found: found.kind(),
    }
}

/// Scoped write handle over a store.
///
/// Nothing is visible in the store until [`Transaction::finish`] succeeds.
/// Dropping an unfinished transaction discards everything staged in it.
pub struct Transaction<'s, S: RecordStore> {
    store: &'s mut S,
    label: String,
    staged: Vec<Staged>,
    index: BTreeMap<Handle, usize>,
    finished: bool,
}

impl<'s, S: RecordStore> Transaction<'s, S> {
    pub fn new(store: &'s mut S, label: &str) -> Self {
        Self {
            store,
            label: label.to_string(),
            staged: Vec::new(),
            index: BTreeMap::new(),
            finished: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stage a new record.
    pub fn add(&mut self, record: impl Into<Record>) -> Result<()> {
        let record = record.into();
        let handle = record.handle().clone();
        if self.index.contains_key(&handle) || self.store.contains(&handle) {
            return Err(Error::DuplicateHandle(handle));
        }
        self.index.insert(handle, self.staged.len());
        self.staged.push(Staged::Add(record));
        Ok(())
    }

    /// Stage a mutation of a record that was already added.
    pub fn commit(&mut self, record: impl Into<Record>) -> Result<()> {
        let record = record.into();
        let handle = record.handle().clone();

        if let Some(&position) = self.index.get(&handle) {
            let slot = &mut self.staged[position];
            let existing = slot.record().kind();
            if existing != record.kind() {
                return Err(Error::KindMismatch {
                    handle,
                    expected: existing,
                    found: record.kind(),
                });
            }
            *slot = match slot {
                Staged::Add(_) => Staged::Add(record),
                Staged::Commit(_) => Staged::Commit(record),
            };
            return Ok(());
        }

        let existing = self.store.lookup(&handle)?.kind();
        if existing != record.kind() {
            return Err(Error::KindMismatch {
                handle,
                expected: existing,
                found: record.kind(),
            });
        }
        self.index.insert(handle, self.staged.len());
        self.staged.push(Staged::Commit(record));
        Ok(())
    }

    /// Look a handle up in this batch first, then in the store.
    pub fn get(&self, handle: &Handle) -> Option<&Record> {
        match self.index.get(handle) {
            Some(&position) => Some(self.staged[position].record()),
            None => self.store.get(handle),
        }
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Check references and apply the batch atomically.
    pub fn finish(mut self) -> Result<usize> {
        for staged in &self.staged {
            let record = staged.record();
            for (target, expected) in record.references() {
                let found = self.get(target).map(Record::kind);
                match found {
                    Some(kind) if kind == expected => {}
                    Some(kind) => {
                        return Err(Error::KindMismatch {
                            handle: target.clone(),
                            expected,
                            found: kind,
                        });
                    }
                    None => {
                        return Err(Error::ReferenceNotFound {
                            from: record.handle().clone(),
                            to: target.clone(),
                        });
                    }
                }
            }
        }

        let changes = std::mem::take(&mut self.staged);
        let count = changes.len();
        self.finished = true;
        self.store.apply(Batch {
            label: self.label.clone(),
            changes,
        })?;
        debug!(label = %self.label, records = count, "transaction applied");
        Ok(count)
    }
}

impl<S: RecordStore> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if !self.finished && !self.staged.is_empty() {
            debug!(
                label = %self.label,
                records = self.staged.len(),
                "transaction discarded"
            );
        }
    }
}

/// In-memory store keeping records in insertion order.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<Handle, Record>,
    order: Vec<Handle>,
    default_person: Option<Handle>,
    transactions: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of batches applied so far.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, handle: &Handle) -> Option<&Record> {
        self.records.get(handle)
    }

    fn apply(&mut self, batch: Batch) -> Result<()> {
        // Re-check adds so a hand-built batch cannot clobber records.
        for change in &batch.changes {
            if let Staged::Add(record) = change
                && self.records.contains_key(record.handle())
            {
                return Err(Error::DuplicateHandle(record.handle().clone()));
            }
        }

        for change in batch.changes {
            match change {
                Staged::Add(record) => {
                    let handle = record.handle().clone();
                    self.order.push(handle.clone());
                    self.records.insert(handle, record);
                }
                Staged::Commit(record) => {
                    self.records.insert(record.handle().clone(), record);
                }
            }
        }
        self.transactions += 1;
        Ok(())
    }

    fn records(&self) -> Box<dyn Iterator<Item = &Record> + '_> {
        Box::new(
            self.order
                .iter()
                .filter_map(|handle| self.records.get(handle)),
        )
    }

    fn default_person(&self) -> Option<&Handle> {
        self.default_person.as_ref()
    }

    fn set_default_person(&mut self, handle: Handle) -> Result<()> {
        self.person(&handle)?;
        self.default_person = Some(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Date, EventKind, Gender, Name, Note};

    fn person(handle: &str) -> Person {
        Person {
            handle: Handle::new(handle),
            gender: Gender::Female,
            name: Name {
                first_name: "Ada".to_string(),
                surname: "Test".to_string(),
            },
            event_refs: Vec::new(),
            birth_ref: None,
            death_ref: None,
            parent_family: None,
            families: Vec::new(),
            media_refs: Vec::new(),
            note_refs: Vec::new(),
        }
    }

    fn birth(handle: &str, year: i32) -> Event {
        Event {
            handle: Handle::new(handle),
            kind: EventKind::Birth,
            date: Date::year_only(year),
            place: None,
            note: None,
            media_refs: Vec::new(),
        }
    }

    #[test]
    fn finish_applies_batch_in_order() {
        let mut store = MemoryStore::new();
        let mut txn = store.begin("Add person");
        let mut ada = person("p1");
        ada.event_refs.push(Handle::new("e1"));
        ada.birth_ref = Some(Handle::new("e1"));
        txn.add(birth("e1", 1900)).expect("add event");
        txn.add(ada).expect("add person");
        assert_eq!(txn.finish().expect("finish"), 2);

        let handles: Vec<_> = store.records().map(|r| r.handle().to_string()).collect();
        assert_eq!(handles, vec!["e1", "p1"]);
        assert_eq!(store.transactions(), 1);
    }

    #[test]
    fn dropped_transaction_leaves_store_untouched() {
        let mut store = MemoryStore::new();
        {
            let mut txn = store.begin("Abandoned");
            txn.add(person("p1")).expect("add person");
        }
        assert!(store.is_empty());
        assert!(matches!(store.lookup(&Handle::new("p1")), Err(Error::NotFound(_))));
    }

    #[test]
    fn add_rejects_duplicate_handles() {
        let mut store = MemoryStore::new();
        store
            .transact("Add", |txn| txn.add(person("p1")))
            .expect("first add");

        let result: Result<()> = store.transact("Add again", |txn| txn.add(person("p1")));
        assert!(matches!(result, Err(Error::DuplicateHandle(_))));

        let mut txn = store.begin("Add twice");
        txn.add(person("p2")).expect("add p2");
        assert!(matches!(txn.add(person("p2")), Err(Error::DuplicateHandle(_))));
    }

    #[test]
    fn commit_requires_existing_record() {
        let mut store = MemoryStore::new();
        let mut txn = store.begin("Commit");
        assert!(matches!(txn.commit(person("ghost")), Err(Error::NotFound(_))));
    }

    #[test]
    fn commit_replaces_staged_add() {
        let mut store = MemoryStore::new();
        store
            .transact("Add", |txn| {
                txn.add(person("p1"))?;
                let mut renamed = person("p1");
                renamed.name.first_name = "Grace".to_string();
                txn.commit(renamed)
            })
            .expect("transact");

        let stored = store.person(&Handle::new("p1")).expect("person");
        assert_eq!(stored.name.first_name, "Grace");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_reference_aborts_whole_batch() {
        let mut store = MemoryStore::new();
        let mut orphan = person("p1");
        orphan.note_refs.push(Handle::new("n404"));

        let result: Result<()> = store.transact("Add", |txn| {
            txn.add(Note {
                handle: Handle::new("n1"),
                text: "kept?".to_string(),
            })?;
            txn.add(orphan)
        });

        assert!(matches!(result, Err(Error::ReferenceNotFound { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn typed_lookup_reports_kind_mismatch() {
        let mut store = MemoryStore::new();
        store
            .transact("Add", |txn| txn.add(birth("e1", 1950)))
            .expect("add event");
        let result = store.person(&Handle::new("e1"));
        assert!(matches!(
            result,
            Err(Error::KindMismatch {
                expected: RecordKind::Person,
                found: RecordKind::Event,
                ..
            })
        ));
    }

    #[test]
    fn default_person_must_exist() {
        let mut store = MemoryStore::new();
        assert!(store.set_default_person(Handle::new("nobody")).is_err());
        store
            .transact("Add", |txn| txn.add(person("p1")))
            .expect("add");
        store
            .set_default_person(Handle::new("p1"))
            .expect("set default");
        assert_eq!(store.default_person(), Some(&Handle::new("p1")));
    }
}
