// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;

use daybook_app::{Patch, Record};
use tracing::warn;

/// Canonical list of one module in server order, indexed by id.
#[derive(Debug, Clone)]
pub struct RecordStore<R: Record> {
    records: Vec<R>,
    index: HashMap<R::Id, usize>,
}

impl<R: Record> Default for RecordStore<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<R: Record> RecordStore<R> {
    pub fn new(records: Vec<R>) -> Self {
        let mut store = Self::default();
        store.replace_all(records);
        store
    }

    pub fn replace_all(&mut self, records: Vec<R>) {
        self.records = records;
        self.reindex();
    }

    pub fn get(&self, id: R::Id) -> Option<&R> {
        self.index.get(&id).map(|position| &self.records[*position])
    }

    pub fn contains(&self, id: R::Id) -> bool {
        self.index.contains_key(&id)
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn remove(&mut self, id: R::Id) -> Option<R> {
        let position = *self.index.get(&id)?;
        let removed = self.records.remove(position);
        self.reindex();
        Some(removed)
    }

    /// Append an empty record for `id` unless one exists. Returns whether a
    /// record was created.
    pub fn insert_blank(&mut self, id: R::Id) -> bool {
        if self.contains(id) {
            return false;
        }
        self.index.insert(id, self.records.len());
        self.records.push(R::blank(id));
        true
    }

    /// Overwrite the fields carried by `patch`. Only the reconciler writes
    /// through here.
    pub(crate) fn apply(&mut self, id: R::Id, patch: &R::Patch) -> bool {
        let Some(position) = self.index.get(&id).copied() else {
            return false;
        };
        patch.apply_to(&mut self.records[position]);
        true
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (position, record) in self.records.iter().enumerate() {
            let id = record.id();
            if self.index.contains_key(&id) {
                warn!(module = R::MODULE.as_str(), %id, "duplicate id in list; keeping the first");
                continue;
            }
            self.index.insert(id, position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RecordStore;
    use daybook_app::{Diary, DiaryId, DiaryPatch, Sport, SportId};

    fn sport(id: i64, content: &str) -> Sport {
        Sport {
            id: SportId::new(id),
            date: 20260101,
            content: content.to_owned(),
        }
    }

    #[test]
    fn remove_keeps_the_index_consistent() {
        let mut store = RecordStore::new(vec![sport(1, "run"), sport(2, "swim"), sport(3, "row")]);
        assert_eq!(store.remove(SportId::new(1)).map(|sport| sport.content), Some("run".to_owned()));
        assert_eq!(store.get(SportId::new(3)).map(|sport| sport.content.as_str()), Some("row"));
        assert_eq!(store.len(), 2);
        assert!(store.remove(SportId::new(1)).is_none());
    }

    #[test]
    fn duplicate_ids_resolve_to_the_first_row() {
        let store = RecordStore::new(vec![sport(1, "first"), sport(1, "second")]);
        assert_eq!(store.get(SportId::new(1)).map(|sport| sport.content.as_str()), Some("first"));
    }

    #[test]
    fn insert_blank_is_idempotent() {
        let mut store = RecordStore::<Diary>::default();
        assert!(store.insert_blank(DiaryId::new(20260102)));
        assert!(!store.insert_blank(DiaryId::new(20260102)));
        assert!(store.get(DiaryId::new(20260102)).is_some_and(Diary::is_empty));
    }

    #[test]
    fn apply_writes_only_patched_fields() {
        let mut store = RecordStore::<Diary>::default();
        store.insert_blank(DiaryId::new(20260102));
        let patch = DiaryPatch {
            weather: Some("rain".to_owned()),
            ..DiaryPatch::default()
        };
        assert!(store.apply(DiaryId::new(20260102), &patch));
        assert!(!store.apply(DiaryId::new(20260103), &patch));
        let diary = store.get(DiaryId::new(20260102));
        assert_eq!(diary.map(|diary| diary.weather.as_str()), Some("rain"));
        assert_eq!(diary.map(|diary| diary.content.as_str()), Some(""));
    }
}
