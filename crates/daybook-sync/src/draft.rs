// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;

use daybook_app::{Patch, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftChange {
    /// The patch carried no fields.
    Ignored,
    /// Every pending field matches the record again; the draft is gone.
    Extinguished,
    /// The draft holds at least one field that differs from the record.
    Pending,
}

/// Pending, unconfirmed edits keyed by record id.
///
/// A draft never holds a field equal to the record's current value, and an
/// empty draft is never stored.
#[derive(Debug, Clone)]
pub struct DraftBook<R: Record> {
    drafts: HashMap<R::Id, R::Patch>,
}

impl<R: Record> Default for DraftBook<R> {
    fn default() -> Self {
        Self {
            drafts: HashMap::new(),
        }
    }
}

impl<R: Record> DraftBook<R> {
    pub fn update(&mut self, record: &R, patch: &R::Patch) -> DraftChange {
        if patch.is_empty() {
            return DraftChange::Ignored;
        }
        let id = record.id();
        let mut draft = self.drafts.remove(&id).unwrap_or_default();
        draft.merge(patch);
        draft.prune_unchanged(record, patch);
        if draft.is_empty() {
            return DraftChange::Extinguished;
        }
        self.drafts.insert(id, draft);
        DraftChange::Pending
    }

    pub fn get(&self, id: R::Id) -> Option<&R::Patch> {
        self.drafts.get(&id)
    }

    pub fn contains(&self, id: R::Id) -> bool {
        self.drafts.contains_key(&id)
    }

    /// Copy of the draft as it stands; later edits do not reach it.
    pub fn snapshot(&self, id: R::Id) -> Option<R::Patch> {
        self.drafts.get(&id).cloned()
    }

    /// Settle a confirmed save: drop fields still equal to what was sent,
    /// then anything that now matches `record`.
    pub fn settle(&mut self, id: R::Id, sent: &R::Patch, record: &R) -> bool {
        let Some(draft) = self.drafts.get_mut(&id) else {
            return false;
        };
        draft.retain_unsent(sent);
        draft.prune_against(record);
        if draft.is_empty() {
            self.drafts.remove(&id);
            return false;
        }
        true
    }

    /// Put a failed snapshot back underneath whatever was typed since, so
    /// the next attempt still carries it.
    pub fn restore(&mut self, sent: &R::Patch, record: &R) -> bool {
        let id = record.id();
        let mut draft = sent.clone();
        if let Some(newer) = self.drafts.get(&id) {
            draft.merge(newer);
        }
        draft.prune_against(record);
        if draft.is_empty() {
            self.drafts.remove(&id);
            return false;
        }
        self.drafts.insert(id, draft);
        true
    }

    /// Re-check a draft against a freshly fetched record.
    pub fn prune(&mut self, record: &R) -> bool {
        let id = record.id();
        let Some(draft) = self.drafts.get_mut(&id) else {
            return false;
        };
        draft.prune_against(record);
        if draft.is_empty() {
            self.drafts.remove(&id);
            return false;
        }
        true
    }

    pub fn discard(&mut self, id: R::Id) -> Option<R::Patch> {
        self.drafts.remove(&id)
    }

    pub fn ids(&self) -> Vec<R::Id> {
        let mut ids: Vec<R::Id> = self.drafts.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{DraftBook, DraftChange};
    use daybook_app::{Bill, BillId, BillPatch};

    fn bill() -> Bill {
        Bill {
            id: BillId::new(7),
            date: 20260110,
            inout: -1,
            category: "food".to_owned(),
            amount: 10.0,
            item: "lunch".to_owned(),
        }
    }

    fn amount(value: f64) -> BillPatch {
        BillPatch {
            amount: Some(value),
            ..BillPatch::default()
        }
    }

    #[test]
    fn later_values_win_and_fields_accumulate() {
        let record = bill();
        let mut book = DraftBook::default();
        assert_eq!(book.update(&record, &amount(11.0)), DraftChange::Pending);
        let item = BillPatch {
            item: Some("dinner".to_owned()),
            ..BillPatch::default()
        };
        assert_eq!(book.update(&record, &item), DraftChange::Pending);
        assert_eq!(book.update(&record, &amount(12.0)), DraftChange::Pending);
        assert_eq!(
            book.get(record.id),
            Some(&BillPatch {
                amount: Some(12.0),
                item: Some("dinner".to_owned()),
                ..BillPatch::default()
            })
        );
    }

    #[test]
    fn reverting_to_the_record_value_extinguishes_the_draft() {
        let record = bill();
        let mut book = DraftBook::default();
        book.update(&record, &amount(11.0));
        assert_eq!(book.update(&record, &amount(10.0)), DraftChange::Extinguished);
        assert!(book.is_empty());
    }

    #[test]
    fn editing_to_the_current_value_creates_nothing() {
        let record = bill();
        let mut book = DraftBook::<Bill>::default();
        assert_eq!(book.update(&record, &amount(10.0)), DraftChange::Extinguished);
        assert_eq!(book.update(&record, &BillPatch::default()), DraftChange::Ignored);
        assert!(book.is_empty());
    }

    #[test]
    fn settle_keeps_fields_edited_after_the_snapshot() {
        let mut record = bill();
        let mut book = DraftBook::default();
        book.update(&record, &amount(12.0));
        let sent = book.snapshot(record.id).unwrap_or_default();
        book.update(&record, &amount(13.0));

        record.amount = 12.0;
        assert!(book.settle(record.id, &sent, &record));
        assert_eq!(book.get(record.id), Some(&amount(13.0)));
    }

    #[test]
    fn restore_keeps_newer_edits_on_top() {
        let record = bill();
        let mut book = DraftBook::default();
        let sent = BillPatch {
            amount: Some(12.0),
            item: Some("tea".to_owned()),
            ..BillPatch::default()
        };
        book.update(&record, &amount(14.0));
        assert!(book.restore(&sent, &record));
        assert_eq!(
            book.get(record.id),
            Some(&BillPatch {
                amount: Some(14.0),
                item: Some("tea".to_owned()),
                ..BillPatch::default()
            })
        );
    }

    #[test]
    fn prune_drops_drafts_the_server_already_has() {
        let mut record = bill();
        let mut book = DraftBook::default();
        book.update(&record, &amount(12.0));
        record.amount = 12.0;
        assert!(!book.prune(&record));
        assert!(!book.contains(record.id));
    }
}
