// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use daybook_app::Record;

use crate::draft::DraftBook;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    /// The record still existed and took the sent values.
    pub applied: bool,
    /// Edits made after the snapshot are still waiting to be saved.
    pub draft_remaining: bool,
}

/// Fold a confirmed save into the canonical list and the pending draft.
///
/// The record takes every sent field first; the draft then loses the fields
/// that still hold the sent value and any that now match the record.
pub fn reconcile<R: Record>(
    store: &mut RecordStore<R>,
    drafts: &mut DraftBook<R>,
    id: R::Id,
    sent: &R::Patch,
) -> Reconciled {
    let applied = store.apply(id, sent);
    let draft_remaining = match store.get(id) {
        Some(record) => drafts.settle(id, sent, record),
        None => {
            drafts.discard(id);
            false
        }
    };
    Reconciled {
        applied,
        draft_remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::{Reconciled, reconcile};
    use crate::draft::DraftBook;
    use crate::store::RecordStore;
    use daybook_app::{Note, NoteId, NotePatch};

    fn note() -> Note {
        Note {
            id: NoteId::new(4),
            begin: 20260101,
            last: 20260101,
            process: 10,
            desire: 3,
            priority: 2,
            content: "fence".to_owned(),
        }
    }

    #[test]
    fn interim_edits_to_other_values_survive() {
        let mut store = RecordStore::new(vec![note()]);
        let mut drafts = DraftBook::default();
        let id = NoteId::new(4);
        let first = NotePatch {
            process: Some(50),
            content: Some("fence and gate".to_owned()),
            ..NotePatch::default()
        };
        drafts.update(&note(), &first);
        let sent = drafts.snapshot(id).unwrap_or_default();
        drafts.update(
            &note(),
            &NotePatch {
                process: Some(60),
                ..NotePatch::default()
            },
        );

        let outcome = reconcile(&mut store, &mut drafts, id, &sent);
        assert_eq!(
            outcome,
            Reconciled {
                applied: true,
                draft_remaining: true
            }
        );
        let record = store.get(id).cloned().unwrap_or_else(note);
        assert_eq!(record.process, 50);
        assert_eq!(record.content, "fence and gate");
        assert_eq!(
            drafts.get(id),
            Some(&NotePatch {
                process: Some(60),
                ..NotePatch::default()
            })
        );
    }

    #[test]
    fn removed_records_lose_their_draft() {
        let mut store = RecordStore::<Note>::default();
        let mut drafts = DraftBook::default();
        drafts.update(
            &note(),
            &NotePatch {
                process: Some(70),
                ..NotePatch::default()
            },
        );
        let sent = drafts.snapshot(NoteId::new(4)).unwrap_or_default();
        let outcome = reconcile(&mut store, &mut drafts, NoteId::new(4), &sent);
        assert!(!outcome.applied);
        assert!(drafts.is_empty());
    }
}
