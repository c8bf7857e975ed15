// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use daybook_app::{Patch, Record};
use tracing::{debug, error, warn};

use crate::adapter::{AdapterError, CellEdit, read_cell};
use crate::draft::{DraftBook, DraftChange};
use crate::reconcile::reconcile;
use crate::rollback::{BlurOutcome, check_blur};
use crate::scheduler::{DeadlineKind, SavePolicy, SaveScheduler};
use crate::store::RecordStore;

/// Identifies one dispatched save. Completions carrying any other ticket
/// for the id are stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SaveTicket<Id> {
    pub id: Id,
    pub seq: u64,
}

/// One write handed to the save collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest<R: Record> {
    pub ticket: SaveTicket<R::Id>,
    /// Fields to write, frozen when the request was built.
    pub patch: R::Patch,
    /// The confirmed record with `patch` laid over it, for backends that
    /// replace whole rows.
    pub record: R,
    pub attempt: u32,
}

impl<R: Record> SaveRequest<R> {
    pub fn id(&self) -> R::Id {
        self.ticket.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The session is gone; nothing will succeed until the user signs in.
    Unauthorized,
    Server { status: u16, message: String },
    Transport(String),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("session expired; sign in again"),
            Self::Server { status, message } => {
                write!(f, "server rejected the save (HTTP {status}): {message}")
            }
            Self::Transport(message) => write!(f, "save did not reach the server: {message}"),
        }
    }
}

impl std::error::Error for SaveError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Clean,
    Pending,
    Saving,
    Failed {
        attempts: u32,
        last_error: String,
        retry_at: Option<Instant>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing usable in the patch.
    Ignored,
    /// No record with that id; the edit was dropped.
    UnknownRecord,
    /// The edit put every field back; nothing will be saved.
    Extinguished,
    Scheduled { at: Instant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent<Id> {
    Saved {
        id: Id,
        draft_remaining: bool,
    },
    Failed {
        id: Id,
        attempts: u32,
        error: SaveError,
        retry_at: Option<Instant>,
    },
    SessionExpired {
        id: Id,
    },
    Stale {
        ticket: SaveTicket<Id>,
    },
}

#[derive(Debug, Clone)]
struct InFlight<P> {
    seq: u64,
    sent: P,
    // Set when a list refresh overtook the save; the id stays occupied
    // until the response arrives, but the response no longer reconciles.
    stale: bool,
}

#[derive(Debug, Clone)]
struct Failure {
    attempts: u32,
    last_error: SaveError,
}

/// Optimistic edit buffer for one module's list.
///
/// Edits become drafts, drafts become debounced saves, and confirmed saves
/// fold back into the list. Time is always passed in, so the whole thing is
/// driven by whoever owns the clock.
#[derive(Debug)]
pub struct AutoSaver<R: Record> {
    policy: SavePolicy,
    store: RecordStore<R>,
    drafts: DraftBook<R>,
    scheduler: SaveScheduler<R::Id>,
    in_flight: HashMap<R::Id, InFlight<R::Patch>>,
    deferred: HashSet<R::Id>,
    failures: HashMap<R::Id, Failure>,
    next_seq: u64,
    session_expired: bool,
}

impl<R: Record> AutoSaver<R> {
    pub fn new(policy: SavePolicy) -> Self {
        Self {
            policy,
            store: RecordStore::default(),
            drafts: DraftBook::default(),
            scheduler: SaveScheduler::default(),
            in_flight: HashMap::new(),
            deferred: HashSet::new(),
            failures: HashMap::new(),
            next_seq: 0,
            session_expired: false,
        }
    }

    pub fn with_records(policy: SavePolicy, records: Vec<R>) -> Self {
        let mut saver = Self::new(policy);
        saver.store.replace_all(records);
        saver
    }

    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    pub fn store(&self) -> &RecordStore<R> {
        &self.store
    }

    pub fn draft(&self, id: R::Id) -> Option<&R::Patch> {
        self.drafts.get(id)
    }

    /// Ids with unsaved edits, in id order.
    pub fn pending_ids(&self) -> Vec<R::Id> {
        self.drafts.ids()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Nothing is scheduled and nothing is on the wire. Drafts whose
    /// retries ran out can still exist.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_empty() && self.in_flight.is_empty()
    }

    pub fn session_expired(&self) -> bool {
        self.session_expired
    }

    pub fn status(&self, id: R::Id) -> SaveStatus {
        if let Some(failure) = self.failures.get(&id) {
            return SaveStatus::Failed {
                attempts: failure.attempts,
                last_error: failure.last_error.to_string(),
                retry_at: self.scheduler.deadline(id).map(|deadline| deadline.at),
            };
        }
        if self.in_flight.contains_key(&id) {
            SaveStatus::Saving
        } else if self.drafts.contains(id) {
            SaveStatus::Pending
        } else {
            SaveStatus::Clean
        }
    }

    pub fn update(&mut self, id: R::Id, patch: &R::Patch, now: Instant) -> UpdateOutcome {
        let module = R::MODULE.as_str();
        if patch.is_empty() {
            return UpdateOutcome::Ignored;
        }
        let Some(record) = self.store.get(id) else {
            debug!(module, %id, "edit for unknown record dropped");
            return UpdateOutcome::UnknownRecord;
        };
        // Compare against what the record will hold once the in-flight save
        // lands, so reverting mid-flight still writes the old value back.
        let baseline = match self.in_flight.get(&id).filter(|flight| !flight.stale) {
            Some(flight) => {
                let mut expected = record.clone();
                flight.sent.apply_to(&mut expected);
                Cow::Owned(expected)
            }
            None => Cow::Borrowed(record),
        };
        match self.drafts.update(&baseline, patch) {
            DraftChange::Ignored => UpdateOutcome::Ignored,
            DraftChange::Extinguished => {
                self.scheduler.cancel(id);
                self.deferred.remove(&id);
                self.failures.remove(&id);
                debug!(module, %id, "edit reverted; pending save cancelled");
                UpdateOutcome::Extinguished
            }
            DraftChange::Pending => {
                let at = now + self.policy.delay;
                let replaced = self.scheduler.schedule(id, at, DeadlineKind::Debounce);
                self.deferred.remove(&id);
                self.failures.remove(&id);
                debug!(module, %id, coalesced = replaced, "save scheduled");
                UpdateOutcome::Scheduled { at }
            }
        }
    }

    /// Read an edited cell and feed it to [`AutoSaver::update`]. Text that
    /// does not parse is treated as no change.
    pub fn edit_cell(
        &mut self,
        edit: &CellEdit<'_>,
        now: Instant,
    ) -> Result<UpdateOutcome, AdapterError> {
        let cell = read_cell::<R>(edit)?;
        if cell.invalid {
            return Ok(UpdateOutcome::Ignored);
        }
        Ok(self.update(cell.id, &cell.patch, now))
    }

    /// Validate a typed cell on blur. `None` means the record is unknown.
    pub fn blur(
        &mut self,
        id: R::Id,
        field: R::Field,
        raw: &str,
        now: Instant,
    ) -> Option<BlurOutcome> {
        let outcome = check_blur(self.store.get(id)?, field, raw);
        if let BlurOutcome::Keep(value) = &outcome {
            let mut patch = R::Patch::default();
            if patch.set(field, value.clone()).is_ok() {
                self.update(id, &patch, now);
            }
        }
        Some(outcome)
    }

    /// Make sure a record exists for `id`, creating a blank one if needed.
    pub fn ensure_record(&mut self, id: R::Id) -> bool {
        let created = self.store.insert_blank(id);
        if created {
            debug!(module = R::MODULE.as_str(), %id, "blank record created");
        }
        created
    }

    /// Start every save whose deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Vec<SaveRequest<R>> {
        if self.session_expired {
            return Vec::new();
        }
        let due = self.scheduler.take_due(now);
        due.into_iter()
            .filter_map(|id| self.dispatch_or_defer(id))
            .collect()
    }

    /// Start a save for every draft right away, ignoring debounce and
    /// backoff. Call before leaving a view or reloading its list.
    pub fn flush(&mut self, _now: Instant) -> Vec<SaveRequest<R>> {
        if self.session_expired {
            return Vec::new();
        }
        self.drafts
            .ids()
            .into_iter()
            .filter_map(|id| {
                self.scheduler.cancel(id);
                self.dispatch_or_defer(id)
            })
            .collect()
    }

    /// Put failed drafts back on the schedule with a fresh retry budget.
    pub fn retry_failed(&mut self, now: Instant) -> Vec<R::Id> {
        self.session_expired = false;
        let mut ids: Vec<R::Id> = self
            .failures
            .keys()
            .copied()
            .filter(|id| self.drafts.contains(*id))
            .collect();
        ids.sort();
        for id in &ids {
            if let Some(failure) = self.failures.get_mut(id) {
                failure.attempts = 0;
            }
            if !self.scheduler.is_pending(*id) {
                self.scheduler.schedule(*id, now, DeadlineKind::Retry);
            }
        }
        ids
    }

    pub fn complete(
        &mut self,
        ticket: SaveTicket<R::Id>,
        result: Result<(), SaveError>,
        now: Instant,
    ) -> SyncEvent<R::Id> {
        let module = R::MODULE.as_str();
        let id = ticket.id;
        let current = self
            .in_flight
            .get(&id)
            .is_some_and(|flight| flight.seq == ticket.seq);
        if !current {
            debug!(module, %id, seq = ticket.seq, "stale save completion ignored");
            return SyncEvent::Stale { ticket };
        }
        let Some(flight) = self.in_flight.remove(&id) else {
            return SyncEvent::Stale { ticket };
        };
        let deferred = self.deferred.remove(&id);
        if flight.stale {
            if self.drafts.contains(id) && !self.scheduler.is_pending(id) {
                self.scheduler
                    .schedule(id, now + self.policy.delay, DeadlineKind::Debounce);
            }
            debug!(module, %id, seq = ticket.seq, "save overtaken by list refresh; draft re-armed");
            return SyncEvent::Stale { ticket };
        }

        if result.is_err()
            && let Some(record) = self.store.get(id)
        {
            self.drafts.restore(&flight.sent, record);
        }

        match result {
            Ok(()) => {
                let outcome = reconcile(&mut self.store, &mut self.drafts, id, &flight.sent);
                self.failures.remove(&id);
                if deferred && outcome.draft_remaining {
                    self.scheduler.schedule(id, now, DeadlineKind::Debounce);
                }
                debug!(module, %id, remaining = outcome.draft_remaining, "save reconciled");
                SyncEvent::Saved {
                    id,
                    draft_remaining: outcome.draft_remaining,
                }
            }
            Err(SaveError::Unauthorized) => {
                self.session_expired = true;
                let attempts = self.failures.get(&id).map_or(0, |failure| failure.attempts) + 1;
                self.failures.insert(
                    id,
                    Failure {
                        attempts,
                        last_error: SaveError::Unauthorized,
                    },
                );
                error!(module, %id, "save rejected; session expired");
                SyncEvent::SessionExpired { id }
            }
            Err(save_error) => {
                let attempts = self.failures.get(&id).map_or(0, |failure| failure.attempts) + 1;
                self.failures.insert(
                    id,
                    Failure {
                        attempts,
                        last_error: save_error.clone(),
                    },
                );
                let retry_at = if deferred {
                    self.scheduler.schedule(id, now, DeadlineKind::Debounce);
                    Some(now)
                } else if let Some(deadline) = self.scheduler.deadline(id) {
                    Some(deadline.at)
                } else if self.drafts.contains(id) && self.policy.should_retry(attempts) {
                    let at = now + self.policy.backoff(attempts);
                    self.scheduler.schedule(id, at, DeadlineKind::Retry);
                    Some(at)
                } else {
                    None
                };
                warn!(module, %id, attempts, error = %save_error, retrying = retry_at.is_some(), "save failed");
                SyncEvent::Failed {
                    id,
                    attempts,
                    error: save_error,
                    retry_at,
                }
            }
        }
    }

    /// Swap in a freshly fetched list. Drafts for ids that vanished are
    /// dropped; the rest are re-checked against the new values. Saves still
    /// on the wire become stale but keep their id occupied until they
    /// answer; other surviving drafts without a deadline are scheduled
    /// again. Returns the ids whose drafts were dropped.
    pub fn replace_list(&mut self, records: Vec<R>, now: Instant) -> Vec<R::Id> {
        let module = R::MODULE.as_str();
        self.store.replace_all(records);
        for flight in self.in_flight.values_mut() {
            flight.stale = true;
        }
        self.deferred.clear();

        let mut dropped = Vec::new();
        for id in self.drafts.ids() {
            match self.store.get(id) {
                Some(record) => {
                    self.drafts.prune(record);
                }
                None => {
                    self.drafts.discard(id);
                    dropped.push(id);
                }
            }
        }
        if !dropped.is_empty() {
            warn!(module, count = dropped.len(), "unsaved edits dropped; records left the list");
        }

        let drafts = &self.drafts;
        self.scheduler.retain(|id| drafts.contains(id));
        self.failures.retain(|id, _| drafts.contains(*id));
        for id in self.drafts.ids() {
            if !self.scheduler.is_pending(id) && !self.in_flight.contains_key(&id) {
                self.scheduler
                    .schedule(id, now + self.policy.delay, DeadlineKind::Debounce);
            }
        }
        dropped
    }

    /// Forget a record after the server confirmed its deletion.
    pub fn remove(&mut self, id: R::Id) -> Option<R> {
        self.drafts.discard(id);
        self.scheduler.cancel(id);
        self.in_flight.remove(&id);
        self.deferred.remove(&id);
        self.failures.remove(&id);
        self.store.remove(id)
    }

    fn dispatch_or_defer(&mut self, id: R::Id) -> Option<SaveRequest<R>> {
        if self.in_flight.contains_key(&id) {
            self.deferred.insert(id);
            debug!(module = R::MODULE.as_str(), %id, "save deferred behind in-flight request");
            return None;
        }
        let patch = self.drafts.snapshot(id)?;
        let mut record = self.store.get(id)?.clone();
        patch.apply_to(&mut record);

        self.next_seq += 1;
        let ticket = SaveTicket {
            id,
            seq: self.next_seq,
        };
        let attempt = self.failures.get(&id).map_or(0, |failure| failure.attempts) + 1;
        self.in_flight.insert(
            id,
            InFlight {
                seq: ticket.seq,
                sent: patch.clone(),
                stale: false,
            },
        );
        debug!(module = R::MODULE.as_str(), %id, seq = ticket.seq, fields = patch.len(), "save dispatched");
        Some(SaveRequest {
            ticket,
            patch,
            record,
            attempt,
        })
    }
}

impl<R: Record> Default for AutoSaver<R> {
    fn default() -> Self {
        Self::new(SavePolicy::default())
    }
}
