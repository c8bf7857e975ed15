// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_MAX: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Timing knobs for debounced saves and failure retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavePolicy {
    pub delay: Duration,
    pub retry_base: Duration,
    pub retry_max: Duration,
    pub max_retries: u32,
}

impl Default for SavePolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_SAVE_DELAY,
            retry_base: DEFAULT_RETRY_BASE,
            retry_max: DEFAULT_RETRY_MAX,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl SavePolicy {
    /// Wait before retry number `attempt` (1-based): doubles each time and
    /// never exceeds `retry_max`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.retry_base
            .checked_mul(1_u32 << exponent)
            .map_or(self.retry_max, |delay| delay.min(self.retry_max))
    }

    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts <= self.max_retries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineKind {
    Debounce,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub at: Instant,
    pub kind: DeadlineKind,
}

/// One live deadline per id; scheduling again replaces it.
#[derive(Debug, Clone)]
pub struct SaveScheduler<Id> {
    deadlines: HashMap<Id, Deadline>,
}

impl<Id> Default for SaveScheduler<Id> {
    fn default() -> Self {
        Self {
            deadlines: HashMap::new(),
        }
    }
}

impl<Id: Copy + Eq + Ord + Hash> SaveScheduler<Id> {
    /// Returns whether an earlier deadline for `id` was replaced.
    pub fn schedule(&mut self, id: Id, at: Instant, kind: DeadlineKind) -> bool {
        self.deadlines.insert(id, Deadline { at, kind }).is_some()
    }

    pub fn cancel(&mut self, id: Id) -> bool {
        self.deadlines.remove(&id).is_some()
    }

    pub fn deadline(&self, id: Id) -> Option<Deadline> {
        self.deadlines.get(&id).copied()
    }

    pub fn is_pending(&self, id: Id) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Remove and return every id whose deadline has passed, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<Id> {
        let mut due: Vec<(Instant, Id)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| deadline.at <= now)
            .map(|(id, deadline)| (deadline.at, *id))
            .collect();
        due.sort();
        for (_, id) in &due {
            self.deadlines.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().map(|deadline| deadline.at).min()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(Id) -> bool) {
        self.deadlines.retain(|id, _| keep(*id));
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
