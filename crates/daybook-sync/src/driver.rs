// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use daybook_app::{ListQuery, Record};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::engine::{AutoSaver, SaveError, SaveRequest, SaveTicket, SyncEvent};

/// Writes one save to wherever records live.
pub trait SaveBackend<R: Record>: Send + Sync + 'static {
    fn save(&self, request: &SaveRequest<R>) -> Result<(), SaveError>;
}

/// Fetches one module's list.
pub trait ListSource<R: Record> {
    fn fetch_list(&self, query: &ListQuery) -> Result<Vec<R>>;
}

#[derive(Debug)]
struct Completion<Id> {
    ticket: SaveTicket<Id>,
    result: Result<(), SaveError>,
}

/// Owns an [`AutoSaver`] on the calling thread and runs its saves on worker
/// threads, feeding completions back over a channel.
pub struct SyncDriver<R: Record, B: SaveBackend<R>> {
    saver: AutoSaver<R>,
    backend: Arc<B>,
    tx: Sender<Completion<R::Id>>,
    rx: Receiver<Completion<R::Id>>,
}

impl<R: Record, B: SaveBackend<R>> SyncDriver<R, B> {
    pub fn new(saver: AutoSaver<R>, backend: B) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            saver,
            backend: Arc::new(backend),
            tx,
            rx,
        }
    }

    pub fn saver(&self) -> &AutoSaver<R> {
        &self.saver
    }

    pub fn saver_mut(&mut self) -> &mut AutoSaver<R> {
        &mut self.saver
    }

    pub fn into_saver(self) -> AutoSaver<R> {
        self.saver
    }

    /// Apply finished saves, then start whatever has come due.
    pub fn pump(&mut self, now: Instant) -> Vec<SyncEvent<R::Id>> {
        let mut events = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            events.push(self.saver.complete(completion.ticket, completion.result, now));
        }
        let requests = self.saver.poll(now);
        self.spawn_all(requests);
        events
    }

    /// Start every pending draft now instead of waiting for its deadline.
    pub fn flush(&mut self, now: Instant) {
        let requests = self.saver.flush(now);
        self.spawn_all(requests);
    }

    /// Keep pumping until nothing is scheduled or on the wire.
    pub fn run_until_idle(&mut self, timeout: Duration) -> Result<Vec<SyncEvent<R::Id>>> {
        let limit = Instant::now() + timeout;
        let mut events = self.pump(Instant::now());
        loop {
            if self.saver.is_idle() || self.saver.session_expired() {
                return Ok(events);
            }
            let now = Instant::now();
            if now >= limit {
                bail!(
                    "{} save(s) still pending after {:?}; check the server connection",
                    self.saver.pending_ids().len(),
                    timeout
                );
            }
            let wake = self
                .saver
                .next_deadline()
                .map_or(limit, |deadline| deadline.min(limit));
            let wait = wake.saturating_duration_since(now);
            match self.rx.recv_timeout(wait) {
                Ok(completion) => {
                    let event = self
                        .saver
                        .complete(completion.ticket, completion.result, Instant::now());
                    events.push(event);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => bail!("save completion channel closed"),
            }
            events.extend(self.pump(Instant::now()));
        }
    }

    /// Flush, wait for the saves, then replace the list with a fresh fetch.
    pub fn reload(
        &mut self,
        source: &impl ListSource<R>,
        query: &ListQuery,
        timeout: Duration,
    ) -> Result<Vec<R::Id>> {
        self.flush(Instant::now());
        self.run_until_idle(timeout)
            .context("finish pending saves before reloading")?;
        let records = source
            .fetch_list(query)
            .with_context(|| format!("load {} list", query.module().as_str()))?;
        Ok(self.saver.replace_list(records, Instant::now()))
    }

    fn spawn_all(&self, requests: Vec<SaveRequest<R>>) {
        for request in requests {
            debug!(
                module = R::MODULE.as_str(),
                id = %request.id(),
                attempt = request.attempt,
                "save started"
            );
            let backend = Arc::clone(&self.backend);
            let sender = self.tx.clone();
            thread::spawn(move || {
                let result = backend.save(&request);
                let _ = sender.send(Completion {
                    ticket: request.ticket,
                    result,
                });
            });
        }
    }
}
