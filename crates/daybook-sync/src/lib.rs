// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod adapter;
pub mod draft;
pub mod driver;
pub mod engine;
pub mod persist;
pub mod reconcile;
pub mod rollback;
pub mod scheduler;
pub mod store;

pub use adapter::{AdapterError, CellEdit, CellPatch, EditorKind, read_cell};
pub use draft::{DraftBook, DraftChange};
pub use driver::{ListSource, SaveBackend, SyncDriver};
pub use engine::{
    AutoSaver, SaveError, SaveRequest, SaveStatus, SaveTicket, SyncEvent, UpdateOutcome,
};
pub use persist::{APP_NAME, StateStore};
pub use rollback::{BlurOutcome, check_blur};
pub use scheduler::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE, DEFAULT_RETRY_MAX, DEFAULT_SAVE_DELAY, DeadlineKind,
    SavePolicy, SaveScheduler,
};
pub use store::RecordStore;
