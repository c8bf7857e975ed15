// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use daybook_app::ViewState;
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const APP_NAME: &str = "daybook";

/// Client-local view state: one JSON object keyed by module name.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("DAYBOOK_STATE_PATH") {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set DAYBOOK_STATE_PATH to the state file")
        })?;
        Ok(data_root.join(APP_NAME).join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every module's saved state. Missing or unreadable files read as
    /// empty.
    pub fn load_all(&self) -> Map<String, Value> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "state file unreadable; starting fresh");
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "state file is not a JSON object; ignoring it");
                Map::new()
            }
        }
    }

    /// One module's state, or its default when absent or malformed.
    pub fn load<S: ViewState>(&self) -> S {
        let module = S::MODULE.as_str();
        let Some(value) = self.load_all().remove(module) else {
            return S::default();
        };
        serde_json::from_value(value).unwrap_or_else(|error| {
            warn!(module, %error, "saved view state does not decode; using defaults");
            S::default()
        })
    }

    /// Write one module's state, keeping every other module's entry as it is
    /// on disk right now.
    pub fn save<S: ViewState>(&self, state: &S) -> Result<()> {
        let mut all = self.load_all();
        let value = serde_json::to_value(state)
            .with_context(|| format!("encode {} view state", S::MODULE.as_str()))?;
        all.insert(S::MODULE.as_str().to_owned(), value);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create state directory {}", parent.display()))?;
        }
        let encoded = serde_json::to_string_pretty(&Value::Object(all))
            .context("encode state file")?;
        fs::write(&self.path, encoded)
            .with_context(|| format!("write state file {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::StateStore;
    use daybook_app::{BillState, DiaryState, DiaryView, InterestState, NoteState};
    use daybook_testkit::temp_state_path;
    use std::fs;

    #[test]
    fn modules_merge_instead_of_overwriting() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        store.save(&InterestState { sort: 3 })?;
        store.save(&NoteState { flag: 2 })?;

        assert_eq!(store.load::<InterestState>(), InterestState { sort: 3 });
        assert_eq!(store.load::<NoteState>(), NoteState { flag: 2 });
        assert_eq!(store.load_all().len(), 2);
        Ok(())
    }

    #[test]
    fn writes_pick_up_changes_made_by_another_writer() -> anyhow::Result<()> {
        let (_dir, path) = temp_state_path()?;
        let first = StateStore::new(&path);
        let second = StateStore::new(&path);

        first.save(&DiaryState {
            view: DiaryView::Monthly,
            date: 20261001,
        })?;
        second.save(&BillState::default())?;

        assert_eq!(first.load::<DiaryState>().view, DiaryView::Monthly);
        Ok(())
    }

    #[test]
    fn corrupt_files_read_as_defaults() -> anyhow::Result<()> {
        let (_dir, path) = temp_state_path()?;
        fs::write(&path, "{not json")?;
        let store = StateStore::new(&path);
        assert_eq!(store.load::<NoteState>(), NoteState::default());

        store.save(&NoteState { flag: 1 })?;
        assert_eq!(store.load::<NoteState>().flag, 1);
        Ok(())
    }

    #[test]
    fn malformed_module_entries_fall_back_to_defaults() -> anyhow::Result<()> {
        let (_dir, path) = temp_state_path()?;
        fs::write(&path, r#"{"interest": {"sort": "movies"}, "note": {"flag": 1}}"#)?;
        let store = StateStore::new(&path);
        assert_eq!(store.load::<InterestState>(), InterestState::default());
        assert_eq!(store.load::<NoteState>().flag, 1);
        Ok(())
    }
}
