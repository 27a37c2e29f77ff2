//! Draft autosave for the prompt form.
//!
//! Unsaved form input is periodically persisted to a pluggable key-value
//! store under `prompt-draft-{mode}`, restored on the next visit, and
//! cleared on successful submit or explicit cancel. The store is an
//! external collaborator (browser localStorage in the web UI); this module
//! ships a file-backed and an in-memory implementation.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Which form the draft belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    Create,
    Edit,
}

impl DraftMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftMode::Create => "create",
            DraftMode::Edit => "edit",
        }
    }
}

/// Storage key for a form mode.
pub fn draft_key(mode: DraftMode) -> String {
    format!("prompt-draft-{}", mode.as_str())
}

/// In-progress form input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptDraft {
    pub name: String,
    pub content: String,
    pub system_prompt: String,
    pub description: String,
    pub tag_ids: Vec<i64>,
}

impl PromptDraft {
    /// Drafts with neither a name nor content are not worth persisting.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.content.is_empty()
    }
}

/// Pluggable key-value persistence for drafts.
pub trait DraftStore {
    fn save(&self, key: &str, value: &str) -> io::Result<()>;
    fn load(&self, key: &str) -> io::Result<Option<String>>;
    fn clear(&self, key: &str) -> io::Result<()>;
}

/// In-memory store, used in tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn clear(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// File-backed store writing one JSON file per key.
#[derive(Debug)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl DraftStore for FileDraftStore {
    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)
    }

    fn load(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn clear(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Draft autosave bound to a store and a form mode.
pub struct DraftAutosave<S: DraftStore> {
    store: S,
    mode: DraftMode,
}

impl<S: DraftStore> DraftAutosave<S> {
    pub fn new(store: S, mode: DraftMode) -> Self {
        Self { store, mode }
    }

    /// Persist the draft. Empty drafts are skipped; returns whether
    /// anything was written.
    pub fn save(&self, draft: &PromptDraft) -> io::Result<bool> {
        if draft.is_empty() {
            return Ok(false);
        }
        let json = serde_json::to_string(draft)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.store.save(&draft_key(self.mode), &json)?;
        Ok(true)
    }

    /// Load the stored draft, if any. A corrupt draft is discarded.
    pub fn load(&self) -> io::Result<Option<PromptDraft>> {
        let key = draft_key(self.mode);
        let Some(json) = self.store.load(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(draft) => Ok(Some(draft)),
            Err(err) => {
                tracing::warn!("Discarding unreadable draft {}: {}", key, err);
                self.store.clear(&key)?;
                Ok(None)
            }
        }
    }

    /// Drop the stored draft (after submit or cancel).
    pub fn clear(&self) -> io::Result<()> {
        self.store.clear(&draft_key(self.mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> PromptDraft {
        PromptDraft {
            name: "summarizer".to_string(),
            content: "Summarize: {input}".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_draft_key_scheme() {
        assert_eq!(draft_key(DraftMode::Create), "prompt-draft-create");
        assert_eq!(draft_key(DraftMode::Edit), "prompt-draft-edit");
    }

    #[test]
    fn test_save_load_clear_roundtrip() {
        let autosave = DraftAutosave::new(MemoryDraftStore::new(), DraftMode::Create);

        assert!(autosave.load().unwrap().is_none());
        assert!(autosave.save(&sample_draft()).unwrap());
        assert_eq!(autosave.load().unwrap(), Some(sample_draft()));

        autosave.clear().unwrap();
        assert!(autosave.load().unwrap().is_none());
    }

    #[test]
    fn test_empty_draft_is_not_persisted() {
        let autosave = DraftAutosave::new(MemoryDraftStore::new(), DraftMode::Create);
        assert!(!autosave.save(&PromptDraft::default()).unwrap());
        assert!(autosave.load().unwrap().is_none());
    }

    #[test]
    fn test_modes_do_not_collide() {
        let store = MemoryDraftStore::new();
        store.save(&draft_key(DraftMode::Create), "{}").unwrap();
        assert!(store.load(&draft_key(DraftMode::Edit)).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_draft_is_discarded() {
        let store = MemoryDraftStore::new();
        store
            .save(&draft_key(DraftMode::Create), "not json")
            .unwrap();
        let autosave = DraftAutosave::new(store, DraftMode::Create);
        assert!(autosave.load().unwrap().is_none());
        // A second load sees a clean slate
        assert!(autosave.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let autosave = DraftAutosave::new(FileDraftStore::new(dir.path()), DraftMode::Edit);

        assert!(autosave.save(&sample_draft()).unwrap());
        assert_eq!(autosave.load().unwrap(), Some(sample_draft()));
        autosave.clear().unwrap();
        assert!(autosave.load().unwrap().is_none());
    }
}
