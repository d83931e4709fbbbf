//! Periodic persistence of undo/redo history.
//!
//! The two stacks are stored under separate keys, `"{document}:history:past"`
//! and `"{document}:history:future"`, each as a JSON array of snapshots.

use crate::history::{DEFAULT_MAX_HISTORY_STATES, HistoryStack, SceneSnapshot};
use crate::storage::{FileStorage, Storage, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

pub fn past_key(document_id: &str) -> String {
    format!("{}:history:past", document_id)
}

pub fn future_key(document_id: &str) -> String {
    format!("{}:history:future", document_id)
}

/// Saves a document's history stack when it has changed and the interval
/// has elapsed.
pub struct HistoryAutoSave<S: Storage> {
    storage: Arc<S>,
    document_id: String,
    interval: Duration,
    last_save: Option<Instant>,
    dirty: bool,
    max_states: usize,
}

impl<S: Storage> HistoryAutoSave<S> {
    pub fn new(storage: Arc<S>, document_id: impl Into<String>) -> Self {
        Self {
            storage,
            document_id: document_id.into(),
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            max_states: DEFAULT_MAX_HISTORY_STATES,
        }
    }

    /// Set the per-side bound applied when saving.
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Dirty, and never saved or the interval has elapsed.
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save if [`should_save`](Self::should_save). Returns whether it saved.
    pub async fn maybe_save(&mut self, stack: &HistoryStack) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }
        self.save(stack).await?;
        Ok(true)
    }

    /// Save both stacks now, keeping at most `max_states` newest entries each.
    pub async fn save(&mut self, stack: &HistoryStack) -> StorageResult<()> {
        let past = serde_json::to_string(newest(&stack.past, self.max_states))?;
        let future = serde_json::to_string(newest(&stack.future, self.max_states))?;

        self.storage.save(&past_key(&self.document_id), &past).await?;
        self.storage
            .save(&future_key(&self.document_id), &future)
            .await?;

        log::debug!(
            "Saved history for {} ({} undo / {} redo)",
            self.document_id,
            stack.past.len().min(self.max_states),
            stack.future.len().min(self.max_states)
        );
        self.last_save = Some(Instant::now());
        self.dirty = false;
        Ok(())
    }

    /// Load the persisted stacks. Missing keys load as empty stacks.
    pub async fn load(&mut self) -> StorageResult<HistoryStack> {
        let past = self.load_side(&past_key(&self.document_id)).await?;
        let future = self.load_side(&future_key(&self.document_id)).await?;
        self.dirty = false;
        self.last_save = Some(Instant::now());
        Ok(HistoryStack { past, future })
    }

    async fn load_side(&self, key: &str) -> StorageResult<Vec<SceneSnapshot>> {
        match self.storage.load(key).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Delete the persisted history of the current document.
    pub async fn clear(&mut self) -> StorageResult<()> {
        self.storage.delete(&past_key(&self.document_id)).await?;
        self.storage.delete(&future_key(&self.document_id)).await?;
        self.dirty = false;
        Ok(())
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

fn newest(stack: &[SceneSnapshot], max: usize) -> &[SceneSnapshot] {
    &stack[stack.len().saturating_sub(max)..]
}

/// File storage in the platform data directory.
pub fn create_default_storage() -> StorageResult<Arc<FileStorage>> {
    Ok(Arc::new(FileStorage::default_location()?))
}
