//! Bounded undo/redo over scene snapshots.
//!
//! Snapshots only ever hold drawing records, so the background grid can never
//! be captured, removed or re-added by undo and redo.

use crate::config::{ConfigError, HistoryConfig};
use crate::scene::{Scene, SceneObject, SceneResult};
use crate::shapes::SceneRecord;
use serde::{Deserialize, Serialize};

/// Default number of entries kept on each stack.
pub const DEFAULT_MAX_HISTORY_STATES: usize = 50;

/// Serialized copy of every drawing object at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneSnapshot {
    records: Vec<SceneRecord>,
}

impl SceneSnapshot {
    pub fn new(records: Vec<SceneRecord>) -> Self {
        Self { records }
    }

    /// Capture the scene's drawing objects. Grid lines are never included.
    pub fn capture(scene: &dyn Scene) -> Self {
        Self::new(scene.drawing_records())
    }

    pub fn records(&self) -> &[SceneRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Undo and redo stacks. The most recent entry is last on both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStack {
    pub past: Vec<SceneSnapshot>,
    pub future: Vec<SceneSnapshot>,
}

impl HistoryStack {
    /// Drop the oldest entries so that each side holds at most `max` entries.
    pub fn trim(&mut self, max: usize) {
        trim_oldest(&mut self.past, max);
        trim_oldest(&mut self.future, max);
    }
}

fn trim_oldest(stack: &mut Vec<SceneSnapshot>, max: usize) {
    if stack.len() > max {
        let excess = stack.len() - max;
        stack.drain(..excess);
    }
}

/// Called with the restored snapshot after every undo or redo.
pub type RestoreCallback = Box<dyn FnMut(&SceneSnapshot)>;

/// Undo/redo manager for an editing session.
pub struct HistoryManager {
    stack: HistoryStack,
    max_states: usize,
    on_restore: Option<RestoreCallback>,
}

impl std::fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("past", &self.stack.past.len())
            .field("future", &self.stack.future.len())
            .field("max_states", &self.max_states)
            .finish()
    }
}

impl HistoryManager {
    /// Create an empty history. Fails when `max_states` is zero.
    pub fn new(config: HistoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            stack: HistoryStack::default(),
            max_states: config.max_states,
            on_restore: None,
        })
    }

    /// Register the callback run after every restore, typically an area
    /// recalculation.
    pub fn set_on_restore(&mut self, callback: impl FnMut(&SceneSnapshot) + 'static) {
        self.on_restore = Some(Box::new(callback));
    }

    pub fn max_states(&self) -> usize {
        self.max_states
    }

    pub fn stack(&self) -> &HistoryStack {
        &self.stack
    }

    pub fn can_undo(&self) -> bool {
        !self.stack.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.stack.future.is_empty()
    }

    /// True when there is nothing to undo or redo.
    pub fn is_empty(&self) -> bool {
        !self.can_undo() && !self.can_redo()
    }

    /// Push a snapshot taken before an edit. Invalidates the redo stack.
    pub fn record(&mut self, snapshot: SceneSnapshot) {
        self.stack.past.push(snapshot);
        self.stack.future.clear();
        trim_oldest(&mut self.stack.past, self.max_states);
    }

    /// Capture the scene and record it.
    pub fn record_scene(&mut self, scene: &dyn Scene) {
        self.record(SceneSnapshot::capture(scene));
    }

    /// Restore the most recent past snapshot.
    ///
    /// Returns `Ok(false)` when there is nothing to undo. Fails without
    /// touching either stack if the scene is not active or refuses the
    /// restored objects.
    pub fn undo(&mut self, scene: &mut dyn Scene) -> SceneResult<bool> {
        if self.stack.past.is_empty() {
            return Ok(false);
        }
        ensure_active(scene)?;

        let current = SceneSnapshot::capture(scene);
        let Some(target) = self.stack.past.pop() else {
            return Ok(false);
        };
        if let Err(e) = self.restore(scene, &target, &current) {
            self.stack.past.push(target);
            return Err(e);
        }
        self.stack.future.push(current);
        trim_oldest(&mut self.stack.future, self.max_states);

        log::debug!(
            "Undo: restored {} objects ({} undo / {} redo left)",
            target.len(),
            self.stack.past.len(),
            self.stack.future.len()
        );
        self.notify(&target);
        Ok(true)
    }

    /// Restore the most recently undone snapshot.
    pub fn redo(&mut self, scene: &mut dyn Scene) -> SceneResult<bool> {
        if self.stack.future.is_empty() {
            return Ok(false);
        }
        ensure_active(scene)?;

        let current = SceneSnapshot::capture(scene);
        let Some(target) = self.stack.future.pop() else {
            return Ok(false);
        };
        if let Err(e) = self.restore(scene, &target, &current) {
            self.stack.future.push(target);
            return Err(e);
        }
        self.stack.past.push(current);
        trim_oldest(&mut self.stack.past, self.max_states);

        log::debug!(
            "Redo: restored {} objects ({} undo / {} redo left)",
            target.len(),
            self.stack.past.len(),
            self.stack.future.len()
        );
        self.notify(&target);
        Ok(true)
    }

    /// Replace every drawing object with the snapshot's records. If the scene
    /// rejects them, `previous` is put back before the error is returned.
    fn restore(
        &self,
        scene: &mut dyn Scene,
        snapshot: &SceneSnapshot,
        previous: &SceneSnapshot,
    ) -> SceneResult<()> {
        if let Err(e) = replace_drawings(scene, snapshot) {
            if let Err(rollback) = replace_drawings(scene, previous) {
                log::warn!("Failed to roll back scene after {}: {}", e, rollback);
            }
            return Err(e);
        }
        scene.request_render();
        Ok(())
    }

    fn notify(&mut self, snapshot: &SceneSnapshot) {
        if let Some(callback) = self.on_restore.as_mut() {
            callback(snapshot);
        }
    }

    /// Forget all history, e.g. on document load or reset.
    pub fn clear(&mut self) {
        self.stack = HistoryStack::default();
    }

    /// Replace the stacks with a persisted copy, trimmed to `max_states`.
    pub fn restore_stack(&mut self, mut stack: HistoryStack) {
        if stack.past.len() > self.max_states || stack.future.len() > self.max_states {
            log::warn!(
                "Persisted history exceeds {} entries per side, dropping oldest",
                self.max_states
            );
        }
        stack.trim(self.max_states);
        self.stack = stack;
    }
}

fn replace_drawings(scene: &mut dyn Scene, snapshot: &SceneSnapshot) -> SceneResult<()> {
    for id in scene.drawing_ids() {
        scene.remove(id)?;
    }
    for record in snapshot.records() {
        scene.add(SceneObject::Drawing(record.clone()))?;
    }
    Ok(())
}

fn ensure_active(scene: &dyn Scene) -> SceneResult<()> {
    if scene.is_active() {
        Ok(())
    } else {
        Err(crate::scene::SceneError::Disposed)
    }
}
