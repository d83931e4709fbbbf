//! Scene capability and an in-memory implementation.
//!
//! The scene is the set of currently rendered objects. Drawing objects and
//! background grid lines live side by side, but the grid layer is always kept
//! behind every drawing object and is never part of a snapshot.

use crate::grid::GridLine;
use crate::shapes::{Room, SceneRecord, ShapeId};
use std::collections::HashMap;
use thiserror::Error;

/// Scene errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("Scene has been disposed")]
    Disposed,
    #[error("Duplicate object id: {0}")]
    DuplicateId(ShapeId),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Lifecycle of a scene handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneState {
    #[default]
    Active,
    Disposed,
}

/// An object held by a scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneObject {
    /// User drawing content.
    Drawing(SceneRecord),
    /// Background grid line.
    Grid(GridLine),
}

impl SceneObject {
    pub fn id(&self) -> ShapeId {
        match self {
            SceneObject::Drawing(record) => record.id,
            SceneObject::Grid(line) => line.id,
        }
    }

    pub fn is_grid(&self) -> bool {
        matches!(self, SceneObject::Grid(_))
    }

    pub fn as_drawing(&self) -> Option<&SceneRecord> {
        match self {
            SceneObject::Drawing(record) => Some(record),
            SceneObject::Grid(_) => None,
        }
    }
}

/// Rendering-side scene the engine reads from and writes to.
///
/// `objects` yields back-to-front order.
pub trait Scene {
    /// Add an object. Grid lines go behind all drawing content.
    fn add(&mut self, object: SceneObject) -> SceneResult<()>;

    /// Remove an object by id, returning it if it was present.
    fn remove(&mut self, id: ShapeId) -> SceneResult<Option<SceneObject>>;

    /// All objects in back-to-front order.
    fn objects(&self) -> Box<dyn Iterator<Item = &SceneObject> + '_>;

    /// Ask the renderer to repaint.
    fn request_render(&mut self);

    /// Current lifecycle state.
    fn state(&self) -> SceneState;

    /// Tear the scene down. Every later mutation fails with [`SceneError::Disposed`].
    fn dispose(&mut self);

    fn is_active(&self) -> bool {
        self.state() == SceneState::Active
    }

    /// Clones of every non-grid object, in drawing order.
    fn drawing_records(&self) -> Vec<SceneRecord> {
        self.objects()
            .filter_map(SceneObject::as_drawing)
            .cloned()
            .collect()
    }

    fn drawing_ids(&self) -> Vec<ShapeId> {
        self.objects()
            .filter(|o| !o.is_grid())
            .map(SceneObject::id)
            .collect()
    }

    fn grid_ids(&self) -> Vec<ShapeId> {
        self.objects()
            .filter(|o| o.is_grid())
            .map(SceneObject::id)
            .collect()
    }

    /// Every room currently drawn.
    fn rooms(&self) -> Vec<Room> {
        self.objects()
            .filter_map(SceneObject::as_drawing)
            .filter_map(|record| record.shape.as_room())
            .cloned()
            .collect()
    }
}

/// Scene held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryScene {
    objects: HashMap<ShapeId, SceneObject>,
    /// Back-to-front order. The first `grid_len` entries are grid lines.
    z_order: Vec<ShapeId>,
    grid_len: usize,
    state: SceneState,
    render_requests: usize,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ShapeId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of grid lines currently in the scene.
    pub fn grid_len(&self) -> usize {
        self.grid_len
    }

    /// How many times a repaint was requested.
    pub fn render_requests(&self) -> usize {
        self.render_requests
    }

    fn ensure_active(&self) -> SceneResult<()> {
        match self.state {
            SceneState::Active => Ok(()),
            SceneState::Disposed => Err(SceneError::Disposed),
        }
    }
}

impl Scene for MemoryScene {
    fn add(&mut self, object: SceneObject) -> SceneResult<()> {
        self.ensure_active()?;
        let id = object.id();
        if self.objects.contains_key(&id) {
            return Err(SceneError::DuplicateId(id));
        }

        if object.is_grid() {
            self.z_order.insert(self.grid_len, id);
            self.grid_len += 1;
        } else {
            self.z_order.push(id);
        }
        self.objects.insert(id, object);
        Ok(())
    }

    fn remove(&mut self, id: ShapeId) -> SceneResult<Option<SceneObject>> {
        self.ensure_active()?;
        let Some(object) = self.objects.remove(&id) else {
            return Ok(None);
        };
        if let Some(pos) = self.z_order.iter().position(|&other| other == id) {
            self.z_order.remove(pos);
        }
        if object.is_grid() {
            self.grid_len -= 1;
        }
        Ok(Some(object))
    }

    fn objects(&self) -> Box<dyn Iterator<Item = &SceneObject> + '_> {
        Box::new(self.z_order.iter().filter_map(|id| self.objects.get(id)))
    }

    fn request_render(&mut self) {
        if self.state == SceneState::Active {
            self.render_requests += 1;
        }
    }

    fn state(&self) -> SceneState {
        self.state
    }

    fn dispose(&mut self) {
        self.objects.clear();
        self.z_order.clear();
        self.grid_len = 0;
        self.state = SceneState::Disposed;
    }
}
