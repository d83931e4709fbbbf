//! Editing session state.
//!
//! A [`Session`] owns one scene together with its camera, grid, history and
//! current area report, and is the single entry point the UI drives.

use crate::area::{GiaResult, calculate_gia};
use crate::camera::Camera;
use crate::config::{ConfigError, EngineConfig};
use crate::grid::{Debouncer, GridRenderer};
use crate::history::{HistoryManager, HistoryStack};
use crate::scene::{MemoryScene, Scene, SceneError, SceneObject, SceneResult};
use crate::shapes::{Room, SceneRecord, Shape, ShapeId, Stroke, StrokeStyle};
use crate::straighten::{straighten_polygon, straighten_stroke};
use kurbo::{Point, Size, Vec2};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

/// Canvas size used until the UI reports one.
pub const DEFAULT_CANVAS_SIZE: Size = Size::new(800.0, 600.0);

/// Runtime state of one floor-plan editing session.
pub struct Session<S: Scene = MemoryScene> {
    config: EngineConfig,
    scene: S,
    history: HistoryManager,
    grid: GridRenderer,
    camera: Camera,
    canvas_size: Size,
    viewport: Debouncer<(Size, Camera)>,
    /// Stroke being drawn, if any.
    current_stroke: Option<Stroke>,
    style: StrokeStyle,
    gia: Rc<RefCell<GiaResult>>,
}

impl Session<MemoryScene> {
    /// Create a session over an empty in-memory scene.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_scene(MemoryScene::new(), config)
    }
}

impl<S: Scene> Session<S> {
    /// Create a session over an existing scene.
    pub fn with_scene(scene: S, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut history = HistoryManager::new(config.history)?;
        let grid = GridRenderer::new(config.grid.clone())?;

        let gia = Rc::new(RefCell::new(calculate_gia(&scene.rooms(), &config.area)));
        let area = config.area;
        let report = Rc::clone(&gia);
        history.set_on_restore(move |snapshot| {
            let rooms: Vec<Room> = snapshot
                .records()
                .iter()
                .filter_map(|record| record.shape.as_room().cloned())
                .collect();
            *report.borrow_mut() = calculate_gia(&rooms, &area);
        });

        log::info!(
            "Session started (history {} states, grid {}/{})",
            config.history.max_states,
            config.grid.small_spacing,
            config.grid.large_spacing
        );

        Ok(Self {
            viewport: Debouncer::new(config.viewport_debounce()),
            config,
            scene,
            history,
            grid,
            camera: Camera::new(),
            canvas_size: DEFAULT_CANVAS_SIZE,
            current_stroke: None,
            style: StrokeStyle::default(),
            gia,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn grid(&self) -> &GridRenderer {
        &self.grid
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    /// Style applied to strokes started from now on.
    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
    }

    /// Every drawing record currently in the scene, back to front.
    pub fn records(&self) -> Vec<SceneRecord> {
        self.scene.drawing_records()
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.scene.rooms()
    }

    /// Latest gross internal area report.
    pub fn gia(&self) -> GiaResult {
        self.gia.borrow().clone()
    }

    fn recalculate_gia(&mut self) {
        *self.gia.borrow_mut() = calculate_gia(&self.scene.rooms(), &self.config.area);
    }

    // --- Strokes ---

    /// Start a new stroke at `point`, discarding any unfinished one.
    pub fn begin_stroke(&mut self, point: Point) {
        let mut stroke = Stroke::new(self.style);
        stroke.add_point(point);
        self.current_stroke = Some(stroke);
    }

    /// Append a point to the stroke in progress. Returns false if no stroke
    /// has been started.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        match self.current_stroke.as_mut() {
            Some(stroke) => {
                stroke.add_point(point);
                true
            }
            None => false,
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.current_stroke.is_some()
    }

    pub fn cancel_stroke(&mut self) {
        self.current_stroke = None;
    }

    /// Finish the stroke in progress and commit it to the scene.
    ///
    /// The stroke is straightened when enabled, then normalized. Returns the
    /// id of the added object, or `None` when there was no stroke or it
    /// normalized to nothing.
    pub fn end_stroke(&mut self) -> SceneResult<Option<ShapeId>> {
        let Some(stroke) = self.current_stroke.take() else {
            return Ok(None);
        };

        let options = self.config.straighten;
        let stroke = if options.enabled {
            let points = straighten_stroke(&stroke.points, options.threshold_degrees);
            Stroke::from_points(points, stroke.style)
        } else {
            stroke
        };

        match stroke.into_record() {
            Some(record) => self.commit(record).map(Some),
            None => Ok(None),
        }
    }

    // --- Rooms ---

    /// Add a room outline, squaring it up when straightening is enabled.
    /// Rooms with fewer than three vertices are ignored.
    pub fn add_room(&mut self, mut room: Room) -> SceneResult<Option<ShapeId>> {
        let options = self.config.straighten;
        if options.enabled {
            room.points = straighten_polygon(&room.points, options.threshold_degrees);
        }

        match SceneRecord::normalize(Shape::Room(room), self.style) {
            Some(record) => {
                let id = self.commit(record)?;
                self.recalculate_gia();
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Remove a drawing object. Returns false if there was no such object.
    pub fn remove(&mut self, id: ShapeId) -> SceneResult<bool> {
        let is_drawing = self
            .scene
            .objects()
            .any(|object| object.id() == id && !object.is_grid());
        if !is_drawing {
            return Ok(false);
        }
        self.ensure_active()?;

        self.history.record_scene(&self.scene);
        self.scene.remove(id)?;
        self.scene.request_render();
        self.recalculate_gia();
        Ok(true)
    }

    /// Record the current state, then add `record`.
    fn commit(&mut self, record: SceneRecord) -> SceneResult<ShapeId> {
        self.ensure_active()?;
        let id = record.id;
        log::debug!("Adding {} {}", record.shape.kind(), id);

        self.history.record_scene(&self.scene);
        self.scene.add(SceneObject::Drawing(record))?;
        self.scene.request_render();
        Ok(id)
    }

    fn ensure_active(&self) -> SceneResult<()> {
        if self.scene.is_active() {
            Ok(())
        } else {
            Err(SceneError::Disposed)
        }
    }

    // --- History ---

    pub fn undo(&mut self) -> SceneResult<bool> {
        self.history.undo(&mut self.scene)
    }

    pub fn redo(&mut self) -> SceneResult<bool> {
        self.history.redo(&mut self.scene)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Replace the history with a persisted stack.
    pub fn restore_history(&mut self, stack: HistoryStack) {
        self.history.restore_stack(stack);
    }

    // --- Viewport ---

    /// Report a new canvas size and camera. The grid follows once the
    /// viewport has settled, see [`poll_viewport`](Self::poll_viewport).
    pub fn set_viewport(&mut self, canvas_size: Size, camera: Camera, now: Instant) {
        self.canvas_size = canvas_size;
        self.camera = camera;
        self.notify_viewport(now);
    }

    pub fn pan(&mut self, delta: Vec2, now: Instant) {
        self.camera.pan(delta);
        self.notify_viewport(now);
    }

    pub fn zoom_at(&mut self, screen_point: Point, factor: f64, now: Instant) {
        self.camera.zoom_at(screen_point, factor);
        self.notify_viewport(now);
    }

    fn notify_viewport(&mut self, now: Instant) {
        if self.grid.is_listening() {
            self.viewport.push((self.canvas_size, self.camera.clone()), now);
        }
    }

    /// Apply a settled viewport change to the grid. Returns true if the grid
    /// was regenerated.
    pub fn poll_viewport(&mut self, now: Instant) -> bool {
        match self.viewport.poll(now) {
            Some((canvas, camera)) => self.grid.update_grid(canvas, &camera, &mut self.scene),
            None => false,
        }
    }

    /// Bring the grid up to date with the current viewport immediately.
    pub fn refresh_grid(&mut self) -> bool {
        self.viewport.flush();
        self.grid
            .update_grid(self.canvas_size, &self.camera, &mut self.scene)
    }

    // --- Lifecycle ---

    /// Remove every drawing object and forget all history. The grid stays.
    pub fn reset(&mut self) -> SceneResult<()> {
        self.ensure_active()?;
        for id in self.scene.drawing_ids() {
            self.scene.remove(id)?;
        }
        self.current_stroke = None;
        self.history.clear();
        self.scene.request_render();
        self.recalculate_gia();
        log::info!("Session reset");
        Ok(())
    }

    /// Replace the drawing with `records` as a freshly loaded document.
    pub fn load(&mut self, records: Vec<SceneRecord>) -> SceneResult<()> {
        self.reset()?;
        let count = records.len();
        for record in records {
            self.scene.add(SceneObject::Drawing(record))?;
        }
        self.scene.request_render();
        self.recalculate_gia();
        log::info!("Loaded document with {} objects", count);
        Ok(())
    }

    /// Tear down the grid and dispose of the scene.
    pub fn dispose(&mut self) {
        self.grid.destroy(&mut self.scene);
        self.viewport.flush();
        self.current_stroke = None;
        self.scene.dispose();
        log::info!("Session disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SceneSnapshot;
    use crate::shapes::RoomType;
    use std::time::Duration;

    fn session() -> Session {
        Session::new(EngineConfig::default()).unwrap()
    }

    fn draw(session: &mut Session, points: &[Point]) -> Option<ShapeId> {
        let (first, rest) = points.split_first()?;
        session.begin_stroke(*first);
        for p in rest {
            session.extend_stroke(*p);
        }
        session.end_stroke().unwrap()
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.history.max_states = 0;
        assert!(Session::new(config).is_err());
    }

    #[test]
    fn test_shaky_stroke_becomes_straight_wall() {
        let mut session = session();
        let points = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 1.0),
            Point::new(100.0, -1.0),
            Point::new(150.0, 0.5),
            Point::new(200.0, 3.0),
        ];
        let id = draw(&mut session, &points).unwrap();

        let record = session.scene().get(id).and_then(SceneObject::as_drawing).unwrap();
        match &record.shape {
            Shape::Wall(line) => {
                assert_eq!(line.start, Point::new(0.0, 0.0));
                assert_eq!(line.end, Point::new(200.0, 0.0));
            }
            other => panic!("expected wall, got {:?}", other),
        }
        assert!(session.can_undo());
    }

    #[test]
    fn test_straightening_can_be_disabled() {
        let mut config = EngineConfig::default();
        config.straighten.enabled = false;
        let mut session = Session::new(config).unwrap();
        draw(&mut session, &[Point::new(0.0, 0.0), Point::new(100.0, 3.0)]);

        let records = session.records();
        assert_eq!(
            records[0].shape,
            Shape::Wall(crate::geometry::Line::new(Point::new(0.0, 0.0), Point::new(100.0, 3.0)))
        );
    }

    #[test]
    fn test_style_applies_to_new_strokes() {
        let mut session = session();
        let style = StrokeStyle {
            width: 4.0,
            ..StrokeStyle::default()
        };
        session.set_style(style);
        let id = draw(&mut session, &[Point::new(0.0, 0.0), Point::new(0.0, 80.0)]).unwrap();

        let record = session.scene().get(id).and_then(SceneObject::as_drawing).unwrap();
        assert_eq!(record.style, style);
    }

    #[test]
    fn test_cancel_stroke_discards_points() {
        let mut session = session();
        session.begin_stroke(Point::new(0.0, 0.0));
        session.extend_stroke(Point::new(50.0, 0.0));
        session.cancel_stroke();

        assert!(!session.is_drawing());
        assert!(!session.extend_stroke(Point::new(60.0, 0.0)));
        assert_eq!(session.end_stroke(), Ok(None));
        assert!(session.records().is_empty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_end_without_stroke_is_noop() {
        let mut session = session();
        assert_eq!(session.end_stroke().unwrap(), None);
        assert!(!session.extend_stroke(Point::ZERO));
        assert!(!session.can_undo());
    }

    #[test]
    fn test_single_tap_stroke_is_kept() {
        let mut session = session();
        let id = draw(&mut session, &[Point::new(5.0, 5.0)]);
        assert!(id.is_some());
        assert_eq!(session.records().len(), 1);
    }

    #[test]
    fn test_add_room_updates_gia() {
        let mut session = session();
        assert!(!session.gia().is_valid);

        session
            .add_room(Room::new("Living", square(0.0, 0.0, 500.0), RoomType::Internal))
            .unwrap();
        let gia = session.gia();
        assert!(gia.is_valid);
        assert!((gia.area_m2 - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_add_room_squares_up_outline() {
        let mut session = session();
        let shaky = vec![
            Point::new(0.0, 0.0),
            Point::new(300.0, 4.0),
            Point::new(302.0, 200.0),
            Point::new(-3.0, 203.0),
        ];
        session
            .add_room(Room::new("Bed", shaky, RoomType::Internal))
            .unwrap();

        let room = &session.rooms()[0];
        assert!(crate::straighten::has_aligned_walls(&room.points, 1e-6));
    }

    #[test]
    fn test_degenerate_room_ignored() {
        let mut session = session();
        let room = Room::new("Line", vec![Point::ZERO, Point::new(10.0, 0.0)], RoomType::Internal);
        assert_eq!(session.add_room(room).unwrap(), None);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_undo_recalculates_gia() {
        let mut session = session();
        session
            .add_room(Room::new("A", square(0.0, 0.0, 100.0), RoomType::Internal))
            .unwrap();
        session
            .add_room(Room::new("B", square(200.0, 0.0, 100.0), RoomType::Internal))
            .unwrap();
        assert!((session.gia().area_m2 - 2.0).abs() < 1e-9);

        assert!(session.undo().unwrap());
        assert!((session.gia().area_m2 - 1.0).abs() < 1e-9);
        assert!(session.undo().unwrap());
        assert!(!session.gia().is_valid);

        assert!(session.redo().unwrap());
        assert!((session.gia().area_m2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_remove_is_undoable() {
        let mut session = session();
        let id = draw(&mut session, &[Point::new(0.0, 0.0), Point::new(0.0, 100.0)]).unwrap();
        assert!(session.remove(id).unwrap());
        assert!(session.records().is_empty());
        assert!(!session.remove(id).unwrap());

        session.undo().unwrap();
        assert_eq!(session.records()[0].id, id);
    }

    #[test]
    fn test_viewport_changes_are_debounced() {
        let mut session = session();
        let start = Instant::now();
        assert!(session.refresh_grid());
        let generations = session.grid().generation_count();

        for i in 0..10 {
            session.pan(Vec2::new(-100.0, 0.0), start + Duration::from_millis(i * 10));
        }
        assert!(!session.poll_viewport(start + Duration::from_millis(100)));
        assert_eq!(session.grid().generation_count(), generations);

        assert!(session.poll_viewport(start + Duration::from_millis(400)));
        assert_eq!(session.grid().generation_count(), generations + 1);
    }

    #[test]
    fn test_set_viewport_resizes_grid_once_settled() {
        let mut session = session();
        let start = Instant::now();
        assert!(session.refresh_grid());
        let before = session.grid().bounds().unwrap();

        let mut camera = Camera::new();
        camera.pan(Vec2::new(-5000.0, -5000.0));
        session.set_viewport(Size::new(1600.0, 1200.0), camera.clone(), start);
        assert_eq!(session.canvas_size(), Size::new(1600.0, 1200.0));
        assert_eq!(session.camera(), &camera);
        assert!(!session.poll_viewport(start));

        assert!(session.poll_viewport(start + Duration::from_secs(1)));
        let after = session.grid().bounds().unwrap();
        assert_ne!(after, before);
        assert!(after.width() > before.width());
    }

    #[test]
    fn test_grid_never_enters_history() {
        let mut session = session();
        session.refresh_grid();
        let grid_lines = session.grid().line_count();
        assert!(grid_lines > 0);

        draw(&mut session, &[Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        draw(&mut session, &[Point::new(0.0, 0.0), Point::new(0.0, 100.0)]);
        for snapshot in &session.history().stack().past {
            assert!(snapshot.len() < 2);
        }

        session.undo().unwrap();
        session.undo().unwrap();
        assert_eq!(session.scene().grid_len(), grid_lines);
        session.redo().unwrap();
        assert_eq!(session.scene().grid_len(), grid_lines);
    }

    #[test]
    fn test_reset_and_load() {
        let mut session = session();
        draw(&mut session, &[Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        let saved = session.records();

        session.reset().unwrap();
        assert!(session.records().is_empty());
        assert!(!session.can_undo());

        session.load(saved.clone()).unwrap();
        assert_eq!(session.records(), saved);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_restore_history() {
        let mut session = session();
        let record = SceneRecord::new(
            Shape::Room(Room::new("A", square(0.0, 0.0, 100.0), RoomType::Internal)),
            StrokeStyle::default(),
        );
        session.restore_history(HistoryStack {
            past: vec![SceneSnapshot::new(vec![record])],
            future: Vec::new(),
        });

        assert!(session.undo().unwrap());
        assert_eq!(session.rooms().len(), 1);
        assert!((session.gia().area_m2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disposed_session_rejects_edits() {
        let mut session = session();
        session.refresh_grid();
        session.dispose();

        assert!(!session.grid().is_listening());
        session.begin_stroke(Point::ZERO);
        session.extend_stroke(Point::new(10.0, 0.0));
        assert_eq!(session.end_stroke(), Err(SceneError::Disposed));
        assert!(!session.can_undo());
        assert!(!session.poll_viewport(Instant::now() + Duration::from_secs(1)));
    }
}
