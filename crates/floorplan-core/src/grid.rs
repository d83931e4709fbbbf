//! Infinite background grid bounded to the viewport.
//!
//! Only the part of the grid around the visible area is generated. The
//! renderer keeps the bounds it generated for and skips regeneration until the
//! viewport has moved far enough to matter.

use crate::camera::Camera;
use crate::config::ConfigError;
use crate::geometry::{DEFAULT_TOLERANCE, is_exact_grid_multiple};
use crate::scene::{Scene, SceneError, SceneObject, SceneResult};
use crate::shapes::{SerializableColor, ShapeId};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Minor grid spacing in scene units (10 cm at the default scale).
pub const SMALL_GRID: f64 = 10.0;

/// Major grid spacing in scene units (1 m at the default scale).
pub const LARGE_GRID: f64 = 100.0;

/// Default cap on generated lines across both axes.
pub const DEFAULT_MAX_LINES: usize = 1000;

/// Default margin generated beyond the visible area, in scene units.
pub const DEFAULT_VIEWPORT_PADDING: f64 = 200.0;

/// Default distance an edge must move before the grid is regenerated.
pub const DEFAULT_UPDATE_THRESHOLD: f64 = 50.0;

/// Default debounce for viewport change notifications.
pub const DEFAULT_VIEWPORT_DEBOUNCE_MS: u64 = 150;

/// Stroke appearance of one grid tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridTierStyle {
    pub color: SerializableColor,
    pub width: f64,
}

/// Grid generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub small_spacing: f64,
    pub large_spacing: f64,
    pub minor: GridTierStyle,
    pub major: GridTierStyle,
    pub viewport_padding: f64,
    pub max_lines: usize,
    pub update_threshold: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            small_spacing: SMALL_GRID,
            large_spacing: LARGE_GRID,
            minor: GridTierStyle {
                color: SerializableColor::gray(200, 100),
                width: 0.5,
            },
            major: GridTierStyle {
                color: SerializableColor::gray(160, 160),
                width: 1.0,
            },
            viewport_padding: DEFAULT_VIEWPORT_PADDING,
            max_lines: DEFAULT_MAX_LINES,
            update_threshold: DEFAULT_UPDATE_THRESHOLD,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("grid.small_spacing", self.small_spacing),
            ("grid.large_spacing", self.large_spacing),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field: name, value });
            }
        }
        for (name, value) in [
            ("grid.viewport_padding", self.viewport_padding),
            ("grid.update_threshold", self.update_threshold),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Negative { field: name, value });
            }
        }
        if self.max_lines == 0 {
            return Err(ConfigError::Zero { field: "grid.max_lines" });
        }
        Ok(())
    }
}

/// Scene-space rectangle the grid is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ViewportBounds {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Finite, with `left < right` and `top < bottom`.
    pub fn is_valid(&self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
            && self.left < self.right
            && self.top < self.bottom
    }

    /// Grow the bounds by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.left - margin,
            self.top - margin,
            self.right + margin,
            self.bottom + margin,
        )
    }
}

impl From<Rect> for ViewportBounds {
    fn from(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(rect.x0, rect.y0, rect.x1, rect.y1)
    }
}

/// Scene-space bounds of the visible canvas, expanded by `margin`.
pub fn viewport_bounds(canvas: Size, camera: &Camera, margin: f64) -> ViewportBounds {
    ViewportBounds::from(camera.visible_rect(canvas)).expand(margin)
}

/// True if any edge moved by more than `threshold` scene units.
pub fn bounds_changed_significantly(
    old: &ViewportBounds,
    new: &ViewportBounds,
    threshold: f64,
) -> bool {
    (old.left - new.left).abs() > threshold
        || (old.top - new.top).abs() > threshold
        || (old.right - new.right).abs() > threshold
        || (old.bottom - new.bottom).abs() > threshold
}

/// Grid line direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridOrientation {
    Vertical,
    Horizontal,
}

/// Grid line weight class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridTier {
    Minor,
    Major,
}

/// One generated background grid line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    pub id: ShapeId,
    pub orientation: GridOrientation,
    pub tier: GridTier,
    /// X for vertical lines, Y for horizontal ones.
    pub position: f64,
    pub start: Point,
    pub end: Point,
    pub color: SerializableColor,
    pub width: f64,
}

/// Positions of grid lines covering `[min, max]` at `step`, centred and capped at `cap`.
fn axis_positions(min: f64, max: f64, step: f64, cap: usize) -> Vec<f64> {
    let start = (min / step).floor() * step;
    let end = (max / step).ceil() * step;
    // Counted in f64 so that huge spans clamp instead of overflowing
    let needed = ((end - start) / step).round() + 1.0;
    if !needed.is_finite() {
        return Vec::new();
    }

    let (first, count) = if needed > cap as f64 {
        let skip = ((needed - cap as f64) / 2.0).floor();
        (((start + skip * step) / step).round() * step, cap)
    } else {
        (start, needed as usize)
    };
    (0..count).map(|i| first + i as f64 * step).collect()
}

/// Generate grid lines covering `bounds`.
///
/// Lines sit on multiples of the small spacing and are tagged major where they
/// also fall on the large spacing. When covering the bounds at the small
/// spacing would need more than `max_lines / 2` lines on an axis, only major
/// lines are generated. Each axis is capped at `max_lines / 2` either way.
pub fn create_grid_lines(bounds: &ViewportBounds, config: &GridConfig) -> Vec<GridLine> {
    if !bounds.is_valid() {
        return Vec::new();
    }

    let per_axis = config.max_lines / 2;
    let minor_needed = (bounds.width().max(bounds.height()) / config.small_spacing).ceil() + 2.0;
    let step = if minor_needed <= per_axis as f64 {
        config.small_spacing
    } else {
        log::debug!(
            "Grid needs ~{} minor lines per axis (cap {}), using major spacing only",
            minor_needed,
            per_axis
        );
        config.large_spacing
    };

    let xs = axis_positions(bounds.left, bounds.right, step, per_axis);
    let ys = axis_positions(bounds.top, bounds.bottom, step, per_axis);
    let (Some(&x0), Some(&x1), Some(&y0), Some(&y1)) =
        (xs.first(), xs.last(), ys.first(), ys.last())
    else {
        return Vec::new();
    };

    let make_line = |orientation: GridOrientation, position: f64, start: Point, end: Point| {
        let tier = if is_exact_grid_multiple(position, config.large_spacing, DEFAULT_TOLERANCE) {
            GridTier::Major
        } else {
            GridTier::Minor
        };
        let style = match tier {
            GridTier::Major => config.major,
            GridTier::Minor => config.minor,
        };
        GridLine {
            id: Uuid::new_v4(),
            orientation,
            tier,
            position,
            start,
            end,
            color: style.color,
            width: style.width,
        }
    };

    let mut lines = Vec::with_capacity(xs.len() + ys.len());
    lines.extend(xs.iter().map(|&x| {
        make_line(GridOrientation::Vertical, x, Point::new(x, y0), Point::new(x, y1))
    }));
    lines.extend(ys.iter().map(|&y| {
        make_line(GridOrientation::Horizontal, y, Point::new(x0, y), Point::new(x1, y))
    }));
    lines
}

/// Lifecycle of the grid renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridState {
    #[default]
    Uninitialized,
    Active,
}

/// Keeps the scene's grid layer in sync with the viewport.
#[derive(Debug)]
pub struct GridRenderer {
    config: GridConfig,
    state: GridState,
    /// Bounds the current lines were generated for.
    bounds: Option<ViewportBounds>,
    line_ids: Vec<ShapeId>,
    listening: bool,
    generation_count: usize,
}

impl GridRenderer {
    /// Create a renderer, rejecting invalid configuration.
    pub fn new(config: GridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: GridState::Uninitialized,
            bounds: None,
            line_ids: Vec::new(),
            listening: true,
            generation_count: 0,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn state(&self) -> GridState {
        self.state
    }

    pub fn bounds(&self) -> Option<ViewportBounds> {
        self.bounds
    }

    /// Number of grid lines this renderer currently owns in the scene.
    pub fn line_count(&self) -> usize {
        self.line_ids.len()
    }

    /// How many times the grid has been regenerated.
    pub fn generation_count(&self) -> usize {
        self.generation_count
    }

    /// Whether viewport change notifications should reach this renderer.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Start reacting to viewport changes again after [`destroy`](Self::destroy).
    pub fn attach(&mut self) {
        self.listening = true;
    }

    /// Regenerate the grid if it is missing or the viewport moved enough.
    ///
    /// Returns true when new lines were generated. Failures are logged and
    /// leave the previous grid in place.
    pub fn update_grid(&mut self, canvas: Size, camera: &Camera, scene: &mut dyn Scene) -> bool {
        let bounds = viewport_bounds(canvas, camera, self.config.viewport_padding);

        if self.state == GridState::Active {
            if let Some(old) = &self.bounds {
                if !bounds_changed_significantly(old, &bounds, self.config.update_threshold) {
                    return false;
                }
            }
        }

        match self.regenerate(bounds, scene) {
            Ok(()) => {
                log::debug!(
                    "Grid regenerated with {} lines for {:?}",
                    self.line_ids.len(),
                    bounds
                );
                true
            }
            Err(e) => {
                log::warn!("Grid generation failed, keeping previous grid: {}", e);
                false
            }
        }
    }

    fn regenerate(&mut self, bounds: ViewportBounds, scene: &mut dyn Scene) -> SceneResult<()> {
        if !scene.is_active() {
            return Err(SceneError::Disposed);
        }

        let lines = create_grid_lines(&bounds, &self.config);
        self.remove_lines(scene)?;

        for line in lines {
            let id = line.id;
            scene.add(SceneObject::Grid(line))?;
            self.line_ids.push(id);
        }

        self.bounds = Some(bounds);
        self.state = GridState::Active;
        self.generation_count += 1;
        scene.request_render();
        Ok(())
    }

    fn remove_lines(&mut self, scene: &mut dyn Scene) -> SceneResult<()> {
        while let Some(id) = self.line_ids.pop() {
            if let Err(e) = scene.remove(id) {
                self.line_ids.push(id);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove every generated line. The next update regenerates from scratch.
    ///
    /// Returns false if the scene refused the removal; lines that could not be
    /// removed stay tracked.
    pub fn clear_grid(&mut self, scene: &mut dyn Scene) -> bool {
        if let Err(e) = self.remove_lines(scene) {
            log::warn!("Failed to clear grid: {}", e);
            return false;
        }
        self.bounds = None;
        self.state = GridState::Uninitialized;
        scene.request_render();
        true
    }

    /// Clear the grid and stop listening for viewport changes.
    pub fn destroy(&mut self, scene: &mut dyn Scene) -> bool {
        self.listening = false;
        self.clear_grid(scene)
    }
}

/// Collapses bursts of notifications into the last one, released once
/// `delay` has passed without a newer notification.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Record a new value, replacing any pending one.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Take the pending value if it has settled.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, at)) if now.saturating_duration_since(*at) >= self.delay => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// Take the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;
    use kurbo::Vec2;

    fn canvas() -> Size {
        Size::new(800.0, 600.0)
    }

    #[test]
    fn test_viewport_bounds_includes_margin() {
        let camera = Camera::new();
        let bounds = viewport_bounds(canvas(), &camera, 50.0);
        assert_eq!(bounds, ViewportBounds::new(-50.0, -50.0, 850.0, 650.0));
    }

    #[test]
    fn test_viewport_bounds_follows_zoom_and_pan() {
        let mut camera = Camera::new();
        camera.zoom = 2.0;
        camera.offset = Vec2::new(100.0, 0.0);
        let bounds = viewport_bounds(canvas(), &camera, 0.0);
        assert!((bounds.left + 50.0).abs() < 1e-9);
        assert!((bounds.right - 350.0).abs() < 1e-9);
        assert!((bounds.bottom - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_changed_significantly() {
        let a = ViewportBounds::new(0.0, 0.0, 100.0, 100.0);
        let b = ViewportBounds::new(10.0, 0.0, 110.0, 100.0);
        assert!(!bounds_changed_significantly(&a, &b, 10.0));
        assert!(bounds_changed_significantly(&a, &b, 9.0));
    }

    #[test]
    fn test_create_grid_lines_tags_tiers() {
        let config = GridConfig::default();
        let bounds = ViewportBounds::new(0.0, 0.0, 200.0, 100.0);
        let lines = create_grid_lines(&bounds, &config);

        let verticals: Vec<&GridLine> = lines
            .iter()
            .filter(|l| l.orientation == GridOrientation::Vertical)
            .collect();
        assert_eq!(verticals.len(), 21);
        let majors: Vec<f64> = verticals
            .iter()
            .filter(|l| l.tier == GridTier::Major)
            .map(|l| l.position)
            .collect();
        assert_eq!(majors, vec![0.0, 100.0, 200.0]);
        assert!(verticals.iter().all(|l| l.start.y == 0.0 && l.end.y == 100.0));
    }

    #[test]
    fn test_create_grid_lines_snaps_to_small_spacing() {
        let config = GridConfig::default();
        let bounds = ViewportBounds::new(-15.0, 3.0, 27.0, 44.0);
        let lines = create_grid_lines(&bounds, &config);
        for line in &lines {
            assert!(is_exact_grid_multiple(line.position, SMALL_GRID, DEFAULT_TOLERANCE));
        }
        let first = lines.first().unwrap();
        assert_eq!(first.position, -20.0);
    }

    #[test]
    fn test_create_grid_lines_respects_max_lines() {
        let config = GridConfig {
            max_lines: 100,
            ..GridConfig::default()
        };
        for size in [50.0, 400.0, 5_000.0, 1_000_000.0] {
            let bounds = ViewportBounds::new(-size, -size, size, size);
            let lines = create_grid_lines(&bounds, &config);
            assert!(lines.len() <= config.max_lines, "{} lines for {}", lines.len(), size);
            assert!(!lines.is_empty());
        }
    }

    #[test]
    fn test_zoomed_out_grid_uses_major_lines() {
        let config = GridConfig {
            max_lines: 100,
            ..GridConfig::default()
        };
        let bounds = ViewportBounds::new(0.0, 0.0, 2_000.0, 2_000.0);
        let lines = create_grid_lines(&bounds, &config);
        assert!(lines.iter().all(|l| l.tier == GridTier::Major));
        assert_eq!(lines.len(), 42);
    }

    #[test]
    fn test_create_grid_lines_huge_bounds_stay_capped() {
        let config = GridConfig {
            max_lines: 100,
            ..GridConfig::default()
        };
        let bounds = ViewportBounds::new(-1e30, -1e30, 1e30, 1e30);
        let lines = create_grid_lines(&bounds, &config);
        assert!(!lines.is_empty());
        assert!(lines.len() <= config.max_lines);

        let bounds = ViewportBounds::new(-1e308, -1e308, 1e308, 1e308);
        assert!(create_grid_lines(&bounds, &config).len() <= config.max_lines);
    }

    #[test]
    fn test_create_grid_lines_invalid_bounds() {
        let bounds = ViewportBounds::new(10.0, 0.0, 10.0, 100.0);
        assert!(create_grid_lines(&bounds, &GridConfig::default()).is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(GridConfig::default().validate().is_ok());
        let bad = GridConfig {
            small_spacing: 0.0,
            ..GridConfig::default()
        };
        assert!(GridRenderer::new(bad).is_err());
        let bad = GridConfig {
            max_lines: 0,
            ..GridConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = GridConfig {
            viewport_padding: -1.0,
            ..GridConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_update_grid_is_idempotent() {
        let mut scene = MemoryScene::new();
        let mut grid = GridRenderer::new(GridConfig::default()).unwrap();
        let camera = Camera::new();

        assert_eq!(grid.state(), GridState::Uninitialized);
        assert!(grid.update_grid(canvas(), &camera, &mut scene));
        assert!(!grid.update_grid(canvas(), &camera, &mut scene));
        assert_eq!(grid.generation_count(), 1);
        assert_eq!(grid.state(), GridState::Active);
        assert_eq!(scene.grid_len(), grid.line_count());
    }

    #[test]
    fn test_update_grid_regenerates_after_large_pan() {
        let mut scene = MemoryScene::new();
        let mut grid = GridRenderer::new(GridConfig::default()).unwrap();
        let mut camera = Camera::new();

        grid.update_grid(canvas(), &camera, &mut scene);
        camera.pan(Vec2::new(-10.0, 0.0));
        assert!(!grid.update_grid(canvas(), &camera, &mut scene));
        camera.pan(Vec2::new(-500.0, 0.0));
        assert!(grid.update_grid(canvas(), &camera, &mut scene));
        assert_eq!(grid.generation_count(), 2);
        // Old lines were replaced, not accumulated
        assert_eq!(scene.grid_len(), grid.line_count());
    }

    #[test]
    fn test_update_grid_on_disposed_scene_keeps_state() {
        let mut scene = MemoryScene::new();
        let mut grid = GridRenderer::new(GridConfig::default()).unwrap();
        let mut camera = Camera::new();
        grid.update_grid(canvas(), &camera, &mut scene);
        let bounds = grid.bounds();

        scene.dispose();
        camera.pan(Vec2::new(-1_000.0, 0.0));
        assert!(!grid.update_grid(canvas(), &camera, &mut scene));
        assert_eq!(grid.bounds(), bounds);
        assert_eq!(grid.state(), GridState::Active);
        assert_eq!(grid.generation_count(), 1);
    }

    #[test]
    fn test_clear_and_destroy() {
        let mut scene = MemoryScene::new();
        let mut grid = GridRenderer::new(GridConfig::default()).unwrap();
        let camera = Camera::new();

        grid.update_grid(canvas(), &camera, &mut scene);
        grid.clear_grid(&mut scene);
        assert_eq!(scene.grid_len(), 0);
        assert_eq!(grid.state(), GridState::Uninitialized);

        assert!(grid.update_grid(canvas(), &camera, &mut scene));
        assert!(grid.destroy(&mut scene));
        assert_eq!(scene.grid_len(), 0);
        assert!(!grid.is_listening());
        grid.attach();
        assert!(grid.is_listening());
    }

    #[test]
    fn test_failed_destroy_keeps_tracking_lines() {
        let mut scene = MemoryScene::new();
        let mut grid = GridRenderer::new(GridConfig::default()).unwrap();
        grid.update_grid(canvas(), &Camera::new(), &mut scene);
        let lines = grid.line_count();
        assert!(lines > 0);

        scene.dispose();
        assert!(!grid.destroy(&mut scene));
        assert!(!grid.is_listening());
        assert_eq!(grid.line_count(), lines);
        assert_eq!(grid.state(), GridState::Active);
    }

    #[test]
    fn test_debouncer_last_value_wins() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(150));
        debouncer.push(1, start);
        debouncer.push(2, start + Duration::from_millis(100));

        assert_eq!(debouncer.poll(start + Duration::from_millis(200)), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(250)), Some(2));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.flush(), None);
    }
}
