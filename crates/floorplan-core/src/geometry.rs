//! Primitive point and line math.
//!
//! Angles are in degrees measured from the positive X axis towards the positive
//! Y axis, always normalized to `[0, 360)`. In screen coordinates (Y grows
//! downward) a vector pointing straight down is therefore at 90°.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Default tolerance for grid-multiple tests, in scene units.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Lengths below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// A straight segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Length of the segment.
    pub fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Center of the segment.
    pub fn midpoint(&self) -> Point {
        midpoint(self.start, self.end)
    }

    /// Direction of the segment from start to end, in degrees.
    pub fn angle(&self) -> f64 {
        angle(self.start, self.end)
    }

    /// True when the segment has (effectively) no length.
    pub fn is_degenerate(&self) -> bool {
        self.length() < EPSILON
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Arithmetic mean of two points.
pub fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Angle of the vector `b - a` in degrees, in `[0, 360)`.
///
/// Returns 0 when `a == b`.
pub fn angle(a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    normalize_angle(dy.atan2(dx).to_degrees())
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Smallest absolute difference between two angles, in `[0, 180]`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs().rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// Round each coordinate independently to the nearest multiple of `grid_size`.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    Point::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}

/// Check whether `value` is a multiple of `grid_size`, up to `tolerance`.
pub fn is_exact_grid_multiple(value: f64, grid_size: f64, tolerance: f64) -> bool {
    if grid_size <= 0.0 {
        return false;
    }
    let remainder = value - (value / grid_size).round() * grid_size;
    remainder.abs() <= tolerance
}

/// Check whether both coordinates of a point sit on grid lines.
pub fn is_point_aligned_with_grid(point: Point, grid_size: f64, tolerance: f64) -> bool {
    is_exact_grid_multiple(point.x, grid_size, tolerance)
        && is_exact_grid_multiple(point.y, grid_size, tolerance)
}

/// Check whether both endpoints of a line sit on grid intersections.
pub fn is_line_aligned_with_grid(line: &Line, grid_size: f64, tolerance: f64) -> bool {
    is_point_aligned_with_grid(line.start, grid_size, tolerance)
        && is_point_aligned_with_grid(line.end, grid_size, tolerance)
}

/// Distance from `point` to the infinite line through `line_start` and `line_end`.
pub fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;

    let line_len_sq = dx * dx + dy * dy;
    if line_len_sq < EPSILON {
        return distance(point, line_start);
    }

    // Twice the triangle area divided by the base
    let area2 = ((point.x - line_start.x) * dy - (point.y - line_start.y) * dx).abs();
    area2 / line_len_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_distance() {
        assert!(approx(distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)), 5.0));
        let p = Point::new(-12.5, 7.25);
        assert_eq!(distance(p, p), 0.0);
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(
            midpoint(Point::new(0.0, 0.0), Point::new(10.0, 20.0)),
            Point::new(5.0, 10.0)
        );
        let p = Point::new(3.5, -2.0);
        assert_eq!(midpoint(p, p), p);
    }

    #[test]
    fn test_angle_cardinals() {
        let origin = Point::ZERO;
        assert!(approx(angle(origin, Point::new(10.0, 0.0)), 0.0));
        assert!(approx(angle(origin, Point::new(0.0, 10.0)), 90.0));
        assert!(approx(angle(origin, Point::new(-10.0, 0.0)), 180.0));
        assert!(approx(angle(origin, Point::new(0.0, -10.0)), 270.0));
        assert!(approx(angle(origin, Point::new(10.0, 10.0)), 45.0));
    }

    #[test]
    fn test_angle_degenerate() {
        let p = Point::new(4.0, 4.0);
        assert_eq!(angle(p, p), 0.0);
    }

    #[test]
    fn test_angle_always_in_range() {
        for i in 0..72 {
            let rad = (i as f64 * 5.0).to_radians();
            let a = angle(Point::ZERO, Point::new(rad.cos(), rad.sin()));
            assert!((0.0..360.0).contains(&a), "angle {a} out of range");
        }
    }

    #[test]
    fn test_angle_difference_wraps() {
        assert!(approx(angle_difference(359.0, 1.0), 2.0));
        assert!(approx(angle_difference(0.0, 180.0), 180.0));
        assert!(approx(angle_difference(90.0, 85.0), 5.0));
    }

    #[test]
    fn test_snap_to_grid() {
        assert_eq!(snap_to_grid(Point::new(23.0, 47.0), 20.0), Point::new(20.0, 40.0));
        assert_eq!(snap_to_grid(Point::new(31.0, 51.0), 20.0), Point::new(40.0, 60.0));
        assert_eq!(snap_to_grid(Point::new(-31.0, 0.0), 20.0), Point::new(-40.0, 0.0));
    }

    #[test]
    fn test_exact_grid_multiple_absorbs_noise() {
        assert!(is_exact_grid_multiple(0.1 + 0.2, 0.3, DEFAULT_TOLERANCE));
        assert!(is_exact_grid_multiple(100.00001, 10.0, DEFAULT_TOLERANCE));
        assert!(!is_exact_grid_multiple(105.0, 10.0, DEFAULT_TOLERANCE));
        assert!(!is_exact_grid_multiple(10.0, 0.0, DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_line_alignment() {
        let aligned = Line::new(Point::new(0.0, 10.0), Point::new(30.0, 10.0));
        let off = Line::new(Point::new(0.0, 10.0), Point::new(31.0, 10.0));
        assert!(is_line_aligned_with_grid(&aligned, 10.0, DEFAULT_TOLERANCE));
        assert!(!is_line_aligned_with_grid(&off, 10.0, DEFAULT_TOLERANCE));
        assert!(is_point_aligned_with_grid(Point::new(20.0, -40.0), 10.0, DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_perpendicular_distance() {
        let d = perpendicular_distance(Point::new(5.0, 3.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!(approx(d, 3.0));
        // Degenerate line falls back to point distance
        let d = perpendicular_distance(Point::new(3.0, 4.0), Point::ZERO, Point::ZERO);
        assert!(approx(d, 5.0));
    }

    #[test]
    fn test_line_helpers() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(0.0, -10.0));
        assert!(approx(line.length(), 10.0));
        assert!(approx(line.angle(), 270.0));
        assert_eq!(line.midpoint(), Point::new(0.0, -5.0));
        assert!(!line.is_degenerate());
    }
}
