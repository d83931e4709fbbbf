//! Angle straightening for lines, strokes and polygons.
//!
//! Hand-drawn input that is close to horizontal, vertical or a 45° diagonal is
//! snapped onto that exact direction. Everything further away than the caller's
//! threshold is left exactly as drawn.

use crate::geometry::{EPSILON, angle, angle_difference, distance, perpendicular_distance};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Horizontal and vertical directions, in degrees.
pub const CARDINAL_ANGLES: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

/// Diagonal directions, in degrees.
pub const DIAGONAL_ANGLES: [f64; 4] = [45.0, 135.0, 225.0, 315.0];

/// Default straightening threshold in degrees.
pub const DEFAULT_THRESHOLD_DEGREES: f64 = 5.0;

/// Smallest deviation allowed for a stroke to count as one straight gesture,
/// in scene units. Keeps short strokes from being rejected over jitter.
pub const MIN_COLLINEAR_TOLERANCE: f64 = 2.0;

/// Straightening options carried in the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StraightenOptions {
    /// Whether completed strokes are straightened automatically.
    pub enabled: bool,
    /// Maximum angular distance to a standard angle, in degrees.
    pub threshold_degrees: f64,
}

impl Default for StraightenOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_degrees: DEFAULT_THRESHOLD_DEGREES,
        }
    }
}

/// Which family of standard angles a direction was snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapDirection {
    Horizontal,
    Vertical,
    Diagonal,
}

/// Find the closest angle in `targets` and its distance from `degrees`.
fn nearest(degrees: f64, targets: &[f64]) -> (f64, f64) {
    targets
        .iter()
        .map(|&target| (target, angle_difference(degrees, target)))
        .fold((0.0, f64::INFINITY), |best, candidate| {
            if candidate.1 < best.1 { candidate } else { best }
        })
}

/// Classify the direction from `start` to `end`, if it is within
/// `threshold_degrees` of a standard angle. Cardinal directions win ties.
pub fn classify(start: Point, end: Point, threshold_degrees: f64) -> Option<SnapDirection> {
    if distance(start, end) < EPSILON {
        return None;
    }
    let a = angle(start, end);

    let (cardinal, cardinal_diff) = nearest(a, &CARDINAL_ANGLES);
    if cardinal_diff <= threshold_degrees {
        return Some(if cardinal == 0.0 || cardinal == 180.0 {
            SnapDirection::Horizontal
        } else {
            SnapDirection::Vertical
        });
    }

    let (_, diagonal_diff) = nearest(a, &DIAGONAL_ANGLES);
    if diagonal_diff <= threshold_degrees {
        return Some(SnapDirection::Diagonal);
    }

    None
}

/// Straighten a single line, returning the (possibly adjusted) end point.
///
/// Horizontal snaps copy `start.y`, vertical snaps copy `start.x`. Diagonal
/// snaps make `|dx| == |dy|` using the mean of both magnitudes and keep the
/// sign of each. Lines outside the threshold are returned unchanged.
pub fn straighten_line(start: Point, end: Point, threshold_degrees: f64) -> Point {
    match classify(start, end, threshold_degrees) {
        Some(SnapDirection::Horizontal) => Point::new(end.x, start.y),
        Some(SnapDirection::Vertical) => Point::new(start.x, end.y),
        Some(SnapDirection::Diagonal) => {
            let dx = end.x - start.x;
            let dy = end.y - start.y;
            if (dx.abs() - dy.abs()).abs() < EPSILON {
                return end;
            }
            let magnitude = (dx.abs() + dy.abs()) / 2.0;
            Point::new(
                start.x + magnitude * dx.signum(),
                start.y + magnitude * dy.signum(),
            )
        }
        None => end,
    }
}

/// Straighten a multi-point stroke.
///
/// Strokes of more than two points collapse to a single straightened segment
/// only when every intermediate point projects between the endpoints and
/// stays close to the first-to-last line. The allowed deviation grows with the
/// distance to the nearer endpoint, so a spike next to either end is never
/// absorbed. Anything that is not one straight gesture is returned unchanged.
pub fn straighten_stroke(points: &[Point], threshold_degrees: f64) -> Vec<Point> {
    match points {
        [] | [_] => points.to_vec(),
        [start, end] => vec![*start, straighten_line(*start, *end, threshold_degrees)],
        [first, .., last] => {
            let length = distance(*first, *last);
            if length < EPSILON {
                return points.to_vec();
            }

            let direction = (*last - *first) / length;
            let is_straight = points[1..points.len() - 1].iter().all(|&p| {
                let along = (p - *first).dot(direction);
                if !(0.0..=length).contains(&along) {
                    return false;
                }
                let tolerance = collinear_tolerance(along.min(length - along), threshold_degrees);
                perpendicular_distance(p, *first, *last) <= tolerance
            });

            if is_straight {
                vec![*first, straighten_line(*first, *last, threshold_degrees)]
            } else {
                points.to_vec()
            }
        }
    }
}

/// Allowed deviation for a point `reach` units from the nearer stroke end.
fn collinear_tolerance(reach: f64, threshold_degrees: f64) -> f64 {
    let angular = reach * threshold_degrees.to_radians().tan().abs();
    angular.max(MIN_COLLINEAR_TOLERANCE)
}

/// Check that every edge of a closed polygon is near horizontal or vertical.
///
/// Polygons with fewer than three points never have aligned walls.
/// Zero-length edges are ignored.
pub fn has_aligned_walls(polygon: &[Point], threshold_degrees: f64) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    edges(polygon)
        .filter(|(a, b)| distance(*a, *b) >= EPSILON)
        .all(|(a, b)| {
            let (_, diff) = nearest(angle(a, b), &CARDINAL_ANGLES);
            diff <= threshold_degrees
        })
}

/// Iterate the edges of a closed polygon, including the closing edge.
fn edges(polygon: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| (polygon[i], polygon[(i + 1) % n]))
}

/// Straighten a closed polygon vertex by vertex.
///
/// Each vertex is snapped relative to its already-processed predecessor, so
/// corrections propagate around the outline. The first vertex is the anchor
/// and never moves. After the forward pass the last vertex is also snapped
/// against the closing edge, but only when that keeps its incoming edge on
/// the direction it already had.
pub fn straighten_polygon(polygon: &[Point], threshold_degrees: f64) -> Vec<Point> {
    match polygon {
        [] | [_] => polygon.to_vec(),
        [start, end] => vec![*start, straighten_line(*start, *end, threshold_degrees)],
        [first, ..] => {
            let mut out = Vec::with_capacity(polygon.len());
            out.push(*first);
            for &vertex in &polygon[1..] {
                let prev = out[out.len() - 1];
                out.push(straighten_line(prev, vertex, threshold_degrees));
            }

            let last_index = out.len() - 1;
            let last = out[last_index];
            let before_last = out[last_index - 1];
            // Snapping the closing edge moves the last vertex, never the anchor
            let closed = straighten_line(*first, last, threshold_degrees);

            if closed != last
                && classify(before_last, closed, threshold_degrees)
                    == classify(before_last, last, threshold_degrees)
                && straighten_line(before_last, closed, threshold_degrees) == closed
            {
                out[last_index] = closed;
            }
            out
        }
    }
}
