//! Drawing object model for floor plans.
//!
//! Every concept has exactly one canonical type here. Anything that arrives
//! from the UI goes through [`SceneRecord::normalize`] before it reaches a
//! [`Scene`](crate::scene::Scene).

use crate::geometry::{EPSILON, Line, distance};
use kurbo::Point;
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for scene objects.
pub type ShapeId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn gray(level: u8, alpha: u8) -> Self {
        Self::new(level, level, level, alpha)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Stroke style for drawing objects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: SerializableColor,
    pub width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            width: 2.0,
        }
    }
}

/// A freehand stroke as captured from the pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Points in drawing order.
    pub points: Vec<Point>,
    pub style: StrokeStyle,
}

impl Stroke {
    pub fn new(style: StrokeStyle) -> Self {
        Self {
            points: Vec::new(),
            style,
        }
    }

    pub fn from_points(points: Vec<Point>, style: StrokeStyle) -> Self {
        Self { points, style }
    }

    /// Add a point, skipping exact repeats of the last one.
    pub fn add_point(&mut self, point: Point) {
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Normalize into a scene record, consuming the stroke.
    pub fn into_record(self) -> Option<SceneRecord> {
        SceneRecord::normalize(Shape::Stroke { points: self.points }, self.style)
    }
}

/// How a room counts towards the gross internal area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    #[default]
    Internal,
    External,
    Excluded,
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::External => write!(f, "external"),
            Self::Excluded => write!(f, "excluded"),
        }
    }
}

impl FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            "excluded" => Ok(Self::Excluded),
            _ => Err(format!("Unknown room type: {}", s)),
        }
    }
}

/// A named, closed room outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    /// Outline vertices; the last edge connects back to the first.
    pub points: Vec<Point>,
    #[serde(rename = "type", default)]
    pub room_type: RoomType,
}

impl Room {
    pub fn new(name: impl Into<String>, points: Vec<Point>, room_type: RoomType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            points,
            room_type,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.room_type == RoomType::Internal
    }
}

/// Geometry of a drawing object, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "geometry", rename_all = "lowercase")]
pub enum Shape {
    /// Freehand polyline.
    Stroke { points: Vec<Point> },
    /// Straight wall segment.
    Wall(Line),
    /// Closed room outline.
    Room(Room),
}

impl Shape {
    /// Short name of the shape kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Stroke { .. } => "stroke",
            Shape::Wall(_) => "wall",
            Shape::Room(_) => "room",
        }
    }

    /// Room data, if this shape is a room.
    pub fn as_room(&self) -> Option<&Room> {
        match self {
            Shape::Room(room) => Some(room),
            _ => None,
        }
    }
}

/// A serialized drawing object as stored in a scene or snapshot:
/// `{ id, type, geometry, style }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub id: ShapeId,
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(default)]
    pub style: StrokeStyle,
}

impl SceneRecord {
    pub fn new(shape: Shape, style: StrokeStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            shape,
            style,
        }
    }

    /// Convert UI input into its canonical record.
    ///
    /// Empty strokes are dropped, two-point strokes become walls (a single
    /// point stays a dot-like stroke), zero-length walls are dropped, and rooms
    /// with fewer than three vertices are dropped.
    pub fn normalize(shape: Shape, style: StrokeStyle) -> Option<Self> {
        let shape = match shape {
            Shape::Stroke { points } => {
                if points.is_empty() {
                    return None;
                }
                if points.len() == 2 {
                    let (start, end) = (points[0], points[1]);
                    if distance(start, end) < EPSILON {
                        Shape::Stroke { points: vec![start] }
                    } else {
                        Shape::Wall(Line::new(start, end))
                    }
                } else {
                    Shape::Stroke { points }
                }
            }
            Shape::Wall(line) if line.is_degenerate() => return None,
            Shape::Room(room) if room.points.len() < 3 => return None,
            other => other,
        };
        Some(Self::new(shape, style))
    }
}
