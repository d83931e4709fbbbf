//! Polygon area and gross internal area (GIA) calculation.

use crate::config::ConfigError;
use crate::geometry::distance;
use crate::shapes::{Room, RoomType};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Scene units per metre.
pub const PIXELS_PER_METER: f64 = 100.0;

/// Square feet in one square metre.
pub const SQ_FT_PER_SQ_M: f64 = 10.764;

/// Default number of decimals in reported areas.
pub const DEFAULT_PRECISION: u32 = 2;

/// Area calculation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    pub pixels_per_meter: f64,
    /// Decimal places used for rounding results.
    pub precision: u32,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            pixels_per_meter: PIXELS_PER_METER,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl AreaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.pixels_per_meter.is_finite() && self.pixels_per_meter > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "area.pixels_per_meter",
                value: self.pixels_per_meter,
            });
        }
        Ok(())
    }
}

/// Area of a closed polygon using the Shoelace formula. Never negative.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let twice_signed: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice_signed.abs() / 2.0
}

/// Length of the closed outline through `points`.
pub fn polygon_perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len();
    (0..n)
        .map(|i| distance(points[i], points[(i + 1) % n]))
        .sum()
}

/// Convert an area in square scene units to square metres.
pub fn pixels_to_square_meters(area_px: f64, pixels_per_meter: f64) -> f64 {
    area_px / (pixels_per_meter * pixels_per_meter)
}

pub fn square_meters_to_square_feet(m2: f64) -> f64 {
    m2 * SQ_FT_PER_SQ_M
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Format an area in square metres, e.g. `"1.23 m²"`.
pub fn format_area(m2: f64, precision: usize) -> String {
    format!("{:.*} m²", precision, m2)
}

/// Format an area in square feet, e.g. `"13.24 ft²"`.
pub fn format_area_sq_ft(ft2: f64, precision: usize) -> String {
    format!("{:.*} ft²", precision, ft2)
}

/// Per-room line of a GIA report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomArea {
    pub id: String,
    pub name: String,
    pub area_m2: f64,
    pub area_sq_ft: f64,
    #[serde(rename = "type")]
    pub room_type: RoomType,
}

/// Gross internal area report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiaResult {
    pub is_valid: bool,
    pub area_m2: f64,
    pub area_sq_ft: f64,
    /// Total perimeter of the internal rooms, in metres.
    pub perimeter: f64,
    pub rooms: Vec<RoomArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl GiaResult {
    /// An invalid result with zero areas and an explanation.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            area_m2: 0.0,
            area_sq_ft: 0.0,
            perimeter: 0.0,
            rooms: Vec::new(),
            error_message: Some(message.into()),
        }
    }

    /// Total area formatted in square metres.
    pub fn formatted(&self, precision: usize) -> String {
        format_area(self.area_m2, precision)
    }
}

/// Sum the floor area of every internal room.
///
/// External and excluded rooms are ignored. When no internal room remains the
/// result is marked invalid rather than failing.
pub fn calculate_gia(rooms: &[Room], config: &AreaConfig) -> GiaResult {
    let internal: Vec<&Room> = rooms.iter().filter(|r| r.is_internal()).collect();
    if internal.is_empty() {
        return GiaResult::invalid("No internal rooms to calculate GIA from");
    }

    let ppm = config.pixels_per_meter;
    let mut total_m2 = 0.0;
    let mut total_perimeter = 0.0;
    let mut breakdown = Vec::with_capacity(internal.len());

    for room in internal {
        let area_m2 = pixels_to_square_meters(polygon_area(&room.points), ppm);
        total_m2 += area_m2;
        total_perimeter += polygon_perimeter(&room.points) / ppm;
        breakdown.push(RoomArea {
            id: room.id.clone(),
            name: room.name.clone(),
            area_m2: round_to(area_m2, config.precision),
            area_sq_ft: round_to(square_meters_to_square_feet(area_m2), config.precision),
            room_type: room.room_type,
        });
    }

    GiaResult {
        is_valid: true,
        area_m2: round_to(total_m2, config.precision),
        area_sq_ft: round_to(square_meters_to_square_feet(total_m2), config.precision),
        perimeter: round_to(total_perimeter, config.precision),
        rooms: breakdown,
        error_message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    #[test]
    fn test_polygon_area() {
        assert_eq!(polygon_area(&square(10.0)), 100.0);
        let triangle = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 10.0)];
        assert_eq!(polygon_area(&triangle), 50.0);
        assert_eq!(polygon_area(&[Point::ZERO, Point::new(5.0, 5.0)]), 0.0);
        assert_eq!(polygon_area(&[]), 0.0);
    }

    #[test]
    fn test_polygon_area_ignores_winding() {
        let mut reversed = square(10.0);
        reversed.reverse();
        assert_eq!(polygon_area(&reversed), 100.0);
    }

    #[test]
    fn test_polygon_perimeter() {
        assert_eq!(polygon_perimeter(&square(10.0)), 40.0);
        assert_eq!(polygon_perimeter(&[Point::ZERO]), 0.0);
        // Two points form a closed out-and-back loop
        assert_eq!(polygon_perimeter(&[Point::ZERO, Point::new(3.0, 4.0)]), 10.0);
    }

    #[test]
    fn test_unit_conversion() {
        assert!((pixels_to_square_meters(10_000.0, 100.0) - 1.0).abs() < 1e-12);
        assert!((square_meters_to_square_feet(2.0) - 21.528).abs() < 1e-12);
    }

    #[test]
    fn test_gia_empty() {
        let result = calculate_gia(&[], &AreaConfig::default());
        assert!(!result.is_valid);
        assert_eq!(result.area_m2, 0.0);
        assert!(result.error_message.is_some());
    }

    #[test]
    fn test_gia_ignores_non_internal_rooms() {
        let rooms = vec![
            Room::new("Garden", square(1000.0), RoomType::External),
            Room::new("Void", square(100.0), RoomType::Excluded),
        ];
        let result = calculate_gia(&rooms, &AreaConfig::default());
        assert!(!result.is_valid);
        assert!(result.rooms.is_empty());
    }

    #[test]
    fn test_gia_small_room() {
        let rooms = vec![Room::new("Closet", square(10.0), RoomType::Internal)];
        let result = calculate_gia(&rooms, &AreaConfig::default());
        assert!(result.is_valid);
        assert!((result.area_m2 - 0.01).abs() < 1e-9);
        assert_eq!(result.rooms.len(), 1);
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_gia_sums_internal_rooms() {
        let mut offset = square(300.0);
        for p in &mut offset {
            p.x += 500.0;
        }
        let rooms = vec![
            Room::new("Living", square(500.0), RoomType::Internal),
            Room::new("Bed", offset, RoomType::Internal),
            Room::new("Patio", square(200.0), RoomType::External),
        ];
        let result = calculate_gia(&rooms, &AreaConfig::default());
        assert!(result.is_valid);
        assert!((result.area_m2 - 34.0).abs() < 1e-9);
        assert!((result.area_sq_ft - 365.98).abs() < 1e-9);
        assert!((result.perimeter - 32.0).abs() < 1e-9);
        assert_eq!(result.rooms.len(), 2);
        assert_eq!(result.rooms[0].name, "Living");
        assert!((result.rooms[0].area_m2 - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_gia_respects_scale_and_precision() {
        let rooms = vec![Room::new("Hall", square(100.0), RoomType::Internal)];
        let config = AreaConfig {
            pixels_per_meter: 40.0,
            precision: 3,
        };
        let result = calculate_gia(&rooms, &config);
        assert!((result.area_m2 - 6.25).abs() < 1e-9);
        assert!((result.area_sq_ft - 67.275).abs() < 1e-9);
    }

    #[test]
    fn test_format_area() {
        assert_eq!(format_area(1.2345, 2), "1.23 m²");
        assert_eq!(format_area(0.0, 1), "0.0 m²");
        assert_eq!(format_area_sq_ft(13.0, 2), "13.00 ft²");
    }

    #[test]
    fn test_gia_serializes_camel_case() {
        let rooms = vec![Room::new("Closet", square(10.0), RoomType::Internal)];
        let json = serde_json::to_value(calculate_gia(&rooms, &AreaConfig::default())).unwrap();
        assert_eq!(json["isValid"], true);
        assert!(json.get("areaM2").is_some());
        assert_eq!(json["rooms"][0]["type"], "internal");
        assert!(json.get("errorMessage").is_none());
    }

    #[test]
    fn test_area_config_validation() {
        assert!(AreaConfig::default().validate().is_ok());
        let bad = AreaConfig {
            pixels_per_meter: 0.0,
            ..AreaConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
