//! Floor-plan input files.
//!
//! A plan file lists rooms and freehand strokes in scene units:
//!
//! ```json
//! {
//!   "rooms": [
//!     { "name": "Kitchen", "type": "internal",
//!       "points": [{ "x": 0, "y": 0 }, { "x": 400, "y": 0 }, { "x": 400, "y": 300 }] }
//!   ],
//!   "strokes": [[{ "x": 0, "y": 0 }, { "x": 400, "y": 2 }]]
//! }
//! ```

use floorplan_core::{Room, RoomType, SceneResult, Session};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Failed to read plan: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid plan: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRoom {
    pub name: String,
    pub points: Vec<Point>,
    #[serde(rename = "type", default)]
    pub room_type: RoomType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub rooms: Vec<PlanRoom>,
    #[serde(default)]
    pub strokes: Vec<Vec<Point>>,
}

impl PlanFile {
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// What made it into the scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub rooms: usize,
    pub strokes: usize,
    pub skipped: usize,
}

/// Replay the plan through the session the way a user would draw it.
pub fn apply(plan: &PlanFile, session: &mut Session) -> SceneResult<ApplySummary> {
    let mut summary = ApplySummary::default();

    for points in &plan.strokes {
        let Some((first, rest)) = points.split_first() else {
            summary.skipped += 1;
            continue;
        };
        session.begin_stroke(*first);
        for point in rest {
            session.extend_stroke(*point);
        }
        match session.end_stroke()? {
            Some(_) => summary.strokes += 1,
            None => summary.skipped += 1,
        }
    }

    for room in &plan.rooms {
        let added = session.add_room(Room::new(
            room.name.clone(),
            room.points.clone(),
            room.room_type,
        ))?;
        match added {
            Some(_) => summary.rooms += 1,
            None => {
                log::warn!("Skipping room {:?}: fewer than three points", room.name);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}
