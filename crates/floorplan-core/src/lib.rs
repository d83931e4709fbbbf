//! Floor-plan engine core library
//!
//! Geometry, straightening, area, background grid and undo/redo history for
//! drawing floor plans. Rendering is left to whatever implements [`Scene`].

pub mod area;
pub mod camera;
pub mod config;
pub mod geometry;
pub mod grid;
pub mod history;
pub mod scene;
pub mod session;
pub mod shapes;
pub mod storage;
pub mod straighten;

pub use area::{AreaConfig, GiaResult, RoomArea, calculate_gia, format_area, polygon_area};
pub use camera::Camera;
pub use config::{ConfigError, EngineConfig, HistoryConfig};
pub use geometry::Line;
pub use grid::{GridConfig, GridLine, GridRenderer, GridState, ViewportBounds};
pub use history::{HistoryManager, HistoryStack, SceneSnapshot};
pub use scene::{MemoryScene, Scene, SceneError, SceneObject, SceneResult, SceneState};
pub use session::Session;
pub use shapes::{Room, RoomType, SceneRecord, Shape, ShapeId, Stroke, StrokeStyle};
pub use storage::{FileStorage, HistoryAutoSave, MemoryStorage, Storage, StorageError};
pub use straighten::{StraightenOptions, straighten_line, straighten_polygon, straighten_stroke};
