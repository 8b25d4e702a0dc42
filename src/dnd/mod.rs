pub mod collision;
pub mod controller;
pub mod geometry;
pub mod item;
pub mod scheduler;

pub use collision::{Collision, CollisionDetector, Strategy};
pub use controller::{DragController, DropOutcome};
pub use geometry::{Point, Rect};
pub use item::{DragItem, ParseDragItemError};
pub use scheduler::FrameScheduler;
