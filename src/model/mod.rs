pub mod config;
pub mod entity;
pub mod list;

pub use config::*;
pub use entity::*;
pub use list::*;
