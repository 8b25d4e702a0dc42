pub mod config_io;
pub mod file_store;
pub mod lock;
pub mod watcher;
