pub mod adapter;
pub mod memory;
pub mod store;

pub use adapter::{Hydration, InitState, Level, Notification, SyncAdapter, SyncError};
pub use memory::MemoryStore;
pub use store::{DocumentStore, StoreError};
