pub mod sqlite;
pub mod storage;
pub mod tables;

pub use sqlite::Database;
pub use storage::{KeyValueStorage, MemoryStorage};
