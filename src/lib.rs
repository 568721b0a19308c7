pub mod availability;
pub mod import;
pub mod matching;
pub mod models;
pub mod store;
pub mod utils;

// Re-export the entry points used by the binary and by embedders
pub use import::{Importer, ImportError, ImportOptions, ImportOutcome};
pub use models::core::{DuplicateStrategy, Record, RecordType};
pub use store::{Collection, FileStore, KeyValueStore, MemoryStore, RecordRepository};
