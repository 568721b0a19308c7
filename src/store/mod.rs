// src/store/mod.rs
pub mod file;
pub mod memory;
pub mod repository;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use repository::RecordRepository;

use anyhow::Result;
use std::fmt;

use crate::models::core::RecordType;

/// Opaque string key-value store holding one JSON blob per collection.
///
/// Every mutation is a whole-blob read-modify-write. Callers hold `&mut` for
/// the duration, which serializes access inside one process; two processes
/// sharing the same backing store can still lose each other's writes.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Patients,
    Providers,
}

impl Collection {
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Providers => "providers",
        }
    }
}

impl From<RecordType> for Collection {
    fn from(record_type: RecordType) -> Self {
        match record_type {
            RecordType::Patients => Collection::Patients,
            RecordType::Providers => Collection::Providers,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
