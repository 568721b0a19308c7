// src/store/repository.rs
use anyhow::{bail, Context, Result};
use log::{debug, warn};
use serde_json::Value;

use super::{Collection, KeyValueStore};
use crate::models::core::{now_timestamp, record_str, Record};

/// Typed access to one collection of a [`KeyValueStore`].
pub struct RecordRepository<'a, S: KeyValueStore + ?Sized> {
    store: &'a mut S,
    collection: Collection,
}

impl<'a, S: KeyValueStore + ?Sized> RecordRepository<'a, S> {
    pub fn new(store: &'a mut S, collection: Collection) -> Self {
        Self { store, collection }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// All records. A collection that was never written reads as empty.
    pub fn list(&self) -> Result<Vec<Record>> {
        load_records(&*self.store, self.collection)
    }

    pub fn get(&self, id: &str) -> Result<Option<Record>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|record| record_str(record, "id").as_deref() == Some(id)))
    }

    /// Inserts the record, or replaces the stored record with the same `id`.
    pub fn upsert(&mut self, mut record: Record) -> Result<Record> {
        let Some(id) = record_str(&record, "id") else {
            bail!("Cannot upsert into {} without an 'id' field", self.collection);
        };
        record.insert("lastModified".to_string(), Value::String(now_timestamp()));

        let mut records = self.list()?;
        match records
            .iter_mut()
            .find(|existing| record_str(existing, "id").as_deref() == Some(id.as_str()))
        {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.replace_all(&records)?;
        Ok(record)
    }

    /// Returns whether a record was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let mut records = self.list()?;
        let before = records.len();
        records.retain(|record| record_str(record, "id").as_deref() != Some(id));
        if records.len() == before {
            return Ok(false);
        }
        self.replace_all(&records)?;
        Ok(true)
    }

    /// Writes the whole collection in one store call.
    pub fn replace_all(&mut self, records: &[Record]) -> Result<()> {
        save_records(&mut *self.store, self.collection, records)
    }
}

/// Reads a collection without taking a mutable borrow of the store.
pub fn load_records<S: KeyValueStore + ?Sized>(store: &S, collection: Collection) -> Result<Vec<Record>> {
    let Some(raw) = store
        .get(collection.key())
        .with_context(|| format!("Failed reading collection '{}'", collection))?
    else {
        debug!("Collection '{}' not found, starting empty", collection);
        return Ok(Vec::new());
    };

    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Collection '{}' is not valid JSON", collection))?;
    let Value::Array(items) = parsed else {
        bail!("Collection '{}' is not a JSON array", collection);
    };

    let total = items.len();
    let records: Vec<Record> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect();
    if records.len() != total {
        warn!(
            "Collection '{}': ignored {} non-object entries",
            collection,
            total - records.len()
        );
    }
    Ok(records)
}

pub fn save_records<S: KeyValueStore + ?Sized>(
    store: &mut S,
    collection: Collection,
    records: &[Record],
) -> Result<()> {
    let serialized = serde_json::to_string(records)
        .with_context(|| format!("Failed serializing collection '{}'", collection))?;
    store
        .set(collection.key(), &serialized)
        .with_context(|| format!("Failed writing collection '{}'", collection))?;
    debug!("Saved {} records to '{}'", records.len(), collection);
    Ok(())
}
