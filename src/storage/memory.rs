use super::backup::BackupManager;
use super::error::StoreError;
use super::operators::Operators;
use super::types::{Deadline, Key, Predicate, Range, Update, Value};
use super::{Bucket, Store};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

/// In-memory store: `bucket name -> MemoryBucket`, each bucket a `DashMap`.
pub struct MemoryStore {
    buckets: DashMap<String, Arc<MemoryBucket>>,
    operators: Arc<Operators>,
    backups: Arc<BackupManager>,
}

impl MemoryStore {
    pub fn new(operators: Arc<Operators>, backups: BackupManager) -> Arc<Self> {
        Arc::new(Self {
            buckets: DashMap::new(),
            operators,
            backups: Arc::new(backups),
        })
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn entry_count(&self) -> usize {
        self.buckets
            .iter()
            .map(|bucket| bucket.value().entries.len())
            .sum()
    }
}

impl Store for MemoryStore {
    fn get_or_create_bucket(&self, name: &str) -> Arc<dyn Bucket> {
        let bucket = self
            .buckets
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating bucket '{}'", name);
                Arc::new(MemoryBucket {
                    name: name.to_string(),
                    entries: DashMap::new(),
                    operators: self.operators.clone(),
                    backups: self.backups.clone(),
                })
            })
            .value()
            .clone();
        bucket
    }

    fn get_bucket(&self, name: &str) -> Option<Arc<dyn Bucket>> {
        self.buckets
            .get(name)
            .map(|bucket| bucket.value().clone() as Arc<dyn Bucket>)
    }

    fn remove_bucket(&self, name: &str) -> bool {
        let removed = self.buckets.remove(name).is_some();
        if removed {
            tracing::info!("Removed bucket '{}'", name);
        }
        removed
    }

    fn buckets(&self) -> BTreeSet<String> {
        self.buckets.iter().map(|entry| entry.key().clone()).collect()
    }

    fn operators(&self) -> &Arc<Operators> {
        &self.operators
    }

    fn backups(&self) -> &BackupManager {
        &self.backups
    }
}

pub struct MemoryBucket {
    name: String,
    entries: DashMap<Key, Value>,
    operators: Arc<Operators>,
    backups: Arc<BackupManager>,
}

impl MemoryBucket {
    fn snapshot(&self) -> Vec<(Key, Value)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &Key) -> Option<Value> {
        self.entries.get(key).map(|value| value.value().clone())
    }

    fn conditional_get(&self, key: &Key, predicate: &Predicate) -> Result<Option<Value>, StoreError> {
        let matches = self.operators.matcher(predicate)?;
        Ok(self.get(key).filter(|value| matches(key, value)))
    }

    fn put(&self, key: Key, value: Value) {
        self.entries.insert(key, value);
    }

    fn conditional_put(&self, key: Key, value: Value, predicate: &Predicate) -> Result<(), StoreError> {
        let matches = self.operators.matcher(predicate)?;
        match self.entries.entry(key) {
            Entry::Occupied(mut existing) => {
                if !matches(existing.key(), existing.get()) {
                    return Err(StoreError::ConditionFailed {
                        bucket: self.name.clone(),
                        key: existing.key().to_string(),
                    });
                }
                existing.insert(value);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(value);
            }
        }
        Ok(())
    }

    fn remove(&self, key: &Key) -> Option<Value> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    fn update(&self, key: &Key, update: &Update) -> Result<Value, StoreError> {
        let function = self.operators.function(&update.function)?;
        let deadline = Deadline::after(Duration::from_millis(update.timeout_ms));

        // Holding the entry guard keeps concurrent writers of this key out
        // while the function runs.
        let mut current = self
            .entries
            .get_mut(key)
            .ok_or_else(|| StoreError::KeyNotFound {
                bucket: self.name.clone(),
                key: key.to_string(),
            })?;

        let updated = function(key, current.value(), &update.parameters, &deadline)?;
        deadline.check(&update.function)?;

        *current = updated.clone();
        Ok(updated)
    }

    fn keys(&self) -> BTreeSet<Key> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    fn range(&self, range: &Range, predicate: Option<&Predicate>) -> Result<Vec<(Key, Value)>, StoreError> {
        let comparator = self.operators.comparator(range.comparator_name())?;
        let matches = predicate.map(|p| self.operators.matcher(p)).transpose()?;

        let mut selected: Vec<(Key, Value)> = self
            .snapshot()
            .into_iter()
            .filter(|(key, _)| comparator(&range.start_key, key).is_le())
            .filter(|(key, _)| match &range.end_key {
                Some(end) => comparator(key, end).is_le(),
                None => true,
            })
            .filter(|(key, value)| matches.as_ref().is_none_or(|m| m(key, value)))
            .collect();

        selected.sort_by(|(a, _), (b, _)| comparator(a, b));
        if range.limit > 0 {
            selected.truncate(range.limit);
        }
        Ok(selected)
    }

    fn query(&self, predicate: &Predicate) -> Result<BTreeMap<Key, Value>, StoreError> {
        let matches = self.operators.matcher(predicate)?;
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|(key, value)| matches(key, value))
            .collect())
    }

    fn import_backup(&self, source: &str) -> Result<usize, StoreError> {
        let entries = self.backups.import(&self.name, source)?;
        let imported = entries.len();
        for (key, value) in entries {
            self.entries.insert(key, value);
        }
        Ok(imported)
    }

    fn export_backup(&self, destination: &str) -> Result<usize, StoreError> {
        let mut entries = self.snapshot();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        self.backups.export(&self.name, destination, entries)
    }
}
