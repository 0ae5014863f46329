//! Local Storage Module
//!
//! The storage a node applies commands against. Commands only see the
//! capability traits below; `memory` provides the in-process implementation
//! used by the node binary and the tests.
//!
//! ## Core Concepts
//! - **Store**: a set of named buckets, created implicitly on first write.
//! - **Bucket**: a key/value collection supporting plain and conditional reads and
//!   writes, server-side updates, range and predicate queries, and backups.
//! - **Operators**: named conditions, comparators and update functions referenced
//!   by commands (see `operators`).

pub mod backup;
pub mod error;
pub mod memory;
pub mod operators;
pub mod types;

#[cfg(test)]
mod tests;

use backup::BackupManager;
use error::StoreError;
use operators::Operators;
use types::{Key, Predicate, Range, Update, Value};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub trait Store: Send + Sync {
    fn get_or_create_bucket(&self, name: &str) -> Arc<dyn Bucket>;

    fn get_bucket(&self, name: &str) -> Option<Arc<dyn Bucket>>;

    /// Returns `true` if the bucket existed.
    fn remove_bucket(&self, name: &str) -> bool;

    fn buckets(&self) -> BTreeSet<String>;

    /// Operators the buckets of this store resolve names against.
    fn operators(&self) -> &Arc<Operators>;

    fn backups(&self) -> &BackupManager;
}

pub trait Bucket: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &Key) -> Option<Value>;

    /// Returns the value only if it satisfies `predicate`.
    fn conditional_get(&self, key: &Key, predicate: &Predicate) -> Result<Option<Value>, StoreError>;

    fn put(&self, key: Key, value: Value);

    /// Writes unless the key holds a value that does not satisfy `predicate`.
    fn conditional_put(&self, key: Key, value: Value, predicate: &Predicate) -> Result<(), StoreError>;

    /// Returns the removed value, if any.
    fn remove(&self, key: &Key) -> Option<Value>;

    fn update(&self, key: &Key, update: &Update) -> Result<Value, StoreError>;

    fn keys(&self) -> BTreeSet<Key>;

    /// Entries inside `range`, ordered by the range comparator and truncated
    /// to the range limit.
    fn range(&self, range: &Range, predicate: Option<&Predicate>) -> Result<Vec<(Key, Value)>, StoreError>;

    fn query(&self, predicate: &Predicate) -> Result<BTreeMap<Key, Value>, StoreError>;

    fn import_backup(&self, source: &str) -> Result<usize, StoreError>;

    fn export_backup(&self, destination: &str) -> Result<usize, StoreError>;
}
