//! Command execution against local storage.
//!
//! Runs on the node owning the data, inside its staged executor. Read paths on
//! a bucket that does not exist yield an empty result; put and import create
//! the bucket. Exporting a missing bucket writes an empty backup, and updating
//! it fails with `KeyNotFound`; neither creates it.

use super::types::{Command, CommandKind, CommandResult};
use crate::storage::Store;
use crate::storage::error::StoreError;

use std::collections::{BTreeMap, BTreeSet};

impl Command {
    pub fn apply(&self, store: &dyn Store) -> Result<CommandResult, StoreError> {
        tracing::trace!("Applying {} ({})", self.name(), self.id);

        // Checked before any bucket lookup so a missing bucket cannot hide an
        // unknown operator.
        if let Some(predicate) = self.predicate() {
            store.operators().condition(&predicate.condition)?;
        }
        if let CommandKind::RangeQuery { range, .. } = &self.kind {
            store.operators().comparator(range.comparator_name())?;
        }

        match &self.kind {
            CommandKind::GetBuckets => Ok(CommandResult::Buckets(store.buckets())),

            CommandKind::GetValue {
                bucket,
                key,
                predicate,
            } => {
                let Some(bucket) = store.get_bucket(bucket) else {
                    return Ok(CommandResult::Value(None));
                };
                let value = match predicate {
                    Some(predicate) => bucket.conditional_get(key, predicate)?,
                    None => bucket.get(key),
                };
                Ok(CommandResult::Value(value))
            }

            CommandKind::GetValues {
                bucket,
                keys,
                predicate,
            } => {
                let Some(bucket) = store.get_bucket(bucket) else {
                    return Ok(CommandResult::Values(BTreeMap::new()));
                };
                let mut values = BTreeMap::new();
                for key in keys {
                    let value = match predicate {
                        Some(predicate) => bucket.conditional_get(key, predicate)?,
                        None => bucket.get(key),
                    };
                    // Absent keys are left out, never mapped to an empty marker.
                    if let Some(value) = value {
                        values.insert(key.clone(), value);
                    }
                }
                Ok(CommandResult::Values(values))
            }

            CommandKind::GetKeys { bucket } => Ok(CommandResult::Keys(
                store
                    .get_bucket(bucket)
                    .map(|bucket| bucket.keys())
                    .unwrap_or_else(BTreeSet::new),
            )),

            CommandKind::PutValue {
                bucket,
                key,
                value,
                predicate,
            } => {
                let bucket = store.get_or_create_bucket(bucket);
                match predicate {
                    Some(predicate) => {
                        bucket.conditional_put(key.clone(), value.clone(), predicate)?
                    }
                    None => bucket.put(key.clone(), value.clone()),
                }
                Ok(CommandResult::Done)
            }

            CommandKind::RemoveValue { bucket, key } => {
                if let Some(bucket) = store.get_bucket(bucket) {
                    bucket.remove(key);
                }
                Ok(CommandResult::Done)
            }

            CommandKind::UpdateValue {
                bucket,
                key,
                update,
            } => {
                let Some(existing) = store.get_bucket(bucket) else {
                    return Err(StoreError::KeyNotFound {
                        bucket: bucket.clone(),
                        key: key.to_string(),
                    });
                };
                let updated = existing.update(key, update)?;
                Ok(CommandResult::Value(Some(updated)))
            }

            CommandKind::RangeQuery {
                bucket,
                range,
                predicate,
            } => match store.get_bucket(bucket) {
                Some(bucket) => Ok(CommandResult::Entries(
                    bucket.range(range, predicate.as_ref())?,
                )),
                None => Ok(CommandResult::Entries(Vec::new())),
            },

            CommandKind::PredicateQuery { bucket, predicate } => match store.get_bucket(bucket) {
                Some(bucket) => Ok(CommandResult::Values(bucket.query(predicate)?)),
                None => Ok(CommandResult::Values(BTreeMap::new())),
            },

            CommandKind::RemoveBucket { bucket } => {
                store.remove_bucket(bucket);
                Ok(CommandResult::Done)
            }

            CommandKind::ImportBackup { bucket, source } => {
                let bucket = store.get_or_create_bucket(bucket);
                Ok(CommandResult::Count(bucket.import_backup(source)?))
            }

            CommandKind::ExportBackup {
                bucket,
                destination,
            } => match store.get_bucket(bucket) {
                Some(existing) => Ok(CommandResult::Count(existing.export_backup(destination)?)),
                None => Ok(CommandResult::Count(store.backups().export(
                    bucket,
                    destination,
                    Vec::new(),
                )?)),
            },
        }
    }
}
