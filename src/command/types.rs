use crate::error::ProcessingError;
use crate::storage::types::{Key, Predicate, Range, Update, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Correlation id assigned by the coordinator.
///
/// Opaque to routing and execution; derived sub-commands keep the id of the
/// command they were split from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CommandId(pub String);

impl CommandId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An operation on the store, plus its correlation id.
///
/// Commands are immutable once built. See `resolve` for how each kind is
/// routed and `apply` for how it runs against local storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Command {
    pub id: CommandId,
    pub kind: CommandKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CommandKind {
    GetBuckets,
    GetValue {
        bucket: String,
        key: Key,
        predicate: Option<Predicate>,
    },
    GetValues {
        bucket: String,
        keys: BTreeSet<Key>,
        predicate: Option<Predicate>,
    },
    GetKeys {
        bucket: String,
    },
    PutValue {
        bucket: String,
        key: Key,
        value: Value,
        predicate: Option<Predicate>,
    },
    RemoveValue {
        bucket: String,
        key: Key,
    },
    UpdateValue {
        bucket: String,
        key: Key,
        update: Update,
    },
    RangeQuery {
        bucket: String,
        range: Range,
        predicate: Option<Predicate>,
    },
    PredicateQuery {
        bucket: String,
        predicate: Predicate,
    },
    RemoveBucket {
        bucket: String,
    },
    ImportBackup {
        bucket: String,
        source: String,
    },
    ExportBackup {
        bucket: String,
        destination: String,
    },
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            id: CommandId::new(),
            kind,
        }
    }

    pub fn get_buckets() -> Self {
        Self::new(CommandKind::GetBuckets)
    }

    pub fn get_value(bucket: &str, key: impl Into<Key>) -> Self {
        Self::new(CommandKind::GetValue {
            bucket: bucket.to_string(),
            key: key.into(),
            predicate: None,
        })
    }

    pub fn get_values<K: Into<Key>>(bucket: &str, keys: impl IntoIterator<Item = K>) -> Self {
        Self::new(CommandKind::GetValues {
            bucket: bucket.to_string(),
            keys: keys.into_iter().map(Into::into).collect(),
            predicate: None,
        })
    }

    pub fn get_keys(bucket: &str) -> Self {
        Self::new(CommandKind::GetKeys {
            bucket: bucket.to_string(),
        })
    }

    pub fn put_value(bucket: &str, key: impl Into<Key>, value: Value) -> Self {
        Self::new(CommandKind::PutValue {
            bucket: bucket.to_string(),
            key: key.into(),
            value,
            predicate: None,
        })
    }

    pub fn remove_value(bucket: &str, key: impl Into<Key>) -> Self {
        Self::new(CommandKind::RemoveValue {
            bucket: bucket.to_string(),
            key: key.into(),
        })
    }

    pub fn update_value(bucket: &str, key: impl Into<Key>, update: Update) -> Self {
        Self::new(CommandKind::UpdateValue {
            bucket: bucket.to_string(),
            key: key.into(),
            update,
        })
    }

    pub fn range_query(bucket: &str, range: Range) -> Self {
        Self::new(CommandKind::RangeQuery {
            bucket: bucket.to_string(),
            range,
            predicate: None,
        })
    }

    pub fn predicate_query(bucket: &str, predicate: Predicate) -> Self {
        Self::new(CommandKind::PredicateQuery {
            bucket: bucket.to_string(),
            predicate,
        })
    }

    pub fn remove_bucket(bucket: &str) -> Self {
        Self::new(CommandKind::RemoveBucket {
            bucket: bucket.to_string(),
        })
    }

    pub fn import_backup(bucket: &str, source: &str) -> Self {
        Self::new(CommandKind::ImportBackup {
            bucket: bucket.to_string(),
            source: source.to_string(),
        })
    }

    pub fn export_backup(bucket: &str, destination: &str) -> Self {
        Self::new(CommandKind::ExportBackup {
            bucket: bucket.to_string(),
            destination: destination.to_string(),
        })
    }

    /// Attaches a predicate to the kinds that accept one; other kinds are
    /// returned unchanged.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        match &mut self.kind {
            CommandKind::GetValue { predicate: p, .. }
            | CommandKind::GetValues { predicate: p, .. }
            | CommandKind::PutValue { predicate: p, .. }
            | CommandKind::RangeQuery { predicate: p, .. } => *p = Some(predicate),
            _ => {}
        }
        self
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        match &self.kind {
            CommandKind::GetValue { predicate, .. }
            | CommandKind::GetValues { predicate, .. }
            | CommandKind::PutValue { predicate, .. }
            | CommandKind::RangeQuery { predicate, .. } => predicate.as_ref(),
            CommandKind::PredicateQuery { predicate, .. } => Some(predicate),
            _ => None,
        }
    }

    /// Narrowed copy of a multi-key command: same id, bucket and predicate,
    /// only `keys`. Other kinds are cloned unchanged.
    pub fn scoped(&self, keys: BTreeSet<Key>) -> Self {
        let kind = match &self.kind {
            CommandKind::GetValues {
                bucket, predicate, ..
            } => CommandKind::GetValues {
                bucket: bucket.clone(),
                keys,
                predicate: predicate.clone(),
            },
            other => other.clone(),
        };
        Self {
            id: self.id.clone(),
            kind,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            CommandKind::GetBuckets => "get_buckets",
            CommandKind::GetValue { .. } => "get_value",
            CommandKind::GetValues { .. } => "get_values",
            CommandKind::GetKeys { .. } => "get_keys",
            CommandKind::PutValue { .. } => "put_value",
            CommandKind::RemoveValue { .. } => "remove_value",
            CommandKind::UpdateValue { .. } => "update_value",
            CommandKind::RangeQuery { .. } => "range_query",
            CommandKind::PredicateQuery { .. } => "predicate_query",
            CommandKind::RemoveBucket { .. } => "remove_bucket",
            CommandKind::ImportBackup { .. } => "import_backup",
            CommandKind::ExportBackup { .. } => "export_backup",
        }
    }
}

/// Result of resolving or applying a command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CommandResult {
    Done,
    Value(Option<Value>),
    Values(BTreeMap<Key, Value>),
    /// Entries in comparator order (range queries).
    Entries(Vec<(Key, Value)>),
    Keys(BTreeSet<Key>),
    Buckets(BTreeSet<String>),
    Count(usize),
}

impl CommandResult {
    pub fn into_value(self) -> Result<Option<Value>, ProcessingError> {
        match self {
            CommandResult::Value(value) => Ok(value),
            _ => Err(unexpected("value")),
        }
    }

    pub fn into_values(self) -> Result<BTreeMap<Key, Value>, ProcessingError> {
        match self {
            CommandResult::Values(values) => Ok(values),
            _ => Err(unexpected("values")),
        }
    }

    pub fn into_entries(self) -> Result<Vec<(Key, Value)>, ProcessingError> {
        match self {
            CommandResult::Entries(entries) => Ok(entries),
            _ => Err(unexpected("entries")),
        }
    }

    pub fn into_keys(self) -> Result<BTreeSet<Key>, ProcessingError> {
        match self {
            CommandResult::Keys(keys) => Ok(keys),
            _ => Err(unexpected("keys")),
        }
    }

    pub fn into_buckets(self) -> Result<BTreeSet<String>, ProcessingError> {
        match self {
            CommandResult::Buckets(buckets) => Ok(buckets),
            _ => Err(unexpected("buckets")),
        }
    }

    pub fn into_count(self) -> Result<usize, ProcessingError> {
        match self {
            CommandResult::Count(count) => Ok(count),
            _ => Err(unexpected("count")),
        }
    }
}

fn unexpected(expected: &str) -> ProcessingError {
    ProcessingError::UnexpectedResult {
        expected: expected.to_string(),
    }
}
