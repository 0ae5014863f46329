use super::error::StoreError;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Document key.
///
/// Keys are raw bytes; `Display` renders them as lossy UTF-8. Ordering is
/// plain byte order, i.e. string order for UTF-8 keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().into_bytes())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Key::new(key)
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key::new(key)
    }
}

/// Binary formats carry the raw bytes. Human-readable ones carry a string when
/// the key is valid UTF-8 and a byte array otherwise.
impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable()
            && let Ok(text) = std::str::from_utf8(&self.0)
        {
            return serializer.serialize_str(text);
        }
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(KeyVisitor)
        } else {
            deserializer.deserialize_byte_buf(KeyVisitor)
        }
    }
}

struct KeyVisitor;

impl<'de> Visitor<'de> for KeyVisitor {
    type Value = Key;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or a byte array")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Key, E> {
        Ok(Key::new(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Key, E> {
        Ok(Key::new(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Key, E> {
        Ok(Key::from_bytes(v))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Key, E> {
        Ok(Key::from_bytes(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Key, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Ok(Key::from_bytes(bytes))
    }
}

/// Opaque document payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value(Vec<u8>);

impl Value {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parses the payload as a JSON document.
    pub fn to_json(&self) -> Result<serde_json::Value, StoreError> {
        serde_json::from_slice(&self.0).map_err(|e| StoreError::Malformed {
            reason: e.to_string(),
        })
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self, StoreError> {
        serde_json::to_vec(json)
            .map(Value)
            .map_err(|e| StoreError::Malformed {
                reason: e.to_string(),
            })
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::new(value.as_bytes().to_vec())
    }
}

/// A value filter of the form `<condition>:<expression>`.
///
/// The condition name selects a registered condition; the expression is handed
/// to it untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub condition: String,
    pub expression: String,
}

impl Predicate {
    pub fn new(condition: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            expression: expression.into(),
        }
    }
}

impl FromStr for Predicate {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((condition, expression)) if !condition.trim().is_empty() => {
                Ok(Predicate::new(condition.trim(), expression))
            }
            _ => Err(StoreError::InvalidPredicate {
                expression: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.condition, self.expression)
    }
}

/// Inclusive key range, ordered by a named comparator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_key: Key,
    /// `None` means unbounded.
    pub end_key: Option<Key>,
    /// Maximum number of entries, 0 for no limit.
    pub limit: usize,
    /// Comparator name, `lexical` when absent.
    pub comparator: Option<String>,
}

impl Range {
    pub const DEFAULT_COMPARATOR: &'static str = "lexical";

    pub fn new(start_key: impl Into<Key>, end_key: Option<Key>) -> Self {
        Self {
            start_key: start_key.into(),
            end_key,
            limit: 0,
            comparator: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_comparator(mut self, comparator: impl Into<String>) -> Self {
        self.comparator = Some(comparator.into());
        self
    }

    pub fn comparator_name(&self) -> &str {
        self.comparator
            .as_deref()
            .unwrap_or(Self::DEFAULT_COMPARATOR)
    }
}

/// Named parameters passed to update functions.
pub type Parameters = BTreeMap<String, String>;

/// Server-side update: the named function computes the new value from the
/// current one within `timeout_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub function: String,
    pub timeout_ms: u64,
    pub parameters: Parameters,
}

/// Execution deadline handed to update functions.
///
/// Long-running functions should call [`Deadline::check`] periodically; the
/// bucket checks once more after the function returns.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now() + timeout,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn check(&self, function: &str) -> Result<(), StoreError> {
        if self.expired() {
            return Err(StoreError::Timeout {
                function: function.to_string(),
            });
        }
        Ok(())
    }
}
