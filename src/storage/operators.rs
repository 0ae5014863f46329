//! Operator Registries
//!
//! Named, pluggable operators referenced by commands: value **conditions**
//! (predicates), key **comparators** (range queries) and update **functions**.
//! Commands only carry operator names, so the registry must hold an entry for
//! every name a command may use. A missing name is always an error, never a
//! silent pass or fail.

use super::error::StoreError;
use super::types::{Deadline, Key, Parameters, Predicate, Value};

use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::Arc;

/// Tests a value against a predicate expression.
pub type ConditionFn = Arc<dyn Fn(&Key, &Value, &str) -> bool + Send + Sync>;

/// Orders two keys.
pub type ComparatorFn = Arc<dyn Fn(&Key, &Key) -> Ordering + Send + Sync>;

/// Computes the updated value of a key.
pub type UpdateFn =
    Arc<dyn Fn(&Key, &Value, &Parameters, &Deadline) -> Result<Value, StoreError> + Send + Sync>;

pub struct Operators {
    conditions: DashMap<String, ConditionFn>,
    comparators: DashMap<String, ComparatorFn>,
    functions: DashMap<String, UpdateFn>,
}

impl Operators {
    /// Creates a registry with no operators at all.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            conditions: DashMap::new(),
            comparators: DashMap::new(),
            functions: DashMap::new(),
        })
    }

    /// Creates a registry pre-loaded with the built-in operators:
    /// - conditions: `json`
    /// - comparators: `lexical`, `numeric`
    /// - functions: `replace`, `merge`
    pub fn with_defaults() -> Arc<Self> {
        let operators = Self::empty();
        operators.register_condition("json", json_field_condition);
        operators.register_comparator("lexical", |a, b| a.cmp(b));
        operators.register_comparator("numeric", numeric_order);
        operators.register_function("replace", replace_function);
        operators.register_function("merge", merge_function);
        operators
    }

    pub fn register_condition<F>(&self, name: &str, condition: F)
    where
        F: Fn(&Key, &Value, &str) -> bool + Send + Sync + 'static,
    {
        self.conditions.insert(name.to_string(), Arc::new(condition));
        tracing::info!("Registered condition: {}", name);
    }

    pub fn register_comparator<F>(&self, name: &str, comparator: F)
    where
        F: Fn(&Key, &Key) -> Ordering + Send + Sync + 'static,
    {
        self.comparators.insert(name.to_string(), Arc::new(comparator));
        tracing::info!("Registered comparator: {}", name);
    }

    pub fn register_function<F>(&self, name: &str, function: F)
    where
        F: Fn(&Key, &Value, &Parameters, &Deadline) -> Result<Value, StoreError>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(function));
        tracing::info!("Registered update function: {}", name);
    }

    pub fn condition(&self, name: &str) -> Result<ConditionFn, StoreError> {
        self.conditions
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::UnsatisfiableCondition {
                condition: name.to_string(),
            })
    }

    pub fn comparator(&self, name: &str) -> Result<ComparatorFn, StoreError> {
        self.comparators
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::UnknownComparator {
                comparator: name.to_string(),
            })
    }

    pub fn function(&self, name: &str) -> Result<UpdateFn, StoreError> {
        self.functions
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::UnknownFunction {
                function: name.to_string(),
            })
    }

    /// Resolves the predicate's condition once and returns a reusable matcher.
    pub fn matcher(
        &self,
        predicate: &Predicate,
    ) -> Result<impl Fn(&Key, &Value) -> bool + use<>, StoreError> {
        let condition = self.condition(&predicate.condition)?;
        let expression = predicate.expression.clone();
        Ok(move |key: &Key, value: &Value| condition(key, value, &expression))
    }
}

/// `field=value`: true when the document is a JSON object whose top-level
/// `field` renders as `value`.
fn json_field_condition(_key: &Key, value: &Value, expression: &str) -> bool {
    let Some((field, expected)) = expression.split_once('=') else {
        return false;
    };
    let Ok(serde_json::Value::Object(document)) = value.to_json() else {
        return false;
    };
    match document.get(field.trim()) {
        Some(serde_json::Value::String(actual)) => actual == expected.trim(),
        Some(actual) => actual.to_string() == expected.trim(),
        None => false,
    }
}

/// Numeric keys first, in numeric order; everything else after, lexically.
fn numeric_order(a: &Key, b: &Key) -> Ordering {
    let parse = |key: &Key| key.to_string().parse::<f64>().ok();
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn replace_function(
    _key: &Key,
    _value: &Value,
    parameters: &Parameters,
    deadline: &Deadline,
) -> Result<Value, StoreError> {
    deadline.check("replace")?;
    let document: serde_json::Map<String, serde_json::Value> = parameters
        .iter()
        .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
        .collect();
    Value::from_json(&serde_json::Value::Object(document))
}

fn merge_function(
    _key: &Key,
    value: &Value,
    parameters: &Parameters,
    deadline: &Deadline,
) -> Result<Value, StoreError> {
    let serde_json::Value::Object(mut document) = value.to_json()? else {
        return Err(StoreError::Malformed {
            reason: "merge requires a JSON object".to_string(),
        });
    };
    for (name, parameter) in parameters {
        deadline.check("merge")?;
        document.insert(name.clone(), serde_json::Value::String(parameter.clone()));
    }
    Value::from_json(&serde_json::Value::Object(document))
}
