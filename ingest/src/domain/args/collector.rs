//! In-memory `ArgsSink` producing argument rows

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::domain::interned::{InternedDataStore, InternedMessageView};

use super::key::{Key, KeyScope};
use super::sink::ArgsSink;

/// Typed value of one argument row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Int(i64),
    Uint(u64),
    String(String),
    Real(f64),
    Pointer(u64),
    Bool(bool),
}

/// One emitted argument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgRow {
    pub flat_key: String,
    pub key: String,
    pub value: ArgValue,
}

/// Collects parser emissions in order, optionally resolving interned
/// references from an `InternedDataStore`.
#[derive(Debug, Default)]
pub struct ArgsCollector<'s> {
    rows: Vec<ArgRow>,
    array_indices: HashMap<String, usize>,
    interned: Option<&'s InternedDataStore>,
}

impl<'s> ArgsCollector<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interned(interned: &'s InternedDataStore) -> Self {
        Self {
            interned: Some(interned),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> &[ArgRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ArgRow> {
        self.rows
    }

    /// First value stored under the full key `key`
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.rows.iter().find(|row| row.key == key).map(|row| &row.value)
    }

    /// Full keys in emission order
    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.key.as_str()).collect()
    }

    /// All values sharing the flat key `flat_key`, in emission order
    pub fn values_for_flat_key(&self, flat_key: &str) -> Vec<&ArgValue> {
        self.rows
            .iter()
            .filter(|row| row.flat_key == flat_key)
            .map(|row| &row.value)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn push(&mut self, key: &Key, value: ArgValue) {
        self.rows.push(ArgRow {
            flat_key: key.flat_key.clone(),
            key: key.key.clone(),
            value,
        });
    }

    /// Flatten a JSON value below `scope`; returns the number of rows added
    fn push_json(&mut self, scope: &mut KeyScope<'_>, value: &JsonValue) -> usize {
        match value {
            JsonValue::Null => 0,
            JsonValue::Bool(b) => {
                self.push(scope.key(), ArgValue::Bool(*b));
                1
            }
            JsonValue::Number(n) => {
                let value = if let Some(i) = n.as_i64() {
                    ArgValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ArgValue::Uint(u)
                } else {
                    ArgValue::Real(n.as_f64().unwrap_or(f64::NAN))
                };
                self.push(scope.key(), value);
                1
            }
            JsonValue::String(s) => {
                self.push(scope.key(), ArgValue::String(s.clone()));
                1
            }
            JsonValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let mut entry = scope.enter_array(index);
                    self.push_json(&mut entry, item)
                })
                .sum(),
            JsonValue::Object(map) => map
                .iter()
                .map(|(name, item)| {
                    let mut child = scope.enter_dictionary(name);
                    self.push_json(&mut child, item)
                })
                .sum(),
        }
    }
}

impl ArgsSink for ArgsCollector<'_> {
    fn add_integer(&mut self, key: &Key, value: i64) {
        self.push(key, ArgValue::Int(value));
    }

    fn add_unsigned_integer(&mut self, key: &Key, value: u64) {
        self.push(key, ArgValue::Uint(value));
    }

    fn add_string(&mut self, key: &Key, value: &str) {
        self.push(key, ArgValue::String(value.to_string()));
    }

    fn add_double(&mut self, key: &Key, value: f64) {
        self.push(key, ArgValue::Real(value));
    }

    fn add_pointer(&mut self, key: &Key, value: u64) {
        self.push(key, ArgValue::Pointer(value));
    }

    fn add_boolean(&mut self, key: &Key, value: bool) {
        self.push(key, ArgValue::Bool(value));
    }

    fn add_json(&mut self, key: &Key, value: &str) -> bool {
        let parsed: JsonValue = match serde_json::from_str(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(key = %key.key, error = %e, "Invalid JSON arg value");
                return false;
            }
        };
        let mut base = key.clone();
        let mut scope = KeyScope::root(&mut base);
        self.push_json(&mut scope, &parsed) > 0
    }

    fn get_array_entry_index(&self, array_key: &str) -> usize {
        self.array_indices.get(array_key).copied().unwrap_or(0)
    }

    fn increment_array_entry_index(&mut self, array_key: &str) -> usize {
        let index = self.array_indices.entry(array_key.to_string()).or_insert(0);
        *index += 1;
        *index
    }

    fn get_interned_message(&self, field_id: u32, iid: u64) -> Option<InternedMessageView> {
        self.interned.and_then(|store| store.get(field_id, iid))
    }
}
