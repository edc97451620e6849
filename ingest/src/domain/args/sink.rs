//! Destination of parsed argument values

use crate::domain::interned::InternedMessageView;

use super::key::Key;

/// Receives typed key/value emissions from `ProtoToArgsParser`.
///
/// The table-backed implementation is `ArgsCollector`; tests and parsing
/// overrides may provide their own.
pub trait ArgsSink {
    fn add_integer(&mut self, key: &Key, value: i64);
    fn add_unsigned_integer(&mut self, key: &Key, value: u64);
    fn add_string(&mut self, key: &Key, value: &str);
    fn add_double(&mut self, key: &Key, value: f64);
    fn add_pointer(&mut self, key: &Key, value: u64);
    fn add_boolean(&mut self, key: &Key, value: bool);

    /// Add a JSON-encoded value. Returns whether anything was added.
    fn add_json(&mut self, key: &Key, value: &str) -> bool;

    /// Next free index of the array stored under `array_key`
    fn get_array_entry_index(&self, array_key: &str) -> usize;

    /// Advance the array index for `array_key`, returning the new value
    fn increment_array_entry_index(&mut self, array_key: &str) -> usize;

    /// Resolve an interned payload by its interning field and id
    fn get_interned_message(&self, field_id: u32, iid: u64) -> Option<InternedMessageView>;
}
