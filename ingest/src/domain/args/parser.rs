//! Reflective protobuf to args parser.
//!
//! Walks an encoded message with descriptors from a `DescriptorPool` and
//! emits one `ArgsSink` call per scalar value, keyed by the dotted path of
//! field names from the top of the message:
//!
//! ```text
//! message SubMessage  { optional int32 field = 1; }
//! message MainMessage {
//!   optional int32 field1 = 1;
//!   optional string field2 = 2;
//!   optional SubMessage field3 = 3;
//! }
//! ```
//!
//! produces the keys `field1`, `field2` and `field3.field`. Repeated fields
//! add an index to the full key only: `items[0].x`, `items[1].x` share the
//! flat key `items.x`.
//!
//! ## Overrides
//!
//! `add_parsing_override` intercepts every occurrence of the field at a
//! dotted path (field names, no indices). The override sees the raw field and
//! the key scope of that field, and returns an `OverrideOutcome`:
//!
//! - `Declined` - the generic walker handles the field as usual
//! - `Handled` - the override emitted everything; the field is not walked
//! - `Failed` - the error is recorded and parsing continues with siblings
//!
//! Registering a second override for the same path replaces the first.
//!
//! ## Errors
//!
//! An unknown top-level type fails the call before anything is emitted. Any
//! other failure (bytes fields, wire type mismatches, malformed payloads,
//! failed overrides) drops only the affected field; the call then returns the
//! first error while every value emitted around it stays in the sink.

use std::collections::HashMap;

use crate::core::constants::DEFAULT_ARGS_MAX_DEPTH;
use crate::domain::descriptors::{DescriptorPool, FieldDescriptor, FieldType, MessageDescriptor};
use crate::utils::protowire::{Field, FieldReader, PackedReader, WireValue};

use super::error::{ArgsError, ErrorLog};
use super::key::{Key, KeyScope};
use super::sink::ArgsSink;

/// Result of a parsing override
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideOutcome {
    /// Not handled; continue with the generic walker
    Declined,
    /// Fully handled by the override
    Handled,
    /// Handled, but failed; recorded as a field error
    Failed(ArgsError),
}

/// Callback intercepting one field path
pub type ParsingOverride = Box<
    dyn Fn(&Field<'_>, &mut KeyScope<'_>, &mut dyn ArgsSink) -> OverrideOutcome + Send + Sync,
>;

/// A field holding an interning id instead of the value itself
#[derive(Debug, Clone)]
struct InternedReference {
    field_id: u32,
    type_name: String,
}

/// Traversal state of one `parse_message` call
struct Walk<'s> {
    sink: &'s mut dyn ArgsSink,
    errors: ErrorLog,
}

/// Schema-driven protobuf to args parser.
///
/// The parser only borrows the pool. Each `parse_message` call owns its key
/// buffer, so one parser can serve several calls at once.
pub struct ProtoToArgsParser<'p> {
    pool: &'p DescriptorPool,
    overrides: HashMap<String, ParsingOverride>,
    interned: HashMap<String, InternedReference>,
    max_depth: usize,
}

impl<'p> ProtoToArgsParser<'p> {
    pub fn new(pool: &'p DescriptorPool) -> Self {
        Self {
            pool,
            overrides: HashMap::new(),
            interned: HashMap::new(),
            max_depth: DEFAULT_ARGS_MAX_DEPTH,
        }
    }

    /// Limit message nesting; deeper sub-messages are dropped with an error
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Install an override for the field at `field_path`, e.g. `field3.field`.
    ///
    /// The path is the full dotted path of field names from the top of the
    /// parsed message. A later registration for the same path wins.
    pub fn add_parsing_override<F>(&mut self, field_path: impl Into<String>, parsing_override: F)
    where
        F: Fn(&Field<'_>, &mut KeyScope<'_>, &mut dyn ArgsSink) -> OverrideOutcome
            + Send
            + Sync
            + 'static,
    {
        let field_path = field_path.into();
        if self
            .overrides
            .insert(field_path.clone(), Box::new(parsing_override))
            .is_some()
        {
            tracing::debug!(path = %field_path, "Parsing override replaced");
        }
    }

    /// Declare the varint at `field_path` an interning id.
    ///
    /// The id is resolved with `ArgsSink::get_interned_message(field_id, iid)`
    /// and the payload is parsed as `type_name` under the field's key.
    pub fn add_interned_reference(
        &mut self,
        field_path: impl Into<String>,
        field_id: u32,
        type_name: impl AsRef<str>,
    ) {
        let type_name = type_name.as_ref();
        let type_name = if type_name.starts_with('.') {
            type_name.to_string()
        } else {
            format!(".{type_name}")
        };
        self.interned.insert(
            field_path.into(),
            InternedReference {
                field_id,
                type_name,
            },
        );
    }

    /// Parse `bytes` as a message of `type_name` into `sink`.
    ///
    /// With `allowed_fields`, only those top-level field numbers (plus known
    /// extensions) are parsed. Unknown fields are skipped silently.
    pub fn parse_message(
        &self,
        bytes: &[u8],
        type_name: &str,
        allowed_fields: Option<&[u32]>,
        sink: &mut dyn ArgsSink,
    ) -> Result<(), ArgsError> {
        let descriptor = self
            .pool
            .find_message(type_name)
            .ok_or_else(|| ArgsError::UnknownMessageType(type_name.to_string()))?;

        let mut key = Key::default();
        let mut scope = KeyScope::root(&mut key);
        let mut walk = Walk {
            sink,
            errors: ErrorLog::default(),
        };
        self.parse_fields(&mut scope, bytes, descriptor, allowed_fields, 0, &mut walk);
        walk.errors.into_result()
    }

    fn parse_fields(
        &self,
        scope: &mut KeyScope<'_>,
        bytes: &[u8],
        descriptor: &MessageDescriptor,
        allowed_fields: Option<&[u32]>,
        depth: usize,
        walk: &mut Walk<'_>,
    ) {
        // Occurrences seen so far per repeated field number
        let mut repeated: HashMap<u32, usize> = HashMap::new();

        for field in FieldReader::new(bytes) {
            let field = match field {
                Ok(field) => field,
                Err(source) => {
                    walk.errors.record(ArgsError::Malformed {
                        type_name: descriptor.full_name().to_string(),
                        key: scope.key().key.clone(),
                        source,
                    });
                    return;
                }
            };

            let Some(field_descriptor) = descriptor.field(field.number) else {
                tracing::trace!(
                    type_name = descriptor.full_name(),
                    number = field.number,
                    "Skipping unknown field"
                );
                continue;
            };

            if let Some(allowed) = allowed_fields
                && !field_descriptor.is_extension()
                && !allowed.contains(&field.number)
            {
                continue;
            }

            self.parse_field(scope, field_descriptor, &field, &mut repeated, depth, walk);
        }
    }

    fn parse_field(
        &self,
        parent: &mut KeyScope<'_>,
        descriptor: &FieldDescriptor,
        field: &Field<'_>,
        repeated: &mut HashMap<u32, usize>,
        depth: usize,
        walk: &mut Walk<'_>,
    ) {
        // Packed repeated scalars arrive as one length-delimited payload.
        if descriptor.is_repeated()
            && let Some(encoding) = descriptor.field_type().packed_encoding()
            && let WireValue::LengthDelimited(payload) = field.value
        {
            for element in PackedReader::new(payload, encoding) {
                match element {
                    Ok(value) => {
                        let element = Field::new(field.number, value);
                        self.parse_occurrence(parent, descriptor, &element, repeated, depth, walk);
                    }
                    Err(source) => {
                        let scope = parent.enter_field(descriptor.name(), None);
                        walk.errors.record(ArgsError::Malformed {
                            type_name: format!("packed {}", descriptor.field_type().as_str()),
                            key: scope.key().key.clone(),
                            source,
                        });
                        break;
                    }
                }
            }
            return;
        }

        self.parse_occurrence(parent, descriptor, field, repeated, depth, walk);
    }

    fn parse_occurrence(
        &self,
        parent: &mut KeyScope<'_>,
        descriptor: &FieldDescriptor,
        field: &Field<'_>,
        repeated: &mut HashMap<u32, usize>,
        depth: usize,
        walk: &mut Walk<'_>,
    ) {
        let index = descriptor.is_repeated().then(|| {
            let next = repeated.entry(descriptor.number()).or_insert(0);
            let index = *next;
            *next += 1;
            index
        });
        let mut scope = parent.enter_field(descriptor.name(), index);

        if let Some(parsing_override) = self.overrides.get(scope.key().flat_key.as_str()) {
            match parsing_override(field, &mut scope, &mut *walk.sink) {
                OverrideOutcome::Declined => {}
                OverrideOutcome::Handled => return,
                OverrideOutcome::Failed(error) => {
                    walk.errors.record(error);
                    return;
                }
            }
        }

        let result = if let Some(reference) = self.interned.get(scope.key().flat_key.as_str()) {
            self.parse_interned(&mut scope, descriptor, reference, field, depth, walk)
        } else {
            match descriptor.field_type() {
                FieldType::Message => match field.as_bytes() {
                    Some(bytes) => self.parse_sub_message(
                        &mut scope,
                        bytes,
                        descriptor.type_name().unwrap_or_default(),
                        depth + 1,
                        walk,
                    ),
                    None => Err(wire_type_mismatch(scope.key(), descriptor, field)),
                },
                FieldType::Bytes | FieldType::Group => Err(ArgsError::UnsupportedField {
                    key: scope.key().key.clone(),
                    field_type: descriptor.field_type().as_str(),
                }),
                _ => emit_scalar(descriptor, field, scope.key(), &mut *walk.sink),
            }
        };

        if let Err(error) = result {
            walk.errors.record(error);
        }
    }

    fn parse_interned(
        &self,
        scope: &mut KeyScope<'_>,
        descriptor: &FieldDescriptor,
        reference: &InternedReference,
        field: &Field<'_>,
        depth: usize,
        walk: &mut Walk<'_>,
    ) -> Result<(), ArgsError> {
        let iid = field
            .as_varint()
            .ok_or_else(|| wire_type_mismatch(scope.key(), descriptor, field))?;
        let view = walk
            .sink
            .get_interned_message(reference.field_id, iid)
            .ok_or_else(|| ArgsError::InternedNotFound {
                key: scope.key().key.clone(),
                field_id: reference.field_id,
                iid,
            })?;
        self.parse_sub_message(scope, view.bytes(), &reference.type_name, depth + 1, walk)
    }

    fn parse_sub_message(
        &self,
        scope: &mut KeyScope<'_>,
        bytes: &[u8],
        type_name: &str,
        depth: usize,
        walk: &mut Walk<'_>,
    ) -> Result<(), ArgsError> {
        if depth > self.max_depth {
            return Err(ArgsError::DepthExceeded {
                key: scope.key().key.clone(),
                max_depth: self.max_depth,
            });
        }
        let descriptor = self
            .pool
            .find_message(type_name)
            .ok_or_else(|| ArgsError::UnknownMessageType(type_name.to_string()))?;
        self.parse_fields(scope, bytes, descriptor, None, depth, walk);
        Ok(())
    }
}

/// Emit a scalar according to its declared type. Enums are emitted as their
/// numeric value.
fn emit_scalar(
    descriptor: &FieldDescriptor,
    field: &Field<'_>,
    key: &Key,
    sink: &mut dyn ArgsSink,
) -> Result<(), ArgsError> {
    match (descriptor.field_type(), field.value) {
        (FieldType::Int32 | FieldType::Enum, WireValue::Varint(v)) => {
            sink.add_integer(key, i64::from(v as i32))
        }
        (FieldType::Int64, WireValue::Varint(v)) => sink.add_integer(key, v as i64),
        (FieldType::Sint32, WireValue::Varint(v)) => sink.add_integer(key, zigzag32(v)),
        (FieldType::Sint64, WireValue::Varint(v)) => sink.add_integer(key, zigzag64(v)),
        (FieldType::Sfixed32, WireValue::Fixed32(v)) => sink.add_integer(key, i64::from(v as i32)),
        (FieldType::Sfixed64, WireValue::Fixed64(v)) => sink.add_integer(key, v as i64),
        (FieldType::Uint32, WireValue::Varint(v)) => {
            sink.add_unsigned_integer(key, u64::from(v as u32))
        }
        (FieldType::Uint64, WireValue::Varint(v)) => sink.add_unsigned_integer(key, v),
        (FieldType::Fixed32, WireValue::Fixed32(v)) => sink.add_unsigned_integer(key, u64::from(v)),
        (FieldType::Fixed64, WireValue::Fixed64(v)) => sink.add_unsigned_integer(key, v),
        (FieldType::Bool, WireValue::Varint(v)) => sink.add_boolean(key, v != 0),
        (FieldType::Double, WireValue::Fixed64(v)) => sink.add_double(key, f64::from_bits(v)),
        (FieldType::Float, WireValue::Fixed32(v)) => {
            sink.add_double(key, f64::from(f32::from_bits(v)))
        }
        (FieldType::String, WireValue::LengthDelimited(bytes)) => {
            sink.add_string(key, &String::from_utf8_lossy(bytes))
        }
        _ => return Err(wire_type_mismatch(key, descriptor, field)),
    }
    Ok(())
}

fn wire_type_mismatch(key: &Key, descriptor: &FieldDescriptor, field: &Field<'_>) -> ArgsError {
    ArgsError::WireTypeMismatch {
        key: key.key.clone(),
        field_type: descriptor.field_type().as_str(),
        wire_type: field.value.wire_type_name(),
    }
}

fn zigzag32(v: u64) -> i64 {
    let n = v as u32;
    i64::from(((n >> 1) as i32) ^ -((n & 1) as i32))
}

fn zigzag64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
