//! Runtime protobuf schema registry
//!
//! - `DescriptorPool` - message name to descriptor map, fed from serialized
//!   `FileDescriptorSet`s or assembled by hand
//! - `MessageDescriptor` / `FieldDescriptor` - the reflective view the args
//!   parser walks
//!
//! Message names are fully qualified with a leading dot, e.g.
//! `.perfetto.protos.TrackEvent`. Extensions are stored on their extendee
//! with `is_extension()` set.

mod error;
mod pool;

use std::collections::HashMap;

use prost_types::field_descriptor_proto::Type;

use crate::utils::protowire::PackedEncoding;

pub use error::DescriptorError;
pub use pool::DescriptorPool;

// ============================================================================
// FIELD TYPE
// ============================================================================

/// Declared type of a field (not its wire type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    Uint32,
    Enum,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Int32 => "int32",
            Self::Fixed64 => "fixed64",
            Self::Fixed32 => "fixed32",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Group => "group",
            Self::Message => "message",
            Self::Bytes => "bytes",
            Self::Uint32 => "uint32",
            Self::Enum => "enum",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
        }
    }

    /// Element encoding when this type appears in a packed repeated field.
    /// `None` for types that are always length-delimited or grouped.
    pub fn packed_encoding(&self) -> Option<PackedEncoding> {
        match self {
            Self::Int32
            | Self::Int64
            | Self::Uint32
            | Self::Uint64
            | Self::Sint32
            | Self::Sint64
            | Self::Bool
            | Self::Enum => Some(PackedEncoding::Varint),
            Self::Fixed32 | Self::Sfixed32 | Self::Float => Some(PackedEncoding::Fixed32),
            Self::Fixed64 | Self::Sfixed64 | Self::Double => Some(PackedEncoding::Fixed64),
            Self::String | Self::Bytes | Self::Message | Self::Group => None,
        }
    }

    /// Whether values of this type refer to a nested message type
    pub fn is_message_like(&self) -> bool {
        matches!(self, Self::Message | Self::Group)
    }
}

impl From<Type> for FieldType {
    fn from(value: Type) -> Self {
        match value {
            Type::Double => Self::Double,
            Type::Float => Self::Float,
            Type::Int64 => Self::Int64,
            Type::Uint64 => Self::Uint64,
            Type::Int32 => Self::Int32,
            Type::Fixed64 => Self::Fixed64,
            Type::Fixed32 => Self::Fixed32,
            Type::Bool => Self::Bool,
            Type::String => Self::String,
            Type::Group => Self::Group,
            Type::Message => Self::Message,
            Type::Bytes => Self::Bytes,
            Type::Uint32 => Self::Uint32,
            Type::Enum => Self::Enum,
            Type::Sfixed32 => Self::Sfixed32,
            Type::Sfixed64 => Self::Sfixed64,
            Type::Sint32 => Self::Sint32,
            Type::Sint64 => Self::Sint64,
        }
    }
}

// ============================================================================
// FIELD DESCRIPTOR
// ============================================================================

/// Schema of a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    number: u32,
    field_type: FieldType,
    type_name: Option<String>,
    repeated: bool,
    extension: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            number,
            field_type,
            type_name: None,
            repeated: false,
            extension: false,
        }
    }

    /// Set the nested message type (fully qualified, leading dot optional)
    pub fn with_type_name(mut self, type_name: impl AsRef<str>) -> Self {
        self.type_name = Some(qualify(type_name.as_ref()));
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn as_extension(mut self) -> Self {
        self.extension = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Resolved nested type name, for message and group fields
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    pub fn is_extension(&self) -> bool {
        self.extension
    }
}

// ============================================================================
// MESSAGE DESCRIPTOR
// ============================================================================

/// Schema of a message type: its fields keyed by field number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    full_name: String,
    fields: HashMap<u32, FieldDescriptor>,
}

impl MessageDescriptor {
    pub fn new(full_name: impl AsRef<str>) -> Self {
        Self {
            full_name: qualify(full_name.as_ref()),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.add_field(field);
        self
    }

    /// Add a field, returning the one it replaced (same number)
    pub fn add_field(&mut self, field: FieldDescriptor) -> Option<FieldDescriptor> {
        self.fields.insert(field.number, field)
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn field(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.get(&number)
    }

    /// Fields ordered by field number
    pub fn fields(&self) -> Vec<&FieldDescriptor> {
        let mut fields: Vec<&FieldDescriptor> = self.fields.values().collect();
        fields.sort_by_key(|f| f.number);
        fields
    }
}

/// Prefix a type name with the leading dot used for fully qualified names
fn qualify(name: &str) -> String {
    if name.starts_with('.') {
        name.to_string()
    } else {
        format!(".{name}")
    }
}
