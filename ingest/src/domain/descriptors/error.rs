//! Descriptor pool error types

use thiserror::Error;

/// Errors raised while loading schemas into a `DescriptorPool`
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// The serialized `FileDescriptorSet` could not be decoded
    #[error("Failed to decode descriptor set: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A field references a message type that is not in the pool
    #[error("Unresolved type '{type_name}' referenced by field {field}")]
    UnresolvedType { field: String, type_name: String },

    /// An extension targets a message type that is not in the pool
    #[error("Extension '{extension}' extends unknown message '{extendee}'")]
    UnknownExtendee { extension: String, extendee: String },

    /// Field number outside the protobuf range
    #[error("Invalid field number {number} for field {field}")]
    InvalidFieldNumber { field: String, number: i32 },
}
