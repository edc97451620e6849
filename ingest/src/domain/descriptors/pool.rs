//! Descriptor pool construction from `FileDescriptorSet`s

use std::collections::{HashMap, HashSet};

use prost::Message;
use prost_types::field_descriptor_proto::Label;
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorSet};

use super::{DescriptorError, FieldDescriptor, FieldType, MessageDescriptor, qualify};

/// Registry of message descriptors, keyed by fully qualified name.
///
/// The pool is read-only once parsing starts; parsers borrow it.
#[derive(Debug, Default, Clone)]
pub struct DescriptorPool {
    messages: HashMap<String, MessageDescriptor>,
}

/// A message found while walking a file, with the scope its field types
/// resolve against.
struct PendingMessage<'a> {
    full_name: String,
    proto: &'a DescriptorProto,
}

/// An extension found while walking a file
struct PendingExtension<'a> {
    scope: String,
    proto: &'a FieldDescriptorProto,
}

impl DescriptorPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from a serialized `FileDescriptorSet`
    pub fn from_file_descriptor_set_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let mut pool = Self::new();
        pool.add_file_descriptor_set_bytes(bytes)?;
        Ok(pool)
    }

    /// Decode and add a serialized `FileDescriptorSet`
    pub fn add_file_descriptor_set_bytes(&mut self, bytes: &[u8]) -> Result<(), DescriptorError> {
        let set = FileDescriptorSet::decode(bytes)?;
        self.add_file_descriptor_set(&set)
    }

    /// Add every message and extension of a descriptor set.
    ///
    /// Types referenced with a fully qualified name need not be present yet;
    /// relative names must resolve within the pool or the set.
    pub fn add_file_descriptor_set(&mut self, set: &FileDescriptorSet) -> Result<(), DescriptorError> {
        let mut messages: Vec<PendingMessage<'_>> = Vec::new();
        let mut extensions: Vec<PendingExtension<'_>> = Vec::new();

        for file in &set.file {
            let package_scope = if file.package().is_empty() {
                String::new()
            } else {
                qualify(file.package())
            };
            for proto in &file.message_type {
                collect_message(&package_scope, proto, &mut messages, &mut extensions);
            }
            for proto in &file.extension {
                extensions.push(PendingExtension {
                    scope: package_scope.clone(),
                    proto,
                });
            }
        }

        let mut known: HashSet<String> = self.messages.keys().cloned().collect();
        known.extend(messages.iter().map(|m| m.full_name.clone()));

        for pending in &messages {
            let mut descriptor = MessageDescriptor::new(&pending.full_name);
            for proto in &pending.proto.field {
                let field = convert_field(&pending.full_name, proto, &known)?;
                descriptor.add_field(field);
            }
            self.add_message(descriptor);
        }

        for pending in &extensions {
            let extendee = resolve_type_name(&pending.scope, pending.proto.extendee(), &known)
                .ok_or_else(|| DescriptorError::UnknownExtendee {
                    extension: pending.proto.name().to_string(),
                    extendee: pending.proto.extendee().to_string(),
                })?;
            let field = convert_field(&pending.scope, pending.proto, &known)?.as_extension();
            self.add_extension(&extendee, field)?;
        }

        tracing::debug!(
            files = set.file.len(),
            messages = messages.len(),
            extensions = extensions.len(),
            "Descriptor set added"
        );
        Ok(())
    }

    /// Add a message, merging with an existing descriptor of the same name.
    ///
    /// Fields of the new descriptor win; extension fields already registered
    /// on the old one are kept.
    pub fn add_message(&mut self, message: MessageDescriptor) {
        match self.messages.get_mut(message.full_name()) {
            Some(existing) => {
                for field in message.fields.into_values() {
                    existing.add_field(field);
                }
            }
            None => {
                self.messages.insert(message.full_name().to_string(), message);
            }
        }
    }

    /// Register an extension field on `extendee`
    pub fn add_extension(
        &mut self,
        extendee: &str,
        field: FieldDescriptor,
    ) -> Result<(), DescriptorError> {
        let extendee = qualify(extendee);
        let Some(message) = self.messages.get_mut(&extendee) else {
            return Err(DescriptorError::UnknownExtendee {
                extension: field.name().to_string(),
                extendee,
            });
        };
        let field = if field.is_extension() {
            field
        } else {
            field.as_extension()
        };
        if let Some(previous) = message.add_field(field) {
            tracing::debug!(
                extendee = %extendee,
                field = previous.name(),
                number = previous.number(),
                "Extension replaced existing field"
            );
        }
        Ok(())
    }

    /// Look up a message by name; the leading dot is optional
    pub fn find_message(&self, name: &str) -> Option<&MessageDescriptor> {
        if name.starts_with('.') {
            self.messages.get(name)
        } else {
            self.messages.get(&qualify(name))
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Flatten a message and its nested types into `messages`
fn collect_message<'a>(
    scope: &str,
    proto: &'a DescriptorProto,
    messages: &mut Vec<PendingMessage<'a>>,
    extensions: &mut Vec<PendingExtension<'a>>,
) {
    let full_name = format!("{scope}.{}", proto.name());
    for nested in &proto.nested_type {
        collect_message(&full_name, nested, messages, extensions);
    }
    for ext in &proto.extension {
        extensions.push(PendingExtension {
            scope: full_name.clone(),
            proto: ext,
        });
    }
    messages.push(PendingMessage { full_name, proto });
}

fn convert_field(
    scope: &str,
    proto: &FieldDescriptorProto,
    known: &HashSet<String>,
) -> Result<FieldDescriptor, DescriptorError> {
    let number = u32::try_from(proto.number())
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| DescriptorError::InvalidFieldNumber {
            field: format!("{scope}.{}", proto.name()),
            number: proto.number(),
        })?;
    let field_type = FieldType::from(proto.r#type());

    let mut field = FieldDescriptor::new(proto.name(), number, field_type);
    if proto.label() == Label::Repeated {
        field = field.repeated();
    }
    if field_type.is_message_like() {
        let resolved = resolve_type_name(scope, proto.type_name(), known).ok_or_else(|| {
            DescriptorError::UnresolvedType {
                field: format!("{scope}.{}", proto.name()),
                type_name: proto.type_name().to_string(),
            }
        })?;
        field = field.with_type_name(resolved);
    }
    Ok(field)
}

/// Resolve a type reference the way protoc does: fully qualified names are
/// taken as-is, relative names are searched from the innermost scope out.
fn resolve_type_name(scope: &str, type_name: &str, known: &HashSet<String>) -> Option<String> {
    if type_name.is_empty() {
        return None;
    }
    if type_name.starts_with('.') {
        return Some(type_name.to_string());
    }
    let mut scope = scope;
    loop {
        let candidate = format!("{scope}.{type_name}");
        if known.contains(&candidate) {
            return Some(candidate);
        }
        if scope.is_empty() {
            return None;
        }
        scope = match scope.rfind('.') {
            Some(i) => &scope[..i],
            None => "",
        };
    }
}
