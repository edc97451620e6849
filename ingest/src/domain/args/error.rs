//! Args parser error types

use thiserror::Error;

use crate::utils::protowire::WireError;

/// Errors reported by `ProtoToArgsParser::parse_message`.
///
/// Only `UnknownMessageType` at the top level stops a parse before anything
/// is emitted; every other variant is recorded per field while siblings
/// continue to be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgsError {
    /// Message type not present in the descriptor pool
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// Declared type the parser does not emit (bytes, group)
    #[error("Unsupported {field_type} field at '{key}'")]
    UnsupportedField {
        key: String,
        field_type: &'static str,
    },

    /// Wire type does not match the declared field type
    #[error("Field '{key}' declared {field_type} but encoded as {wire_type}")]
    WireTypeMismatch {
        key: String,
        field_type: &'static str,
        wire_type: &'static str,
    },

    /// Undecodable bytes; the rest of the message is skipped
    #[error("Malformed {type_name} at '{key}': {source}")]
    Malformed {
        type_name: String,
        key: String,
        #[source]
        source: WireError,
    },

    /// A parsing override reported a failure
    #[error("Override for '{path}' failed: {reason}")]
    OverrideFailed { path: String, reason: String },

    /// Interned reference with no stored payload
    #[error("Interned entry {iid} of field {field_id} not found (at '{key}')")]
    InternedNotFound { key: String, field_id: u32, iid: u64 },

    /// Message nesting deeper than the configured limit
    #[error("Nesting depth {max_depth} exceeded at '{key}'")]
    DepthExceeded { key: String, max_depth: usize },

    /// Several fields failed; `first` is the earliest in stream order
    #[error("{count} fields failed to parse, first: {first}")]
    Multiple { first: Box<ArgsError>, count: usize },
}

impl ArgsError {
    /// Create an override failure for `path`
    pub fn override_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OverrideFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Accumulates field errors for one `parse_message` call
#[derive(Debug, Default)]
pub(crate) struct ErrorLog {
    first: Option<ArgsError>,
    count: usize,
}

impl ErrorLog {
    pub(crate) fn record(&mut self, error: ArgsError) {
        tracing::debug!(error = %error, "Field dropped from args");
        self.count += 1;
        if self.first.is_none() {
            self.first = Some(error);
        }
    }

    pub(crate) fn into_result(self) -> Result<(), ArgsError> {
        match (self.first, self.count) {
            (None, _) => Ok(()),
            (Some(first), 1) => Err(first),
            (Some(first), count) => Err(ArgsError::Multiple {
                first: Box::new(first),
                count,
            }),
        }
    }
}
