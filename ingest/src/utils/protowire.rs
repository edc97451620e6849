//! Protobuf wire format reader
//!
//! Iterates the fields of an encoded message without any schema knowledge:
//! - `FieldReader` yields `(field number, wire value)` pairs in stream order
//! - `PackedReader` splits a packed repeated payload into scalar values
//!
//! Varint and key decoding are delegated to `prost::encoding`. Malformed input
//! is reported as a `WireError` and ends the iteration; nothing here panics.

use prost::DecodeError;
use prost::encoding::{WireType, decode_key, decode_varint};
use thiserror::Error;

/// Errors produced while reading raw protobuf bytes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    /// Invalid varint, tag or wire type
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Payload shorter than its declared or implied length
    #[error("truncated payload: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// Group start without a matching end
    #[error("unterminated group for field {0}")]
    UnterminatedGroup(u32),

    /// Group end for a different field than the one opened
    #[error("mismatched group end: expected field {expected}, found {found}")]
    MismatchedGroupEnd { expected: u32, found: u32 },

    /// Packed payload for a type that cannot be packed
    #[error("wire type {0} cannot be packed")]
    NotPackable(&'static str),
}

// ============================================================================
// WIRE VALUES
// ============================================================================

/// One undecoded field value, tagged by its wire type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    LengthDelimited(&'a [u8]),
    /// Contents between a group's start and end tags
    Group(&'a [u8]),
}

impl WireValue<'_> {
    pub fn wire_type_name(&self) -> &'static str {
        match self {
            Self::Varint(_) => "varint",
            Self::Fixed64(_) => "fixed64",
            Self::Fixed32(_) => "fixed32",
            Self::LengthDelimited(_) => "length-delimited",
            Self::Group(_) => "group",
        }
    }
}

/// A single field occurrence in an encoded message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field<'a> {
    pub number: u32,
    pub value: WireValue<'a>,
}

impl<'a> Field<'a> {
    pub fn new(number: u32, value: WireValue<'a>) -> Self {
        Self { number, value }
    }

    pub fn as_varint(&self) -> Option<u64> {
        match self.value {
            WireValue::Varint(v) => Some(v),
            _ => None,
        }
    }

    /// Payload of a length-delimited field (string, bytes, message or packed)
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self.value {
            WireValue::LengthDelimited(b) => Some(b),
            _ => None,
        }
    }

    /// Payload of a length-delimited field as text, replacing invalid UTF-8
    pub fn as_str_lossy(&self) -> Option<std::borrow::Cow<'a, str>> {
        self.as_bytes().map(String::from_utf8_lossy)
    }
}

// ============================================================================
// FIELD READER
// ============================================================================

/// Iterator over the fields of one encoded message.
///
/// After the first error the reader is exhausted.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    failed: bool,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, failed: false }
    }

    fn read_field(&mut self) -> Result<Field<'a>, WireError> {
        let (number, wire_type) = decode_key(&mut self.buf)?;
        let value = match wire_type {
            WireType::Varint => WireValue::Varint(decode_varint(&mut self.buf)?),
            WireType::SixtyFourBit => {
                let raw = take(&mut self.buf, 8)?;
                let mut le = [0u8; 8];
                le.copy_from_slice(raw);
                WireValue::Fixed64(u64::from_le_bytes(le))
            }
            WireType::ThirtyTwoBit => {
                let raw = take(&mut self.buf, 4)?;
                let mut le = [0u8; 4];
                le.copy_from_slice(raw);
                WireValue::Fixed32(u32::from_le_bytes(le))
            }
            WireType::LengthDelimited => {
                let len = decode_varint(&mut self.buf)?;
                let len = usize::try_from(len).map_err(|_| WireError::Truncated {
                    needed: usize::MAX,
                    remaining: self.buf.len(),
                })?;
                WireValue::LengthDelimited(take(&mut self.buf, len)?)
            }
            WireType::StartGroup => WireValue::Group(read_group(&mut self.buf, number)?),
            WireType::EndGroup => {
                // A stray end tag at message level has nothing to close.
                return Err(WireError::MismatchedGroupEnd {
                    expected: 0,
                    found: number,
                });
            }
        };
        Ok(Field { number, value })
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = Result<Field<'a>, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.buf.is_empty() {
            return None;
        }
        let result = self.read_field();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Split `len` bytes off the front of `buf`
fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8], WireError> {
    if buf.len() < len {
        return Err(WireError::Truncated {
            needed: len,
            remaining: buf.len(),
        });
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

/// Consume a group body up to and including its end tag, returning the body.
fn read_group<'a>(buf: &mut &'a [u8], number: u32) -> Result<&'a [u8], WireError> {
    let start = *buf;
    let mut open: Vec<u32> = vec![number];
    loop {
        if buf.is_empty() {
            return Err(WireError::UnterminatedGroup(number));
        }
        let before_tag = buf.len();
        let (inner, wire_type) = decode_key(buf)?;
        match wire_type {
            WireType::Varint => {
                decode_varint(buf)?;
            }
            WireType::SixtyFourBit => {
                take(buf, 8)?;
            }
            WireType::ThirtyTwoBit => {
                take(buf, 4)?;
            }
            WireType::LengthDelimited => {
                let len = decode_varint(buf)?;
                let len = usize::try_from(len).map_err(|_| WireError::Truncated {
                    needed: usize::MAX,
                    remaining: buf.len(),
                })?;
                take(buf, len)?;
            }
            WireType::StartGroup => open.push(inner),
            WireType::EndGroup => {
                let expected = open.pop().unwrap_or(number);
                if expected != inner {
                    return Err(WireError::MismatchedGroupEnd {
                        expected,
                        found: inner,
                    });
                }
                if open.is_empty() {
                    let body_len = start.len() - before_tag;
                    return Ok(&start[..body_len]);
                }
            }
        }
    }
}

// ============================================================================
// PACKED REPEATED FIELDS
// ============================================================================

/// Element encoding inside a packed repeated payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedEncoding {
    Varint,
    Fixed32,
    Fixed64,
}

/// Iterator over the elements of a packed repeated field
#[derive(Debug, Clone)]
pub struct PackedReader<'a> {
    buf: &'a [u8],
    encoding: PackedEncoding,
    failed: bool,
}

impl<'a> PackedReader<'a> {
    pub fn new(buf: &'a [u8], encoding: PackedEncoding) -> Self {
        Self {
            buf,
            encoding,
            failed: false,
        }
    }

    fn read_value(&mut self) -> Result<WireValue<'a>, WireError> {
        match self.encoding {
            PackedEncoding::Varint => Ok(WireValue::Varint(decode_varint(&mut self.buf)?)),
            PackedEncoding::Fixed32 => {
                let raw = take(&mut self.buf, 4)?;
                let mut le = [0u8; 4];
                le.copy_from_slice(raw);
                Ok(WireValue::Fixed32(u32::from_le_bytes(le)))
            }
            PackedEncoding::Fixed64 => {
                let raw = take(&mut self.buf, 8)?;
                let mut le = [0u8; 8];
                le.copy_from_slice(raw);
                Ok(WireValue::Fixed64(u64::from_le_bytes(le)))
            }
        }
    }
}

impl<'a> Iterator for PackedReader<'a> {
    type Item = Result<WireValue<'a>, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.buf.is_empty() {
            return None;
        }
        let result = self.read_value();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
