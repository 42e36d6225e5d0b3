//! Wire-level constants: element type tags and binary subtypes.

use std::fmt;

/// BSON element type tag, the single byte preceding each element's key.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    EmbeddedDocument = 0x03,
    Array = 0x04,
    Binary = 0x05,
    /// Deprecated.
    Undefined = 0x06,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0a,
    RegularExpression = 0x0b,
    /// Deprecated.
    DbPointer = 0x0c,
    JavaScriptCode = 0x0d,
    /// Deprecated.
    Symbol = 0x0e,
    /// Deprecated.
    JavaScriptCodeWithScope = 0x0f,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    Decimal128 = 0x13,
    MaxKey = 0x7f,
    MinKey = 0xff,
}

impl ElementType {
    /// Maps a wire tag to its element type.
    pub fn from_u8(tag: u8) -> Option<Self> {
        use ElementType::*;
        Some(match tag {
            0x01 => Double,
            0x02 => String,
            0x03 => EmbeddedDocument,
            0x04 => Array,
            0x05 => Binary,
            0x06 => Undefined,
            0x07 => ObjectId,
            0x08 => Boolean,
            0x09 => DateTime,
            0x0a => Null,
            0x0b => RegularExpression,
            0x0c => DbPointer,
            0x0d => JavaScriptCode,
            0x0e => Symbol,
            0x0f => JavaScriptCodeWithScope,
            0x10 => Int32,
            0x11 => Timestamp,
            0x12 => Int64,
            0x13 => Decimal128,
            0x7f => MaxKey,
            0xff => MinKey,
            _ => return None,
        })
    }

    /// The wire tag byte.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Double => "double",
            ElementType::String => "string",
            ElementType::EmbeddedDocument => "embedded document",
            ElementType::Array => "array",
            ElementType::Binary => "binary",
            ElementType::Undefined => "undefined",
            ElementType::ObjectId => "objectID",
            ElementType::Boolean => "boolean",
            ElementType::DateTime => "UTC datetime",
            ElementType::Null => "null",
            ElementType::RegularExpression => "regex",
            ElementType::DbPointer => "dbPointer",
            ElementType::JavaScriptCode => "javascript",
            ElementType::Symbol => "symbol",
            ElementType::JavaScriptCodeWithScope => "code with scope",
            ElementType::Int32 => "32-bit integer",
            ElementType::Timestamp => "timestamp",
            ElementType::Int64 => "64-bit integer",
            ElementType::Decimal128 => "128-bit decimal",
            ElementType::MaxKey => "max key",
            ElementType::MinKey => "min key",
        };
        f.write_str(name)
    }
}

/// Binary subtypes.
pub mod subtype {
    pub const GENERIC: u8 = 0x00;
    pub const FUNCTION: u8 = 0x01;
    /// Legacy binary; the payload carries its own inner i32 length.
    pub const BINARY_OLD: u8 = 0x02;
    pub const UUID_OLD: u8 = 0x03;
    pub const UUID: u8 = 0x04;
    pub const MD5: u8 = 0x05;
    pub const ENCRYPTED: u8 = 0x06;
    pub const COLUMN: u8 = 0x07;
    pub const USER_DEFINED: u8 = 0x80;
}
