//! Reader and writer state machines.
//!
//! Both the binary and the extended JSON formats are walked through the same
//! two object-safe traits, [`ValueReader`] and [`ValueWriter`]. Each
//! implementation keeps a single growable stack of frames; entering a nested
//! document pushes a frame and leaving it pops one, so a "document reader" is
//! just a position in that stack.
//!
//! Element and value frames sit on top of their container frame. Reading or
//! writing a scalar pops the element frame; finishing a container pops both
//! the container frame and the element frame that introduced it.

mod binary_reader;
mod binary_writer;
mod copier;
mod extjson_reader;
mod extjson_writer;

pub use binary_reader::BinaryReader;
pub use binary_writer::BinaryWriter;
pub use copier::{copy_bytes_to_writer, copy_document, copy_value, copy_value_to_bytes};
pub use extjson_reader::ExtJsonReader;
pub use extjson_writer::{ExtJsonOptions, ExtJsonWriter};

use std::fmt;

use crate::error::{Action, Error, Result, TransitionError};
use crate::wire::ElementType;
use crate::value::{Binary, DbPointer, Decimal128, ObjectId, Regex, Timestamp};

/// Default cap on nested documents, arrays and scopes.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Position of a reader or writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    TopLevel,
    Document,
    Array,
    /// Positioned on an array slot.
    Value,
    /// Positioned on a document key whose value is not yet consumed.
    Element,
    CodeWithScope,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::TopLevel => "top level",
            Mode::Document => "document",
            Mode::Array => "array",
            Mode::Value => "value",
            Mode::Element => "element",
            Mode::CodeWithScope => "code with scope",
        })
    }
}

/// Cursor over a serialized document.
///
/// End of a document or array is `Ok(None)` from [`read_element`] or
/// [`read_value`]; it is never an error.
///
/// [`read_element`]: ValueReader::read_element
/// [`read_value`]: ValueReader::read_value
pub trait ValueReader {
    /// Wire type of the value under the cursor.
    fn element_type(&self) -> ElementType;

    /// Enters the array under the cursor.
    fn read_array(&mut self) -> Result<()>;
    /// Advances to the next array slot, or returns `None` and leaves the array.
    fn read_value(&mut self) -> Result<Option<ElementType>>;

    /// Enters the document under the cursor (or the top-level document).
    fn read_document(&mut self) -> Result<()>;
    /// Advances to the next key, or returns `None` and leaves the document.
    fn read_element(&mut self) -> Result<Option<(String, ElementType)>>;

    /// Returns the code and enters the scope document.
    fn read_code_with_scope(&mut self) -> Result<String>;

    /// Discards the value under the cursor, including any nested content.
    fn skip(&mut self) -> Result<()>;

    fn read_double(&mut self) -> Result<f64>;
    fn read_string(&mut self) -> Result<String>;
    fn read_binary(&mut self) -> Result<Binary>;
    fn read_undefined(&mut self) -> Result<()>;
    fn read_object_id(&mut self) -> Result<ObjectId>;
    fn read_boolean(&mut self) -> Result<bool>;
    /// Milliseconds since the Unix epoch.
    fn read_date_time(&mut self) -> Result<i64>;
    fn read_null(&mut self) -> Result<()>;
    fn read_regex(&mut self) -> Result<Regex>;
    fn read_db_pointer(&mut self) -> Result<DbPointer>;
    fn read_javascript(&mut self) -> Result<String>;
    fn read_symbol(&mut self) -> Result<String>;
    fn read_int32(&mut self) -> Result<i32>;
    fn read_timestamp(&mut self) -> Result<Timestamp>;
    fn read_int64(&mut self) -> Result<i64>;
    fn read_decimal128(&mut self) -> Result<Decimal128>;
    fn read_min_key(&mut self) -> Result<()>;
    fn read_max_key(&mut self) -> Result<()>;
}

/// Sink for a serialized document.
pub trait ValueWriter {
    fn write_array(&mut self) -> Result<()>;
    /// Positions the writer on the next array slot.
    fn write_array_element(&mut self) -> Result<()>;
    fn write_array_end(&mut self) -> Result<()>;

    fn write_document(&mut self) -> Result<()>;
    /// Positions the writer on `key` inside the open document.
    fn write_document_element(&mut self, key: &str) -> Result<()>;
    fn write_document_end(&mut self) -> Result<()>;

    /// Writes the code and opens the scope document; close it with
    /// [`write_document_end`](ValueWriter::write_document_end).
    fn write_code_with_scope(&mut self, code: &str) -> Result<()>;

    fn write_double(&mut self, v: f64) -> Result<()>;
    fn write_string(&mut self, v: &str) -> Result<()>;
    fn write_binary(&mut self, subtype: u8, bytes: &[u8]) -> Result<()>;
    fn write_undefined(&mut self) -> Result<()>;
    fn write_object_id(&mut self, v: ObjectId) -> Result<()>;
    fn write_boolean(&mut self, v: bool) -> Result<()>;
    fn write_date_time(&mut self, ms: i64) -> Result<()>;
    fn write_null(&mut self) -> Result<()>;
    fn write_regex(&mut self, pattern: &str, options: &str) -> Result<()>;
    fn write_db_pointer(&mut self, namespace: &str, id: ObjectId) -> Result<()>;
    fn write_javascript(&mut self, code: &str) -> Result<()>;
    fn write_symbol(&mut self, symbol: &str) -> Result<()>;
    fn write_int32(&mut self, v: i32) -> Result<()>;
    fn write_timestamp(&mut self, v: Timestamp) -> Result<()>;
    fn write_int64(&mut self, v: i64) -> Result<()>;
    fn write_decimal128(&mut self, v: Decimal128) -> Result<()>;
    fn write_min_key(&mut self) -> Result<()>;
    fn write_max_key(&mut self) -> Result<()>;
}

// ----------------------------------------------------------------
// Shared transition checks

pub(crate) const ELEMENT_OR_VALUE: &[Mode] = &[Mode::Element, Mode::Value];
pub(crate) const DOCUMENT_OR_SCOPE: &[Mode] = &[Mode::Document, Mode::CodeWithScope];
pub(crate) const ARRAY_ONLY: &[Mode] = &[Mode::Array];

pub(crate) fn invalid_position(
    action: Action,
    name: &'static str,
    current: Mode,
    parent: Option<Mode>,
    allowed: &'static [Mode],
) -> Error {
    Error::Transition(TransitionError {
        action,
        name,
        current,
        destination: None,
        parent,
        allowed,
    })
}

pub(crate) fn invalid_transition(
    action: Action,
    name: &'static str,
    current: Mode,
    destination: Mode,
    parent: Option<Mode>,
) -> Error {
    Error::Transition(TransitionError {
        action,
        name,
        current,
        destination: Some(destination),
        parent,
        allowed: &[],
    })
}

pub(crate) fn check_depth(depth: usize, max_depth: usize) -> Result<()> {
    if depth > max_depth {
        return Err(Error::MaxDepthExceeded { max: max_depth });
    }
    Ok(())
}
