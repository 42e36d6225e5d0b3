//! Binary BSON reader.

use bson_codec_buffers::Reader;

use super::{
    check_depth, invalid_position, invalid_transition, Mode, ValueReader, ARRAY_ONLY,
    DEFAULT_MAX_DEPTH, DOCUMENT_OR_SCOPE, ELEMENT_OR_VALUE,
};
use crate::error::{Action, Error, Result};
use crate::wire::{subtype, ElementType};
use crate::value::{Binary, DbPointer, Decimal128, ObjectId, Regex, Timestamp};

#[derive(Debug, Clone, Copy)]
struct Frame {
    mode: Mode,
    ty: ElementType,
    /// Offset one past the terminator of the innermost enclosing container.
    end: usize,
    /// Number of open containers, this one included.
    depth: usize,
}

/// Walks a BSON byte slice without materializing it.
///
/// Every length prefix is checked against the enclosing container, so a
/// corrupt document fails with [`Error::Malformed`] instead of reading past
/// its end.
pub struct BinaryReader<'a> {
    r: Reader<'a>,
    stack: Vec<Frame>,
    max_depth: usize,
    exhausted: bool,
}

impl<'a> BinaryReader<'a> {
    /// Reader over one complete top-level document.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            r: Reader::new(bytes),
            stack: vec![Frame {
                mode: Mode::TopLevel,
                ty: ElementType::EmbeddedDocument,
                end: bytes.len(),
                depth: 0,
            }],
            max_depth: DEFAULT_MAX_DEPTH,
            exhausted: false,
        }
    }

    /// Reader over a single bare value of type `ty` (no tag, no key).
    pub fn new_value(bytes: &'a [u8], ty: ElementType) -> Self {
        let mut reader = Self::new(bytes);
        reader.stack.push(Frame {
            mode: Mode::Value,
            ty,
            end: bytes.len(),
            depth: 0,
        });
        reader
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.r.x
    }

    /// Fails unless every input byte has been read, e.g. after decoding the
    /// single value of a [`BinaryReader::new_value`] reader.
    pub fn ensure_consumed(&self) -> Result<()> {
        let left = self.r.size();
        if left != 0 {
            let ty = self.stack.get(1).map_or(ElementType::EmbeddedDocument, |f| f.ty);
            return Err(Error::malformed(format!(
                "{left} trailing bytes after {ty} value"
            )));
        }
        Ok(())
    }

    fn top(&self) -> Frame {
        self.stack[self.stack.len() - 1]
    }

    fn parent_mode(&self) -> Option<Mode> {
        self.stack.len().checked_sub(2).map(|i| self.stack[i].mode)
    }

    fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        if self.top().mode == Mode::TopLevel {
            self.exhausted = true;
        }
    }

    fn pop_container(&mut self) {
        self.stack.pop();
        if matches!(self.top().mode, Mode::Element | Mode::Value) {
            self.stack.pop();
        }
        if self.top().mode == Mode::TopLevel {
            self.exhausted = true;
        }
    }

    /// Reads a container length prefix and returns the container's end offset.
    fn read_length(&mut self, limit: usize) -> Result<usize> {
        let start = self.r.x;
        let length = self.r.i32()?;
        if length < 5 {
            return Err(Error::malformed(format!(
                "container length {length} at offset {start} is too small"
            )));
        }
        let end = start + length as usize;
        if end > limit {
            return Err(Error::malformed(format!(
                "container at offset {start} claims {length} bytes but only {} remain",
                limit.saturating_sub(start)
            )));
        }
        Ok(end)
    }

    fn push_container(&mut self, mode: Mode, ty: ElementType, end: usize) -> Result<()> {
        let depth = self.top().depth + 1;
        check_depth(depth, self.max_depth)?;
        self.stack.push(Frame {
            mode,
            ty,
            end,
            depth,
        });
        Ok(())
    }

    /// Checks that the cursor is on a value of type `ty`.
    fn begin_scalar(&self, name: &'static str, ty: ElementType) -> Result<Frame> {
        let top = self.top();
        match top.mode {
            Mode::Element | Mode::Value if top.ty == ty => Ok(top),
            Mode::Element | Mode::Value => Err(Error::TypeMismatch {
                expected: ty,
                actual: top.ty,
            }),
            mode => Err(invalid_position(
                Action::Read,
                name,
                mode,
                self.parent_mode(),
                ELEMENT_OR_VALUE,
            )),
        }
    }

    fn end_scalar(&mut self, frame: Frame) -> Result<()> {
        if self.r.x > frame.end {
            return Err(Error::malformed(format!(
                "{} value overruns its container ending at offset {}",
                frame.ty, frame.end
            )));
        }
        self.pop();
        Ok(())
    }

    fn read_end_of_container(&mut self, end: usize) -> Result<()> {
        if self.r.x != end {
            return Err(Error::malformed(format!(
                "terminator at offset {} but length prefix ends at {end}",
                self.r.x - 1
            )));
        }
        self.pop_container();
        Ok(())
    }

    fn read_tag(&mut self) -> Result<Option<ElementType>> {
        let offset = self.r.x;
        let tag = self.r.u8()?;
        if tag == 0 {
            return Ok(None);
        }
        ElementType::from_u8(tag)
            .map(Some)
            .ok_or_else(|| Error::malformed(format!("unknown element type 0x{tag:02x} at offset {offset}")))
    }

    fn string_payload(&mut self) -> Result<String> {
        let offset = self.r.x;
        let length = self.r.i32()?;
        if length < 1 {
            return Err(Error::malformed(format!(
                "string length {length} at offset {offset} is too small"
            )));
        }
        let s = self.r.utf8(length as usize - 1)?.to_owned();
        if self.r.u8()? != 0 {
            return Err(Error::malformed(format!(
                "string at offset {offset} is not NUL-terminated"
            )));
        }
        Ok(s)
    }

    fn skip_length_prefixed(&mut self, extra: usize, includes_prefix: bool) -> Result<()> {
        let offset = self.r.x;
        let length = self.r.i32()?;
        let min = if includes_prefix { 4 } else { 0 };
        if length < min {
            return Err(Error::malformed(format!(
                "length {length} at offset {offset} is invalid"
            )));
        }
        let rest = length as usize - if includes_prefix { 4 } else { 0 };
        self.r.skip(rest + extra)?;
        Ok(())
    }

    fn read_scalar<T>(
        &mut self,
        name: &'static str,
        ty: ElementType,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let frame = self.begin_scalar(name, ty)?;
        let value = read(self)?;
        self.end_scalar(frame)?;
        Ok(value)
    }
}

impl ValueReader for BinaryReader<'_> {
    fn element_type(&self) -> ElementType {
        let top = self.top();
        match top.mode {
            Mode::Element | Mode::Value => top.ty,
            Mode::Array => ElementType::Array,
            _ => ElementType::EmbeddedDocument,
        }
    }

    fn read_array(&mut self) -> Result<()> {
        let top = self.top();
        match top.mode {
            Mode::Element | Mode::Value if top.ty == ElementType::Array => {
                let end = self.read_length(top.end)?;
                self.push_container(Mode::Array, ElementType::Array, end)
            }
            Mode::Element | Mode::Value => Err(Error::TypeMismatch {
                expected: ElementType::Array,
                actual: top.ty,
            }),
            mode => Err(invalid_transition(
                Action::Read,
                "read_array",
                mode,
                Mode::Array,
                self.parent_mode(),
            )),
        }
    }

    fn read_value(&mut self) -> Result<Option<ElementType>> {
        let top = self.top();
        if top.mode != Mode::Array {
            return Err(invalid_position(
                Action::Read,
                "read_value",
                top.mode,
                self.parent_mode(),
                ARRAY_ONLY,
            ));
        }
        let Some(ty) = self.read_tag()? else {
            self.read_end_of_container(top.end)?;
            return Ok(None);
        };
        // Array keys are the decimal indexes; their content is not checked.
        self.r.cstring()?;
        if self.r.x > top.end {
            return Err(Error::malformed("array index overruns its array"));
        }
        self.stack.push(Frame {
            mode: Mode::Value,
            ty,
            end: top.end,
            depth: top.depth,
        });
        Ok(Some(ty))
    }

    fn read_document(&mut self) -> Result<()> {
        let top = self.top();
        match top.mode {
            Mode::TopLevel if !self.exhausted => {
                let start = self.r.x;
                let end = self.read_length(top.end)?;
                if end != top.end {
                    return Err(Error::malformed(format!(
                        "document length {} does not match the {} bytes supplied",
                        end - start,
                        top.end - start
                    )));
                }
                self.push_container(Mode::Document, ElementType::EmbeddedDocument, end)
            }
            Mode::Element | Mode::Value if top.ty == ElementType::EmbeddedDocument => {
                let end = self.read_length(top.end)?;
                self.push_container(Mode::Document, ElementType::EmbeddedDocument, end)
            }
            Mode::Element | Mode::Value => Err(Error::TypeMismatch {
                expected: ElementType::EmbeddedDocument,
                actual: top.ty,
            }),
            mode => Err(invalid_transition(
                Action::Read,
                "read_document",
                mode,
                Mode::Document,
                self.parent_mode(),
            )),
        }
    }

    fn read_element(&mut self) -> Result<Option<(String, ElementType)>> {
        let top = self.top();
        if !DOCUMENT_OR_SCOPE.contains(&top.mode) {
            return Err(invalid_position(
                Action::Read,
                "read_element",
                top.mode,
                self.parent_mode(),
                DOCUMENT_OR_SCOPE,
            ));
        }
        let Some(ty) = self.read_tag()? else {
            self.read_end_of_container(top.end)?;
            return Ok(None);
        };
        let key = self.r.cstring()?.to_owned();
        if self.r.x > top.end {
            return Err(Error::malformed(format!("key {key:?} overruns its document")));
        }
        self.stack.push(Frame {
            mode: Mode::Element,
            ty,
            end: top.end,
            depth: top.depth,
        });
        Ok(Some((key, ty)))
    }

    fn read_code_with_scope(&mut self) -> Result<String> {
        let top = self.begin_scalar("read_code_with_scope", ElementType::JavaScriptCodeWithScope)?;
        let start = self.r.x;
        let total = self.r.i32()?;
        if total < 14 {
            return Err(Error::malformed(format!(
                "code with scope length {total} at offset {start} is too small"
            )));
        }
        let code = self.string_payload()?;
        let end = self.read_length(top.end)?;
        if end != start + total as usize {
            return Err(Error::malformed(format!(
                "code with scope at offset {start} has inconsistent lengths"
            )));
        }
        self.push_container(Mode::CodeWithScope, ElementType::EmbeddedDocument, end)?;
        Ok(code)
    }

    fn skip(&mut self) -> Result<()> {
        let top = self.top();
        if !ELEMENT_OR_VALUE.contains(&top.mode) {
            return Err(invalid_position(
                Action::Read,
                "skip",
                top.mode,
                self.parent_mode(),
                ELEMENT_OR_VALUE,
            ));
        }
        match top.ty {
            ElementType::Double
            | ElementType::DateTime
            | ElementType::Int64
            | ElementType::Timestamp => self.r.skip(8)?,
            ElementType::String | ElementType::JavaScriptCode | ElementType::Symbol => {
                self.skip_length_prefixed(0, false)?
            }
            ElementType::EmbeddedDocument
            | ElementType::Array
            | ElementType::JavaScriptCodeWithScope => self.skip_length_prefixed(0, true)?,
            ElementType::Binary => self.skip_length_prefixed(1, false)?,
            ElementType::Undefined
            | ElementType::Null
            | ElementType::MinKey
            | ElementType::MaxKey => {}
            ElementType::ObjectId => self.r.skip(12)?,
            ElementType::Boolean => self.r.skip(1)?,
            ElementType::RegularExpression => {
                self.r.cstring()?;
                self.r.cstring()?;
            }
            ElementType::DbPointer => self.skip_length_prefixed(12, false)?,
            ElementType::Int32 => self.r.skip(4)?,
            ElementType::Decimal128 => self.r.skip(16)?,
        }
        self.end_scalar(top)
    }

    fn read_double(&mut self) -> Result<f64> {
        self.read_scalar("read_double", ElementType::Double, |s| Ok(s.r.f64()?))
    }

    fn read_string(&mut self) -> Result<String> {
        self.read_scalar("read_string", ElementType::String, Self::string_payload)
    }

    fn read_binary(&mut self) -> Result<Binary> {
        self.read_scalar("read_binary", ElementType::Binary, |s| {
            let offset = s.r.x;
            let length = s.r.i32()?;
            if length < 0 {
                return Err(Error::malformed(format!(
                    "binary length {length} at offset {offset} is negative"
                )));
            }
            let subtype = s.r.u8()?;
            let bytes = if subtype == subtype::BINARY_OLD {
                let inner = s.r.i32()?;
                if inner < 0 || inner as i64 != length as i64 - 4 {
                    return Err(Error::malformed(format!(
                        "old binary at offset {offset} has inner length {inner} for outer length {length}"
                    )));
                }
                s.r.buf(inner as usize)?
            } else {
                s.r.buf(length as usize)?
            };
            Ok(Binary::new(subtype, bytes))
        })
    }

    fn read_undefined(&mut self) -> Result<()> {
        self.read_scalar("read_undefined", ElementType::Undefined, |_| Ok(()))
    }

    fn read_object_id(&mut self) -> Result<ObjectId> {
        self.read_scalar("read_object_id", ElementType::ObjectId, |s| {
            Ok(ObjectId::from_bytes(s.r.array::<12>()?))
        })
    }

    fn read_boolean(&mut self) -> Result<bool> {
        self.read_scalar("read_boolean", ElementType::Boolean, |s| {
            let offset = s.r.x;
            match s.r.u8()? {
                0 => Ok(false),
                1 => Ok(true),
                b => Err(Error::malformed(format!(
                    "invalid boolean byte 0x{b:02x} at offset {offset}"
                ))),
            }
        })
    }

    fn read_date_time(&mut self) -> Result<i64> {
        self.read_scalar("read_date_time", ElementType::DateTime, |s| Ok(s.r.i64()?))
    }

    fn read_null(&mut self) -> Result<()> {
        self.read_scalar("read_null", ElementType::Null, |_| Ok(()))
    }

    fn read_regex(&mut self) -> Result<Regex> {
        self.read_scalar("read_regex", ElementType::RegularExpression, |s| {
            let pattern = s.r.cstring()?.to_owned();
            let options = s.r.cstring()?;
            Ok(Regex::new(pattern, options))
        })
    }

    fn read_db_pointer(&mut self) -> Result<DbPointer> {
        self.read_scalar("read_db_pointer", ElementType::DbPointer, |s| {
            let namespace = s.string_payload()?;
            let id = ObjectId::from_bytes(s.r.array::<12>()?);
            Ok(DbPointer { namespace, id })
        })
    }

    fn read_javascript(&mut self) -> Result<String> {
        self.read_scalar(
            "read_javascript",
            ElementType::JavaScriptCode,
            Self::string_payload,
        )
    }

    fn read_symbol(&mut self) -> Result<String> {
        self.read_scalar("read_symbol", ElementType::Symbol, Self::string_payload)
    }

    fn read_int32(&mut self) -> Result<i32> {
        self.read_scalar("read_int32", ElementType::Int32, |s| Ok(s.r.i32()?))
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.read_scalar("read_timestamp", ElementType::Timestamp, |s| {
            let increment = s.r.u32()?;
            let time = s.r.u32()?;
            Ok(Timestamp { time, increment })
        })
    }

    fn read_int64(&mut self) -> Result<i64> {
        self.read_scalar("read_int64", ElementType::Int64, |s| Ok(s.r.i64()?))
    }

    fn read_decimal128(&mut self) -> Result<Decimal128> {
        self.read_scalar("read_decimal128", ElementType::Decimal128, |s| {
            Ok(Decimal128::from_bytes(s.r.array::<16>()?))
        })
    }

    fn read_min_key(&mut self) -> Result<()> {
        self.read_scalar("read_min_key", ElementType::MinKey, |_| Ok(()))
    }

    fn read_max_key(&mut self) -> Result<()> {
        self.read_scalar("read_max_key", ElementType::MaxKey, |_| Ok(()))
    }
}
