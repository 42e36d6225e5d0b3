//! Binary BSON writer.

use bson_codec_buffers::Writer;

use super::{
    check_depth, invalid_position, invalid_transition, Mode, ValueWriter, ARRAY_ONLY,
    DEFAULT_MAX_DEPTH, DOCUMENT_OR_SCOPE, ELEMENT_OR_VALUE,
};
use crate::error::{Action, Error, Result};
use crate::wire::{subtype, ElementType};
use crate::value::{Decimal128, ObjectId, Timestamp};

#[derive(Debug)]
enum Slot {
    /// Container frames and the top-level frame.
    None,
    Key(String),
    Index(usize),
    /// Root of a value writer: no tag, no key.
    Bare,
}

#[derive(Debug)]
struct Frame {
    mode: Mode,
    slot: Slot,
    /// Offset of the reserved length prefix.
    start: usize,
    /// Offset of the scope length prefix of a code-with-scope frame.
    scope_start: usize,
    next_index: usize,
    depth: usize,
}

impl Frame {
    fn new(mode: Mode, slot: Slot, depth: usize) -> Self {
        Self {
            mode,
            slot,
            start: 0,
            scope_start: 0,
            next_index: 0,
            depth,
        }
    }
}

/// Writes BSON into a growable buffer, back-patching length prefixes as
/// containers close.
pub struct BinaryWriter {
    w: Writer,
    stack: Vec<Frame>,
    max_depth: usize,
    bare_type: Option<ElementType>,
    done: bool,
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryWriter {
    /// Writer for one top-level document.
    pub fn new() -> Self {
        Self::with_buffer(Vec::new())
    }

    /// Writer that appends into a recycled buffer, cleared first.
    pub fn with_buffer(buf: Vec<u8>) -> Self {
        Self {
            w: Writer::with_buffer(buf),
            stack: vec![Frame::new(Mode::TopLevel, Slot::None, 0)],
            max_depth: DEFAULT_MAX_DEPTH,
            bare_type: None,
            done: false,
        }
    }

    /// Writer for a single bare value of any type.
    pub fn new_value() -> Self {
        let mut writer = Self::new();
        writer.stack.push(Frame::new(Mode::Value, Slot::Bare, 0));
        writer
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.w.as_slice()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.w.into_inner()
    }

    /// Consumes a value writer, returning the written type and payload.
    pub fn into_value(self) -> Result<(ElementType, Vec<u8>)> {
        match self.bare_type {
            Some(ty) if self.done => Ok((ty, self.w.into_inner())),
            _ => Err(Error::custom("value writer finished without a complete value")),
        }
    }

    fn top_mode(&self) -> Mode {
        self.stack[self.stack.len() - 1].mode
    }

    fn parent_mode(&self) -> Option<Mode> {
        self.stack.len().checked_sub(2).map(|i| self.stack[i].mode)
    }

    fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        if self.top_mode() == Mode::TopLevel {
            self.done = true;
        }
    }

    /// Emits the type tag and key for the value about to be written.
    fn write_type_and_key(&mut self, name: &'static str, ty: ElementType) -> Result<()> {
        let i = self.stack.len() - 1;
        let mode = self.stack[i].mode;
        if !ELEMENT_OR_VALUE.contains(&mode) {
            return Err(invalid_position(
                Action::Write,
                name,
                mode,
                self.parent_mode(),
                ELEMENT_OR_VALUE,
            ));
        }
        match &self.stack[i].slot {
            Slot::Key(key) => {
                self.w.u8(ty.tag());
                self.w.cstring(key)?;
            }
            Slot::Index(index) => {
                self.w.u8(ty.tag());
                self.w.cstring(&index.to_string())?;
            }
            Slot::Bare => self.bare_type = Some(ty),
            Slot::None => {}
        }
        Ok(())
    }

    fn write_scalar(
        &mut self,
        name: &'static str,
        ty: ElementType,
        payload: impl FnOnce(&mut Writer) -> Result<()>,
    ) -> Result<()> {
        self.write_type_and_key(name, ty)?;
        payload(&mut self.w)?;
        self.pop();
        Ok(())
    }

    fn push_container(&mut self, mode: Mode) -> Result<()> {
        let depth = self.stack[self.stack.len() - 1].depth + 1;
        check_depth(depth, self.max_depth)?;
        let mut frame = Frame::new(mode, Slot::None, depth);
        frame.start = self.w.reserve_i32();
        self.stack.push(frame);
        Ok(())
    }

    fn end_container(&mut self, name: &'static str, allowed: &'static [Mode]) -> Result<()> {
        let mode = self.top_mode();
        if !allowed.contains(&mode) {
            return Err(invalid_position(
                Action::Write,
                name,
                mode,
                self.parent_mode(),
                allowed,
            ));
        }
        self.w.u8(0);
        if let Some(frame) = self.stack.pop() {
            if frame.mode == Mode::CodeWithScope {
                self.w.patch_length(frame.scope_start)?;
            }
            self.w.patch_length(frame.start)?;
        }
        self.pop_if_positioned();
        Ok(())
    }

    fn pop_if_positioned(&mut self) {
        if ELEMENT_OR_VALUE.contains(&self.top_mode()) {
            self.pop();
        } else if self.top_mode() == Mode::TopLevel {
            self.done = true;
        }
    }
}

fn length_prefix(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| Error::malformed(format!("{len} bytes exceed a BSON length prefix")))
}

impl ValueWriter for BinaryWriter {
    fn write_array(&mut self) -> Result<()> {
        let mode = self.top_mode();
        if !ELEMENT_OR_VALUE.contains(&mode) {
            return Err(invalid_transition(
                Action::Write,
                "write_array",
                mode,
                Mode::Array,
                self.parent_mode(),
            ));
        }
        self.write_type_and_key("write_array", ElementType::Array)?;
        self.push_container(Mode::Array)
    }

    fn write_array_element(&mut self) -> Result<()> {
        let i = self.stack.len() - 1;
        if self.stack[i].mode != Mode::Array {
            return Err(invalid_position(
                Action::Write,
                "write_array_element",
                self.stack[i].mode,
                self.parent_mode(),
                ARRAY_ONLY,
            ));
        }
        let index = self.stack[i].next_index;
        self.stack[i].next_index += 1;
        let depth = self.stack[i].depth;
        self.stack.push(Frame::new(Mode::Value, Slot::Index(index), depth));
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<()> {
        self.end_container("write_array_end", ARRAY_ONLY)
    }

    fn write_document(&mut self) -> Result<()> {
        match self.top_mode() {
            Mode::TopLevel if !self.done => self.push_container(Mode::Document),
            Mode::Element | Mode::Value => {
                self.write_type_and_key("write_document", ElementType::EmbeddedDocument)?;
                self.push_container(Mode::Document)
            }
            mode => Err(invalid_transition(
                Action::Write,
                "write_document",
                mode,
                Mode::Document,
                self.parent_mode(),
            )),
        }
    }

    fn write_document_element(&mut self, key: &str) -> Result<()> {
        let mode = self.top_mode();
        if !DOCUMENT_OR_SCOPE.contains(&mode) {
            return Err(invalid_position(
                Action::Write,
                "write_document_element",
                mode,
                self.parent_mode(),
                DOCUMENT_OR_SCOPE,
            ));
        }
        let depth = self.stack[self.stack.len() - 1].depth;
        self.stack
            .push(Frame::new(Mode::Element, Slot::Key(key.to_owned()), depth));
        Ok(())
    }

    fn write_document_end(&mut self) -> Result<()> {
        self.end_container("write_document_end", DOCUMENT_OR_SCOPE)
    }

    fn write_code_with_scope(&mut self, code: &str) -> Result<()> {
        self.write_type_and_key("write_code_with_scope", ElementType::JavaScriptCodeWithScope)?;
        self.push_container(Mode::CodeWithScope)?;
        self.w.string(code)?;
        let scope_start = self.w.reserve_i32();
        let i = self.stack.len() - 1;
        self.stack[i].scope_start = scope_start;
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.write_scalar("write_double", ElementType::Double, |w| {
            w.f64(v);
            Ok(())
        })
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        self.write_scalar("write_string", ElementType::String, |w| Ok(w.string(v)?))
    }

    fn write_binary(&mut self, st: u8, bytes: &[u8]) -> Result<()> {
        let len = length_prefix(bytes.len())?;
        self.write_scalar("write_binary", ElementType::Binary, |w| {
            if st == subtype::BINARY_OLD {
                w.i32(length_prefix(bytes.len() + 4)?);
                w.u8(st);
                w.i32(len);
            } else {
                w.i32(len);
                w.u8(st);
            }
            w.buf(bytes);
            Ok(())
        })
    }

    fn write_undefined(&mut self) -> Result<()> {
        self.write_scalar("write_undefined", ElementType::Undefined, |_| Ok(()))
    }

    fn write_object_id(&mut self, v: ObjectId) -> Result<()> {
        self.write_scalar("write_object_id", ElementType::ObjectId, |w| {
            w.buf(&v.bytes());
            Ok(())
        })
    }

    fn write_boolean(&mut self, v: bool) -> Result<()> {
        self.write_scalar("write_boolean", ElementType::Boolean, |w| {
            w.u8(u8::from(v));
            Ok(())
        })
    }

    fn write_date_time(&mut self, ms: i64) -> Result<()> {
        self.write_scalar("write_date_time", ElementType::DateTime, |w| {
            w.i64(ms);
            Ok(())
        })
    }

    fn write_null(&mut self) -> Result<()> {
        self.write_scalar("write_null", ElementType::Null, |_| Ok(()))
    }

    fn write_regex(&mut self, pattern: &str, options: &str) -> Result<()> {
        let mut sorted: Vec<char> = options.chars().collect();
        sorted.sort_unstable();
        let options: String = sorted.into_iter().collect();
        self.write_scalar("write_regex", ElementType::RegularExpression, |w| {
            w.cstring(pattern)?;
            w.cstring(&options)?;
            Ok(())
        })
    }

    fn write_db_pointer(&mut self, namespace: &str, id: ObjectId) -> Result<()> {
        self.write_scalar("write_db_pointer", ElementType::DbPointer, |w| {
            w.string(namespace)?;
            w.buf(&id.bytes());
            Ok(())
        })
    }

    fn write_javascript(&mut self, code: &str) -> Result<()> {
        self.write_scalar("write_javascript", ElementType::JavaScriptCode, |w| {
            Ok(w.string(code)?)
        })
    }

    fn write_symbol(&mut self, symbol: &str) -> Result<()> {
        self.write_scalar("write_symbol", ElementType::Symbol, |w| Ok(w.string(symbol)?))
    }

    fn write_int32(&mut self, v: i32) -> Result<()> {
        self.write_scalar("write_int32", ElementType::Int32, |w| {
            w.i32(v);
            Ok(())
        })
    }

    fn write_timestamp(&mut self, v: Timestamp) -> Result<()> {
        self.write_scalar("write_timestamp", ElementType::Timestamp, |w| {
            w.u32(v.increment);
            w.u32(v.time);
            Ok(())
        })
    }

    fn write_int64(&mut self, v: i64) -> Result<()> {
        self.write_scalar("write_int64", ElementType::Int64, |w| {
            w.i64(v);
            Ok(())
        })
    }

    fn write_decimal128(&mut self, v: Decimal128) -> Result<()> {
        self.write_scalar("write_decimal128", ElementType::Decimal128, |w| {
            w.buf(&v.bytes());
            Ok(())
        })
    }

    fn write_min_key(&mut self) -> Result<()> {
        self.write_scalar("write_min_key", ElementType::MinKey, |_| Ok(()))
    }

    fn write_max_key(&mut self) -> Result<()> {
        self.write_scalar("write_max_key", ElementType::MaxKey, |_| Ok(()))
    }
}
