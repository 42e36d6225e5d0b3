//! Extended JSON reader.
//!
//! Text is parsed up front into a [`Bson`] tree and the reader walks that
//! tree. Each container frame owns an iterator over its remaining children,
//! so skipping a value drops it whole and the stack always returns to the
//! enclosing container.

use std::vec;

use super::{
    check_depth, invalid_position, invalid_transition, Mode, ValueReader, ARRAY_ONLY,
    DEFAULT_MAX_DEPTH, DOCUMENT_OR_SCOPE, ELEMENT_OR_VALUE,
};
use crate::error::{Action, Error, Result};
use crate::extjson::ExtJsonParser;
use crate::wire::ElementType;
use crate::value::{Binary, Bson, DbPointer, Decimal128, Document, ObjectId, Regex, Timestamp};

enum Content {
    Empty,
    Pending(Bson),
    Entries(vec::IntoIter<(String, Bson)>),
    Items(vec::IntoIter<Bson>),
}

struct Frame {
    mode: Mode,
    ty: ElementType,
    depth: usize,
    content: Content,
}

/// Reads an Extended JSON document (or an already-built [`Bson`] tree)
/// through the [`ValueReader`] state machine.
pub struct ExtJsonReader {
    stack: Vec<Frame>,
    max_depth: usize,
}

impl ExtJsonReader {
    /// Parses `text` as a top-level document.
    pub fn new(text: &str, canonical_only: bool) -> Result<Self> {
        Self::with_depth_limit(text, canonical_only, DEFAULT_MAX_DEPTH)
    }

    /// Like [`ExtJsonReader::new`], with one nesting limit applied both while
    /// parsing and while reading.
    pub fn with_depth_limit(text: &str, canonical_only: bool, max_depth: usize) -> Result<Self> {
        let doc = ExtJsonParser::new(canonical_only)
            .with_max_depth(max_depth)
            .parse_document(text)?;
        Ok(Self::from_document(doc).with_max_depth(max_depth))
    }

    pub fn from_document(doc: Document) -> Self {
        Self {
            stack: vec![Frame {
                mode: Mode::TopLevel,
                ty: ElementType::EmbeddedDocument,
                depth: 0,
                content: Content::Pending(Bson::Document(doc)),
            }],
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Reader positioned on a single value.
    pub fn from_value(value: Bson) -> Self {
        let mut reader = Self::from_document(Document::new());
        reader.stack[0].content = Content::Empty;
        reader.stack.push(Frame {
            mode: Mode::Value,
            ty: value.element_type(),
            depth: 0,
            content: Content::Pending(value),
        });
        reader
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn top(&self) -> &Frame {
        &self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let i = self.stack.len() - 1;
        &mut self.stack[i]
    }

    fn parent_mode(&self) -> Option<Mode> {
        self.stack.len().checked_sub(2).map(|i| self.stack[i].mode)
    }

    fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn pop_container(&mut self) {
        self.pop();
        if ELEMENT_OR_VALUE.contains(&self.top().mode) {
            self.pop();
        }
    }

    fn push_container(&mut self, mode: Mode, ty: ElementType, content: Content) -> Result<()> {
        let depth = self.top().depth + 1;
        check_depth(depth, self.max_depth)?;
        self.stack.push(Frame {
            mode,
            ty,
            depth,
            content,
        });
        Ok(())
    }

    /// Takes the pending value of the element or value frame on top.
    fn take_pending(&mut self) -> Bson {
        match std::mem::replace(&mut self.top_mut().content, Content::Empty) {
            Content::Pending(v) => v,
            _ => Bson::Null,
        }
    }

    /// Consumes the scalar under the cursor after checking position and type.
    fn take(&mut self, name: &'static str, ty: ElementType) -> Result<Bson> {
        let top = self.top();
        match top.mode {
            Mode::Element | Mode::Value if top.ty == ty => {
                let value = self.take_pending();
                self.pop();
                Ok(value)
            }
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

    fn push_child(&mut self, mode: Mode, value: Bson) {
        let depth = self.top().depth;
        self.stack.push(Frame {
            mode,
            ty: value.element_type(),
            depth,
            content: Content::Pending(value),
        });
    }
}

fn mismatch(expected: ElementType, actual: &Bson) -> Error {
    Error::TypeMismatch {
        expected,
        actual: actual.element_type(),
    }
}

impl ValueReader for ExtJsonReader {
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
                let items = match self.take_pending() {
                    Bson::Array(items) => items,
                    other => return Err(mismatch(ElementType::Array, &other)),
                };
                self.push_container(
                    Mode::Array,
                    ElementType::Array,
                    Content::Items(items.into_iter()),
                )
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
        let mode = self.top().mode;
        if mode != Mode::Array {
            return Err(invalid_position(
                Action::Read,
                "read_value",
                mode,
                self.parent_mode(),
                ARRAY_ONLY,
            ));
        }
        let next = match &mut self.top_mut().content {
            Content::Items(items) => items.next(),
            _ => None,
        };
        match next {
            Some(value) => {
                let ty = value.element_type();
                self.push_child(Mode::Value, value);
                Ok(Some(ty))
            }
            None => {
                self.pop_container();
                Ok(None)
            }
        }
    }

    fn read_document(&mut self) -> Result<()> {
        let top = self.top();
        match top.mode {
            Mode::TopLevel if matches!(top.content, Content::Pending(_)) => {}
            Mode::Element | Mode::Value if top.ty == ElementType::EmbeddedDocument => {}
            Mode::Element | Mode::Value => {
                return Err(Error::TypeMismatch {
                    expected: ElementType::EmbeddedDocument,
                    actual: top.ty,
                })
            }
            mode => {
                return Err(invalid_transition(
                    Action::Read,
                    "read_document",
                    mode,
                    Mode::Document,
                    self.parent_mode(),
                ))
            }
        }
        let doc = match self.take_pending() {
            Bson::Document(doc) => doc,
            other => return Err(mismatch(ElementType::EmbeddedDocument, &other)),
        };
        self.push_container(
            Mode::Document,
            ElementType::EmbeddedDocument,
            Content::Entries(doc.into_iter()),
        )
    }

    fn read_element(&mut self) -> Result<Option<(String, ElementType)>> {
        let mode = self.top().mode;
        if !DOCUMENT_OR_SCOPE.contains(&mode) {
            return Err(invalid_position(
                Action::Read,
                "read_element",
                mode,
                self.parent_mode(),
                DOCUMENT_OR_SCOPE,
            ));
        }
        let next = match &mut self.top_mut().content {
            Content::Entries(entries) => entries.next(),
            _ => None,
        };
        match next {
            Some((key, value)) => {
                let ty = value.element_type();
                self.push_child(Mode::Element, value);
                Ok(Some((key, ty)))
            }
            None => {
                self.pop_container();
                Ok(None)
            }
        }
    }

    fn read_code_with_scope(&mut self) -> Result<String> {
        let top = self.top();
        match top.mode {
            Mode::Element | Mode::Value if top.ty == ElementType::JavaScriptCodeWithScope => {}
            Mode::Element | Mode::Value => {
                return Err(Error::TypeMismatch {
                    expected: ElementType::JavaScriptCodeWithScope,
                    actual: top.ty,
                })
            }
            mode => {
                return Err(invalid_position(
                    Action::Read,
                    "read_code_with_scope",
                    mode,
                    self.parent_mode(),
                    ELEMENT_OR_VALUE,
                ))
            }
        }
        let cws = match self.take_pending() {
            Bson::JavaScriptCodeWithScope(cws) => cws,
            other => return Err(mismatch(ElementType::JavaScriptCodeWithScope, &other)),
        };
        self.push_container(
            Mode::CodeWithScope,
            ElementType::EmbeddedDocument,
            Content::Entries(cws.scope.into_iter()),
        )?;
        Ok(cws.code)
    }

    fn skip(&mut self) -> Result<()> {
        let mode = self.top().mode;
        if !ELEMENT_OR_VALUE.contains(&mode) {
            return Err(invalid_position(
                Action::Read,
                "skip",
                mode,
                self.parent_mode(),
                ELEMENT_OR_VALUE,
            ));
        }
        self.pop();
        Ok(())
    }

    fn read_double(&mut self) -> Result<f64> {
        match self.take("read_double", ElementType::Double)? {
            Bson::Double(v) => Ok(v),
            other => Err(mismatch(ElementType::Double, &other)),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        match self.take("read_string", ElementType::String)? {
            Bson::String(v) => Ok(v),
            other => Err(mismatch(ElementType::String, &other)),
        }
    }

    fn read_binary(&mut self) -> Result<Binary> {
        match self.take("read_binary", ElementType::Binary)? {
            Bson::Binary(v) => Ok(v),
            other => Err(mismatch(ElementType::Binary, &other)),
        }
    }

    fn read_undefined(&mut self) -> Result<()> {
        self.take("read_undefined", ElementType::Undefined).map(drop)
    }

    fn read_object_id(&mut self) -> Result<ObjectId> {
        match self.take("read_object_id", ElementType::ObjectId)? {
            Bson::ObjectId(v) => Ok(v),
            other => Err(mismatch(ElementType::ObjectId, &other)),
        }
    }

    fn read_boolean(&mut self) -> Result<bool> {
        match self.take("read_boolean", ElementType::Boolean)? {
            Bson::Boolean(v) => Ok(v),
            other => Err(mismatch(ElementType::Boolean, &other)),
        }
    }

    fn read_date_time(&mut self) -> Result<i64> {
        match self.take("read_date_time", ElementType::DateTime)? {
            Bson::DateTime(v) => Ok(v.timestamp_millis()),
            other => Err(mismatch(ElementType::DateTime, &other)),
        }
    }

    fn read_null(&mut self) -> Result<()> {
        self.take("read_null", ElementType::Null).map(drop)
    }

    fn read_regex(&mut self) -> Result<Regex> {
        match self.take("read_regex", ElementType::RegularExpression)? {
            Bson::RegularExpression(v) => Ok(v),
            other => Err(mismatch(ElementType::RegularExpression, &other)),
        }
    }

    fn read_db_pointer(&mut self) -> Result<DbPointer> {
        match self.take("read_db_pointer", ElementType::DbPointer)? {
            Bson::DbPointer(v) => Ok(v),
            other => Err(mismatch(ElementType::DbPointer, &other)),
        }
    }

    fn read_javascript(&mut self) -> Result<String> {
        match self.take("read_javascript", ElementType::JavaScriptCode)? {
            Bson::JavaScriptCode(v) => Ok(v),
            other => Err(mismatch(ElementType::JavaScriptCode, &other)),
        }
    }

    fn read_symbol(&mut self) -> Result<String> {
        match self.take("read_symbol", ElementType::Symbol)? {
            Bson::Symbol(v) => Ok(v),
            other => Err(mismatch(ElementType::Symbol, &other)),
        }
    }

    fn read_int32(&mut self) -> Result<i32> {
        match self.take("read_int32", ElementType::Int32)? {
            Bson::Int32(v) => Ok(v),
            other => Err(mismatch(ElementType::Int32, &other)),
        }
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        match self.take("read_timestamp", ElementType::Timestamp)? {
            Bson::Timestamp(v) => Ok(v),
            other => Err(mismatch(ElementType::Timestamp, &other)),
        }
    }

    fn read_int64(&mut self) -> Result<i64> {
        match self.take("read_int64", ElementType::Int64)? {
            Bson::Int64(v) => Ok(v),
            other => Err(mismatch(ElementType::Int64, &other)),
        }
    }

    fn read_decimal128(&mut self) -> Result<Decimal128> {
        match self.take("read_decimal128", ElementType::Decimal128)? {
            Bson::Decimal128(v) => Ok(v),
            other => Err(mismatch(ElementType::Decimal128, &other)),
        }
    }

    fn read_min_key(&mut self) -> Result<()> {
        self.take("read_min_key", ElementType::MinKey).map(drop)
    }

    fn read_max_key(&mut self) -> Result<()> {
        self.take("read_max_key", ElementType::MaxKey).map(drop)
    }
}
