//! In-memory value model.
//!
//! [`Bson`] is the closed sum over every wire type; [`Document`] is an ordered
//! key/value sequence built on it. The fixed-shape types in [`types`] double
//! as native types with their own codecs, so a struct field of type
//! [`ObjectId`] encodes as an ObjectId without going through [`Bson`].

mod datetime;
mod decimal128;
mod document;
mod oid;
mod types;

pub use datetime::DateTime;
pub use decimal128::Decimal128;
pub use document::Document;
pub use oid::ObjectId;
pub use types::{
    Binary, CodeWithScope, DbPointer, JavaScript, MaxKey, MinKey, Null, Regex, Symbol,
    Timestamp, Undefined,
};

use crate::wire::ElementType;

/// A BSON array.
pub type Array = Vec<Bson>;

/// Any value that can appear as a document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Bson {
    /// BSON double (0x01)
    Double(f64),
    /// BSON UTF-8 string (0x02)
    String(String),
    /// Embedded document (0x03)
    Document(Document),
    /// Array (0x04)
    Array(Array),
    /// Binary data (0x05)
    Binary(Binary),
    /// Undefined, deprecated (0x06)
    Undefined,
    /// ObjectId (0x07)
    ObjectId(ObjectId),
    /// Boolean (0x08)
    Boolean(bool),
    /// UTC datetime (0x09)
    DateTime(DateTime),
    /// Null (0x0a)
    Null,
    /// Regular expression (0x0b)
    RegularExpression(Regex),
    /// DBPointer, deprecated (0x0c)
    DbPointer(DbPointer),
    /// JavaScript code (0x0d)
    JavaScriptCode(String),
    /// Symbol, deprecated (0x0e)
    Symbol(String),
    /// JavaScript code with scope, deprecated (0x0f)
    JavaScriptCodeWithScope(CodeWithScope),
    /// 32-bit integer (0x10)
    Int32(i32),
    /// Replication timestamp (0x11)
    Timestamp(Timestamp),
    /// 64-bit integer (0x12)
    Int64(i64),
    /// 128-bit decimal (0x13)
    Decimal128(Decimal128),
    /// Min key (0xff)
    MinKey,
    /// Max key (0x7f)
    MaxKey,
}

impl Bson {
    /// The wire type this value encodes as.
    pub fn element_type(&self) -> ElementType {
        match self {
            Bson::Double(_) => ElementType::Double,
            Bson::String(_) => ElementType::String,
            Bson::Document(_) => ElementType::EmbeddedDocument,
            Bson::Array(_) => ElementType::Array,
            Bson::Binary(_) => ElementType::Binary,
            Bson::Undefined => ElementType::Undefined,
            Bson::ObjectId(_) => ElementType::ObjectId,
            Bson::Boolean(_) => ElementType::Boolean,
            Bson::DateTime(_) => ElementType::DateTime,
            Bson::Null => ElementType::Null,
            Bson::RegularExpression(_) => ElementType::RegularExpression,
            Bson::DbPointer(_) => ElementType::DbPointer,
            Bson::JavaScriptCode(_) => ElementType::JavaScriptCode,
            Bson::Symbol(_) => ElementType::Symbol,
            Bson::JavaScriptCodeWithScope(_) => ElementType::JavaScriptCodeWithScope,
            Bson::Int32(_) => ElementType::Int32,
            Bson::Timestamp(_) => ElementType::Timestamp,
            Bson::Int64(_) => ElementType::Int64,
            Bson::Decimal128(_) => ElementType::Decimal128,
            Bson::MinKey => ElementType::MinKey,
            Bson::MaxKey => ElementType::MaxKey,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bson::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Bson::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Bson::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Bson::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Bson::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Bson::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Bson::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Bson::Null)
    }
}

impl Default for Bson {
    fn default() -> Self {
        Bson::Null
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Bson {
                fn from(v: $ty) -> Self {
                    Bson::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    f64 => Double,
    f32 => Double,
    i32 => Int32,
    i64 => Int64,
    u32 => Int64,
    bool => Boolean,
    String => String,
    &str => String,
    Document => Document,
    Binary => Binary,
    ObjectId => ObjectId,
    DateTime => DateTime,
    Regex => RegularExpression,
    DbPointer => DbPointer,
    CodeWithScope => JavaScriptCodeWithScope,
    Timestamp => Timestamp,
    Decimal128 => Decimal128,
}

impl From<JavaScript> for Bson {
    fn from(v: JavaScript) -> Self {
        Bson::JavaScriptCode(v.0)
    }
}

impl From<Symbol> for Bson {
    fn from(v: Symbol) -> Self {
        Bson::Symbol(v.0)
    }
}

impl From<MinKey> for Bson {
    fn from(_: MinKey) -> Self {
        Bson::MinKey
    }
}

impl From<MaxKey> for Bson {
    fn from(_: MaxKey) -> Self {
        Bson::MaxKey
    }
}

impl From<Null> for Bson {
    fn from(_: Null) -> Self {
        Bson::Null
    }
}

impl From<Undefined> for Bson {
    fn from(_: Undefined) -> Self {
        Bson::Undefined
    }
}

impl<T: Into<Bson>> From<Vec<T>> for Bson {
    fn from(v: Vec<T>) -> Self {
        Bson::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Bson>> From<Option<T>> for Bson {
    fn from(v: Option<T>) -> Self {
        v.map_or(Bson::Null, Into::into)
    }
}

/// Builds a [`Document`] from `key => value` pairs, in order.
///
/// ```
/// use bson_codec::{doc, Bson};
///
/// let d = doc! { "foo" => 1, "bar" => "baz" };
/// assert_eq!(d.get("foo"), Some(&Bson::Int32(1)));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::Document::new();
        $( doc.push($key, $value); )+
        doc
    }};
}
