//! Codecs for native types that map to exactly one wire type.

use std::marker::PhantomData;

use chrono::{TimeZone, Utc};

use super::primitive::wrong_native;
use super::{read_bson, write_bson, DecodeContext, EncodeContext, ValueDecoder, ValueEncoder};
use crate::error::{Error, Result};
use crate::reflect::{Reflect, Typed};
use crate::rw::{ValueReader, ValueWriter};
use crate::wire::ElementType;
use crate::value::{
    Binary, CodeWithScope, DateTime, DbPointer, Decimal128, Document, JavaScript, MaxKey, MinKey,
    Null, ObjectId, Regex, Symbol, Timestamp, Undefined,
};

/// A native type with a single wire representation.
pub trait FixedType: Reflect + Typed + Sized {
    const WIRE: ElementType;
    /// Codec name used in error messages.
    const CODEC: &'static str;

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()>;

    fn read(vr: &mut dyn ValueReader) -> Result<Self>;
}

/// Codec for any [`FixedType`]. Both the native type and the wire type must
/// match exactly.
pub struct FixedCodec<T>(PhantomData<fn() -> T>);

impl<T> FixedCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FixedCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for FixedCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FixedCodec<{}>", std::any::type_name::<T>())
    }
}

impl<T: FixedType> ValueEncoder for FixedCodec<T> {
    fn encode_value(
        &self,
        _ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        let Some(v) = value.downcast_ref::<T>() else {
            return Err(wrong_native(
                T::CODEC,
                std::any::type_name::<T>(),
                value.type_name(),
            ));
        };
        v.write(vw)
    }
}

impl<T: FixedType> ValueDecoder for FixedCodec<T> {
    fn decode_value(
        &self,
        _ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let Some(slot) = target.downcast_mut::<T>() else {
            return Err(wrong_native(T::CODEC, std::any::type_name::<T>(), type_name));
        };
        let actual = vr.element_type();
        if actual != T::WIRE {
            return Err(Error::WrongWireType {
                codec: T::CODEC,
                expected: T::WIRE.to_string(),
                actual,
            });
        }
        *slot = T::read(vr)?;
        Ok(())
    }
}

impl FixedType for ObjectId {
    const WIRE: ElementType = ElementType::ObjectId;
    const CODEC: &'static str = "ObjectIdCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_object_id(*self)
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        vr.read_object_id()
    }
}

impl FixedType for Decimal128 {
    const WIRE: ElementType = ElementType::Decimal128;
    const CODEC: &'static str = "Decimal128Codec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_decimal128(*self)
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        vr.read_decimal128()
    }
}

impl FixedType for DateTime {
    const WIRE: ElementType = ElementType::DateTime;
    const CODEC: &'static str = "DateTimeCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_date_time(self.timestamp_millis())
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        vr.read_date_time().map(DateTime::from_millis)
    }
}

impl FixedType for chrono::DateTime<Utc> {
    const WIRE: ElementType = ElementType::DateTime;
    const CODEC: &'static str = "TimeCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_date_time(self.timestamp_millis())
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        let ms = vr.read_date_time()?;
        Utc.timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| Error::Overflow {
                value: ms.to_string(),
                target: "chrono::DateTime<Utc>",
            })
    }
}

impl FixedType for Timestamp {
    const WIRE: ElementType = ElementType::Timestamp;
    const CODEC: &'static str = "TimestampCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_timestamp(*self)
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        vr.read_timestamp()
    }
}

impl FixedType for Regex {
    const WIRE: ElementType = ElementType::RegularExpression;
    const CODEC: &'static str = "RegexCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_regex(&self.pattern, &self.options)
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        vr.read_regex()
    }
}

impl FixedType for DbPointer {
    const WIRE: ElementType = ElementType::DbPointer;
    const CODEC: &'static str = "DBPointerCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_db_pointer(&self.namespace, self.id)
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        vr.read_db_pointer()
    }
}

impl FixedType for CodeWithScope {
    const WIRE: ElementType = ElementType::JavaScriptCodeWithScope;
    const CODEC: &'static str = "CodeWithScopeCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_code_with_scope(&self.code)?;
        for (key, value) in self.scope.iter() {
            vw.write_document_element(key)?;
            write_bson(vw, value)?;
        }
        vw.write_document_end()
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        let code = vr.read_code_with_scope()?;
        let mut scope = Document::new();
        while let Some((key, _)) = vr.read_element()? {
            let value = read_bson(vr).map_err(|e| e.at_key(&key))?;
            scope.push(key, value);
        }
        Ok(CodeWithScope { code, scope })
    }
}

impl FixedType for Binary {
    const WIRE: ElementType = ElementType::Binary;
    const CODEC: &'static str = "BinaryCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_binary(self.subtype, &self.bytes)
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        vr.read_binary()
    }
}

impl FixedType for JavaScript {
    const WIRE: ElementType = ElementType::JavaScriptCode;
    const CODEC: &'static str = "JavaScriptCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_javascript(&self.0)
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        vr.read_javascript().map(JavaScript)
    }
}

impl FixedType for Symbol {
    const WIRE: ElementType = ElementType::Symbol;
    const CODEC: &'static str = "SymbolCodec";

    fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
        vw.write_symbol(&self.0)
    }

    fn read(vr: &mut dyn ValueReader) -> Result<Self> {
        vr.read_symbol().map(Symbol)
    }
}

macro_rules! fixed_unit {
    ($($ty:ident => $wire:ident, $codec:literal, $write:ident, $read:ident;)*) => {$(
        impl FixedType for $ty {
            const WIRE: ElementType = ElementType::$wire;
            const CODEC: &'static str = $codec;

            fn write(&self, vw: &mut dyn ValueWriter) -> Result<()> {
                vw.$write()
            }

            fn read(vr: &mut dyn ValueReader) -> Result<Self> {
                vr.$read().map(|()| $ty)
            }
        }
    )*};
}

fixed_unit! {
    MinKey => MinKey, "MinKeyCodec", write_min_key, read_min_key;
    MaxKey => MaxKey, "MaxKeyCodec", write_max_key, read_max_key;
    Undefined => Undefined, "UndefinedCodec", write_undefined, read_undefined;
    Null => Null, "NullCodec", write_null, read_null;
}
