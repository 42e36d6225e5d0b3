//! Codecs for booleans, integers, floats and strings.
//!
//! All numeric narrowing goes through the same checks: an integer that does
//! not fit its target width is an [`Error::Overflow`], and a double with a
//! fractional part is an [`Error::TruncationDisallowed`] unless the decode
//! context allows truncation.

use super::{DecodeContext, EncodeContext, ValueDecoder, ValueEncoder};
use crate::error::{Error, Result};
use crate::reflect::{FloatMut, IntMut, Kind, Reflect, ReflectMut, ReflectRef, UintMut};
use crate::rw::{ValueReader, ValueWriter};
use crate::wire::ElementType;

pub(super) fn wrong_native(
    codec: &'static str,
    expected: &'static str,
    actual: &'static str,
) -> Error {
    Error::WrongNativeType {
        codec,
        expected,
        actual,
    }
}

fn fits_i32(v: i64) -> bool {
    i32::try_from(v).is_ok()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BoolCodec;

impl ValueEncoder for BoolCodec {
    fn encode_value(
        &self,
        _ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.reflect_ref() {
            ReflectRef::Bool(b) => vw.write_boolean(b),
            _ => Err(wrong_native("BoolCodec", "bool", value.type_name())),
        }
    }
}

impl ValueDecoder for BoolCodec {
    fn decode_value(
        &self,
        _ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let actual = vr.element_type();
        if actual != ElementType::Boolean {
            return Err(Error::TypeMismatch {
                expected: ElementType::Boolean,
                actual,
            });
        }
        match target.reflect_mut() {
            ReflectMut::Bool(b) => {
                *b = vr.read_boolean()?;
                Ok(())
            }
            ReflectMut::ReadOnly => Err(Error::NonSettable { type_name }),
            _ => Err(wrong_native("BoolCodec", "bool", type_name)),
        }
    }
}

/// Reads an integer-valued wire value, applying the truncation policy to
/// doubles. `target` names the destination in error messages.
fn read_integer(
    ctx: &DecodeContext<'_>,
    vr: &mut dyn ValueReader,
    codec: &'static str,
    target: &'static str,
) -> Result<i64> {
    match vr.element_type() {
        ElementType::Int32 => Ok(i64::from(vr.read_int32()?)),
        ElementType::Int64 => vr.read_int64(),
        ElementType::Double => {
            let f = vr.read_double()?;
            if !ctx.truncate && f.fract() != 0.0 {
                return Err(Error::TruncationDisallowed {
                    value: f.to_string(),
                    target,
                });
            }
            // i64::MAX as f64 rounds up to 2^63, which is already out of range.
            if f.is_nan() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
                return Err(Error::Overflow {
                    value: f.to_string(),
                    target,
                });
            }
            Ok(f.trunc() as i64)
        }
        ElementType::Null => {
            vr.read_null()?;
            Ok(0)
        }
        ElementType::Undefined => {
            vr.read_undefined()?;
            Ok(0)
        }
        actual => Err(Error::WrongWireType {
            codec,
            expected: "int32, int64 or double".to_owned(),
            actual,
        }),
    }
}

fn narrow<T: TryFrom<i64>>(v: i64, target: &'static str) -> Result<T> {
    T::try_from(v).map_err(|_| Error::Overflow {
        value: v.to_string(),
        target,
    })
}

fn int_target_name(view: &IntMut<'_>) -> &'static str {
    match view {
        IntMut::I8(_) => "i8",
        IntMut::I16(_) => "i16",
        IntMut::I32(_) => "i32",
        IntMut::I64(_) => "i64",
        IntMut::Isize(_) => "isize",
    }
}

fn uint_target_name(view: &UintMut<'_>) -> &'static str {
    match view {
        UintMut::U8(_) => "u8",
        UintMut::U16(_) => "u16",
        UintMut::U32(_) => "u32",
        UintMut::U64(_) => "u64",
        UintMut::Usize(_) => "usize",
    }
}

/// Signed integers of every width.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntCodec;

impl ValueEncoder for IntCodec {
    fn encode_value(
        &self,
        ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        let ReflectRef::Int(v) = value.reflect_ref() else {
            return Err(wrong_native("IntCodec", "signed integer", value.type_name()));
        };
        match value.reflect_type_info().kind {
            Kind::Int8 | Kind::Int16 | Kind::Int32 => vw.write_int32(narrow(v, "int32")?),
            Kind::Isize if fits_i32(v) => vw.write_int32(narrow(v, "int32")?),
            _ if ctx.min_size && fits_i32(v) => vw.write_int32(narrow(v, "int32")?),
            _ => vw.write_int64(v),
        }
    }
}

impl ValueDecoder for IntCodec {
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let view = match target.reflect_mut() {
            ReflectMut::Int(view) => view,
            ReflectMut::ReadOnly => return Err(Error::NonSettable { type_name }),
            _ => return Err(wrong_native("IntCodec", "signed integer", type_name)),
        };
        let name = int_target_name(&view);
        let v = read_integer(ctx, vr, "IntCodec", name)?;
        match view {
            IntMut::I8(t) => *t = narrow(v, name)?,
            IntMut::I16(t) => *t = narrow(v, name)?,
            IntMut::I32(t) => *t = narrow(v, name)?,
            IntMut::I64(t) => *t = v,
            IntMut::Isize(t) => *t = narrow(v, name)?,
        }
        Ok(())
    }
}

/// Unsigned integers of every width. The wire format has no unsigned
/// types, so values are written as signed and range-checked both ways.
#[derive(Debug, Default, Clone, Copy)]
pub struct UintCodec;

impl ValueEncoder for UintCodec {
    fn encode_value(
        &self,
        ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        let ReflectRef::Uint(u) = value.reflect_ref() else {
            return Err(wrong_native("UintCodec", "unsigned integer", value.type_name()));
        };
        let v = i64::try_from(u).map_err(|_| Error::Overflow {
            value: u.to_string(),
            target: "int64",
        })?;
        match value.reflect_type_info().kind {
            Kind::Uint8 | Kind::Uint16 => vw.write_int32(narrow(v, "int32")?),
            _ if ctx.min_size && fits_i32(v) => vw.write_int32(narrow(v, "int32")?),
            _ => vw.write_int64(v),
        }
    }
}

impl ValueDecoder for UintCodec {
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let view = match target.reflect_mut() {
            ReflectMut::Uint(view) => view,
            ReflectMut::ReadOnly => return Err(Error::NonSettable { type_name }),
            _ => return Err(wrong_native("UintCodec", "unsigned integer", type_name)),
        };
        let name = uint_target_name(&view);
        let v = read_integer(ctx, vr, "UintCodec", name)?;
        match view {
            UintMut::U8(t) => *t = narrow(v, name)?,
            UintMut::U16(t) => *t = narrow(v, name)?,
            UintMut::U32(t) => *t = narrow(v, name)?,
            UintMut::U64(t) => *t = narrow(v, name)?,
            UintMut::Usize(t) => *t = narrow(v, name)?,
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FloatCodec;

impl ValueEncoder for FloatCodec {
    fn encode_value(
        &self,
        _ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.reflect_ref() {
            ReflectRef::Float(f) => vw.write_double(f),
            _ => Err(wrong_native("FloatCodec", "float", value.type_name())),
        }
    }
}

impl ValueDecoder for FloatCodec {
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let view = match target.reflect_mut() {
            ReflectMut::Float(view) => view,
            ReflectMut::ReadOnly => return Err(Error::NonSettable { type_name }),
            _ => return Err(wrong_native("FloatCodec", "float", type_name)),
        };
        let f = match vr.element_type() {
            ElementType::Double => vr.read_double()?,
            ElementType::Null => {
                vr.read_null()?;
                0.0
            }
            ElementType::Undefined => {
                vr.read_undefined()?;
                0.0
            }
            actual => {
                return Err(Error::TypeMismatch {
                    expected: ElementType::Double,
                    actual,
                })
            }
        };
        match view {
            FloatMut::F64(t) => *t = f,
            FloatMut::F32(t) => {
                let narrowed = f as f32;
                if !ctx.truncate && !f.is_nan() && f64::from(narrowed) != f {
                    return Err(Error::TruncationDisallowed {
                        value: f.to_string(),
                        target: "f32",
                    });
                }
                *t = narrowed;
            }
        }
        Ok(())
    }
}

/// Native strings, fed by the String, Symbol and JavaScript wire types.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringCodec;

impl ValueEncoder for StringCodec {
    fn encode_value(
        &self,
        _ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.reflect_ref() {
            ReflectRef::Str(s) => vw.write_string(s),
            _ => Err(wrong_native("StringCodec", "string", value.type_name())),
        }
    }
}

impl ValueDecoder for StringCodec {
    fn decode_value(
        &self,
        _ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let slot = match target.reflect_mut() {
            ReflectMut::String(slot) => slot,
            ReflectMut::ReadOnly => return Err(Error::NonSettable { type_name }),
            _ => return Err(wrong_native("StringCodec", "string", type_name)),
        };
        *slot = match vr.element_type() {
            ElementType::String => vr.read_string()?,
            ElementType::Symbol => vr.read_symbol()?,
            ElementType::JavaScriptCode => vr.read_javascript()?,
            ElementType::Null => {
                vr.read_null()?;
                String::new()
            }
            ElementType::Undefined => {
                vr.read_undefined()?;
                String::new()
            }
            actual => {
                return Err(Error::WrongWireType {
                    codec: "StringCodec",
                    expected: "string, symbol or javascript".to_owned(),
                    actual,
                })
            }
        };
        Ok(())
    }
}
