//! Kind-level codecs for structs, maps, slices, options and pointers.

use super::primitive::wrong_native;
use super::{DecodeContext, EncodeContext, ValueDecoder, ValueEncoder};
use crate::error::{Error, Result};
use crate::reflect::{Reflect, ReflectMut, ReflectRef};
use crate::rw::{ValueReader, ValueWriter};
use crate::wire::ElementType;

fn wrong_wire(codec: &'static str, expected: &str, actual: ElementType) -> Error {
    Error::WrongWireType {
        codec,
        expected: expected.to_owned(),
        actual,
    }
}

/// Structs declared with [`reflect_struct!`](crate::reflect_struct), as
/// documents with one key per field.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructCodec;

impl ValueEncoder for StructCodec {
    fn encode_value(
        &self,
        ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        let ReflectRef::Struct(s) = value.reflect_ref() else {
            return Err(wrong_native("StructCodec", "struct", value.type_name()));
        };
        vw.write_document()?;
        for field in s.fields() {
            vw.write_document_element(field.key)?;
            ctx.encode(vw, field.value)?;
        }
        vw.write_document_end()
    }
}

impl ValueDecoder for StructCodec {
    /// Unknown keys are skipped. Null leaves the struct unchanged.
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let s = match target.reflect_mut() {
            ReflectMut::Struct(s) => s,
            ReflectMut::ReadOnly => return Err(Error::NonSettable { type_name }),
            _ => return Err(wrong_native("StructCodec", "struct", type_name)),
        };
        match vr.element_type() {
            ElementType::EmbeddedDocument => {}
            ElementType::Null => return vr.read_null(),
            actual => return Err(wrong_wire("StructCodec", "embedded document", actual)),
        }
        vr.read_document()?;
        while let Some((key, _)) = vr.read_element()? {
            match s.field_mut(&key) {
                Some(field) => ctx.decode(vr, field).map_err(|e| e.at_key(&key))?,
                None => vr.skip()?,
            }
        }
        Ok(())
    }
}

/// Renders a map key as a document key.
fn key_to_string(key: &dyn Reflect) -> Result<String> {
    if let ReflectRef::Str(s) = key.reflect_ref() {
        return Ok(s.to_owned());
    }
    match key.as_key_marshaler() {
        Some(m) => m.marshal_key(),
        None => Err(Error::KeyMarshal(format!(
            "{} cannot be used as a document key",
            key.type_name()
        ))),
    }
}

fn key_from_str(slot: &mut dyn Reflect, key: &str) -> Result<()> {
    let type_name = slot.type_name();
    if let ReflectMut::String(s) = slot.reflect_mut() {
        key.clone_into(s);
        return Ok(());
    }
    match slot.as_key_unmarshaler() {
        Some(u) => u.unmarshal_key(key),
        None => Err(Error::KeyMarshal(format!(
            "{type_name} cannot be decoded from a document key"
        ))),
    }
}

/// Maps with string-like or integer keys, as documents.
///
/// Key order follows the map's own iteration order.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapCodec;

impl ValueEncoder for MapCodec {
    fn encode_value(
        &self,
        ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        let ReflectRef::Map(m) = value.reflect_ref() else {
            return Err(wrong_native("MapCodec", "map", value.type_name()));
        };
        vw.write_document()?;
        for (k, v) in m.entries() {
            let key = key_to_string(k)?;
            vw.write_document_element(&key)?;
            ctx.encode(vw, v)?;
        }
        vw.write_document_end()
    }
}

impl ValueDecoder for MapCodec {
    /// Entries are merged into the map unless `zero_maps` is set. Later
    /// duplicates of a key replace earlier ones.
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let m = match target.reflect_mut() {
            ReflectMut::Map(m) => m,
            ReflectMut::ReadOnly => return Err(Error::NonSettable { type_name }),
            _ => return Err(wrong_native("MapCodec", "map", type_name)),
        };
        match vr.element_type() {
            ElementType::EmbeddedDocument => {}
            ElementType::Null => {
                vr.read_null()?;
                m.clear();
                return Ok(());
            }
            actual => return Err(wrong_wire("MapCodec", "embedded document", actual)),
        }
        if ctx.zero_maps {
            m.clear();
        }
        vr.read_document()?;
        while let Some((key, _)) = vr.read_element()? {
            m.decode_entry(&mut |k, v| {
                key_from_str(k, &key)?;
                ctx.decode(vr, v)
            })
            .map_err(|e| e.at_key(&key))?;
        }
        Ok(())
    }
}

/// `Vec<T>`, as arrays.
#[derive(Debug, Default, Clone, Copy)]
pub struct SliceCodec;

impl ValueEncoder for SliceCodec {
    fn encode_value(
        &self,
        ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        let ReflectRef::List(list) = value.reflect_ref() else {
            return Err(wrong_native("SliceCodec", "slice", value.type_name()));
        };
        vw.write_array()?;
        for i in 0..list.len() {
            let Some(item) = list.get(i) else { break };
            vw.write_array_element()?;
            ctx.encode(vw, item)?;
        }
        vw.write_array_end()
    }
}

impl ValueDecoder for SliceCodec {
    /// Replaces the contents. Null decodes to an empty slice.
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let list = match target.reflect_mut() {
            ReflectMut::List(list) => list,
            ReflectMut::ReadOnly => return Err(Error::NonSettable { type_name }),
            _ => return Err(wrong_native("SliceCodec", "slice", type_name)),
        };
        match vr.element_type() {
            ElementType::Array => {}
            ElementType::Null => {
                vr.read_null()?;
                list.clear();
                return Ok(());
            }
            actual => return Err(wrong_wire("SliceCodec", "array", actual)),
        }
        list.clear();
        vr.read_array()?;
        let mut index = 0usize;
        while vr.read_value()?.is_some() {
            list.push_with(&mut |item| ctx.decode(vr, item))
                .map_err(|e| e.at_key(&index.to_string()))?;
            index += 1;
        }
        Ok(())
    }
}

/// `Option<T>`: `None` is Null.
#[derive(Debug, Default, Clone, Copy)]
pub struct OptionCodec;

impl ValueEncoder for OptionCodec {
    fn encode_value(
        &self,
        ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.reflect_ref() {
            ReflectRef::Option(Some(inner)) => ctx.encode(vw, inner),
            ReflectRef::Option(None) => vw.write_null(),
            _ => Err(wrong_native("OptionCodec", "option", value.type_name())),
        }
    }
}

impl ValueDecoder for OptionCodec {
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let slot = match target.reflect_mut() {
            ReflectMut::Option(slot) => slot,
            ReflectMut::ReadOnly => return Err(Error::NonSettable { type_name }),
            _ => return Err(wrong_native("OptionCodec", "option", type_name)),
        };
        match vr.element_type() {
            ElementType::Null => {
                vr.read_null()?;
                slot.set_none();
                Ok(())
            }
            ElementType::Undefined => {
                vr.read_undefined()?;
                slot.set_none();
                Ok(())
            }
            _ => ctx.decode(vr, slot.insert_default()),
        }
    }
}

/// `Box<T>` and `Arc<T>`, through the pointee's codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointerCodec;

impl ValueEncoder for PointerCodec {
    fn encode_value(
        &self,
        ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.reflect_ref() {
            ReflectRef::Pointer(inner) => ctx.encode(vw, inner),
            _ => Err(wrong_native("PointerCodec", "pointer", value.type_name())),
        }
    }
}

impl ValueDecoder for PointerCodec {
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        match target.reflect_mut() {
            ReflectMut::Pointer(inner) => ctx.decode(vr, inner),
            ReflectMut::ReadOnly => Err(Error::NonSettable { type_name }),
            _ => Err(wrong_native("PointerCodec", "pointer", type_name)),
        }
    }
}
