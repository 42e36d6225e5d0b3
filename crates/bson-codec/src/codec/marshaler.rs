//! User-extensible encoding through raw wire values.

use super::{DecodeContext, EncodeContext, ValueDecoder, ValueEncoder};
use crate::error::Result;
use crate::reflect::Reflect;
use crate::rw::{copy_bytes_to_writer, copy_value_to_bytes, ValueReader, ValueWriter};
use crate::wire::ElementType;

/// A type that produces its own wire value.
///
/// The bytes are the bare payload of one value of type `ElementType`, as it
/// would follow the key in a binary document.
pub trait ValueMarshaler {
    fn marshal_bson_value(&self) -> Result<(ElementType, Vec<u8>)>;
}

/// A type that consumes its own wire value.
pub trait ValueUnmarshaler {
    fn unmarshal_bson_value(&mut self, ty: ElementType, bytes: &[u8]) -> Result<()>;
}

/// A type that can be a map key.
pub trait KeyMarshaler {
    fn marshal_key(&self) -> Result<String>;
}

pub trait KeyUnmarshaler {
    fn unmarshal_key(&mut self, key: &str) -> Result<()>;
}

/// Codec for the value-marshaling capabilities.
///
/// A type that implements only one direction is handed to its kind-level
/// codec for the other.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueMarshalerCodec;

impl ValueEncoder for ValueMarshalerCodec {
    fn encode_value(
        &self,
        ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.as_value_marshaler() {
            Some(m) => {
                let (ty, bytes) = m.marshal_bson_value()?;
                copy_bytes_to_writer(vw, ty, &bytes)
            }
            None => {
                let info = value.reflect_type_info();
                ctx.registry.kind_codec(&info)?.encode_value(ctx, vw, value)
            }
        }
    }
}

impl ValueDecoder for ValueMarshalerCodec {
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        if let Some(u) = target.as_value_unmarshaler() {
            let (ty, bytes) = copy_value_to_bytes(vr)?;
            return u.unmarshal_bson_value(ty, &bytes);
        }
        let info = target.reflect_type_info();
        ctx.registry.kind_codec(&info)?.decode_value(ctx, vr, target)
    }
}

