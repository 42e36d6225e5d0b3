use super::primitive::wrong_native;
use super::{DecodeContext, EncodeContext, ValueDecoder, ValueEncoder};
use crate::error::{Error, Result};
use crate::reflect::Reflect;
use crate::rw::{ValueReader, ValueWriter};
use crate::wire::{subtype, ElementType};

/// `Vec<u8>` as generic binary data.
///
/// Only subtype 0x00 decodes into a plain byte vector; any other subtype
/// needs a [`Binary`](crate::value::Binary) target.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesCodec;

impl ValueEncoder for BytesCodec {
    fn encode_value(
        &self,
        _ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.downcast_ref::<Vec<u8>>() {
            Some(bytes) => vw.write_binary(subtype::GENERIC, bytes),
            None => Err(wrong_native("BytesCodec", "Vec<u8>", value.type_name())),
        }
    }
}

impl ValueDecoder for BytesCodec {
    fn decode_value(
        &self,
        _ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let Some(slot) = target.downcast_mut::<Vec<u8>>() else {
            return Err(wrong_native("BytesCodec", "Vec<u8>", type_name));
        };
        match vr.element_type() {
            ElementType::Binary => {
                let binary = vr.read_binary()?;
                if binary.subtype != subtype::GENERIC {
                    return Err(Error::UnexpectedSubtype {
                        expected: subtype::GENERIC,
                        actual: binary.subtype,
                    });
                }
                *slot = binary.bytes;
                Ok(())
            }
            ElementType::Null => {
                vr.read_null()?;
                slot.clear();
                Ok(())
            }
            actual => Err(Error::WrongWireType {
                codec: "BytesCodec",
                expected: ElementType::Binary.to_string(),
                actual,
            }),
        }
    }
}
