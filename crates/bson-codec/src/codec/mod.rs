//! Encoders and decoders between native values and reader/writer events.
//!
//! A codec never looks at bytes. It drives a [`ValueWriter`] while encoding
//! and a [`ValueReader`] while decoding, and recurses into the registry for
//! nested values through [`EncodeContext::encode`] and
//! [`DecodeContext::decode`].

mod bson_value;
mod bytes;
mod container;
mod fixed;
mod marshaler;
mod primitive;

pub use bson_value::{read_bson, write_bson, BsonCodec, DocumentCodec};
pub use bytes::BytesCodec;
pub use container::{MapCodec, OptionCodec, PointerCodec, SliceCodec, StructCodec};
pub use fixed::{FixedCodec, FixedType};
pub use marshaler::{
    KeyMarshaler, KeyUnmarshaler, ValueMarshaler, ValueMarshalerCodec, ValueUnmarshaler,
};
pub use primitive::{BoolCodec, FloatCodec, IntCodec, StringCodec, UintCodec};

use crate::error::Result;
use crate::reflect::Reflect;
use crate::registry::Registry;
use crate::rw::{ValueReader, ValueWriter, DEFAULT_MAX_DEPTH};

pub trait ValueEncoder: Send + Sync {
    fn encode_value(
        &self,
        ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()>;
}

pub trait ValueDecoder: Send + Sync {
    fn decode_value(
        &self,
        ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()>;
}

/// An encoder and decoder for the same type or family of types.
pub trait Codec: ValueEncoder + ValueDecoder {}

impl<T: ValueEncoder + ValueDecoder> Codec for T {}

/// Encode-time policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Write 64-bit integers that fit in 32 bits as Int32.
    pub min_size: bool,
}

/// Decode-time policy, applied uniformly to a whole decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Allow lossy float to integer and f64 to f32 narrowing.
    pub truncate: bool,
    /// Clear maps before decoding into them.
    pub zero_maps: bool,
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            truncate: false,
            zero_maps: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// State threaded through one encode.
#[derive(Clone, Copy)]
pub struct EncodeContext<'r> {
    pub registry: &'r Registry,
    pub min_size: bool,
}

impl<'r> EncodeContext<'r> {
    pub fn new(registry: &'r Registry, options: EncodeOptions) -> Self {
        Self {
            registry,
            min_size: options.min_size,
        }
    }

    /// Encodes `value` with the codec the registry resolves for its type.
    pub fn encode(&self, vw: &mut dyn ValueWriter, value: &dyn Reflect) -> Result<()> {
        let codec = self.registry.lookup(&value.reflect_type_info())?;
        codec.encode_value(self, vw, value)
    }
}

/// State threaded through one decode.
#[derive(Clone, Copy)]
pub struct DecodeContext<'r> {
    pub registry: &'r Registry,
    pub truncate: bool,
    pub zero_maps: bool,
}

impl<'r> DecodeContext<'r> {
    pub fn new(registry: &'r Registry, options: DecodeOptions) -> Self {
        Self {
            registry,
            truncate: options.truncate,
            zero_maps: options.zero_maps,
        }
    }

    /// Decodes the value under the cursor into `target` with the codec the
    /// registry resolves for the target's type.
    pub fn decode(&self, vr: &mut dyn ValueReader, target: &mut dyn Reflect) -> Result<()> {
        let codec = self.registry.lookup(&target.reflect_type_info())?;
        codec.decode_value(self, vr, target)
    }
}
