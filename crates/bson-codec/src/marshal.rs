//! Entry points that tie a registry, a reader or writer, and the options
//! together.

use std::sync::Arc;

use bson_codec_buffers::BufferPool;

use crate::codec::{DecodeContext, DecodeOptions, EncodeContext, EncodeOptions};
use crate::error::Result;
use crate::reflect::Reflect;
use crate::registry::Registry;
use crate::rw::{BinaryReader, BinaryWriter, ExtJsonReader, ExtJsonWriter};
use crate::wire::ElementType;

/// Encodes and decodes native values through a shared [`Registry`].
///
/// ```
/// use std::collections::BTreeMap;
/// use bson_codec::Marshaller;
///
/// let m = Marshaller::new();
/// let mut value = BTreeMap::new();
/// value.insert("foo".to_string(), 1_i32);
/// let bytes = m.marshal(&value).unwrap();
/// assert_eq!(bytes, [0x0e, 0, 0, 0, 0x10, b'f', b'o', b'o', 0, 1, 0, 0, 0, 0]);
///
/// let mut back: BTreeMap<String, i32> = BTreeMap::new();
/// m.unmarshal(&bytes, &mut back).unwrap();
/// assert_eq!(back, value);
/// ```
#[derive(Debug)]
pub struct Marshaller {
    registry: Arc<Registry>,
    pool: BufferPool,
    encode: EncodeOptions,
    decode: DecodeOptions,
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new()
    }
}

impl Marshaller {
    /// A marshaller over the default registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(Registry::new()))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            pool: BufferPool::new(),
            encode: EncodeOptions::default(),
            decode: DecodeOptions::default(),
        }
    }

    pub fn with_encode_options(mut self, options: EncodeOptions) -> Self {
        self.encode = options;
        self
    }

    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode = options;
        self
    }

    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    fn encode_context(&self) -> EncodeContext<'_> {
        EncodeContext::new(&self.registry, self.encode)
    }

    fn decode_context(&self) -> DecodeContext<'_> {
        DecodeContext::new(&self.registry, self.decode)
    }

    /// Encodes `value` as a binary document.
    pub fn marshal(&self, value: &dyn Reflect) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::with_buffer(self.pool.acquire());
        let result = self.encode_context().encode(&mut writer, value);
        let out = result.map(|()| writer.as_bytes().to_vec());
        self.pool.release(writer.into_bytes());
        out
    }

    /// Decodes a binary document into `target`.
    pub fn unmarshal(&self, bytes: &[u8], target: &mut dyn Reflect) -> Result<()> {
        let mut reader = BinaryReader::new(bytes).with_max_depth(self.decode.max_depth);
        self.decode_context().decode(&mut reader, target)
    }

    /// Encodes `value` as a single bare value, returning its wire type.
    pub fn marshal_value(&self, value: &dyn Reflect) -> Result<(ElementType, Vec<u8>)> {
        let mut writer = BinaryWriter::new_value();
        self.encode_context().encode(&mut writer, value)?;
        writer.into_value()
    }

    /// Decodes a single bare value of wire type `ty` into `target`.
    pub fn unmarshal_value(
        &self,
        ty: ElementType,
        bytes: &[u8],
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let mut reader = BinaryReader::new_value(bytes, ty).with_max_depth(self.decode.max_depth);
        self.decode_context().decode(&mut reader, target)?;
        reader.ensure_consumed()
    }

    /// Encodes `value` as an extended JSON document.
    pub fn to_ext_json(&self, value: &dyn Reflect, canonical: bool) -> Result<String> {
        let mut writer = ExtJsonWriter::new(canonical);
        self.encode_context().encode(&mut writer, value)?;
        Ok(writer.into_string())
    }

    /// Decodes an extended JSON document into `target`. With
    /// `canonical_only`, relaxed forms such as bare numbers are rejected.
    pub fn from_ext_json(
        &self,
        text: &str,
        canonical_only: bool,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let mut reader =
            ExtJsonReader::with_depth_limit(text, canonical_only, self.decode.max_depth)?;
        self.decode_context().decode(&mut reader, target)
    }
}
