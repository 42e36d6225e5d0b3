//! Type-to-codec resolution.
//!
//! Lookup order for a type:
//!
//! 1. a codec registered for the exact type;
//! 2. the capability resolution cached for the type by an earlier lookup;
//! 3. the first registered capability the type advertises, which is then
//!    cached;
//! 4. maps whose key is neither a string nor key-marshalable are rejected;
//! 5. the default codec for the type's [`Kind`].
//!
//! The first lookup freezes the registry. Registering afterwards fails with
//! [`Error::FrozenRegistry`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::codec::{
    BoolCodec, BsonCodec, BytesCodec, Codec, DocumentCodec, FixedCodec, FixedType, FloatCodec,
    IntCodec, MapCodec, OptionCodec, PointerCodec, SliceCodec, StringCodec, StructCodec,
    UintCodec, ValueMarshalerCodec,
};
use crate::error::{Error, Result};
use crate::reflect::{Capability, Kind, TypeInfo, Typed};
use crate::value::{
    Binary, Bson, CodeWithScope, DateTime, DbPointer, Decimal128, Document, JavaScript, MaxKey,
    MinKey, Null, ObjectId, Regex, Symbol, Timestamp, Undefined,
};

type CodecRef = Arc<dyn Codec>;

/// Collects codecs before building an immutable [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    type_codecs: HashMap<TypeId, CodecRef>,
    interface_codecs: Vec<(Capability, CodecRef)>,
    kind_codecs: HashMap<Kind, CodecRef>,
}

impl RegistryBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preloaded with codecs for the primitives, containers and
    /// value-model types.
    pub fn with_defaults() -> Self {
        let mut b = Self::new();
        b.kind(Kind::Bool, BoolCodec);
        for kind in [Kind::Int8, Kind::Int16, Kind::Int32, Kind::Int64, Kind::Isize] {
            b.kind(kind, IntCodec);
        }
        for kind in [Kind::Uint8, Kind::Uint16, Kind::Uint32, Kind::Uint64, Kind::Usize] {
            b.kind(kind, UintCodec);
        }
        b.kind(Kind::Float32, FloatCodec);
        b.kind(Kind::Float64, FloatCodec);
        b.kind(Kind::String, StringCodec);
        b.kind(Kind::Struct, StructCodec);
        b.kind(Kind::Map, MapCodec);
        b.kind(Kind::Slice, SliceCodec);
        b.kind(Kind::Option, OptionCodec);
        b.kind(Kind::Pointer, PointerCodec);

        b.interface(Capability::VALUE_MARSHALER, ValueMarshalerCodec);
        b.interface(Capability::VALUE_UNMARSHALER, ValueMarshalerCodec);

        b.ty::<Vec<u8>>(BytesCodec);
        b.ty::<Bson>(BsonCodec);
        b.ty::<Document>(DocumentCodec);
        b.fixed::<ObjectId>();
        b.fixed::<Decimal128>();
        b.fixed::<DateTime>();
        b.fixed::<chrono::DateTime<Utc>>();
        b.fixed::<Timestamp>();
        b.fixed::<Regex>();
        b.fixed::<DbPointer>();
        b.fixed::<CodeWithScope>();
        b.fixed::<Binary>();
        b.fixed::<JavaScript>();
        b.fixed::<Symbol>();
        b.fixed::<MinKey>();
        b.fixed::<MaxKey>();
        b.fixed::<Undefined>();
        b.fixed::<Null>();
        b
    }

    fn ty<T: Typed>(&mut self, codec: impl Codec + 'static) {
        self.type_codecs.insert(TypeId::of::<T>(), Arc::new(codec));
    }

    fn fixed<T: FixedType>(&mut self) {
        self.ty::<T>(FixedCodec::<T>::new());
    }

    fn interface(&mut self, capability: Capability, codec: impl Codec + 'static) {
        self.interface_codecs.push((capability, Arc::new(codec)));
    }

    fn kind(&mut self, kind: Kind, codec: impl Codec + 'static) {
        self.kind_codecs.insert(kind, Arc::new(codec));
    }

    /// Uses `codec` for values of exactly type `T`, replacing any previous
    /// registration.
    pub fn register_type_codec<T: Typed>(mut self, codec: impl Codec + 'static) -> Self {
        self.ty::<T>(codec);
        self
    }

    /// Uses `codec` for types advertising `capability`. Capabilities are
    /// tried in registration order.
    pub fn register_interface_codec(
        mut self,
        capability: Capability,
        codec: impl Codec + 'static,
    ) -> Self {
        self.interface(capability, codec);
        self
    }

    /// Uses `codec` for types of `kind` that have no more specific codec.
    pub fn register_kind_codec(mut self, kind: Kind, codec: impl Codec + 'static) -> Self {
        self.kind(kind, codec);
        self
    }

    pub fn build(self) -> Registry {
        debug!(
            types = self.type_codecs.len(),
            interfaces = self.interface_codecs.len(),
            kinds = self.kind_codecs.len(),
            "built codec registry"
        );
        Registry {
            type_codecs: self.type_codecs,
            interface_codecs: self.interface_codecs,
            kind_codecs: self.kind_codecs,
            interface_cache: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
        }
    }
}

/// Resolves codecs for runtime types. Safe to share across threads.
pub struct Registry {
    type_codecs: HashMap<TypeId, CodecRef>,
    interface_codecs: Vec<(Capability, CodecRef)>,
    kind_codecs: HashMap<Kind, CodecRef>,
    interface_cache: RwLock<HashMap<TypeId, CodecRef>>,
    frozen: AtomicBool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("type_codecs", &self.type_codecs.len())
            .field("interface_codecs", &self.interface_codecs.len())
            .field("kind_codecs", &self.kind_codecs.len())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

impl Registry {
    /// A registry with the default codecs.
    pub fn new() -> Self {
        RegistryBuilder::with_defaults().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Whether a lookup has happened.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    fn check_unfrozen(&self, what: &str) -> Result<()> {
        if self.is_frozen() {
            warn!(what, "registration attempted on a frozen codec registry");
            return Err(Error::FrozenRegistry);
        }
        Ok(())
    }

    pub fn register_type_codec<T: Typed>(&mut self, codec: impl Codec + 'static) -> Result<()> {
        self.check_unfrozen(std::any::type_name::<T>())?;
        self.type_codecs.insert(TypeId::of::<T>(), Arc::new(codec));
        Ok(())
    }

    pub fn register_interface_codec(
        &mut self,
        capability: Capability,
        codec: impl Codec + 'static,
    ) -> Result<()> {
        self.check_unfrozen(capability.0)?;
        self.interface_codecs.push((capability, Arc::new(codec)));
        Ok(())
    }

    pub fn register_kind_codec(&mut self, kind: Kind, codec: impl Codec + 'static) -> Result<()> {
        self.check_unfrozen("kind")?;
        self.kind_codecs.insert(kind, Arc::new(codec));
        Ok(())
    }

    /// Resolves the codec for `info`. Freezes the registry.
    pub fn lookup(&self, info: &TypeInfo) -> Result<Arc<dyn Codec>> {
        if !self.frozen.load(Ordering::Relaxed) {
            self.frozen.store(true, Ordering::Release);
        }

        if let Some(codec) = self.type_codecs.get(&info.id) {
            return Ok(Arc::clone(codec));
        }

        if let Some(codec) = self.interface_cache.read().get(&info.id) {
            return Ok(Arc::clone(codec));
        }

        if let Some((capability, codec)) = self
            .interface_codecs
            .iter()
            .find(|(capability, _)| info.has(*capability))
        {
            debug!(
                type_name = info.name,
                %capability,
                "caching capability codec"
            );
            self.interface_cache
                .write()
                .insert(info.id, Arc::clone(codec));
            return Ok(Arc::clone(codec));
        }

        if info.kind == Kind::Map {
            if let Some(key) = info.key_type() {
                if !key.kind.is_string() && !key.has(Capability::KEY_MARSHALER) {
                    trace!(type_name = info.name, key = key.name, "map key is not string-like");
                    return Err(Error::NoCodec {
                        type_name: info.name,
                    });
                }
            }
        }

        trace!(type_name = info.name, kind = %info.kind, "falling back to kind codec");
        self.kind_codec(info)
    }

    /// The default codec for the kind of `info`, skipping exact-type and
    /// capability codecs.
    pub fn kind_codec(&self, info: &TypeInfo) -> Result<Arc<dyn Codec>> {
        self.kind_codecs
            .get(&info.kind)
            .cloned()
            .ok_or(Error::NoCodec {
                type_name: info.name,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::*;
    use crate::codec::{
        DecodeContext, EncodeContext, ValueDecoder, ValueEncoder, ValueMarshaler,
        ValueUnmarshaler,
    };
    use crate::reflect::Reflect;
    use crate::rw::{ValueReader, ValueWriter};
    use crate::wire::ElementType;
    use crate::{reflect_struct, reflect_value_marshaler};
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Plain {
        a: i32,
    }

    reflect_struct!(Plain { a });

    #[derive(Default)]
    struct Raw(Vec<u8>);

    impl ValueMarshaler for Raw {
        fn marshal_bson_value(&self) -> Result<(ElementType, Vec<u8>)> {
            Ok((ElementType::Binary, self.0.clone()))
        }
    }

    impl ValueUnmarshaler for Raw {
        fn unmarshal_bson_value(&mut self, _ty: ElementType, bytes: &[u8]) -> Result<()> {
            self.0 = bytes.to_vec();
            Ok(())
        }
    }

    reflect_value_marshaler!(Raw);

    struct NullCodec;

    impl ValueEncoder for NullCodec {
        fn encode_value(
            &self,
            _ctx: &EncodeContext<'_>,
            vw: &mut dyn ValueWriter,
            _value: &dyn Reflect,
        ) -> Result<()> {
            vw.write_null()
        }
    }

    impl ValueDecoder for NullCodec {
        fn decode_value(
            &self,
            _ctx: &DecodeContext<'_>,
            vr: &mut dyn ValueReader,
            _target: &mut dyn Reflect,
        ) -> Result<()> {
            vr.skip()
        }
    }

    #[test]
    fn registration_fails_after_first_lookup() {
        let mut registry = Registry::new();
        registry.register_type_codec::<Plain>(NullCodec).unwrap();
        assert!(!registry.is_frozen());
        registry.lookup(&TypeInfo::of::<Plain>()).unwrap();
        assert!(registry.is_frozen());
        assert_eq!(
            registry.register_kind_codec(Kind::Bool, NullCodec),
            Err(Error::FrozenRegistry)
        );
    }

    #[test]
    fn struct_falls_back_to_kind_codec() {
        let registry = Registry::new();
        assert!(registry.lookup(&TypeInfo::of::<Plain>()).is_ok());
    }

    #[test]
    fn empty_registry_has_no_codecs() {
        let registry = RegistryBuilder::new().build();
        assert_eq!(
            registry.lookup(&TypeInfo::of::<Plain>()).err(),
            Some(Error::NoCodec {
                type_name: std::any::type_name::<Plain>()
            })
        );
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let registry = Registry::new();
        assert!(matches!(
            registry.lookup(&TypeInfo::of::<HashMap<bool, i32>>()),
            Err(Error::NoCodec { .. })
        ));
        assert!(registry.lookup(&TypeInfo::of::<BTreeMap<i64, i32>>()).is_ok());
        assert!(registry.lookup(&TypeInfo::of::<HashMap<String, i32>>()).is_ok());
    }

    #[test]
    fn capability_resolution_is_cached() {
        let registry = Registry::new();
        let info = TypeInfo::of::<Raw>();
        let first = registry.lookup(&info).unwrap();
        assert!(registry.interface_cache.read().contains_key(&info.id));
        let second = registry.lookup(&info).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn exact_type_beats_kind() {
        let registry = RegistryBuilder::with_defaults()
            .register_type_codec::<Plain>(NullCodec)
            .build();
        let codec = registry.lookup(&TypeInfo::of::<Plain>()).unwrap();
        let kind = registry.kind_codec(&TypeInfo::of::<Plain>()).unwrap();
        assert!(!Arc::ptr_eq(&codec, &kind));
    }

    #[test]
    #[traced_test]
    fn frozen_registration_and_capability_caching_are_logged() {
        let mut registry = Registry::new();
        registry.lookup(&TypeInfo::of::<Raw>()).unwrap();
        assert!(logs_contain("caching capability codec"));
        assert!(registry.register_type_codec::<Plain>(NullCodec).is_err());
        assert!(logs_contain("frozen codec registry"));
    }
}
