//! Built-in [`Typed`] and [`Reflect`] implementations.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{
    Capability, ElemFn, EntryFn, FloatMut, IntMut, Kind, List, Map, OptionSlot, Reflect,
    ReflectMut, ReflectRef, TypeInfo, Typed, UintMut,
};
use crate::codec::{KeyMarshaler, KeyUnmarshaler};
use crate::error::{Error, Result};
use crate::value::{
    Binary, Bson, CodeWithScope, DateTime, DbPointer, Decimal128, Document, JavaScript, MaxKey,
    MinKey, Null, ObjectId, Regex, Symbol, Timestamp, Undefined,
};

const KEY_CAPABILITIES: &[Capability] = &[Capability::KEY_MARSHALER, Capability::KEY_UNMARSHALER];

macro_rules! any_methods {
    () => {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}

macro_rules! reflect_integer {
    ($($ty:ty => $kind:ident, $variant:ident, $view:ident($mut:ident), $wide:ty;)*) => {$(
        impl Typed for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::new::<$ty>(Kind::$kind).with_capabilities(KEY_CAPABILITIES)
            }
        }

        impl Reflect for $ty {
            fn reflect_type_info(&self) -> TypeInfo {
                Self::type_info()
            }

            any_methods!();

            fn reflect_ref(&self) -> ReflectRef<'_> {
                ReflectRef::$variant(*self as $wide)
            }

            fn reflect_mut(&mut self) -> ReflectMut<'_> {
                ReflectMut::$variant($view::$mut(self))
            }

            fn as_key_marshaler(&self) -> Option<&dyn KeyMarshaler> {
                Some(self)
            }

            fn as_key_unmarshaler(&mut self) -> Option<&mut dyn KeyUnmarshaler> {
                Some(self)
            }
        }

        impl KeyMarshaler for $ty {
            fn marshal_key(&self) -> Result<String> {
                Ok(self.to_string())
            }
        }

        impl KeyUnmarshaler for $ty {
            fn unmarshal_key(&mut self, key: &str) -> Result<()> {
                *self = key.parse().map_err(|err| {
                    Error::KeyMarshal(format!(
                        "cannot parse {key:?} as {}: {err}",
                        stringify!($ty)
                    ))
                })?;
                Ok(())
            }
        }
    )*};
}

reflect_integer! {
    i8 => Int8, Int, IntMut(I8), i64;
    i16 => Int16, Int, IntMut(I16), i64;
    i32 => Int32, Int, IntMut(I32), i64;
    i64 => Int64, Int, IntMut(I64), i64;
    isize => Isize, Int, IntMut(Isize), i64;
    u8 => Uint8, Uint, UintMut(U8), u64;
    u16 => Uint16, Uint, UintMut(U16), u64;
    u32 => Uint32, Uint, UintMut(U32), u64;
    u64 => Uint64, Uint, UintMut(U64), u64;
    usize => Usize, Uint, UintMut(Usize), u64;
}

macro_rules! reflect_float {
    ($($ty:ty => $kind:ident, $mut:ident;)*) => {$(
        impl Typed for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::new::<$ty>(Kind::$kind)
            }
        }

        impl Reflect for $ty {
            fn reflect_type_info(&self) -> TypeInfo {
                Self::type_info()
            }

            any_methods!();

            fn reflect_ref(&self) -> ReflectRef<'_> {
                ReflectRef::Float(f64::from(*self))
            }

            fn reflect_mut(&mut self) -> ReflectMut<'_> {
                ReflectMut::Float(FloatMut::$mut(self))
            }
        }
    )*};
}

reflect_float! {
    f32 => Float32, F32;
    f64 => Float64, F64;
}

impl Typed for bool {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<bool>(Kind::Bool)
    }
}

impl Reflect for bool {
    fn reflect_type_info(&self) -> TypeInfo {
        Self::type_info()
    }

    any_methods!();

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Bool(*self)
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Bool(self)
    }
}

impl Typed for String {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<String>(Kind::String)
    }
}

impl Reflect for String {
    fn reflect_type_info(&self) -> TypeInfo {
        Self::type_info()
    }

    any_methods!();

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Str(self)
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::String(self)
    }
}

impl Typed for &'static str {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<&'static str>(Kind::String)
    }
}

impl Reflect for &'static str {
    fn reflect_type_info(&self) -> TypeInfo {
        Self::type_info()
    }

    any_methods!();

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Str(self)
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::ReadOnly
    }
}

impl<T: Reflect + Typed + Default> Typed for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Vec<T>>(Kind::Slice).with_elem::<T>()
    }
}

impl<T: Reflect + Typed + Default> Reflect for Vec<T> {
    fn reflect_type_info(&self) -> TypeInfo {
        Self::type_info()
    }

    any_methods!();

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::List(self)
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::List(self)
    }
}

impl<T: Reflect + Typed + Default> List for Vec<T> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn get(&self, index: usize) -> Option<&dyn Reflect> {
        self.as_slice().get(index).map(|v| v as &dyn Reflect)
    }

    fn clear(&mut self) {
        Vec::clear(self)
    }

    fn push_with(&mut self, f: &mut ElemFn<'_>) -> Result<()> {
        let mut item = T::default();
        f(&mut item)?;
        self.push(item);
        Ok(())
    }
}

impl<T: Reflect + Typed + Default> Typed for Option<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Option<T>>(Kind::Option).with_elem::<T>()
    }
}

impl<T: Reflect + Typed + Default> Reflect for Option<T> {
    fn reflect_type_info(&self) -> TypeInfo {
        Self::type_info()
    }

    any_methods!();

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Option(self.as_ref().map(|v| v as &dyn Reflect))
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Option(self)
    }
}

impl<T: Reflect + Typed + Default> OptionSlot for Option<T> {
    fn is_none(&self) -> bool {
        Option::is_none(self)
    }

    fn set_none(&mut self) {
        *self = None;
    }

    fn insert_default(&mut self) -> &mut dyn Reflect {
        self.insert(T::default())
    }
}

impl<T: Reflect + Typed> Typed for Box<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Box<T>>(Kind::Pointer).with_elem::<T>()
    }
}

impl<T: Reflect + Typed> Reflect for Box<T> {
    fn reflect_type_info(&self) -> TypeInfo {
        Self::type_info()
    }

    any_methods!();

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Pointer(&**self)
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Pointer(&mut **self)
    }
}

impl<T: Reflect + Typed> Typed for Arc<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Arc<T>>(Kind::Pointer).with_elem::<T>()
    }
}

impl<T: Reflect + Typed> Reflect for Arc<T> {
    fn reflect_type_info(&self) -> TypeInfo {
        Self::type_info()
    }

    any_methods!();

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Pointer(&**self)
    }

    /// Shared pointees cannot be decoded into.
    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        match Arc::get_mut(self) {
            Some(inner) => ReflectMut::Pointer(inner),
            None => ReflectMut::ReadOnly,
        }
    }
}

macro_rules! reflect_map {
    ($($map:ident where K: $($bound:path),+;)*) => {$(
        impl<K, V> Typed for $map<K, V>
        where
            K: Reflect + Typed + Default $(+ $bound)+,
            V: Reflect + Typed + Default,
        {
            fn type_info() -> TypeInfo {
                TypeInfo::new::<$map<K, V>>(Kind::Map)
                    .with_key::<K>()
                    .with_elem::<V>()
            }
        }

        impl<K, V> Reflect for $map<K, V>
        where
            K: Reflect + Typed + Default $(+ $bound)+,
            V: Reflect + Typed + Default,
        {
            fn reflect_type_info(&self) -> TypeInfo {
                Self::type_info()
            }

            any_methods!();

            fn reflect_ref(&self) -> ReflectRef<'_> {
                ReflectRef::Map(self)
            }

            fn reflect_mut(&mut self) -> ReflectMut<'_> {
                ReflectMut::Map(self)
            }
        }

        impl<K, V> Map for $map<K, V>
        where
            K: Reflect + Typed + Default $(+ $bound)+,
            V: Reflect + Typed + Default,
        {
            fn len(&self) -> usize {
                $map::len(self)
            }

            fn entries(&self) -> Vec<(&dyn Reflect, &dyn Reflect)> {
                self.iter()
                    .map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect))
                    .collect()
            }

            fn clear(&mut self) {
                $map::clear(self)
            }

            fn decode_entry(&mut self, f: &mut EntryFn<'_>) -> Result<()> {
                let mut key = K::default();
                let mut value = V::default();
                f(&mut key, &mut value)?;
                self.insert(key, value);
                Ok(())
            }
        }
    )*};
}

reflect_map! {
    HashMap where K: Eq, Hash;
    BTreeMap where K: Ord;
    IndexMap where K: Eq, Hash;
}

/// Types encoded only by their exact-type codec.
macro_rules! reflect_opaque {
    ($($ty:ty),* $(,)?) => {$(
        impl Typed for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::new::<$ty>(Kind::Opaque)
            }
        }

        impl Reflect for $ty {
            fn reflect_type_info(&self) -> TypeInfo {
                Self::type_info()
            }

            any_methods!();

            fn reflect_ref(&self) -> ReflectRef<'_> {
                ReflectRef::Opaque
            }

            fn reflect_mut(&mut self) -> ReflectMut<'_> {
                ReflectMut::Opaque
            }
        }
    )*};
}

reflect_opaque!(
    Bson,
    Document,
    ObjectId,
    Decimal128,
    DateTime,
    Binary,
    Regex,
    Timestamp,
    DbPointer,
    CodeWithScope,
    JavaScript,
    Symbol,
    MinKey,
    MaxKey,
    Null,
    Undefined,
    chrono::DateTime<chrono::Utc>,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_keys_round_trip_through_strings() {
        let mut key = 0_u32;
        key.unmarshal_key("42").unwrap();
        assert_eq!(key, 42);
        assert_eq!(key.marshal_key().unwrap(), "42");
        let err = key.unmarshal_key("-1").unwrap_err();
        assert!(matches!(err, Error::KeyMarshal(_)));
    }

    #[test]
    fn vec_pushes_filled_elements() {
        let mut v: Vec<i32> = vec![1];
        v.push_with(&mut |slot| {
            if let ReflectMut::Int(IntMut::I32(n)) = slot.reflect_mut() {
                *n = 5;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(v, [1, 5]);
        assert_eq!(List::len(&v), 2);
    }

    #[test]
    fn failed_fill_leaves_list_unchanged() {
        let mut v: Vec<String> = Vec::new();
        let err = v.push_with(&mut |_| Err(Error::custom("boom"))).unwrap_err();
        assert_eq!(err, Error::custom("boom"));
        assert!(v.is_empty());
    }

    #[test]
    fn map_entries_replace_equal_keys() {
        let mut m: BTreeMap<String, i64> = BTreeMap::new();
        for n in [1, 2] {
            m.decode_entry(&mut |k, v| {
                if let ReflectMut::String(s) = k.reflect_mut() {
                    s.push('k');
                }
                if let ReflectMut::Int(IntMut::I64(x)) = v.reflect_mut() {
                    *x = n;
                }
                Ok(())
            })
            .unwrap();
        }
        assert_eq!(m.len(), 1);
        assert_eq!(m["k"], 2);
    }

    #[test]
    fn shared_arc_is_read_only() {
        let mut a = Arc::new(1_i32);
        assert!(matches!(a.reflect_mut(), ReflectMut::Pointer(_)));
        let _other = Arc::clone(&a);
        assert!(matches!(a.reflect_mut(), ReflectMut::ReadOnly));
    }

    #[test]
    fn option_slot_inserts_default() {
        let mut o: Option<bool> = None;
        let slot = o.insert_default();
        if let ReflectMut::Bool(b) = slot.reflect_mut() {
            *b = true;
        }
        assert_eq!(o, Some(true));
        OptionSlot::set_none(&mut o);
        assert!(o.is_none());
    }

    #[test]
    fn static_str_is_read_only() {
        let mut s: &'static str = "x";
        assert!(matches!(s.reflect_ref(), ReflectRef::Str("x")));
        assert!(matches!(s.reflect_mut(), ReflectMut::ReadOnly));
    }
}
