//! Runtime type identity for the codec registry.
//!
//! The registry dispatches on a value's runtime type, its category (its
//! [`Kind`]) and the optional capabilities it implements. Rust erases all of
//! that at compile time, so every encodable type describes itself through
//! [`Typed`] (static) and [`Reflect`] (object-safe). Containers expose their
//! contents through the [`Struct`], [`Map`], [`List`] and [`OptionSlot`]
//! views so the kind-level codecs can walk them without knowing the
//! concrete type.

mod impls;

use std::any::{Any, TypeId};
use std::fmt;

use crate::codec::{KeyMarshaler, KeyUnmarshaler, ValueMarshaler, ValueUnmarshaler};
use crate::error::Result;

/// Category of a type, used to pick a default codec when no codec was
/// registered for the exact type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Isize,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Usize,
    Float32,
    Float64,
    String,
    Struct,
    Map,
    Slice,
    Option,
    Pointer,
    /// A type handled only by an exact-type or capability codec.
    Opaque,
}

impl Kind {
    pub fn is_string(self) -> bool {
        self == Kind::String
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Bool => "bool",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Isize => "isize",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Usize => "usize",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::String => "string",
            Kind::Struct => "struct",
            Kind::Map => "map",
            Kind::Slice => "slice",
            Kind::Option => "option",
            Kind::Pointer => "pointer",
            Kind::Opaque => "opaque",
        })
    }
}

/// Optional behaviour a type can advertise to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability(pub &'static str);

impl Capability {
    /// Produces its own raw wire bytes, see [`ValueMarshaler`].
    pub const VALUE_MARSHALER: Capability = Capability("ValueMarshaler");
    /// Consumes raw wire bytes, see [`ValueUnmarshaler`].
    pub const VALUE_UNMARSHALER: Capability = Capability("ValueUnmarshaler");
    /// Renders itself as a document key, see [`KeyMarshaler`].
    pub const KEY_MARSHALER: Capability = Capability("KeyMarshaler");
    /// Parses itself from a document key, see [`KeyUnmarshaler`].
    pub const KEY_UNMARSHALER: Capability = Capability("KeyUnmarshaler");
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Static description of a type.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: &'static str,
    pub kind: Kind,
    pub capabilities: &'static [Capability],
    /// Element type of slices, maps, options and pointers.
    pub elem: Option<fn() -> TypeInfo>,
    /// Key type of maps.
    pub key: Option<fn() -> TypeInfo>,
}

impl TypeInfo {
    pub fn new<T: Any>(kind: Kind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind,
            capabilities: &[],
            elem: None,
            key: None,
        }
    }

    pub fn of<T: Typed>() -> Self {
        T::type_info()
    }

    pub fn with_capabilities(mut self, capabilities: &'static [Capability]) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_elem<E: Typed>(mut self) -> Self {
        self.elem = Some(E::type_info);
        self
    }

    pub fn with_key<K: Typed>(mut self) -> Self {
        self.key = Some(K::type_info);
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn elem_type(&self) -> Option<TypeInfo> {
        self.elem.map(|f| f())
    }

    pub fn key_type(&self) -> Option<TypeInfo> {
        self.key.map(|f| f())
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

/// Types that can describe themselves without a value.
pub trait Typed: Any {
    fn type_info() -> TypeInfo;
}

/// Object-safe view of an encodable value.
pub trait Reflect: Any + Send + Sync {
    fn reflect_type_info(&self) -> TypeInfo;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn reflect_ref(&self) -> ReflectRef<'_>;

    fn reflect_mut(&mut self) -> ReflectMut<'_>;

    fn as_value_marshaler(&self) -> Option<&dyn ValueMarshaler> {
        None
    }

    fn as_value_unmarshaler(&mut self) -> Option<&mut dyn ValueUnmarshaler> {
        None
    }

    fn as_key_marshaler(&self) -> Option<&dyn KeyMarshaler> {
        None
    }

    fn as_key_unmarshaler(&mut self) -> Option<&mut dyn KeyUnmarshaler> {
        None
    }
}

impl<'a> dyn Reflect + 'a {
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.reflect_type_info().name
    }
}

/// Borrowed, kind-specific view of a value for encoding.
pub enum ReflectRef<'a> {
    Bool(bool),
    /// Any signed integer, widened.
    Int(i64),
    /// Any unsigned integer, widened.
    Uint(u64),
    /// Any float, widened.
    Float(f64),
    Str(&'a str),
    Struct(&'a dyn Struct),
    Map(&'a dyn Map),
    List(&'a dyn List),
    Option(Option<&'a dyn Reflect>),
    Pointer(&'a dyn Reflect),
    Opaque,
}

/// Mutable, kind-specific view of a value for decoding.
pub enum ReflectMut<'a> {
    Bool(&'a mut bool),
    Int(IntMut<'a>),
    Uint(UintMut<'a>),
    Float(FloatMut<'a>),
    String(&'a mut String),
    Struct(&'a mut dyn Struct),
    Map(&'a mut dyn Map),
    List(&'a mut dyn List),
    Option(&'a mut dyn OptionSlot),
    Pointer(&'a mut dyn Reflect),
    /// The value exists but cannot be written through this handle.
    ReadOnly,
    Opaque,
}

pub enum IntMut<'a> {
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    Isize(&'a mut isize),
}

pub enum UintMut<'a> {
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    U64(&'a mut u64),
    Usize(&'a mut usize),
}

pub enum FloatMut<'a> {
    F32(&'a mut f32),
    F64(&'a mut f64),
}

/// One field of a struct, under its document key.
pub struct Field<'a> {
    pub key: &'static str,
    pub value: &'a dyn Reflect,
}

pub trait Struct {
    /// Fields in declaration order.
    fn fields(&self) -> Vec<Field<'_>>;

    fn field_mut(&mut self, key: &str) -> Option<&mut dyn Reflect>;
}

/// Callback handed a fresh key and value slot.
pub type EntryFn<'f> = dyn FnMut(&mut dyn Reflect, &mut dyn Reflect) -> Result<()> + 'f;

/// Callback handed a fresh element slot.
pub type ElemFn<'f> = dyn FnMut(&mut dyn Reflect) -> Result<()> + 'f;

pub trait Map {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> Vec<(&dyn Reflect, &dyn Reflect)>;

    fn clear(&mut self);

    /// Fills a default key and value through `f`, then inserts them,
    /// replacing any previous entry with an equal key.
    fn decode_entry(&mut self, f: &mut EntryFn<'_>) -> Result<()>;
}

pub trait List {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<&dyn Reflect>;

    fn clear(&mut self);

    /// Fills a default element through `f`, then appends it.
    fn push_with(&mut self, f: &mut ElemFn<'_>) -> Result<()>;
}

pub trait OptionSlot {
    fn is_none(&self) -> bool;

    fn set_none(&mut self);

    /// Replaces the content with a default value and returns it.
    fn insert_default(&mut self) -> &mut dyn Reflect;
}

/// Implements [`Typed`] and [`Reflect`] for a struct, encoding it as a
/// document with one key per listed field.
///
/// ```
/// use bson_codec::reflect_struct;
///
/// #[derive(Default)]
/// struct Account {
///     id: i64,
///     display_name: String,
/// }
///
/// reflect_struct!(Account { id => "_id", display_name => "name" });
/// ```
#[macro_export]
macro_rules! reflect_struct {
    (@key $field:ident $key:literal) => {
        $key
    };
    (@key $field:ident) => {
        stringify!($field)
    };
    ($ty:ty { $($field:ident $(=> $key:literal)?),* $(,)? }) => {
        impl $crate::reflect::Typed for $ty {
            fn type_info() -> $crate::reflect::TypeInfo {
                $crate::reflect::TypeInfo::new::<$ty>($crate::reflect::Kind::Struct)
            }
        }

        impl $crate::reflect::Struct for $ty {
            fn fields(&self) -> ::std::vec::Vec<$crate::reflect::Field<'_>> {
                ::std::vec![$(
                    $crate::reflect::Field {
                        key: $crate::reflect_struct!(@key $field $($key)?),
                        value: &self.$field,
                    },
                )*]
            }

            fn field_mut(
                &mut self,
                key: &str,
            ) -> ::std::option::Option<&mut dyn $crate::reflect::Reflect> {
                $(
                    if key == $crate::reflect_struct!(@key $field $($key)?) {
                        return ::std::option::Option::Some(
                            &mut self.$field as &mut dyn $crate::reflect::Reflect,
                        );
                    }
                )*
                ::std::option::Option::None
            }
        }

        impl $crate::reflect::Reflect for $ty {
            fn reflect_type_info(&self) -> $crate::reflect::TypeInfo {
                <$ty as $crate::reflect::Typed>::type_info()
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn reflect_ref(&self) -> $crate::reflect::ReflectRef<'_> {
                $crate::reflect::ReflectRef::Struct(self)
            }

            fn reflect_mut(&mut self) -> $crate::reflect::ReflectMut<'_> {
                $crate::reflect::ReflectMut::Struct(self)
            }
        }
    };
}

/// Implements [`Typed`] and [`Reflect`] for a type that encodes and decodes
/// itself through [`ValueMarshaler`] and [`ValueUnmarshaler`].
#[macro_export]
macro_rules! reflect_value_marshaler {
    ($ty:ty) => {
        impl $crate::reflect::Typed for $ty {
            fn type_info() -> $crate::reflect::TypeInfo {
                $crate::reflect::TypeInfo::new::<$ty>($crate::reflect::Kind::Opaque)
                    .with_capabilities(&[
                        $crate::reflect::Capability::VALUE_MARSHALER,
                        $crate::reflect::Capability::VALUE_UNMARSHALER,
                    ])
            }
        }

        impl $crate::reflect::Reflect for $ty {
            fn reflect_type_info(&self) -> $crate::reflect::TypeInfo {
                <$ty as $crate::reflect::Typed>::type_info()
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn reflect_ref(&self) -> $crate::reflect::ReflectRef<'_> {
                $crate::reflect::ReflectRef::Opaque
            }

            fn reflect_mut(&mut self) -> $crate::reflect::ReflectMut<'_> {
                $crate::reflect::ReflectMut::Opaque
            }

            fn as_value_marshaler(
                &self,
            ) -> ::std::option::Option<&dyn $crate::codec::ValueMarshaler> {
                ::std::option::Option::Some(self)
            }

            fn as_value_unmarshaler(
                &mut self,
            ) -> ::std::option::Option<&mut dyn $crate::codec::ValueUnmarshaler> {
                ::std::option::Option::Some(self)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Point {
        x: i32,
        label: String,
    }

    reflect_struct!(Point { x, label => "name" });

    #[test]
    fn struct_macro_lists_fields_under_their_keys() {
        let p = Point {
            x: 3,
            label: "a".into(),
        };
        let keys: Vec<_> = p.fields().iter().map(|f| f.key).collect();
        assert_eq!(keys, ["x", "name"]);
        assert_eq!(Point::type_info().kind, Kind::Struct);
    }

    #[test]
    fn struct_macro_finds_renamed_fields() {
        let mut p = Point::default();
        assert!(p.field_mut("label").is_none());
        let field = p.field_mut("name").expect("renamed field");
        match field.reflect_mut() {
            ReflectMut::String(s) => s.push_str("renamed"),
            _ => panic!("expected a string view"),
        }
        assert_eq!(p.label, "renamed");
    }

    #[test]
    fn containers_describe_their_element_types() {
        let info = TypeInfo::of::<HashMap<String, Vec<Option<u8>>>>();
        assert_eq!(info.kind, Kind::Map);
        assert_eq!(info.key_type().map(|k| k.kind), Some(Kind::String));
        let slice = info.elem_type().expect("map value type");
        assert_eq!(slice.kind, Kind::Slice);
        let option = slice.elem_type().expect("slice element type");
        assert_eq!(option.kind, Kind::Option);
        assert_eq!(option.elem_type().map(|e| e.kind), Some(Kind::Uint8));
    }

    #[test]
    fn integers_carry_key_capabilities() {
        assert!(TypeInfo::of::<i64>().has(Capability::KEY_MARSHALER));
        assert!(TypeInfo::of::<u16>().has(Capability::KEY_UNMARSHALER));
        assert!(!TypeInfo::of::<bool>().has(Capability::KEY_MARSHALER));
    }

    #[test]
    fn downcast_through_dyn_reflect() {
        let mut v: Box<dyn Reflect> = Box::new(7_i16);
        assert_eq!(v.downcast_ref::<i16>(), Some(&7));
        *v.downcast_mut::<i16>().expect("i16") = 9;
        assert!(matches!(v.reflect_ref(), ReflectRef::Int(9)));
        assert_eq!(v.type_name(), "i16");
    }
}
