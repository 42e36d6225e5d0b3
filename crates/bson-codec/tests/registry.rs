use std::collections::HashMap;
use std::sync::Arc;

use bson_codec::codec::{
    DecodeContext, EncodeContext, ValueDecoder, ValueEncoder, ValueMarshaler, ValueUnmarshaler,
};
use bson_codec::reflect::{Field, ReflectMut, ReflectRef, Struct};
use bson_codec::{
    doc, reflect_struct, reflect_value_marshaler, Bson, Capability, Document, ElementType, Error,
    Kind, Marshaller, Reflect, Registry, RegistryBuilder, Result, TypeInfo, Typed, ValueReader,
    ValueWriter,
};

fn string_payload(text: &str) -> Vec<u8> {
    let mut out = ((text.len() + 1) as i32).to_le_bytes().to_vec();
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    out
}

fn payload_str(bytes: &[u8]) -> Result<&str> {
    if bytes.len() < 5 {
        return Err(Error::custom("string payload too short"));
    }
    std::str::from_utf8(&bytes[4..bytes.len() - 1]).map_err(Error::custom)
}

/// Temperature that travels as a string such as `"21.5C"`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Celsius(f64);

impl ValueMarshaler for Celsius {
    fn marshal_bson_value(&self) -> Result<(ElementType, Vec<u8>)> {
        Ok((ElementType::String, string_payload(&format!("{}C", self.0))))
    }
}

impl ValueUnmarshaler for Celsius {
    fn unmarshal_bson_value(&mut self, ty: ElementType, bytes: &[u8]) -> Result<()> {
        if ty != ElementType::String {
            return Err(Error::custom(format!("temperature must be a string, got {ty}")));
        }
        let text = payload_str(bytes)?;
        let degrees = text
            .strip_suffix('C')
            .ok_or_else(|| Error::custom(format!("missing unit in {text:?}")))?;
        self.0 = degrees.parse().map_err(Error::custom)?;
        Ok(())
    }
}

reflect_value_marshaler!(Celsius);

#[derive(Debug, Default, PartialEq)]
struct Reading {
    sensor: String,
    temp: Celsius,
    history: Vec<Celsius>,
}

reflect_struct!(Reading {
    sensor,
    temp,
    history
});

fn reading(i: usize) -> Reading {
    Reading {
        sensor: format!("s-{i}"),
        temp: Celsius(20.0 + i as f64 / 2.0),
        history: vec![Celsius(1.5), Celsius(-3.0)],
    }
}

#[test]
fn value_marshalers_write_their_own_bytes() {
    let m = Marshaller::new();
    let bytes = m.marshal(&reading(3)).unwrap();
    assert_eq!(
        Document::from_bytes(&bytes).unwrap(),
        doc! {
            "sensor" => "s-3",
            "temp" => "21.5C",
            "history" => Bson::Array(vec!["1.5C".into(), "-3C".into()]),
        }
    );

    let mut back = Reading::default();
    m.unmarshal(&bytes, &mut back).unwrap();
    assert_eq!(back, reading(3));

    assert_eq!(
        m.to_ext_json(&reading(3), true).unwrap(),
        r#"{"sensor":"s-3","temp":"21.5C","history":["1.5C","-3C"]}"#
    );
}

#[test]
fn value_unmarshaler_errors_carry_the_key() {
    let bytes = doc! { "temp" => 21 }.to_bytes().unwrap();
    let err = Marshaller::new()
        .unmarshal(&bytes, &mut Reading::default())
        .unwrap_err();
    assert_eq!(err.path(), Some("temp"));
    assert_eq!(
        err.root_cause(),
        &Error::Custom("temperature must be a string, got 32-bit integer".into())
    );
}

/// Decodes itself from `"major.minor"` but encodes as a plain struct.
#[derive(Debug, Default, PartialEq)]
struct Version {
    major: i32,
    minor: i32,
}

impl Typed for Version {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Version>(Kind::Struct).with_capabilities(&[Capability::VALUE_UNMARSHALER])
    }
}

impl Struct for Version {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field {
                key: "major",
                value: &self.major,
            },
            Field {
                key: "minor",
                value: &self.minor,
            },
        ]
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut dyn Reflect> {
        match key {
            "major" => Some(&mut self.major),
            "minor" => Some(&mut self.minor),
            _ => None,
        }
    }
}

impl ValueUnmarshaler for Version {
    fn unmarshal_bson_value(&mut self, ty: ElementType, bytes: &[u8]) -> Result<()> {
        if ty != ElementType::String {
            return Err(Error::custom("version must be a string"));
        }
        let text = payload_str(bytes)?;
        let (major, minor) = text
            .split_once('.')
            .ok_or_else(|| Error::custom(format!("bad version {text:?}")))?;
        self.major = major.parse().map_err(Error::custom)?;
        self.minor = minor.parse().map_err(Error::custom)?;
        Ok(())
    }
}

impl Reflect for Version {
    fn reflect_type_info(&self) -> TypeInfo {
        Self::type_info()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Struct(self)
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Struct(self)
    }

    fn as_value_unmarshaler(&mut self) -> Option<&mut dyn ValueUnmarshaler> {
        Some(self)
    }
}

#[derive(Debug, Default, PartialEq)]
struct Release {
    version: Version,
}

reflect_struct!(Release { version });

#[test]
fn one_way_unmarshaler_encodes_through_its_kind() {
    let m = Marshaller::new();
    let release = Release {
        version: Version { major: 1, minor: 2 },
    };
    let bytes = m.marshal(&release).unwrap();
    assert_eq!(
        Document::from_bytes(&bytes).unwrap(),
        doc! { "version" => doc! { "major" => 1, "minor" => 2 } }
    );

    let text = doc! { "version" => "3.4" }.to_bytes().unwrap();
    let mut back = Release::default();
    m.unmarshal(&text, &mut back).unwrap();
    assert_eq!(back.version, Version { major: 3, minor: 4 });

    // The capability wins over the kind on decode, so a document is refused.
    assert!(m.unmarshal(&bytes, &mut Release::default()).is_err());
}

/// Writes booleans as 0 or 1.
struct BoolAsInt;

impl ValueEncoder for BoolAsInt {
    fn encode_value(
        &self,
        _ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.reflect_ref() {
            ReflectRef::Bool(b) => vw.write_int32(i32::from(b)),
            _ => Err(Error::custom("BoolAsInt only handles bool")),
        }
    }
}

impl ValueDecoder for BoolAsInt {
    fn decode_value(
        &self,
        _ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let v = vr.read_int32()?;
        match target.reflect_mut() {
            ReflectMut::Bool(b) => {
                *b = v != 0;
                Ok(())
            }
            _ => Err(Error::custom("BoolAsInt only handles bool")),
        }
    }
}

/// Writes a temperature as a bare double.
struct CelsiusAsDouble;

impl ValueEncoder for CelsiusAsDouble {
    fn encode_value(
        &self,
        _ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        let c = value
            .downcast_ref::<Celsius>()
            .ok_or_else(|| Error::custom("expected Celsius"))?;
        vw.write_double(c.0)
    }
}

impl ValueDecoder for CelsiusAsDouble {
    fn decode_value(
        &self,
        _ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let v = vr.read_double()?;
        let c = target
            .downcast_mut::<Celsius>()
            .ok_or_else(|| Error::custom("expected Celsius"))?;
        c.0 = v;
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
struct Flags {
    enabled: bool,
    temp: Celsius,
}

reflect_struct!(Flags { enabled, temp });

#[test]
fn registered_codecs_override_defaults() {
    let registry = RegistryBuilder::with_defaults()
        .register_kind_codec(Kind::Bool, BoolAsInt)
        .register_type_codec::<Celsius>(CelsiusAsDouble)
        .build();
    let m = Marshaller::with_registry(Arc::new(registry));

    let flags = Flags {
        enabled: true,
        temp: Celsius(4.5),
    };
    let bytes = m.marshal(&flags).unwrap();
    assert_eq!(
        Document::from_bytes(&bytes).unwrap(),
        doc! { "enabled" => 1, "temp" => 4.5 }
    );

    let mut back = Flags::default();
    m.unmarshal(&bytes, &mut back).unwrap();
    assert_eq!(back, flags);
}

#[test]
fn registration_after_lookup_is_rejected() {
    let mut registry = Registry::new();
    registry.register_kind_codec(Kind::Bool, BoolAsInt).unwrap();
    assert!(!registry.is_frozen());

    registry.lookup(&TypeInfo::of::<Flags>()).unwrap();
    assert!(registry.is_frozen());
    assert_eq!(
        registry.register_type_codec::<Celsius>(CelsiusAsDouble),
        Err(Error::FrozenRegistry)
    );
    assert_eq!(
        registry.register_interface_codec(Capability::VALUE_MARSHALER, BoolAsInt),
        Err(Error::FrozenRegistry)
    );
}

#[test]
fn empty_registry_resolves_nothing() {
    let m = Marshaller::with_registry(Arc::new(Registry::builder().build()));
    assert!(matches!(
        m.marshal(&Flags::default()),
        Err(Error::NoCodec { .. })
    ));
}

#[test]
fn maps_with_unencodable_keys_have_no_codec() {
    let mut map: HashMap<bool, i32> = HashMap::new();
    map.insert(true, 1);
    let err = Marshaller::new().marshal(&map).unwrap_err();
    assert_eq!(
        err,
        Error::NoCodec {
            type_name: std::any::type_name::<HashMap<bool, i32>>()
        }
    );
}

#[test]
fn concurrent_lookups_share_one_registry() {
    let registry = Arc::new(Registry::new());
    std::thread::scope(|s| {
        for t in 0..8 {
            let registry = Arc::clone(&registry);
            s.spawn(move || {
                let m = Marshaller::with_registry(Arc::clone(&registry));
                for i in 0..50 {
                    let expected = reading(t * 100 + i);
                    let bytes = m.marshal(&expected).unwrap();
                    let mut back = Reading::default();
                    m.unmarshal(&bytes, &mut back).unwrap();
                    assert_eq!(back, expected);

                    let flags = Flags {
                        enabled: i % 2 == 0,
                        temp: Celsius(i as f64),
                    };
                    let bytes = m.marshal(&flags).unwrap();
                    let mut back = Flags::default();
                    m.unmarshal(&bytes, &mut back).unwrap();
                    assert_eq!(back, flags);

                    assert_eq!(
                        registry.lookup(&TypeInfo::of::<HashMap<bool, i32>>()).err(),
                        Some(Error::NoCodec {
                            type_name: std::any::type_name::<HashMap<bool, i32>>()
                        })
                    );
                    assert!(registry.lookup(&TypeInfo::of::<Celsius>()).is_ok());
                }
            });
        }
    });
    assert!(registry.is_frozen());
}

/// Claims an int32 but hands back eight bytes.
#[derive(Debug, Default)]
struct Padded;

impl ValueMarshaler for Padded {
    fn marshal_bson_value(&self) -> Result<(ElementType, Vec<u8>)> {
        Ok((ElementType::Int32, vec![1, 0, 0, 0, 0, 0, 0, 0]))
    }
}

impl ValueUnmarshaler for Padded {
    fn unmarshal_bson_value(&mut self, _ty: ElementType, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }
}

reflect_value_marshaler!(Padded);

#[derive(Debug, Default)]
struct Holder {
    v: Padded,
}

reflect_struct!(Holder { v });

#[test]
fn marshaler_payload_longer_than_its_type_is_rejected() {
    let m = Marshaller::new();
    let err = m.marshal(&Holder::default()).unwrap_err();
    assert!(matches!(err.root_cause(), Error::Malformed(_)), "{err:?}");
    assert!(matches!(
        m.to_ext_json(&Holder::default(), true).unwrap_err().root_cause(),
        Error::Malformed(_)
    ));
}
