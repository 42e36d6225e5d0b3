use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bson_codec::codec::{EncodeContext, EncodeOptions, FixedCodec, ValueEncoder};
use bson_codec::codec::{write_bson, DecodeOptions};
use bson_codec::rw::BinaryWriter;
use bson_codec::{
    doc, reflect_struct, subtype, Binary, Bson, DateTime, Document, Error, Marshaller, ObjectId,
    Registry, Timestamp,
};
use indexmap::IndexMap;

const FOO_ONE: [u8; 14] = [0x0e, 0, 0, 0, 0x10, b'f', b'o', b'o', 0, 1, 0, 0, 0, 0];

#[derive(Debug, Default, PartialEq)]
struct Address {
    city: String,
    zip: Option<u32>,
}

reflect_struct!(Address { city, zip });

#[derive(Debug, Default, PartialEq)]
struct Person {
    id: ObjectId,
    name: String,
    age: i32,
    tags: Vec<String>,
    address: Address,
    scores: BTreeMap<String, f64>,
    nick: Option<String>,
    avatar: Vec<u8>,
    joined: DateTime,
    visits: Box<i64>,
}

reflect_struct!(Person {
    id => "_id",
    name,
    age,
    tags,
    address,
    scores,
    nick,
    avatar,
    joined,
    visits,
});

fn sample_person() -> Person {
    let mut scores = BTreeMap::new();
    scores.insert("math".to_owned(), 9.5);
    scores.insert("art".to_owned(), 7.0);
    Person {
        id: ObjectId::from_bytes([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]),
        name: "Ada".into(),
        age: 36,
        tags: vec!["admin".into(), "ops".into()],
        address: Address {
            city: "London".into(),
            zip: Some(12345),
        },
        scores,
        nick: None,
        avatar: vec![0xde, 0xad],
        joined: DateTime::from_millis(1_600_000_000_000),
        visits: Box::new(-4),
    }
}

#[test]
fn foo_one_matches_reference_bytes_for_every_map_shape() {
    let m = Marshaller::new();

    let mut hash = HashMap::new();
    hash.insert("foo".to_owned(), 1_i32);
    assert_eq!(m.marshal(&hash).unwrap(), FOO_ONE);

    let mut tree = BTreeMap::new();
    tree.insert("foo".to_owned(), 1_i32);
    assert_eq!(m.marshal(&tree).unwrap(), FOO_ONE);

    assert_eq!(m.marshal(&doc! { "foo" => 1 }).unwrap(), FOO_ONE);
    assert_eq!(doc! { "foo" => 1 }.to_bytes().unwrap(), FOO_ONE);

    let mut back = Document::new();
    m.unmarshal(&FOO_ONE, &mut back).unwrap();
    assert_eq!(back, doc! { "foo" => 1 });
}

#[test]
fn struct_round_trip_and_wire_layout() {
    let m = Marshaller::new();
    let person = sample_person();
    let bytes = m.marshal(&person).unwrap();

    let doc = Document::from_bytes(&bytes).unwrap();
    let keys: Vec<&str> = doc.keys().collect();
    assert_eq!(
        keys,
        [
            "_id", "name", "age", "tags", "address", "scores", "nick", "avatar", "joined",
            "visits"
        ]
    );
    assert_eq!(doc.get("_id"), Some(&Bson::ObjectId(person.id)));
    assert_eq!(doc.get("age"), Some(&Bson::Int32(36)));
    assert_eq!(doc.get("nick"), Some(&Bson::Null));
    assert_eq!(
        doc.get("avatar"),
        Some(&Bson::Binary(Binary::new(subtype::GENERIC, vec![0xde, 0xad])))
    );
    assert_eq!(doc.get("visits"), Some(&Bson::Int64(-4)));
    assert_eq!(
        doc.get_document("address"),
        Some(&doc! { "city" => "London", "zip" => Bson::Int64(12345) })
    );
    assert_eq!(
        doc.get_document("scores"),
        Some(&doc! { "art" => 7.0, "math" => 9.5 })
    );

    let mut back = Person::default();
    m.unmarshal(&bytes, &mut back).unwrap();
    assert_eq!(back, person);
}

#[test]
fn unknown_keys_are_skipped() {
    let m = Marshaller::new();
    let bytes = doc! {
        "name" => "Grace",
        "extra" => doc! { "deep" => Bson::Array(vec![Bson::Int32(1), Bson::Null]) },
        "age" => 85,
        "ts" => Timestamp { time: 1, increment: 2 },
    }
    .to_bytes()
    .unwrap();

    let mut back = Person::default();
    m.unmarshal(&bytes, &mut back).unwrap();
    assert_eq!(back.name, "Grace");
    assert_eq!(back.age, 85);
    assert!(back.tags.is_empty());
}

#[test]
fn null_fields_reset_containers_and_options() {
    let m = Marshaller::new();
    let bytes = doc! {
        "tags" => Bson::Null,
        "scores" => Bson::Null,
        "nick" => Bson::Null,
        "avatar" => Bson::Null,
        "address" => Bson::Null,
    }
    .to_bytes()
    .unwrap();

    let mut target = sample_person();
    target.nick = Some("a".into());
    m.unmarshal(&bytes, &mut target).unwrap();
    assert!(target.tags.is_empty());
    assert!(target.scores.is_empty());
    assert_eq!(target.nick, None);
    assert!(target.avatar.is_empty());
    // Null leaves a struct untouched.
    assert_eq!(target.address.city, "London");
}

#[test]
fn undefined_decodes_to_none() {
    let m = Marshaller::new();
    let bytes = doc! { "nick" => Bson::Undefined }.to_bytes().unwrap();
    let mut target = Person {
        nick: Some("x".into()),
        ..Person::default()
    };
    m.unmarshal(&bytes, &mut target).unwrap();
    assert_eq!(target.nick, None);
}

#[test]
fn nested_error_reports_dotted_path() {
    let m = Marshaller::new();
    let bytes = doc! {
        "address" => doc! { "city" => "Paris", "zip" => "75001" },
    }
    .to_bytes()
    .unwrap();

    let err = m.unmarshal(&bytes, &mut Person::default()).unwrap_err();
    assert_eq!(err.path(), Some("address.zip"));
    assert!(matches!(
        err.root_cause(),
        Error::WrongWireType {
            codec: "UintCodec",
            ..
        }
    ));
}

#[test]
fn array_element_errors_carry_the_index() {
    let m = Marshaller::new();
    let bytes = doc! {
        "tags" => Bson::Array(vec![Bson::String("ok".into()), Bson::Boolean(true)]),
    }
    .to_bytes()
    .unwrap();

    let err = m.unmarshal(&bytes, &mut Person::default()).unwrap_err();
    assert_eq!(err.path(), Some("tags.1"));
}

#[test]
fn byte_vectors_accept_only_the_generic_subtype() {
    let m = Marshaller::new();
    let bytes = doc! {
        "avatar" => Binary::new(subtype::USER_DEFINED, vec![1, 2, 3]),
    }
    .to_bytes()
    .unwrap();

    let err = m.unmarshal(&bytes, &mut Person::default()).unwrap_err();
    assert_eq!(err.path(), Some("avatar"));
    assert_eq!(
        err.root_cause(),
        &Error::UnexpectedSubtype {
            expected: subtype::GENERIC,
            actual: subtype::USER_DEFINED,
        }
    );
}

#[derive(Debug, Default)]
struct Tagged {
    id: ObjectId,
}

reflect_struct!(Tagged { id });

#[test]
fn fixed_codecs_reject_the_wrong_wire_type() {
    let m = Marshaller::new();
    let bytes = doc! { "id" => "not-an-oid" }.to_bytes().unwrap();

    let err = m.unmarshal(&bytes, &mut Tagged::default()).unwrap_err();
    assert_eq!(err.path(), Some("id"));
    assert!(matches!(
        err.root_cause(),
        Error::WrongWireType {
            codec: "ObjectIdCodec",
            ..
        }
    ));
}

#[test]
fn fixed_codecs_reject_the_wrong_native_type() {
    let registry = Registry::new();
    let ctx = EncodeContext::new(&registry, EncodeOptions::default());
    let mut writer = BinaryWriter::new_value();

    let err = FixedCodec::<ObjectId>::new()
        .encode_value(&ctx, &mut writer, &5_i32)
        .unwrap_err();
    assert_eq!(
        err,
        Error::WrongNativeType {
            codec: "ObjectIdCodec",
            expected: std::any::type_name::<ObjectId>(),
            actual: "i32",
        }
    );
}

#[test]
fn integer_keyed_maps_use_decimal_keys() {
    let m = Marshaller::new();
    let mut by_port: BTreeMap<u16, String> = BTreeMap::new();
    by_port.insert(80, "http".into());
    by_port.insert(443, "https".into());

    let bytes = m.marshal(&by_port).unwrap();
    assert_eq!(
        Document::from_bytes(&bytes).unwrap(),
        doc! { "80" => "http", "443" => "https" }
    );

    let mut back: BTreeMap<u16, String> = BTreeMap::new();
    m.unmarshal(&bytes, &mut back).unwrap();
    assert_eq!(back, by_port);

    let bad = doc! { "http" => "x" }.to_bytes().unwrap();
    let err = m.unmarshal(&bad, &mut back).unwrap_err();
    assert_eq!(err.path(), Some("http"));
    assert!(matches!(err.root_cause(), Error::KeyMarshal(_)));
}

#[test]
fn index_maps_keep_insertion_order() {
    let m = Marshaller::new();
    let mut map: IndexMap<String, i32> = IndexMap::new();
    map.insert("z".into(), 1);
    map.insert("a".into(), 2);
    map.insert("m".into(), 3);

    let doc = Document::from_bytes(&m.marshal(&map).unwrap()).unwrap();
    assert_eq!(doc.keys().collect::<Vec<_>>(), ["z", "a", "m"]);
}

#[test]
fn maps_merge_unless_zero_maps_is_set() {
    let bytes = doc! { "new" => 2 }.to_bytes().unwrap();

    let mut merged: HashMap<String, i32> = HashMap::new();
    merged.insert("old".into(), 1);
    Marshaller::new().unmarshal(&bytes, &mut merged).unwrap();
    assert_eq!(merged.len(), 2);

    let mut zeroed: HashMap<String, i32> = HashMap::new();
    zeroed.insert("old".into(), 1);
    Marshaller::new()
        .with_decode_options(DecodeOptions {
            zero_maps: true,
            ..DecodeOptions::default()
        })
        .unmarshal(&bytes, &mut zeroed)
        .unwrap();
    assert_eq!(zeroed.len(), 1);
    assert_eq!(zeroed.get("new"), Some(&2));
}

#[derive(Debug, Default)]
struct Labelled {
    label: &'static str,
    count: i32,
}

reflect_struct!(Labelled { label, count });

#[test]
fn read_only_fields_encode_but_do_not_decode() {
    let m = Marshaller::new();
    let bytes = m
        .marshal(&Labelled {
            label: "fixed",
            count: 2,
        })
        .unwrap();
    assert_eq!(
        Document::from_bytes(&bytes).unwrap(),
        doc! { "label" => "fixed", "count" => 2 }
    );

    let err = m.unmarshal(&bytes, &mut Labelled::default()).unwrap_err();
    assert_eq!(err.path(), Some("label"));
    assert!(matches!(err.root_cause(), Error::NonSettable { .. }));
}

#[derive(Debug, Default)]
struct Shared {
    inner: Option<Arc<String>>,
}

reflect_struct!(Shared { inner });

#[test]
fn shared_arcs_are_not_settable() {
    let m = Marshaller::new();
    let value = Arc::new("hello".to_owned());
    let keep = Arc::clone(&value);
    let source = Shared { inner: Some(value) };
    let bytes = m.marshal(&source).unwrap();
    assert_eq!(
        Document::from_bytes(&bytes).unwrap(),
        doc! { "inner" => "hello" }
    );

    let mut target = Shared {
        inner: Some(Arc::clone(&keep)),
    };
    // Option::insert_default replaces the Arc, so the fresh one is unique.
    m.unmarshal(&bytes, &mut target).unwrap();
    assert_eq!(target.inner.as_deref().map(String::as_str), Some("hello"));

    let mut shared = Arc::clone(&keep);
    let err = m
        .unmarshal_value(bson_codec::ElementType::String, &[2, 0, 0, 0, b'x', 0], &mut shared)
        .unwrap_err();
    assert!(matches!(err, Error::NonSettable { .. }));
}

#[test]
fn nesting_beyond_the_depth_limit_is_rejected() {
    let mut deep = doc! { "leaf" => 1 };
    for _ in 0..200 {
        deep = doc! { "d" => deep };
    }
    let mut writer = BinaryWriter::new().with_max_depth(1_000);
    write_bson(&mut writer, &Bson::Document(deep)).unwrap();
    let bytes = writer.into_bytes();

    let err = Marshaller::new()
        .unmarshal(&bytes, &mut Document::new())
        .unwrap_err();
    assert_eq!(
        err.root_cause(),
        &Error::MaxDepthExceeded {
            max: bson_codec::DEFAULT_MAX_DEPTH
        }
    );
}
