use bson_codec_buffers::{Reader, Writer};
use proptest::collection::vec;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Field {
    Int32(i32),
    Int64(i64),
    Double(f64),
    CString(String),
    String(String),
}

fn field() -> impl Strategy<Value = Field> {
    prop_oneof![
        any::<i32>().prop_map(Field::Int32),
        any::<i64>().prop_map(Field::Int64),
        (-1e15..1e15_f64).prop_map(Field::Double),
        "[a-z_.$]{0,8}".prop_map(Field::CString),
        ".{0,12}".prop_map(Field::String),
    ]
}

proptest! {
    #[test]
    fn framed_fields_read_back_in_order(fields in vec(field(), 0..16)) {
        let mut w = Writer::new();
        let at = w.reserve_i32();
        for f in &fields {
            match f {
                Field::Int32(v) => w.i32(*v),
                Field::Int64(v) => w.i64(*v),
                Field::Double(v) => w.f64(*v),
                Field::CString(s) => w.cstring(s).unwrap(),
                Field::String(s) => w.string(s).unwrap(),
            }
        }
        w.patch_length(at).unwrap();
        let bytes = w.flush();

        let mut r = Reader::new(&bytes);
        prop_assert_eq!(r.i32().unwrap() as usize, bytes.len());
        for f in &fields {
            match f {
                Field::Int32(v) => prop_assert_eq!(r.i32().unwrap(), *v),
                Field::Int64(v) => prop_assert_eq!(r.i64().unwrap(), *v),
                Field::Double(v) => prop_assert_eq!(r.f64().unwrap(), *v),
                Field::CString(s) => prop_assert_eq!(r.cstring().unwrap(), s.as_str()),
                Field::String(s) => {
                    let len = r.i32().unwrap() as usize;
                    prop_assert_eq!(len, s.len() + 1);
                    prop_assert_eq!(r.utf8(len - 1).unwrap(), s.as_str());
                    prop_assert_eq!(r.u8().unwrap(), 0);
                }
            }
        }
        prop_assert_eq!(r.size(), 0);
    }

    #[test]
    fn reads_past_the_end_fail_without_moving(data in vec(any::<u8>(), 0..12), skip in 0usize..12) {
        let mut r = Reader::new(&data);
        let _ = r.skip(skip);
        let before = r.x;
        if r.i64().is_err() {
            prop_assert_eq!(r.x, before);
        }
        let _ = r.cstring();
        prop_assert!(r.x <= data.len());
    }
}
