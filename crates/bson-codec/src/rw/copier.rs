//! Streaming copies between any reader and any writer.

use super::{BinaryReader, BinaryWriter, ValueReader, ValueWriter};
use crate::error::Result;
use crate::wire::ElementType;

/// Copies the top-level document under `src` into `dst`.
pub fn copy_document(dst: &mut dyn ValueWriter, src: &mut dyn ValueReader) -> Result<()> {
    src.read_document()?;
    dst.write_document()?;
    copy_elements(dst, src)
}

fn copy_elements(dst: &mut dyn ValueWriter, src: &mut dyn ValueReader) -> Result<()> {
    while let Some((key, _)) = src.read_element()? {
        dst.write_document_element(&key)?;
        copy_value(dst, src)?;
    }
    dst.write_document_end()
}

/// Copies the value under `src` into the position `dst` is on.
pub fn copy_value(dst: &mut dyn ValueWriter, src: &mut dyn ValueReader) -> Result<()> {
    match src.element_type() {
        ElementType::Double => dst.write_double(src.read_double()?),
        ElementType::String => dst.write_string(&src.read_string()?),
        ElementType::EmbeddedDocument => {
            src.read_document()?;
            dst.write_document()?;
            copy_elements(dst, src)
        }
        ElementType::Array => {
            src.read_array()?;
            dst.write_array()?;
            while src.read_value()?.is_some() {
                dst.write_array_element()?;
                copy_value(dst, src)?;
            }
            dst.write_array_end()
        }
        ElementType::Binary => {
            let b = src.read_binary()?;
            dst.write_binary(b.subtype, &b.bytes)
        }
        ElementType::Undefined => {
            src.read_undefined()?;
            dst.write_undefined()
        }
        ElementType::ObjectId => dst.write_object_id(src.read_object_id()?),
        ElementType::Boolean => dst.write_boolean(src.read_boolean()?),
        ElementType::DateTime => dst.write_date_time(src.read_date_time()?),
        ElementType::Null => {
            src.read_null()?;
            dst.write_null()
        }
        ElementType::RegularExpression => {
            let re = src.read_regex()?;
            dst.write_regex(&re.pattern, &re.options)
        }
        ElementType::DbPointer => {
            let p = src.read_db_pointer()?;
            dst.write_db_pointer(&p.namespace, p.id)
        }
        ElementType::JavaScriptCode => dst.write_javascript(&src.read_javascript()?),
        ElementType::Symbol => dst.write_symbol(&src.read_symbol()?),
        ElementType::JavaScriptCodeWithScope => {
            let code = src.read_code_with_scope()?;
            dst.write_code_with_scope(&code)?;
            copy_elements(dst, src)
        }
        ElementType::Int32 => dst.write_int32(src.read_int32()?),
        ElementType::Timestamp => dst.write_timestamp(src.read_timestamp()?),
        ElementType::Int64 => dst.write_int64(src.read_int64()?),
        ElementType::Decimal128 => dst.write_decimal128(src.read_decimal128()?),
        ElementType::MinKey => {
            src.read_min_key()?;
            dst.write_min_key()
        }
        ElementType::MaxKey => {
            src.read_max_key()?;
            dst.write_max_key()
        }
    }
}

/// Serializes the value under `src` as bare BSON bytes (no tag, no key).
pub fn copy_value_to_bytes(src: &mut dyn ValueReader) -> Result<(ElementType, Vec<u8>)> {
    let mut writer = BinaryWriter::new_value();
    copy_value(&mut writer, src)?;
    writer.into_value()
}

/// Writes a bare BSON value of type `ty` into the position `dst` is on.
pub fn copy_bytes_to_writer(
    dst: &mut dyn ValueWriter,
    ty: ElementType,
    bytes: &[u8],
) -> Result<()> {
    let mut reader = BinaryReader::new_value(bytes, ty);
    copy_value(dst, &mut reader)?;
    reader.ensure_consumed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::rw::{ExtJsonReader, ExtJsonWriter};

    #[test]
    fn ext_json_to_binary_and_back() {
        let text = r#"{"a":{"$numberInt":"1"},"b":[{"$numberLong":"2"},{"c":{"$oid":"5f1a2b3c4d5e6f7a8b9c0d1e"}}],"d":{"$code":"f","$scope":{"x":null}}}"#;
        let mut reader = ExtJsonReader::new(text, true).unwrap();
        let mut binary = BinaryWriter::new();
        copy_document(&mut binary, &mut reader).unwrap();
        let bytes = binary.into_bytes();

        let mut reader = BinaryReader::new(&bytes);
        let mut json = ExtJsonWriter::new(true);
        copy_document(&mut json, &mut reader).unwrap();
        assert_eq!(json.into_string(), text);
    }

    #[test]
    fn bare_value_bytes() {
        let mut reader = ExtJsonReader::new(r#"{"v":"hi"}"#, false).unwrap();
        reader.read_document().unwrap();
        reader.read_element().unwrap();
        let (ty, bytes) = copy_value_to_bytes(&mut reader).unwrap();
        assert_eq!(ty, ElementType::String);
        assert_eq!(bytes, [3, 0, 0, 0, b'h', b'i', 0]);

        let mut writer = ExtJsonWriter::new(false);
        writer.write_document().unwrap();
        writer.write_document_element("w").unwrap();
        copy_bytes_to_writer(&mut writer, ty, &bytes).unwrap();
        writer.write_document_end().unwrap();
        assert_eq!(writer.into_string(), r#"{"w":"hi"}"#);
    }

    #[test]
    fn bare_value_with_trailing_bytes_is_malformed() {
        let mut writer = BinaryWriter::new();
        writer.write_document().unwrap();
        writer.write_document_element("n").unwrap();
        let err = copy_bytes_to_writer(&mut writer, ElementType::Int32, &[1, 0, 0, 0, 9, 9, 9, 9])
            .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)), "{err:?}");
    }
}
