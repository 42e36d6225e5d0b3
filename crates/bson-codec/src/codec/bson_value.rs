//! Codecs for the dynamic value model, and the walkers they share.

use super::primitive::wrong_native;
use super::{DecodeContext, EncodeContext, FixedType, ValueDecoder, ValueEncoder};
use crate::error::{Error, Result};
use crate::reflect::Reflect;
use crate::rw::{BinaryReader, BinaryWriter, ValueReader, ValueWriter};
use crate::wire::ElementType;
use crate::value::{Bson, CodeWithScope, DateTime, Document};

/// Writes `value` at the position `vw` is on.
pub fn write_bson(vw: &mut dyn ValueWriter, value: &Bson) -> Result<()> {
    match value {
        Bson::Double(v) => vw.write_double(*v),
        Bson::String(s) => vw.write_string(s),
        Bson::Document(doc) => write_document(vw, doc),
        Bson::Array(items) => {
            vw.write_array()?;
            for item in items {
                vw.write_array_element()?;
                write_bson(vw, item)?;
            }
            vw.write_array_end()
        }
        Bson::Binary(b) => vw.write_binary(b.subtype, &b.bytes),
        Bson::Undefined => vw.write_undefined(),
        Bson::ObjectId(id) => vw.write_object_id(*id),
        Bson::Boolean(b) => vw.write_boolean(*b),
        Bson::DateTime(dt) => vw.write_date_time(dt.timestamp_millis()),
        Bson::Null => vw.write_null(),
        Bson::RegularExpression(re) => vw.write_regex(&re.pattern, &re.options),
        Bson::DbPointer(p) => vw.write_db_pointer(&p.namespace, p.id),
        Bson::JavaScriptCode(code) => vw.write_javascript(code),
        Bson::Symbol(s) => vw.write_symbol(s),
        Bson::JavaScriptCodeWithScope(cws) => cws.write(vw),
        Bson::Int32(v) => vw.write_int32(*v),
        Bson::Timestamp(ts) => vw.write_timestamp(*ts),
        Bson::Int64(v) => vw.write_int64(*v),
        Bson::Decimal128(d) => vw.write_decimal128(*d),
        Bson::MinKey => vw.write_min_key(),
        Bson::MaxKey => vw.write_max_key(),
    }
}

pub(crate) fn write_document(vw: &mut dyn ValueWriter, doc: &Document) -> Result<()> {
    vw.write_document()?;
    for (key, value) in doc.iter() {
        vw.write_document_element(key)?;
        write_bson(vw, value)?;
    }
    vw.write_document_end()
}

/// Materializes the value under the cursor.
pub fn read_bson(vr: &mut dyn ValueReader) -> Result<Bson> {
    Ok(match vr.element_type() {
        ElementType::Double => Bson::Double(vr.read_double()?),
        ElementType::String => Bson::String(vr.read_string()?),
        ElementType::EmbeddedDocument => Bson::Document(read_document(vr)?),
        ElementType::Array => {
            vr.read_array()?;
            let mut items = Vec::new();
            while vr.read_value()?.is_some() {
                let index = items.len();
                items.push(read_bson(vr).map_err(|e| e.at_key(&index.to_string()))?);
            }
            Bson::Array(items)
        }
        ElementType::Binary => Bson::Binary(vr.read_binary()?),
        ElementType::Undefined => {
            vr.read_undefined()?;
            Bson::Undefined
        }
        ElementType::ObjectId => Bson::ObjectId(vr.read_object_id()?),
        ElementType::Boolean => Bson::Boolean(vr.read_boolean()?),
        ElementType::DateTime => Bson::DateTime(DateTime::from_millis(vr.read_date_time()?)),
        ElementType::Null => {
            vr.read_null()?;
            Bson::Null
        }
        ElementType::RegularExpression => Bson::RegularExpression(vr.read_regex()?),
        ElementType::DbPointer => Bson::DbPointer(vr.read_db_pointer()?),
        ElementType::JavaScriptCode => Bson::JavaScriptCode(vr.read_javascript()?),
        ElementType::Symbol => Bson::Symbol(vr.read_symbol()?),
        ElementType::JavaScriptCodeWithScope => {
            Bson::JavaScriptCodeWithScope(CodeWithScope::read(vr)?)
        }
        ElementType::Int32 => Bson::Int32(vr.read_int32()?),
        ElementType::Timestamp => Bson::Timestamp(vr.read_timestamp()?),
        ElementType::Int64 => Bson::Int64(vr.read_int64()?),
        ElementType::Decimal128 => Bson::Decimal128(vr.read_decimal128()?),
        ElementType::MinKey => {
            vr.read_min_key()?;
            Bson::MinKey
        }
        ElementType::MaxKey => {
            vr.read_max_key()?;
            Bson::MaxKey
        }
    })
}

pub(crate) fn read_document(vr: &mut dyn ValueReader) -> Result<Document> {
    vr.read_document()?;
    let mut doc = Document::new();
    while let Some((key, _)) = vr.read_element()? {
        let value = read_bson(vr).map_err(|e| e.at_key(&key))?;
        doc.push(key, value);
    }
    Ok(doc)
}

impl Document {
    /// Serializes the document to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        write_document(&mut writer, self)?;
        Ok(writer.into_bytes())
    }

    /// Parses one binary document. Bytes after it are malformed input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Document> {
        read_document(&mut BinaryReader::new(bytes))
    }
}

/// [`Bson`], any wire type.
#[derive(Debug, Default, Clone, Copy)]
pub struct BsonCodec;

impl ValueEncoder for BsonCodec {
    fn encode_value(
        &self,
        _ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.downcast_ref::<Bson>() {
            Some(v) => write_bson(vw, v),
            None => Err(wrong_native("BsonCodec", "Bson", value.type_name())),
        }
    }
}

impl ValueDecoder for BsonCodec {
    fn decode_value(
        &self,
        _ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let Some(slot) = target.downcast_mut::<Bson>() else {
            return Err(wrong_native("BsonCodec", "Bson", type_name));
        };
        *slot = read_bson(vr)?;
        Ok(())
    }
}

/// [`Document`], preserving key order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentCodec;

impl ValueEncoder for DocumentCodec {
    fn encode_value(
        &self,
        _ctx: &EncodeContext<'_>,
        vw: &mut dyn ValueWriter,
        value: &dyn Reflect,
    ) -> Result<()> {
        match value.downcast_ref::<Document>() {
            Some(doc) => write_document(vw, doc),
            None => Err(wrong_native("DocumentCodec", "Document", value.type_name())),
        }
    }
}

impl ValueDecoder for DocumentCodec {
    fn decode_value(
        &self,
        _ctx: &DecodeContext<'_>,
        vr: &mut dyn ValueReader,
        target: &mut dyn Reflect,
    ) -> Result<()> {
        let type_name = target.type_name();
        let Some(slot) = target.downcast_mut::<Document>() else {
            return Err(wrong_native("DocumentCodec", "Document", type_name));
        };
        match vr.element_type() {
            ElementType::EmbeddedDocument => *slot = read_document(vr)?,
            ElementType::Null => {
                vr.read_null()?;
                slot.clear();
            }
            actual => {
                return Err(Error::WrongWireType {
                    codec: "DocumentCodec",
                    expected: ElementType::EmbeddedDocument.to_string(),
                    actual,
                })
            }
        }
        Ok(())
    }
}
