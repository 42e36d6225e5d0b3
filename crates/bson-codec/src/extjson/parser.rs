//! Extended JSON parser.
//!
//! Parsing runs in two passes. The tokenizer reads plain JSON into an
//! order-preserving [`Json`] tree; the transform pass then recognises type
//! wrapper objects (`{"$oid": ...}`, `{"$numberLong": ...}`, ...) and builds
//! the [`Bson`] value. Wrapper payloads are inspected as raw JSON, so a
//! `$timestamp` may carry bare numbers even when bare numbers are otherwise
//! rejected.

use std::str;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{Error, Result};
use crate::rw::DEFAULT_MAX_DEPTH;
use crate::wire::subtype;
use crate::value::{
    Binary, Bson, CodeWithScope, DateTime, DbPointer, Decimal128, Document, ObjectId, Regex,
    Timestamp,
};

/// Plain JSON, with object keys kept in input order.
#[derive(Debug, Clone, PartialEq)]
pub enum Json {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Json>),
    Object(Vec<(String, Json)>),
}

/// Type wrappers nest at most this many objects below the value they
/// encode (`{"$date":{"$numberLong":..}}`, `{"$dbPointer":{"$id":{"$oid":..}}}`).
const WRAPPER_HEADROOM: usize = 2;

/// Raw JSON nesting allowed for `max_depth` containers. A `$code`/`$scope`
/// wrapper costs two objects for one container level.
fn raw_depth_limit(max_depth: usize) -> usize {
    max_depth.saturating_mul(2).saturating_add(WRAPPER_HEADROOM)
}

/// Parses a top-level Extended JSON document.
pub fn parse_document(text: &str, canonical_only: bool) -> Result<Document> {
    ExtJsonParser::new(canonical_only).parse_document(text)
}

/// Parses any single Extended JSON value.
pub fn parse_value(text: &str, canonical_only: bool) -> Result<Bson> {
    ExtJsonParser::new(canonical_only).parse(text)
}

fn expect_document(value: Bson) -> Result<Document> {
    match value {
        Bson::Document(doc) => Ok(doc),
        other => Err(Error::malformed(format!(
            "extended JSON top level must be an object, got {}",
            other.element_type()
        ))),
    }
}

// ----------------------------------------------------------------
// Parser state

/// Extended JSON parser.
///
/// With `canonical_only` set, bare JSON numbers and relaxed `$date` forms
/// are rejected.
pub struct ExtJsonParser<'a> {
    data: &'a [u8],
    x: usize,
    depth: usize,
    max_depth: usize,
    canonical_only: bool,
}

impl<'a> ExtJsonParser<'a> {
    pub fn new(canonical_only: bool) -> Self {
        Self {
            data: &[],
            x: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            canonical_only,
        }
    }

    /// Limits document and array nesting. Type wrapper objects do not count.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parse(&mut self, text: &'a str) -> Result<Bson> {
        let json = self.parse_json(text)?;
        self.transform(json, 0)
    }

    /// Parses text whose top level must be an object.
    pub fn parse_document(&mut self, text: &'a str) -> Result<Document> {
        self.parse(text).and_then(expect_document)
    }

    /// Reads plain JSON without recognising wrappers.
    pub fn parse_json(&mut self, text: &'a str) -> Result<Json> {
        self.data = text.as_bytes();
        self.x = 0;
        self.depth = 0;
        let value = self.read_any()?;
        self.skip_ws();
        if self.x != self.data.len() {
            return Err(self.invalid("trailing characters after JSON value"));
        }
        Ok(value)
    }

    fn invalid(&self, what: &str) -> Error {
        Error::malformed(format!("invalid JSON at offset {}: {what}", self.x))
    }

    // ----------------------------------------------------------------
    // Tokenizer

    fn read_any(&mut self) -> Result<Json> {
        self.skip_ws();
        match self.data.get(self.x) {
            Some(b'"') => Ok(Json::Str(self.read_string()?)),
            Some(b'[') => self.read_array(),
            Some(b'{') => self.read_object(),
            Some(b't') => self.read_literal("true", Json::Bool(true)),
            Some(b'f') => self.read_literal("false", Json::Bool(false)),
            Some(b'n') => self.read_literal("null", Json::Null),
            Some(c) if c.is_ascii_digit() || *c == b'-' => self.read_num(),
            Some(_) => Err(self.invalid("unexpected character")),
            None => Err(self.invalid("unexpected end of input")),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.data.get(self.x) {
            self.x += 1;
        }
    }

    fn read_literal(&mut self, literal: &str, value: Json) -> Result<Json> {
        if self.data[self.x..].starts_with(literal.as_bytes()) {
            self.x += literal.len();
            Ok(value)
        } else {
            Err(self.invalid("unknown literal"))
        }
    }

    fn read_num(&mut self) -> Result<Json> {
        let start = self.x;
        let digits = |data: &[u8], mut x: usize| {
            while data.get(x).is_some_and(u8::is_ascii_digit) {
                x += 1;
            }
            x
        };
        let mut x = self.x;
        if self.data.get(x) == Some(&b'-') {
            x += 1;
        }
        x = digits(self.data, x);
        let mut is_float = false;
        if self.data.get(x) == Some(&b'.') {
            is_float = true;
            x = digits(self.data, x + 1);
        }
        if let Some(b'e' | b'E') = self.data.get(x) {
            is_float = true;
            x += 1;
            if let Some(b'+' | b'-') = self.data.get(x) {
                x += 1;
            }
            x = digits(self.data, x);
        }
        self.x = x;
        let s = str::from_utf8(&self.data[start..x]).map_err(|_| self.invalid("bad number"))?;
        if !is_float {
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Json::Int(i));
            }
        }
        s.parse::<f64>().map(Json::Float).map_err(|_| {
            Error::malformed(format!("invalid JSON number {s:?} at offset {start}"))
        })
    }

    fn read_string(&mut self) -> Result<String> {
        self.x += 1;
        let start = self.x;
        let mut i = start;
        let mut escaped = false;
        loop {
            match self.data.get(i) {
                Some(b'\\') => {
                    escaped = true;
                    i += 2;
                }
                Some(b'"') => break,
                Some(_) => i += 1,
                None => {
                    self.x = start;
                    return Err(self.invalid("unterminated string"));
                }
            }
        }
        let body = &self.data[start..i];
        self.x = i + 1;
        if !escaped {
            return str::from_utf8(body)
                .map(str::to_owned)
                .map_err(|_| Error::malformed(format!("invalid UTF-8 in string at offset {start}")));
        }
        // Escapes are resolved by serde_json on the quoted slice.
        let quoted = &self.data[start - 1..i + 1];
        serde_json::from_slice(quoted)
            .map_err(|e| Error::malformed(format!("invalid string at offset {start}: {e}")))
    }

    /// Bounds raw JSON nesting; the exact container limit is applied by
    /// [`Self::nest`] once wrappers are recognised.
    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > raw_depth_limit(self.max_depth) {
            return Err(Error::MaxDepthExceeded {
                max: self.max_depth,
            });
        }
        Ok(())
    }

    /// Depth of a document or array opened inside a container at `depth`.
    fn nest(&self, depth: usize) -> Result<usize> {
        let depth = depth + 1;
        if depth > self.max_depth {
            return Err(Error::MaxDepthExceeded {
                max: self.max_depth,
            });
        }
        Ok(depth)
    }

    fn read_array(&mut self) -> Result<Json> {
        self.enter()?;
        self.x += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.data.get(self.x) {
                Some(b']') => {
                    self.x += 1;
                    break;
                }
                Some(b',') if !items.is_empty() => self.x += 1,
                Some(_) if items.is_empty() => {}
                _ => return Err(self.invalid("expected ',' or ']'")),
            }
            items.push(self.read_any()?);
        }
        self.depth -= 1;
        Ok(Json::Array(items))
    }

    fn read_object(&mut self) -> Result<Json> {
        self.enter()?;
        self.x += 1;
        let mut pairs = Vec::new();
        loop {
            self.skip_ws();
            match self.data.get(self.x) {
                Some(b'}') => {
                    self.x += 1;
                    break;
                }
                Some(b',') if !pairs.is_empty() => {
                    self.x += 1;
                    self.skip_ws();
                }
                Some(_) if pairs.is_empty() => {}
                _ => return Err(self.invalid("expected ',' or '}'")),
            }
            if self.data.get(self.x) != Some(&b'"') {
                return Err(self.invalid("expected object key"));
            }
            let key = self.read_string()?;
            self.skip_ws();
            if self.data.get(self.x) != Some(&b':') {
                return Err(self.invalid("expected ':'"));
            }
            self.x += 1;
            let value = self.read_any()?;
            pairs.push((key, value));
        }
        self.depth -= 1;
        Ok(Json::Object(pairs))
    }

    // ----------------------------------------------------------------
    // Wrapper transformation

    fn transform(&self, json: Json, depth: usize) -> Result<Bson> {
        match json {
            Json::Null => Ok(Bson::Null),
            Json::Bool(b) => Ok(Bson::Boolean(b)),
            Json::Str(s) => Ok(Bson::String(s)),
            Json::Int(i) => {
                self.check_bare_number(&i.to_string())?;
                Ok(match i32::try_from(i) {
                    Ok(v) => Bson::Int32(v),
                    Err(_) => Bson::Int64(i),
                })
            }
            Json::Float(f) => {
                self.check_bare_number(&f.to_string())?;
                Ok(Bson::Double(f))
            }
            Json::Array(items) => {
                let depth = self.nest(depth)?;
                items
                    .into_iter()
                    .map(|item| self.transform(item, depth))
                    .collect::<Result<Vec<_>>>()
                    .map(Bson::Array)
            }
            Json::Object(pairs) => self.transform_object(pairs, depth),
        }
    }

    fn check_bare_number(&self, n: &str) -> Result<()> {
        if self.canonical_only {
            return Err(Error::malformed(format!(
                "bare number {n} is not canonical extended JSON"
            )));
        }
        Ok(())
    }

    fn transform_document(&self, pairs: Vec<(String, Json)>, depth: usize) -> Result<Document> {
        let depth = self.nest(depth)?;
        let mut doc = Document::with_capacity(pairs.len());
        for (key, value) in pairs {
            let value = self.transform(value, depth)?;
            doc.push(key, value);
        }
        Ok(doc)
    }

    fn transform_object(&self, pairs: Vec<(String, Json)>, depth: usize) -> Result<Bson> {
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        let wrapper = match keys.first() {
            Some(k) if k.starts_with('$') => *k,
            _ => return self.transform_document(pairs, depth).map(Bson::Document),
        };
        let has_exact = |expected: &[&str]| {
            keys.len() == expected.len() && expected.iter().all(|k| keys.contains(k))
        };
        let get = |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v);

        let value = match wrapper {
            "$oid" => {
                exact(has_exact(&["$oid"]), "ObjectId")?;
                Bson::ObjectId(ObjectId::parse_str(str_field(get("$oid"), "$oid")?)?)
            }
            "$symbol" => {
                exact(has_exact(&["$symbol"]), "Symbol")?;
                Bson::Symbol(str_field(get("$symbol"), "$symbol")?.to_owned())
            }
            "$numberInt" => {
                exact(has_exact(&["$numberInt"]), "Int32")?;
                let s = str_field(get("$numberInt"), "$numberInt")?;
                Bson::Int32(s.parse().map_err(|_| bad("$numberInt", s))?)
            }
            "$numberLong" => {
                exact(has_exact(&["$numberLong"]), "Int64")?;
                let s = str_field(get("$numberLong"), "$numberLong")?;
                Bson::Int64(s.parse().map_err(|_| bad("$numberLong", s))?)
            }
            "$numberDouble" => {
                exact(has_exact(&["$numberDouble"]), "Double")?;
                let s = str_field(get("$numberDouble"), "$numberDouble")?;
                Bson::Double(parse_double(s)?)
            }
            "$numberDecimal" => {
                exact(has_exact(&["$numberDecimal"]), "Decimal128")?;
                let s = str_field(get("$numberDecimal"), "$numberDecimal")?;
                Bson::Decimal128(s.parse::<Decimal128>()?)
            }
            "$binary" if has_exact(&["$binary", "$type"]) && !self.canonical_only => {
                // Legacy form: {"$binary": "<base64>", "$type": "<hex>"}
                let data = str_field(get("$binary"), "$binary")?;
                let st = str_field(get("$type"), "$type")?;
                Bson::Binary(Binary::new(parse_subtype(st)?, decode_base64(data)?))
            }
            "$binary" => {
                exact(has_exact(&["$binary"]), "Binary")?;
                let inner = object_field(get("$binary"), "$binary", &["base64", "subType"])?;
                let data = str_field(field(inner, "base64"), "base64")?;
                let st = str_field(field(inner, "subType"), "subType")?;
                Bson::Binary(Binary::new(parse_subtype(st)?, decode_base64(data)?))
            }
            "$uuid" => {
                exact(has_exact(&["$uuid"]), "UUID")?;
                let s = str_field(get("$uuid"), "$uuid")?;
                Bson::Binary(Binary::new(subtype::UUID, parse_uuid(s)?))
            }
            "$code" if has_exact(&["$code", "$scope"]) => {
                let code = str_field(get("$code"), "$code")?.to_owned();
                let scope = match get("$scope") {
                    Some(Json::Object(pairs)) => self.transform_document(pairs.clone(), depth)?,
                    _ => return Err(bad("$scope", "non-object")),
                };
                Bson::JavaScriptCodeWithScope(CodeWithScope { code, scope })
            }
            "$code" => {
                exact(has_exact(&["$code"]), "Code")?;
                Bson::JavaScriptCode(str_field(get("$code"), "$code")?.to_owned())
            }
            "$timestamp" => {
                exact(has_exact(&["$timestamp"]), "Timestamp")?;
                let inner = object_field(get("$timestamp"), "$timestamp", &["t", "i"])?;
                Bson::Timestamp(Timestamp {
                    time: u32_field(field(inner, "t"), "t")?,
                    increment: u32_field(field(inner, "i"), "i")?,
                })
            }
            "$regularExpression" => {
                exact(has_exact(&["$regularExpression"]), "RegularExpression")?;
                let inner = object_field(
                    get("$regularExpression"),
                    "$regularExpression",
                    &["pattern", "options"],
                )?;
                let pattern = str_field(field(inner, "pattern"), "pattern")?;
                let options = str_field(field(inner, "options"), "options")?;
                Bson::RegularExpression(Regex::new(pattern, options))
            }
            "$regex"
                if has_exact(&["$regex", "$options"])
                    && !self.canonical_only
                    && matches!(get("$regex"), Some(Json::Str(_)))
                    && matches!(get("$options"), Some(Json::Str(_))) =>
            {
                let pattern = str_field(get("$regex"), "$regex")?;
                let options = str_field(get("$options"), "$options")?;
                Bson::RegularExpression(Regex::new(pattern, options))
            }
            "$dbPointer" => {
                exact(has_exact(&["$dbPointer"]), "DBPointer")?;
                let inner = object_field(get("$dbPointer"), "$dbPointer", &["$ref", "$id"])?;
                let namespace = str_field(field(inner, "$ref"), "$ref")?.to_owned();
                let id = match field(inner, "$id").cloned().map(|v| self.transform(v, depth)) {
                    Some(Ok(Bson::ObjectId(id))) => id,
                    Some(Err(e)) => return Err(e),
                    _ => return Err(bad("$dbPointer", "$id is not an ObjectId")),
                };
                Bson::DbPointer(DbPointer { namespace, id })
            }
            "$date" => {
                exact(has_exact(&["$date"]), "Date")?;
                Bson::DateTime(self.parse_date(get("$date"))?)
            }
            "$minKey" => {
                exact(has_exact(&["$minKey"]), "MinKey")?;
                one_field(get("$minKey"), "$minKey")?;
                Bson::MinKey
            }
            "$maxKey" => {
                exact(has_exact(&["$maxKey"]), "MaxKey")?;
                one_field(get("$maxKey"), "$maxKey")?;
                Bson::MaxKey
            }
            "$undefined" => {
                exact(has_exact(&["$undefined"]), "Undefined")?;
                if get("$undefined") != Some(&Json::Bool(true)) {
                    return Err(bad("$undefined", "value other than true"));
                }
                Bson::Undefined
            }
            // Not a type wrapper, e.g. a DBRef or a query operator.
            _ => return self.transform_document(pairs, depth).map(Bson::Document),
        };
        Ok(value)
    }

    fn parse_date(&self, value: Option<&Json>) -> Result<DateTime> {
        match value {
            Some(Json::Object(inner)) if inner.len() == 1 && inner[0].0 == "$numberLong" => {
                let s = str_field(Some(&inner[0].1), "$numberLong")?;
                Ok(DateTime::from_millis(
                    s.parse().map_err(|_| bad("$date", s))?,
                ))
            }
            Some(Json::Str(s)) if !self.canonical_only => DateTime::parse_rfc3339(s),
            Some(Json::Int(ms)) if !self.canonical_only => Ok(DateTime::from_millis(*ms)),
            Some(_) if self.canonical_only => Err(Error::malformed(
                "relaxed $date is not canonical extended JSON",
            )),
            _ => Err(bad("$date", "unsupported representation")),
        }
    }
}

// ----------------------------------------------------------------
// Utility functions

fn bad(wrapper: &str, detail: &str) -> Error {
    Error::malformed(format!("invalid {wrapper} value: {detail}"))
}

fn exact(ok: bool, kind: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::malformed(format!(
            "extra keys in extended JSON {kind} wrapper"
        )))
    }
}

fn field<'j>(pairs: &'j [(String, Json)], key: &str) -> Option<&'j Json> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn str_field<'j>(value: Option<&'j Json>, name: &str) -> Result<&'j str> {
    match value {
        Some(Json::Str(s)) => Ok(s),
        _ => Err(bad(name, "expected a string")),
    }
}

fn u32_field(value: Option<&Json>, name: &str) -> Result<u32> {
    match value {
        Some(Json::Int(i)) => u32::try_from(*i).map_err(|_| bad(name, "out of range")),
        _ => Err(bad(name, "expected an unsigned integer")),
    }
}

fn one_field(value: Option<&Json>, name: &str) -> Result<()> {
    match value {
        Some(Json::Int(1)) => Ok(()),
        _ => Err(bad(name, "expected 1")),
    }
}

fn object_field<'j>(
    value: Option<&'j Json>,
    name: &str,
    keys: &[&str],
) -> Result<&'j [(String, Json)]> {
    match value {
        Some(Json::Object(pairs))
            if pairs.len() == keys.len()
                && keys.iter().all(|k| pairs.iter().any(|(pk, _)| pk == k)) =>
        {
            Ok(pairs)
        }
        _ => Err(bad(name, &format!("expected an object with keys {keys:?}"))),
    }
}

fn parse_double(s: &str) -> Result<f64> {
    match s {
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        other => match other.parse::<f64>() {
            Ok(v) if !v.is_nan() && !v.is_infinite() => Ok(v),
            _ => Err(bad("$numberDouble", other)),
        },
    }
}

fn parse_subtype(s: &str) -> Result<u8> {
    if s.is_empty() || s.len() > 2 {
        return Err(bad("subType", s));
    }
    u8::from_str_radix(s, 16).map_err(|_| bad("subType", s))
}

fn decode_base64(s: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| Error::malformed(format!("invalid base64 payload: {e}")))
}

fn parse_uuid(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let dashes_ok = bytes.len() == 36 && [8, 13, 18, 23].iter().all(|&i| bytes[i] == b'-');
    if !dashes_ok {
        return Err(bad("$uuid", s));
    }
    let compact: String = s.chars().filter(|&c| c != '-').collect();
    hex::decode(compact).map_err(|_| bad("$uuid", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_keeps_key_order() {
        let doc = parse_document(r#"{"b": 1, "a": [true, null, "x"], "c": 1.5}"#, false).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), ["b", "a", "c"]);
        assert_eq!(doc.get("b"), Some(&Bson::Int32(1)));
        assert_eq!(doc.get("c"), Some(&Bson::Double(1.5)));
        assert_eq!(
            doc.get("a"),
            Some(&Bson::Array(vec![
                Bson::Boolean(true),
                Bson::Null,
                Bson::String("x".into())
            ]))
        );
    }

    #[test]
    fn large_integers_widen() {
        assert_eq!(parse_value("3000000000", false).unwrap(), Bson::Int64(3_000_000_000));
        assert_eq!(parse_value("-1", false).unwrap(), Bson::Int32(-1));
    }

    #[test]
    fn canonical_wrappers() {
        let v = parse_value(
            r#"{"$numberLong":"9007199254740993"}"#,
            true,
        )
        .unwrap();
        assert_eq!(v, Bson::Int64(9_007_199_254_740_993));
        let v = parse_value(r#"{"$timestamp":{"t":1,"i":2}}"#, true).unwrap();
        assert_eq!(v, Bson::Timestamp(Timestamp { time: 1, increment: 2 }));
        let v = parse_value(r#"{"$date":{"$numberLong":"-5"}}"#, true).unwrap();
        assert_eq!(v, Bson::DateTime(DateTime::from_millis(-5)));
        let v = parse_value(r#"{"$numberDouble":"-Infinity"}"#, true).unwrap();
        assert_eq!(v, Bson::Double(f64::NEG_INFINITY));
    }

    #[test]
    fn canonical_only_rejects_relaxed_forms() {
        assert!(parse_value("1", true).is_err());
        assert!(parse_value(r#"{"$date":"2020-01-01T00:00:00Z"}"#, true).is_err());
        assert!(parse_value(r#"{"$date":"2020-01-01T00:00:00Z"}"#, false).is_ok());
    }

    #[test]
    fn binary_and_uuid() {
        let v = parse_value(r#"{"$binary":{"base64":"aGk=","subType":"80"}}"#, true).unwrap();
        assert_eq!(v, Bson::Binary(Binary::new(0x80, b"hi".to_vec())));
        let v = parse_value(r#"{"$uuid":"00112233-4455-6677-8899-aabbccddeeff"}"#, true).unwrap();
        match v {
            Bson::Binary(b) => {
                assert_eq!(b.subtype, subtype::UUID);
                assert_eq!(b.bytes.len(), 16);
                assert_eq!(b.bytes[15], 0xff);
            }
            other => panic!("unexpected {other:?}"),
        }
        let legacy = parse_value(r#"{"$binary":"aGk=","$type":"00"}"#, false).unwrap();
        assert_eq!(legacy, Bson::Binary(Binary::new(0, b"hi".to_vec())));
    }

    #[test]
    fn extra_keys_are_rejected() {
        assert!(parse_value(r#"{"$oid":"5f1a2b3c4d5e6f7a8b9c0d1e","x":1}"#, false).is_err());
    }

    #[test]
    fn unknown_dollar_keys_stay_documents() {
        let v = parse_value(r#"{"$ref":"coll","$id":{"$oid":"5f1a2b3c4d5e6f7a8b9c0d1e"}}"#, false)
            .unwrap();
        let doc = v.as_document().unwrap();
        assert!(matches!(doc.get("$id"), Some(Bson::ObjectId(_))));
    }

    #[test]
    fn code_with_scope() {
        let v = parse_value(r#"{"$code":"f()","$scope":{"x":{"$numberInt":"1"}}}"#, true).unwrap();
        match v {
            Bson::JavaScriptCodeWithScope(cws) => {
                assert_eq!(cws.code, "f()");
                assert_eq!(cws.scope.get("x"), Some(&Bson::Int32(1)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn escapes() {
        let v = parse_value(r#""a\"bé""#, false).unwrap();
        assert_eq!(v, Bson::String("a\"bé".into()));
    }

    #[test]
    fn malformed_json() {
        for text in ["{", "[1,]", "{\"a\" 1}", "tru", "{} x", "\"abc", "[1 2]"] {
            assert!(parse_value(text, false).is_err(), "{text}");
        }
    }

    fn nested_text(levels: usize, leaf: &str) -> String {
        let mut text = leaf.to_owned();
        for _ in 0..levels {
            text = format!(r#"{{"a":{text}}}"#);
        }
        text
    }

    #[test]
    fn wrappers_do_not_count_toward_depth() {
        let int4 = nested_text(4, r#"{"$numberInt":"1"}"#);
        let date4 = nested_text(4, r#"{"$date":{"$numberLong":"1"}}"#);
        let int5 = nested_text(5, r#"{"$numberInt":"1"}"#);
        let mut parser = ExtJsonParser::new(true).with_max_depth(4);
        assert!(parser.parse_document(&int4).is_ok());
        assert!(parser.parse_document(&date4).is_ok());
        assert_eq!(
            parser.parse_document(&int5).unwrap_err(),
            Error::MaxDepthExceeded { max: 4 }
        );
    }

    #[test]
    fn scope_documents_count_once() {
        let inner = nested_text(1, r#"{"$code":"f","$scope":{"x":{"$date":{"$numberLong":"1"}}}}"#);
        let mut parser = ExtJsonParser::new(true).with_max_depth(2);
        assert!(parser.parse_document(&inner).is_ok());
        let mut parser = ExtJsonParser::new(true).with_max_depth(1);
        assert_eq!(
            parser.parse_document(&inner).unwrap_err(),
            Error::MaxDepthExceeded { max: 1 }
        );
    }

    #[test]
    fn depth_guard() {
        let text = "[".repeat(10) + &"]".repeat(10);
        let mut parser = ExtJsonParser::new(false).with_max_depth(5);
        assert_eq!(
            parser.parse(&text).unwrap_err(),
            Error::MaxDepthExceeded { max: 5 }
        );
    }
}
