//! Extended JSON writer.
//!
//! Emits canonical or relaxed Extended JSON. Every value is followed by a
//! `,`; closing a container replaces a trailing `,` with the closing
//! delimiter, so no separator is ever left dangling.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::{
    check_depth, invalid_position, invalid_transition, Mode, ValueWriter, ARRAY_ONLY,
    DEFAULT_MAX_DEPTH, DOCUMENT_OR_SCOPE, ELEMENT_OR_VALUE,
};
use crate::error::{Action, Result};
use crate::value::{DateTime, Decimal128, ObjectId, Timestamp};

/// Options controlling Extended JSON output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtJsonOptions {
    /// When `true`, every non-JSON-native value carries a type wrapper.
    /// When `false` (default), native JSON is used where it is lossless.
    pub canonical: bool,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    mode: Mode,
    depth: usize,
}

/// Writes Extended JSON text into a `String`.
pub struct ExtJsonWriter {
    out: String,
    stack: Vec<Frame>,
    options: ExtJsonOptions,
    max_depth: usize,
    done: bool,
}

impl ExtJsonWriter {
    pub fn new(canonical: bool) -> Self {
        Self::with_options(ExtJsonOptions { canonical })
    }

    pub fn with_options(options: ExtJsonOptions) -> Self {
        Self {
            out: String::new(),
            stack: vec![Frame {
                mode: Mode::TopLevel,
                depth: 0,
            }],
            options,
            max_depth: DEFAULT_MAX_DEPTH,
            done: false,
        }
    }

    /// Writer for a single bare value of any type.
    pub fn new_value(canonical: bool) -> Self {
        let mut writer = Self::new(canonical);
        writer.stack.push(Frame {
            mode: Mode::Value,
            depth: 0,
        });
        writer
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn top(&self) -> Frame {
        self.stack[self.stack.len() - 1]
    }

    fn parent_mode(&self) -> Option<Mode> {
        self.stack.len().checked_sub(2).map(|i| self.stack[i].mode)
    }

    fn ensure_positioned(&self, name: &'static str) -> Result<()> {
        let mode = self.top().mode;
        if ELEMENT_OR_VALUE.contains(&mode) {
            return Ok(());
        }
        Err(invalid_position(
            Action::Write,
            name,
            mode,
            self.parent_mode(),
            ELEMENT_OR_VALUE,
        ))
    }

    /// Pops the element or value frame after its value is complete.
    fn end_value(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        match self.top().mode {
            Mode::TopLevel => self.done = true,
            _ => self.out.push(','),
        }
    }

    fn push_container(&mut self, mode: Mode) -> Result<()> {
        let depth = self.top().depth + 1;
        check_depth(depth, self.max_depth)?;
        self.stack.push(Frame { mode, depth });
        Ok(())
    }

    fn close_container(&mut self, close: &str) {
        if self.out.ends_with(',') {
            self.out.pop();
        }
        self.out.push_str(close);
        self.stack.pop();
        if ELEMENT_OR_VALUE.contains(&self.top().mode) {
            self.end_value();
        } else {
            self.done = true;
        }
    }

    fn write_raw(&mut self, name: &'static str, text: &str) -> Result<()> {
        self.ensure_positioned(name)?;
        self.out.push_str(text);
        self.end_value();
        Ok(())
    }

    fn write_wrapped(&mut self, name: &'static str, key: &str, body: &str) -> Result<()> {
        self.write_raw(name, &format!("{{\"{key}\":{body}}}"))
    }
}

impl ValueWriter for ExtJsonWriter {
    fn write_array(&mut self) -> Result<()> {
        let mode = self.top().mode;
        if !ELEMENT_OR_VALUE.contains(&mode) {
            return Err(invalid_transition(
                Action::Write,
                "write_array",
                mode,
                Mode::Array,
                self.parent_mode(),
            ));
        }
        self.push_container(Mode::Array)?;
        self.out.push('[');
        Ok(())
    }

    fn write_array_element(&mut self) -> Result<()> {
        let top = self.top();
        if top.mode != Mode::Array {
            return Err(invalid_position(
                Action::Write,
                "write_array_element",
                top.mode,
                self.parent_mode(),
                ARRAY_ONLY,
            ));
        }
        self.stack.push(Frame {
            mode: Mode::Value,
            depth: top.depth,
        });
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<()> {
        let mode = self.top().mode;
        if mode != Mode::Array {
            return Err(invalid_position(
                Action::Write,
                "write_array_end",
                mode,
                self.parent_mode(),
                ARRAY_ONLY,
            ));
        }
        self.close_container("]");
        Ok(())
    }

    fn write_document(&mut self) -> Result<()> {
        match self.top().mode {
            Mode::TopLevel if !self.done => {}
            Mode::Element | Mode::Value => {}
            mode => {
                return Err(invalid_transition(
                    Action::Write,
                    "write_document",
                    mode,
                    Mode::Document,
                    self.parent_mode(),
                ))
            }
        }
        self.push_container(Mode::Document)?;
        self.out.push('{');
        Ok(())
    }

    fn write_document_element(&mut self, key: &str) -> Result<()> {
        let top = self.top();
        if !DOCUMENT_OR_SCOPE.contains(&top.mode) {
            return Err(invalid_position(
                Action::Write,
                "write_document_element",
                top.mode,
                self.parent_mode(),
                DOCUMENT_OR_SCOPE,
            ));
        }
        self.out.push_str(&json_string(key));
        self.out.push(':');
        self.stack.push(Frame {
            mode: Mode::Element,
            depth: top.depth,
        });
        Ok(())
    }

    fn write_document_end(&mut self) -> Result<()> {
        match self.top().mode {
            Mode::Document => self.close_container("}"),
            Mode::CodeWithScope => self.close_container("}}"),
            mode => {
                return Err(invalid_position(
                    Action::Write,
                    "write_document_end",
                    mode,
                    self.parent_mode(),
                    DOCUMENT_OR_SCOPE,
                ))
            }
        }
        Ok(())
    }

    fn write_code_with_scope(&mut self, code: &str) -> Result<()> {
        self.ensure_positioned("write_code_with_scope")?;
        self.push_container(Mode::CodeWithScope)?;
        self.out.push_str("{\"$code\":");
        self.out.push_str(&json_string(code));
        self.out.push_str(",\"$scope\":{");
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        if self.options.canonical || !v.is_finite() || (v == 0.0 && v.is_sign_negative()) {
            let body = json_string(&format_double(v));
            return self.write_wrapped("write_double", "$numberDouble", &body);
        }
        self.write_raw("write_double", &format_double(v))
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        self.write_raw("write_string", &json_string(v))
    }

    fn write_binary(&mut self, subtype: u8, bytes: &[u8]) -> Result<()> {
        let body = format!(
            "{{\"base64\":\"{}\",\"subType\":\"{subtype:02x}\"}}",
            STANDARD.encode(bytes)
        );
        self.write_wrapped("write_binary", "$binary", &body)
    }

    fn write_undefined(&mut self) -> Result<()> {
        self.write_raw("write_undefined", "{\"$undefined\":true}")
    }

    fn write_object_id(&mut self, v: ObjectId) -> Result<()> {
        self.write_wrapped("write_object_id", "$oid", &format!("\"{}\"", v.to_hex()))
    }

    fn write_boolean(&mut self, v: bool) -> Result<()> {
        self.write_raw("write_boolean", if v { "true" } else { "false" })
    }

    fn write_date_time(&mut self, ms: i64) -> Result<()> {
        let dt = DateTime::from_millis(ms);
        let relaxed = (!self.options.canonical)
            .then(|| dt.year())
            .flatten()
            .filter(|year| (1970..=9999).contains(year))
            .and_then(|_| dt.try_to_rfc3339());
        let body = match relaxed {
            Some(iso) => json_string(&iso),
            None => format!("{{\"$numberLong\":\"{ms}\"}}"),
        };
        self.write_wrapped("write_date_time", "$date", &body)
    }

    fn write_null(&mut self) -> Result<()> {
        self.write_raw("write_null", "null")
    }

    fn write_regex(&mut self, pattern: &str, options: &str) -> Result<()> {
        let mut sorted: Vec<char> = options.chars().collect();
        sorted.sort_unstable();
        let options: String = sorted.into_iter().collect();
        let body = format!(
            "{{\"pattern\":{},\"options\":{}}}",
            json_string(pattern),
            json_string(&options)
        );
        self.write_wrapped("write_regex", "$regularExpression", &body)
    }

    fn write_db_pointer(&mut self, namespace: &str, id: ObjectId) -> Result<()> {
        let body = format!(
            "{{\"$ref\":{},\"$id\":{{\"$oid\":\"{}\"}}}}",
            json_string(namespace),
            id.to_hex()
        );
        self.write_wrapped("write_db_pointer", "$dbPointer", &body)
    }

    fn write_javascript(&mut self, code: &str) -> Result<()> {
        self.write_wrapped("write_javascript", "$code", &json_string(code))
    }

    fn write_symbol(&mut self, symbol: &str) -> Result<()> {
        self.write_wrapped("write_symbol", "$symbol", &json_string(symbol))
    }

    fn write_int32(&mut self, v: i32) -> Result<()> {
        if self.options.canonical {
            return self.write_wrapped("write_int32", "$numberInt", &format!("\"{v}\""));
        }
        self.write_raw("write_int32", &v.to_string())
    }

    fn write_timestamp(&mut self, v: Timestamp) -> Result<()> {
        let body = format!("{{\"t\":{},\"i\":{}}}", v.time, v.increment);
        self.write_wrapped("write_timestamp", "$timestamp", &body)
    }

    fn write_int64(&mut self, v: i64) -> Result<()> {
        if self.options.canonical {
            return self.write_wrapped("write_int64", "$numberLong", &format!("\"{v}\""));
        }
        self.write_raw("write_int64", &v.to_string())
    }

    fn write_decimal128(&mut self, v: Decimal128) -> Result<()> {
        self.write_wrapped("write_decimal128", "$numberDecimal", &format!("\"{v}\""))
    }

    fn write_min_key(&mut self) -> Result<()> {
        self.write_raw("write_min_key", "{\"$minKey\":1}")
    }

    fn write_max_key(&mut self) -> Result<()> {
        self.write_raw("write_max_key", "{\"$maxKey\":1}")
    }
}

// ----------------------------------------------------------------
// Utility functions

pub(crate) fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

fn format_double(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_owned()
    } else if v == f64::INFINITY {
        "Infinity".to_owned()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        exponent_form(format!("{v:?}"))
    }
}

/// Rewrites Rust's `1e300` / `1.5e-7` as `1.0E+300` / `1.5E-7`.
fn exponent_form(text: String) -> String {
    let Some((mantissa, exp)) = text.split_once('e') else {
        return text;
    };
    let point = if mantissa.contains('.') { "" } else { ".0" };
    let sign = if exp.starts_with('-') { "" } else { "+" };
    format!("{mantissa}{point}E{sign}{exp}")
}
