//! Extended JSON text handling.
//!
//! [`parser`] turns Extended JSON text into a [`Bson`](crate::Bson) tree,
//! recognising the `$`-prefixed type wrappers of both dialects;
//! [`indent_ext_json`] pretty-prints already-encoded text.

mod indent;
pub mod parser;

pub use indent::indent_ext_json;
pub use parser::{parse_document, parse_value, ExtJsonParser};
