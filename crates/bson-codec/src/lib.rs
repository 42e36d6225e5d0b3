//! Registry-driven BSON codec.
//!
//! Native values are converted to and from the BSON binary format and its
//! Extended JSON text form. Encoding walks a value through the [`Reflect`]
//! layer, asks the [`Registry`] for the codec of each runtime type, and
//! drives a [`ValueWriter`]; decoding is the mirror image over a
//! [`ValueReader`]. Readers and writers are explicit state machines over a
//! single frame stack, so every misplaced call is a [`TransitionError`]
//! rather than corrupt output.
//!
//! ```
//! use bson_codec::{reflect_struct, Marshaller};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! reflect_struct!(Point { x, y });
//!
//! let m = Marshaller::new();
//! let bytes = m.marshal(&Point { x: 1, y: 2 }).unwrap();
//! let mut back = Point::default();
//! m.unmarshal(&bytes, &mut back).unwrap();
//! assert_eq!(back, Point { x: 1, y: 2 });
//! ```

mod error;
mod marshal;
mod wire;

pub mod codec;
pub mod extjson;
pub mod reflect;
pub mod registry;
pub mod rw;
pub mod value;

pub use error::{Action, Error, Result, TransitionError};
pub use marshal::Marshaller;
pub use reflect::{Capability, Kind, Reflect, TypeInfo, Typed};
pub use registry::{Registry, RegistryBuilder};
pub use rw::{Mode, ValueReader, ValueWriter, DEFAULT_MAX_DEPTH};
pub use wire::{subtype, ElementType};
pub use value::{
    Array, Binary, Bson, CodeWithScope, DateTime, DbPointer, Decimal128, Document, JavaScript,
    MaxKey, MinKey, Null, ObjectId, Regex, Symbol, Timestamp, Undefined,
};

pub use bson_codec_buffers::{BufferPool, MAX_POOLED_BUFFERS, MAX_POOLED_CAPACITY};
pub use codec::{DecodeOptions, EncodeOptions};
