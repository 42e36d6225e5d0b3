//! Byte buffers for the BSON binary format.
//!
//! BSON stores every multi-byte integer and float in little-endian order,
//! and every document carries a 4-byte length prefix that is only known once
//! the document body has been written. [`Writer`] supports reserving that
//! prefix and back-patching it later; [`Reader`] is a bounds-checked cursor
//! that never panics on truncated input. [`BufferPool`] recycles output
//! buffers between encode calls.

mod error;
mod pool;
mod reader;
mod writer;

pub use error::BufferError;
pub use pool::{BufferPool, MAX_POOLED_BUFFERS, MAX_POOLED_CAPACITY};
pub use reader::Reader;
pub use writer::Writer;
