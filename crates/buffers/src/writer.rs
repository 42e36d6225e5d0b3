//! Little-endian growable byte writer.

use crate::BufferError;

/// A binary buffer writer that grows automatically as needed.
///
/// All fixed-width values are written little-endian, matching the BSON wire
/// layout.
///
/// # Example
///
/// ```
/// use bson_codec_buffers::Writer;
///
/// let mut writer = Writer::new();
/// let at = writer.reserve_i32();
/// writer.u8(0x00);
/// writer.patch_length(at).unwrap();
/// assert_eq!(writer.flush(), [0x05, 0x00, 0x00, 0x00, 0x00]);
/// ```
#[derive(Debug, Default)]
pub struct Writer {
    /// The underlying byte buffer. Everything in it has been written.
    pub uint8: Vec<u8>,
}

impl Writer {
    /// Creates a new, empty writer.
    pub fn new() -> Self {
        Self { uint8: Vec::new() }
    }

    /// Creates a writer that appends into a recycled buffer.
    ///
    /// The buffer is cleared first; its capacity is kept.
    pub fn with_buffer(mut buf: Vec<u8>) -> Self {
        buf.clear();
        Self { uint8: buf }
    }

    /// Current write position (number of bytes written so far).
    #[inline]
    pub fn position(&self) -> usize {
        self.uint8.len()
    }

    /// Returns a copy of the written data and clears the writer.
    pub fn flush(&mut self) -> Vec<u8> {
        let result = self.uint8.clone();
        self.uint8.clear();
        result
    }

    /// Returns the underlying buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.uint8
    }

    /// Returns the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.uint8
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.uint8.push(val);
    }

    /// Writes a signed 32-bit integer (little-endian).
    #[inline]
    pub fn i32(&mut self, val: i32) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes an unsigned 32-bit integer (little-endian).
    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes a signed 64-bit integer (little-endian).
    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes a 64-bit floating point number (little-endian).
    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        self.uint8.extend_from_slice(buf);
    }

    /// Writes a UTF-8 string without terminator. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.uint8.extend_from_slice(s.as_bytes());
        s.len()
    }

    /// Writes a NUL-terminated C string.
    ///
    /// Keys and regex parts cannot contain NUL, so an interior NUL is an error
    /// rather than a silent truncation.
    pub fn cstring(&mut self, s: &str) -> Result<(), BufferError> {
        if s.as_bytes().contains(&0) {
            return Err(BufferError::InteriorNul(s.to_owned()));
        }
        self.uint8.extend_from_slice(s.as_bytes());
        self.uint8.push(0);
        Ok(())
    }

    /// Writes a length-prefixed string: i32 (byte count + 1), UTF-8 bytes, NUL.
    pub fn string(&mut self, s: &str) -> Result<(), BufferError> {
        let len = i32::try_from(s.len() + 1).map_err(|_| BufferError::LengthOverflow {
            offset: self.position(),
            length: s.len(),
        })?;
        self.i32(len);
        self.utf8(s);
        self.uint8.push(0);
        Ok(())
    }

    /// Reserves four bytes for a length prefix and returns their offset.
    pub fn reserve_i32(&mut self) -> usize {
        let at = self.uint8.len();
        self.uint8.extend_from_slice(&[0u8; 4]);
        at
    }

    /// Overwrites four bytes at `at` with `val`.
    pub fn patch_i32(&mut self, at: usize, val: i32) {
        self.uint8[at..at + 4].copy_from_slice(&val.to_le_bytes());
    }

    /// Back-patches the prefix reserved at `at` with the byte count from `at`
    /// to the current position (prefix included).
    pub fn patch_length(&mut self, at: usize) -> Result<(), BufferError> {
        let length = self.uint8.len() - at;
        let val = i32::try_from(length)
            .map_err(|_| BufferError::LengthOverflow { offset: at, length })?;
        self.patch_i32(at, val);
        Ok(())
    }

    /// Drops everything written after `position`.
    pub fn truncate(&mut self, position: usize) {
        self.uint8.truncate(position);
    }
}
