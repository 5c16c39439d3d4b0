//! Cursor-based reader for the stream wire format.
//!
//! [`Parser`] keeps a position inside a byte slice and offers bounds-checked reads of the
//! primitives and variable-length fields the wire format is built from. Every failed read
//! leaves the cursor where it was, so callers can report the exact offset of a damaged
//! record.
//!
//! # Examples
//!
//! ```rust
//! use smproxy::stream::parser::Parser;
//!
//! let data = [0x03, 0x00, 0x00, 0x00, 2, b'o', b'k'];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u32>()?, 3);
//! assert_eq!(parser.read_prefixed_string_utf8()?, "ok");
//! assert!(!parser.has_more_data());
//! # Ok::<(), smproxy::Error>(())
//! ```

use crate::{
    stream::io::{read_le_at, WireIO},
    Error::OutOfBounds,
    Result,
};

/// A cursor over wire bytes.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of bytes left after the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: WireIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a 7-bit encoded integer (low groups first, high bit = continuation).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends inside the integer, or
    /// [`crate::Error::Malformed`] if the value does not fit into a `u32`.
    pub fn read_7bit_encoded_int(&mut self) -> Result<u32> {
        let start = self.position;
        let mut value = 0u32;
        let mut shift = 0;

        loop {
            if self.position >= self.data.len() {
                self.position = start;
                return Err(OutOfBounds);
            }

            let byte = self.data[self.position];
            self.position += 1;

            value |= u32::from(byte & 0x7F) << shift;
            shift += 7;

            if (byte & 0x80) == 0 {
                break;
            }

            if shift >= 32 {
                self.position = start;
                return Err(malformed_error!(
                    "7-bit encoded integer at offset {} overflows u32",
                    start
                ));
            }
        }

        Ok(value)
    }

    /// Reads a slice of bytes of the specified length from the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `length` bytes would exceed the data.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.position.checked_add(length).ok_or(OutOfBounds)?;
        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a UTF-8 string prefixed with its byte length as a 7-bit encoded integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length or
    /// [`crate::Error::Malformed`] for invalid UTF-8 encoding.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let length = self.read_7bit_encoded_int()? as usize;

        let bytes = match self.read_bytes(length) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.position = start;
                return Err(err);
            }
        };

        String::from_utf8(bytes.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}: {}",
                start,
                e.utf8_error()
            )
        })
    }
}
