//! Low-level byte order and safe reading/writing utilities for the stream wire format.
//!
//! The wire format is little-endian throughout. This module provides the [`WireIO`] trait
//! implemented by every primitive that appears on the wire, bounds-checked readers that
//! advance an offset, and append-only writers that grow a `Vec<u8>`.
//!
//! # Key Components
//!
//! - [`WireIO`] - Conversion between primitives and their little-endian byte arrays
//! - [`read_le_at`] - Read a value at an offset and advance it
//! - [`write_le`] - Append a value to a buffer
//! - [`write_7bit_encoded_int`] / [`write_prefixed_string_utf8`] - Variable-length fields
//!
//! # Examples
//!
//! ```rust
//! use smproxy::stream::io::{read_le_at, write_le};
//!
//! let mut data = Vec::new();
//! write_le(&mut data, 1u16);
//! write_le(&mut data, 3u32);
//!
//! let mut offset = 0;
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! let second: u32 = read_le_at(&data, &mut offset)?;
//! assert_eq!((first, second, offset), (1, 3, 6));
//! # Ok::<(), smproxy::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for endian-aware conversion of the primitives carried by a stream.
///
/// Each implementation names the fixed-size byte array it converts from and to.
pub trait WireIO: Sized + Copy {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_wire_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl WireIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_wire_io!(
    u8 => 1,
    u16 => 2,
    u32 => 4,
    u64 => 8,
    i32 => 4,
    i64 => 8,
    f64 => 8,
);

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing it.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: WireIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let end = offset.checked_add(type_len).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Safely reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: WireIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Appends `value` in little-endian byte order.
pub fn write_le<T: WireIO>(data: &mut Vec<u8>, value: T) {
    data.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Appends `value` as a 7-bit encoded integer (low groups first, high bit = continuation).
pub fn write_7bit_encoded_int(data: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        data.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    data.push(value as u8);
}

/// Appends a UTF-8 string prefixed with its byte length as a 7-bit encoded integer.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if the string is longer than `u32::MAX` bytes.
pub fn write_prefixed_string_utf8(data: &mut Vec<u8>, value: &str) -> Result<()> {
    let Ok(length) = u32::try_from(value.len()) else {
        return Err(malformed_error!(
            "String of {} bytes exceeds the wire limit",
            value.len()
        ));
    };

    write_7bit_encoded_int(data, length);
    data.extend_from_slice(value.as_bytes());
    Ok(())
}
