//! Binary wire encoding of [`Stream`]s.
//!
//! # Layout
//!
//! ```text
//! u32            magic "CSS1" (0x31535343)
//! u32            message count
//! per message:
//!   u8           command tag (see [`Command`])
//!   7bit         argument count
//!   per argument:
//!     u8         argument tag
//!     payload    bool: u8, int: i64, double: f64, string: 7bit length + UTF-8, id: u32
//! ```
//!
//! All fixed-size fields are little-endian.

use crate::{
    stream::{
        io::{write_7bit_encoded_int, write_le, write_prefixed_string_utf8},
        parser::Parser,
        Argument, Command, Message, Stream,
    },
    ObjectId, Result,
};

/// Magic number opening every encoded stream ("CSS1", little-endian)
pub const STREAM_MAGIC: u32 = 0x3153_5343;

const TAG_BOOL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_DOUBLE: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_ID: u8 = 4;

/// Encodes a stream into its wire form.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the stream has more than `u32::MAX` messages or
/// arguments, or a string longer than `u32::MAX` bytes.
pub fn encode(stream: &Stream) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(8 + stream.len() * 32);

    write_le(&mut data, STREAM_MAGIC);
    write_le(&mut data, wire_count(stream.len())?);

    for message in stream {
        write_le(&mut data, message.command as u8);
        write_7bit_encoded_int(&mut data, wire_count(message.arguments.len())?);

        for argument in &message.arguments {
            encode_argument(&mut data, argument)?;
        }
    }

    Ok(data)
}

/// Decodes a stream from its wire form.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the data ends early and
/// [`crate::Error::Malformed`] for a wrong magic, unknown tags or trailing bytes.
pub fn decode(data: &[u8]) -> Result<Stream> {
    let mut parser = Parser::new(data);

    let magic = parser.read_le::<u32>()?;
    if magic != STREAM_MAGIC {
        return Err(malformed_error!("Invalid stream magic 0x{:08x}", magic));
    }

    let message_count = parser.read_le::<u32>()?;
    let mut stream = Stream::new();

    for _ in 0..message_count {
        let offset = parser.pos();
        let tag = parser.read_le::<u8>()?;
        let Some(command) = Command::from_u8(tag) else {
            return Err(malformed_error!(
                "Unknown command tag {} at offset {}",
                tag,
                offset
            ));
        };

        let argument_count = parser.read_7bit_encoded_int()?;
        let mut arguments = Vec::new();
        for _ in 0..argument_count {
            arguments.push(decode_argument(&mut parser)?);
        }

        stream.push(Message::new(command, arguments));
    }

    if parser.has_more_data() {
        return Err(malformed_error!(
            "{} trailing bytes after the last message",
            parser.remaining()
        ));
    }

    Ok(stream)
}

fn wire_count(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| malformed_error!("Count {} exceeds the wire limit", count))
}

fn encode_argument(data: &mut Vec<u8>, argument: &Argument) -> Result<()> {
    match argument {
        Argument::Bool(value) => {
            write_le(data, TAG_BOOL);
            write_le(data, u8::from(*value));
        }
        Argument::Int(value) => {
            write_le(data, TAG_INT);
            write_le(data, *value);
        }
        Argument::Double(value) => {
            write_le(data, TAG_DOUBLE);
            write_le(data, *value);
        }
        Argument::String(value) => {
            write_le(data, TAG_STRING);
            write_prefixed_string_utf8(data, value)?;
        }
        Argument::Id(id) => {
            write_le(data, TAG_ID);
            write_le(data, id.value());
        }
    }

    Ok(())
}

fn decode_argument(parser: &mut Parser<'_>) -> Result<Argument> {
    let offset = parser.pos();
    let argument = match parser.read_le::<u8>()? {
        TAG_BOOL => match parser.read_le::<u8>()? {
            0 => Argument::Bool(false),
            1 => Argument::Bool(true),
            other => {
                return Err(malformed_error!(
                    "Invalid boolean value {} at offset {}",
                    other,
                    offset
                ))
            }
        },
        TAG_INT => Argument::Int(parser.read_le::<i64>()?),
        TAG_DOUBLE => Argument::Double(parser.read_le::<f64>()?),
        TAG_STRING => Argument::String(parser.read_prefixed_string_utf8()?),
        TAG_ID => Argument::Id(ObjectId::new(parser.read_le::<u32>()?)),
        tag => {
            return Err(malformed_error!(
                "Unknown argument tag {} at offset {}",
                tag,
                offset
            ))
        }
    };

    Ok(argument)
}
