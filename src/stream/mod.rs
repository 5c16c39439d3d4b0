//! Client/server message streams.
//!
//! A [`Stream`] is an ordered list of [`Message`]s that is sent to the server in one
//! round-trip. Messages execute on the server in the order they were appended, so a
//! proxy can batch every pending change into one stream and flush it at once.
//!
//! # Message Layout
//!
//! Every message is a [`Command`] followed by a list of [`Argument`]s:
//!
//! | Command  | Arguments                                   |
//! |----------|---------------------------------------------|
//! | `New`    | class name, new object id                   |
//! | `Invoke` | target object id, method name, call args... |
//! | `Delete` | object id                                   |
//! | `Reply`  | result values of the last invoke            |
//! | `Error`  | error text                                  |
//!
//! # Key Components
//!
//! - [`Stream`] / [`Message`] / [`Command`] / [`Argument`] - In-memory representation
//! - [`ServerRole`] / [`Destination`] - Addressing
//! - [`codec`] - Binary wire encoding built on [`io`] and [`parser`]
//!
//! # Examples
//!
//! ```rust
//! use smproxy::{stream::{Argument, Stream}, ObjectId};
//!
//! let sphere = ObjectId::new(3);
//! let mut stream = Stream::new();
//! stream.new_object("vtkSphereSource", sphere);
//! stream.invoke(sphere, "SetRadius", [Argument::from(1.5)]);
//!
//! let bytes = stream.encode()?;
//! assert_eq!(Stream::decode(&bytes)?, stream);
//! # Ok::<(), smproxy::Error>(())
//! ```

pub mod codec;
pub mod io;
pub mod parser;
mod roles;

pub use roles::{Destination, ServerRole};

use std::fmt;

use strum::{EnumCount, EnumIter};

use crate::{ObjectId, Result};

/// Kind of a stream message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, strum::Display)]
#[repr(u8)]
pub enum Command {
    /// Instantiate a server-side object of a class under a given id
    New = 1,
    /// Call a method on a server-side object
    Invoke = 2,
    /// Release a server-side object
    Delete = 3,
    /// Result values of the last executed invoke
    Reply = 4,
    /// The server failed to execute a message
    Error = 5,
}

impl Command {
    /// Converts a wire tag back into a command.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Command::New),
            2 => Some(Command::Invoke),
            3 => Some(Command::Delete),
            4 => Some(Command::Reply),
            5 => Some(Command::Error),
            _ => None,
        }
    }
}

/// One value carried by a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point value
    Double(f64),
    /// UTF-8 text (method and class names, string values)
    String(String),
    /// Reference to a server-side object
    Id(ObjectId),
}

impl Argument {
    /// Integer view; booleans map to 0/1.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Argument::Int(value) => Some(*value),
            Argument::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    /// Floating point view; integers are widened.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Argument::Double(value) => Some(*value),
            Argument::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Text view.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::String(value) => Some(value),
            _ => None,
        }
    }

    /// Object id view.
    #[must_use]
    pub fn as_id(&self) -> Option<ObjectId> {
        match self {
            Argument::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Boolean view; integers are true when non-zero.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Bool(value) => Some(*value),
            Argument::Int(value) => Some(*value != 0),
            _ => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Bool(value) => write!(f, "{value}"),
            Argument::Int(value) => write!(f, "{value}"),
            Argument::Double(value) => write!(f, "{value}"),
            Argument::String(value) => write!(f, "{value:?}"),
            Argument::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Argument::Bool(value)
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Argument::Int(i64::from(value))
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Argument::Int(value)
    }
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Argument::Double(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::String(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::String(value)
    }
}

impl From<ObjectId> for Argument {
    fn from(value: ObjectId) -> Self {
        Argument::Id(value)
    }
}

/// One record of a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// What the server should do
    pub command: Command,
    /// Command operands, see the module documentation for the layout per command
    pub arguments: Vec<Argument>,
}

impl Message {
    /// Creates a message from a command and its operands.
    #[must_use]
    pub fn new(command: Command, arguments: Vec<Argument>) -> Self {
        Message { command, arguments }
    }

    /// Target object of an `Invoke`, or the object of `New`/`Delete`.
    #[must_use]
    pub fn target(&self) -> Option<ObjectId> {
        match self.command {
            Command::Invoke | Command::Delete => self.arguments.first().and_then(Argument::as_id),
            Command::New => self.arguments.get(1).and_then(Argument::as_id),
            Command::Reply | Command::Error => None,
        }
    }

    /// Method name of an `Invoke`.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self.command {
            Command::Invoke => self.arguments.get(1).and_then(Argument::as_str),
            _ => None,
        }
    }

    /// Call arguments of an `Invoke` (everything after target and method).
    #[must_use]
    pub fn call_arguments(&self) -> &[Argument] {
        match self.command {
            Command::Invoke if self.arguments.len() > 2 => &self.arguments[2..],
            _ => &[],
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for argument in &self.arguments {
            write!(f, " {argument}")?;
        }
        write!(f, " End")
    }
}

/// An ordered batch of messages delivered in one round-trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    messages: Vec<Message>,
}

impl Stream {
    /// Creates an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no message has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// All messages in append order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Iterates the messages in append order.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Appends a raw message.
    pub fn push(&mut self, message: Message) -> &mut Self {
        self.messages.push(message);
        self
    }

    /// Appends every message of `other`, preserving its order.
    pub fn append(&mut self, other: &Stream) -> &mut Self {
        self.messages.extend(other.messages.iter().cloned());
        self
    }

    /// Drops all messages.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Appends `New class_name id`.
    pub fn new_object(&mut self, class_name: &str, id: ObjectId) -> &mut Self {
        self.push(Message::new(
            Command::New,
            vec![Argument::from(class_name), Argument::Id(id)],
        ))
    }

    /// Appends `Invoke target method args...`.
    pub fn invoke<I>(&mut self, target: ObjectId, method: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = Argument>,
    {
        let mut arguments = vec![Argument::Id(target), Argument::from(method)];
        arguments.extend(args);
        self.push(Message::new(Command::Invoke, arguments))
    }

    /// Appends `Delete id`.
    pub fn delete(&mut self, id: ObjectId) -> &mut Self {
        self.push(Message::new(Command::Delete, vec![Argument::Id(id)]))
    }

    /// Builds a reply stream carrying the result values of the last invoke.
    #[must_use]
    pub fn reply(values: Vec<Argument>) -> Self {
        let mut stream = Stream::new();
        stream.push(Message::new(Command::Reply, values));
        stream
    }

    /// Builds a reply stream reporting a failure.
    #[must_use]
    pub fn error(text: &str) -> Self {
        let mut stream = Stream::new();
        stream.push(Message::new(Command::Error, vec![Argument::from(text)]));
        stream
    }

    /// Result values of the last `Reply` message, if any.
    #[must_use]
    pub fn last_result(&self) -> Option<&[Argument]> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.command == Command::Reply)
            .map(|message| message.arguments.as_slice())
    }

    /// Text of the first `Error` message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|message| message.command == Command::Error)
            .map(|message| {
                message
                    .arguments
                    .first()
                    .and_then(Argument::as_str)
                    .unwrap_or("unknown error")
            })
    }

    /// Encodes the stream into its binary wire form.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a field exceeds the wire limits.
    pub fn encode(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    /// Decodes a stream from its binary wire form.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for damaged input.
    pub fn decode(data: &[u8]) -> Result<Self> {
        codec::decode(data)
    }
}

impl<'a> IntoIterator for &'a Stream {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_command_tags() {
        for command in Command::iter() {
            assert_eq!(Command::from_u8(command as u8), Some(command));
        }
        assert_eq!(Command::from_u8(0), None);
        assert_eq!(Command::from_u8(6), None);
        assert_eq!(Command::COUNT, 5);
    }

    #[test]
    fn test_invoke_layout() {
        let mut stream = Stream::new();
        stream.invoke(
            ObjectId(4),
            "SetCenter",
            [1.0, 2.0, 3.0].map(Argument::from),
        );

        let message = &stream.messages()[0];
        assert_eq!(message.command, Command::Invoke);
        assert_eq!(message.target(), Some(ObjectId(4)));
        assert_eq!(message.method(), Some("SetCenter"));
        assert_eq!(message.call_arguments().len(), 3);
        assert_eq!(
            message.to_string(),
            "Invoke id4 \"SetCenter\" 1 2 3 End"
        );
    }

    #[test]
    fn test_append_preserves_order() {
        let mut first = Stream::new();
        first.new_object("vtkSphereSource", ObjectId(1));

        let mut second = Stream::new();
        second.invoke(ObjectId(1), "Update", []);
        second.delete(ObjectId(1));

        first.append(&second);
        let commands: Vec<Command> = first.iter().map(|message| message.command).collect();
        assert_eq!(
            commands,
            vec![Command::New, Command::Invoke, Command::Delete]
        );
        assert_eq!(first.messages()[0].target(), Some(ObjectId(1)));
        assert_eq!(first.messages()[2].target(), Some(ObjectId(1)));
    }

    #[test]
    fn test_reply_and_error() {
        let reply = Stream::reply(vec![Argument::Double(0.5)]);
        assert_eq!(reply.last_result(), Some(&[Argument::Double(0.5)][..]));
        assert_eq!(reply.error_message(), None);

        let error = Stream::error("no such object");
        assert_eq!(error.last_result(), None);
        assert_eq!(error.error_message(), Some("no such object"));
    }

    #[test]
    fn test_argument_views() {
        assert_eq!(Argument::Int(3).as_double(), Some(3.0));
        assert_eq!(Argument::Bool(true).as_int(), Some(1));
        assert_eq!(Argument::Int(0).as_bool(), Some(false));
        assert_eq!(Argument::from("x").as_str(), Some("x"));
        assert_eq!(Argument::Double(1.0).as_int(), None);
        assert_eq!(Argument::Id(ObjectId(2)).as_id(), Some(ObjectId(2)));
    }
}
