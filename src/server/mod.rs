//! Server side of a session.
//!
//! A [`Session`](crate::Session) talks to each destination through a [`Transport`], which
//! moves one encoded request stream to the server and returns the encoded reply. The only
//! transport shipped with the crate is [`InProcessServer`], which runs an [`Interpreter`]
//! in the same process. It backs builtin sessions and every test.
//!
//! # Examples
//!
//! ```rust
//! use smproxy::{
//!     server::{InProcessServer, Transport},
//!     stream::{Argument, Stream},
//!     ObjectId,
//! };
//!
//! let mut server = InProcessServer::new();
//! let mut stream = Stream::new();
//! stream
//!     .new_object("vtkSphereSource", ObjectId::new(1))
//!     .invoke(ObjectId::new(1), "SetRadius", [Argument::from(2.0)])
//!     .invoke(ObjectId::new(1), "GetRadius", []);
//!
//! let reply = Stream::decode(&server.round_trip(&stream.encode()?)?)?;
//! assert_eq!(reply.last_result(), Some(&[Argument::Double(2.0)][..]));
//! # Ok::<(), smproxy::Error>(())
//! ```

mod interpreter;

pub use interpreter::{Interpreter, ServerObject};

use std::sync::{Arc, Mutex};

use crate::{stream::Stream, Error, Result};

/// Moves encoded streams to one destination and back.
pub trait Transport: Send {
    /// Delivers `request` and blocks until the encoded reply arrives.
    ///
    /// # Errors
    /// Returns an error if the request could not be delivered or no reply was received.
    /// A reply that carries an `Error` message is still a successful round-trip.
    fn round_trip(&mut self, request: &[u8]) -> Result<Vec<u8>>;
}

struct ServerState {
    interpreter: Interpreter,
    connected: bool,
}

/// Transport executing streams in the calling process.
///
/// Clones share the same interpreter, so a test can keep one handle for inspection while
/// the session owns another.
#[derive(Clone)]
pub struct InProcessServer {
    state: Arc<Mutex<ServerState>>,
}

impl InProcessServer {
    /// Creates a server with an empty object table.
    #[must_use]
    pub fn new() -> Self {
        InProcessServer {
            state: Arc::new(Mutex::new(ServerState {
                interpreter: Interpreter::new(),
                connected: true,
            })),
        }
    }

    /// Runs `f` with the interpreter locked.
    pub fn with_interpreter<R>(&self, f: impl FnOnce(&mut Interpreter) -> R) -> R {
        let mut state = lock!(self.state);
        f(&mut state.interpreter)
    }

    /// Simulates a lost connection: every following round-trip fails.
    pub fn disconnect(&self) {
        lock!(self.state).connected = false;
    }

    /// Re-establishes a connection dropped by [`InProcessServer::disconnect`].
    pub fn reconnect(&self) {
        lock!(self.state).connected = true;
    }

    /// Returns `true` while round-trips are accepted.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        lock!(self.state).connected
    }
}

impl Default for InProcessServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for InProcessServer {
    fn round_trip(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let mut state = lock!(self.state);
        if !state.connected {
            return Err(Error::ConnectionClosed);
        }

        let reply = match Stream::decode(request) {
            Ok(stream) => state.interpreter.execute(&stream),
            Err(err) => Stream::error(&format!("Undecodable request: {err}")),
        };

        reply.encode()
    }
}
