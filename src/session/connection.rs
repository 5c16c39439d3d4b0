//! Per-destination transports and reply bookkeeping for one session.

use std::sync::Mutex;

use log::{debug, trace, warn};

use crate::{
    server::Transport,
    stream::{Argument, Destination, ServerRole, Stream},
    Error, Result,
};

/// The transports of one session, one per [`Destination`].
///
/// A missing render server folds render traffic into the data server, so a stream
/// addressed at [`ServerRole::SERVERS`] reaches a combined server only once.
pub(crate) struct Connection {
    client: Mutex<Box<dyn Transport>>,
    data_server: Mutex<Box<dyn Transport>>,
    render_server: Option<Mutex<Box<dyn Transport>>>,
    last_results: Mutex<[Vec<Argument>; Destination::COUNT]>,
    trace_streams: bool,
}

impl Connection {
    pub(crate) fn new(
        client: Box<dyn Transport>,
        data_server: Box<dyn Transport>,
        render_server: Option<Box<dyn Transport>>,
        trace_streams: bool,
    ) -> Self {
        Connection {
            client: Mutex::new(client),
            data_server: Mutex::new(data_server),
            render_server: render_server.map(Mutex::new),
            last_results: Mutex::new(Default::default()),
            trace_streams,
        }
    }

    /// Resolves a role mask into the distinct destinations that receive traffic.
    pub(crate) fn route(&self, roles: ServerRole) -> Vec<Destination> {
        let mut routed = Vec::with_capacity(Destination::COUNT);
        for destination in roles.destinations() {
            let destination = self.resolve(destination);
            if !routed.contains(&destination) {
                routed.push(destination);
            }
        }
        routed
    }

    fn resolve(&self, destination: Destination) -> Destination {
        match destination {
            Destination::RenderServer if self.render_server.is_none() => Destination::DataServer,
            other => other,
        }
    }

    fn transport(&self, destination: Destination) -> &Mutex<Box<dyn Transport>> {
        match destination {
            Destination::Client => &self.client,
            Destination::DataServer => &self.data_server,
            Destination::RenderServer => self.render_server.as_ref().unwrap_or(&self.data_server),
        }
    }

    /// Sends `stream` to every destination of `roles`, stopping at the first failure.
    pub(crate) fn send(&self, roles: ServerRole, stream: &Stream) -> Result<()> {
        self.send_or_roll_back(roles, stream, &Stream::new())
    }

    /// Sends `stream` to every destination of `roles`. If one destination fails, `rollback`
    /// is sent to the destinations that already executed `stream`, and the failure is
    /// returned.
    pub(crate) fn send_or_roll_back(
        &self,
        roles: ServerRole,
        stream: &Stream,
        rollback: &Stream,
    ) -> Result<()> {
        if stream.is_empty() {
            return Ok(());
        }

        let request = stream.encode()?;
        let mut delivered = Vec::new();
        for destination in self.route(roles) {
            if let Err(err) = self.deliver(destination, stream, &request) {
                self.roll_back(&delivered, rollback);
                return Err(err);
            }
            delivered.push(destination);
        }
        Ok(())
    }

    fn roll_back(&self, destinations: &[Destination], rollback: &Stream) {
        if destinations.is_empty() || rollback.is_empty() {
            return;
        }

        let request = match rollback.encode() {
            Ok(request) => request,
            Err(err) => {
                warn!("Cannot encode rollback stream: {}", err);
                return;
            }
        };
        for destination in destinations {
            debug!("Rolling back {} messages on {:?}", rollback.len(), destination);
            if let Err(err) = self.deliver(*destination, rollback, &request) {
                warn!("Rollback on {:?} failed: {}", destination, err);
            }
        }
    }

    /// Sends `stream` to one destination and returns the decoded reply.
    pub(crate) fn send_to(&self, destination: Destination, stream: &Stream) -> Result<Stream> {
        let request = stream.encode()?;
        self.deliver(self.resolve(destination), stream, &request)
    }

    fn deliver(&self, destination: Destination, stream: &Stream, request: &[u8]) -> Result<Stream> {
        debug!(
            "Sending stream of {} messages to {:?}",
            stream.len(),
            destination
        );
        if self.trace_streams {
            for message in stream {
                trace!("{destination:?} <- {message}");
            }
        }

        let failure = |message: String| Error::RemoteCallFailure {
            role: destination.roles(),
            message,
        };

        let reply_bytes = lock!(self.transport(destination))
            .round_trip(request)
            .map_err(|err| failure(err.to_string()))?;
        let reply = Stream::decode(&reply_bytes).map_err(|err| failure(err.to_string()))?;

        if let Some(text) = reply.error_message() {
            return Err(failure(text.to_string()));
        }

        if let Some(result) = reply.last_result() {
            lock!(self.last_results)[destination.index()] = result.to_vec();
        }

        Ok(reply)
    }

    /// Result values of the last invoke executed on the primary destination of `roles`.
    pub(crate) fn last_result(&self, roles: ServerRole) -> Option<Vec<Argument>> {
        let destination = self.resolve(roles.primary_destination()?);
        Some(lock!(self.last_results)[destination.index()].clone())
    }
}
