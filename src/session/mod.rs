//! Sessions: the connection between client-side proxies and the server processes.
//!
//! A [`Session`] owns everything the proxies of one connection share:
//!
//! - the transports to the client interpreter, the data server and the render server,
//!   together with the last result returned by each of them
//! - the allocators for [`ObjectId`]s and [`GlobalId`]s
//! - the [`ProxyFactory`] that turns (group, type) pairs into proxies
//! - the registry of live proxies, keyed by [`GlobalId`]
//!
//! Sessions are independent of each other; two sessions in one process never share ids,
//! definitions or live proxies.
//!
//! # Examples
//!
//! ```rust
//! use smproxy::prelude::*;
//!
//! let factory = ProxyFactory::new();
//! factory.register(
//!     ProxyDefinition::new("sources", "SphereSource", "vtkSphereSource")
//!         .property(PropertyDefinition::new("Radius", PropertyKind::Double).command("SetRadius")),
//! );
//!
//! let session = Session::builtin(factory);
//! let sphere = session.new_proxy("sources", "SphereSource")?;
//! sphere.property("Radius").unwrap().set(2.5)?;
//! sphere.update_vtk_objects()?;
//! # Ok::<(), smproxy::Error>(())
//! ```

mod config;
mod connection;

pub use config::SessionConfig;

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Weak,
};

use dashmap::DashMap;
use log::debug;

use crate::{
    proxy::{Proxy, ProxyFactory, ProxyRc},
    server::{InProcessServer, Transport},
    stream::{Argument, ServerRole, Stream},
    Error, GlobalId, ObjectId, Result,
};
use connection::Connection;

static NEXT_CONNECTION_ID: AtomicU32 = AtomicU32::new(1);

/// Builder for [`Session`]s with custom transports or configuration.
pub struct SessionBuilder {
    factory: ProxyFactory,
    config: SessionConfig,
    client: Option<Box<dyn Transport>>,
    data_server: Option<Box<dyn Transport>>,
    render_server: Option<Box<dyn Transport>>,
}

impl SessionBuilder {
    /// Uses `config` instead of [`SessionConfig::default`].
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport for the client role. Defaults to a fresh [`InProcessServer`].
    #[must_use]
    pub fn client(mut self, transport: impl Transport + 'static) -> Self {
        self.client = Some(Box::new(transport));
        self
    }

    /// Transport for the data server roles. Defaults to a fresh [`InProcessServer`].
    #[must_use]
    pub fn data_server(mut self, transport: impl Transport + 'static) -> Self {
        self.data_server = Some(Box::new(transport));
        self
    }

    /// Transport for the render server roles.
    ///
    /// Without one, render traffic is folded into the data server unless
    /// [`SessionConfig::separate_render_server`] asks for a fresh [`InProcessServer`].
    #[must_use]
    pub fn render_server(mut self, transport: impl Transport + 'static) -> Self {
        self.render_server = Some(Box::new(transport));
        self
    }

    /// Creates the session.
    #[must_use]
    pub fn build(self) -> Arc<Session> {
        let render_server = match self.render_server {
            Some(transport) => Some(transport),
            None if self.config.separate_render_server => {
                Some(Box::new(InProcessServer::new()) as Box<dyn Transport>)
            }
            None => None,
        };

        let connection = Connection::new(
            self.client
                .unwrap_or_else(|| Box::new(InProcessServer::new())),
            self.data_server
                .unwrap_or_else(|| Box::new(InProcessServer::new())),
            render_server,
            self.config.trace_streams,
        );

        let session = Session {
            connection_id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            config: self.config,
            factory: self.factory,
            connection,
            next_object_id: AtomicU32::new(1),
            next_global_id: AtomicU32::new(1),
            live_proxies: DashMap::new(),
        };
        debug!("Opened session {}", session.connection_id);

        Arc::new(session)
    }
}

/// One connection between the client and its servers.
pub struct Session {
    connection_id: u32,
    config: SessionConfig,
    factory: ProxyFactory,
    connection: Connection,
    next_object_id: AtomicU32,
    next_global_id: AtomicU32,
    live_proxies: DashMap<GlobalId, Weak<Proxy>>,
}

impl Session {
    /// Starts building a session that creates proxies from `factory`.
    #[must_use]
    pub fn builder(factory: ProxyFactory) -> SessionBuilder {
        SessionBuilder {
            factory,
            config: SessionConfig::default(),
            client: None,
            data_server: None,
            render_server: None,
        }
    }

    /// Creates a session whose servers all run in-process.
    #[must_use]
    pub fn builtin(factory: ProxyFactory) -> Arc<Session> {
        Self::builder(factory).build()
    }

    /// Process-unique id of this connection.
    #[must_use]
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// The configuration the session was built with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The proxy definitions known to this session.
    #[must_use]
    pub fn factory(&self) -> &ProxyFactory {
        &self.factory
    }

    /// Creates a proxy of the registered (group, type) definition.
    ///
    /// # Errors
    /// Returns [`Error::UnknownProxyType`] if the factory has no such definition, or any
    /// error raised while materializing the definition's sub-proxies.
    pub fn new_proxy(self: &Arc<Self>, group: &str, name: &str) -> Result<ProxyRc> {
        let Some(definition) = self.factory.definition(group, name) else {
            return Err(Error::UnknownProxyType {
                group: group.to_string(),
                name: name.to_string(),
            });
        };

        Proxy::from_definition(self, definition)
    }

    /// Sends `stream` to every destination addressed by `roles`.
    ///
    /// # Errors
    /// Returns [`Error::RemoteCallFailure`] if a destination could not be reached or
    /// replied with an error. Destinations after the failing one are not contacted.
    pub fn send_stream(&self, roles: ServerRole, stream: &Stream) -> Result<()> {
        self.connection.send(roles, stream)
    }

    /// Like [`Session::send_stream`], but sends `rollback` to the destinations that had
    /// already executed `stream` when a later destination fails.
    pub(crate) fn send_stream_or_roll_back(
        &self,
        roles: ServerRole,
        stream: &Stream,
        rollback: &Stream,
    ) -> Result<()> {
        self.connection.send_or_roll_back(roles, stream, rollback)
    }

    /// Sends `stream` to the primary destination of `roles` and returns the result of its
    /// last invoke.
    ///
    /// # Errors
    /// Returns [`Error::RemoteCallFailure`] as [`Session::send_stream`] does, and
    /// [`Error::UnresolvedName`] if `roles` addresses no destination.
    pub fn query(&self, roles: ServerRole, stream: &Stream) -> Result<Vec<Argument>> {
        let Some(destination) = roles.primary_destination() else {
            return Err(Error::UnresolvedName(format!(
                "no destination for roles {roles:?}"
            )));
        };

        let reply = self.connection.send_to(destination, stream)?;
        Ok(reply.last_result().map(<[Argument]>::to_vec).unwrap_or_default())
    }

    /// Result values of the last invoke executed on the primary destination of `roles`.
    #[must_use]
    pub fn last_result(&self, roles: ServerRole) -> Option<Vec<Argument>> {
        self.connection.last_result(roles)
    }

    /// Allocates `count` fresh object ids. Ids are never reused within a session.
    ///
    /// # Errors
    /// Returns [`Error::IdSpaceExhausted`] if fewer than `count` ids are left; nothing is
    /// allocated in that case.
    pub fn allocate_object_ids(&self, count: usize) -> Result<Vec<ObjectId>> {
        let requested = u32::try_from(count).map_err(|_| Error::IdSpaceExhausted(count))?;
        let first = self
            .next_object_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                next.checked_add(requested)
            })
            .map_err(|_| Error::IdSpaceExhausted(count))?;
        Ok((first..first + requested).map(ObjectId::new).collect())
    }

    pub(crate) fn allocate_global_id(&self) -> GlobalId {
        GlobalId::new(self.next_global_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register_live(&self, proxy: &ProxyRc) {
        self.live_proxies
            .insert(proxy.global_id(), Arc::downgrade(proxy));
    }

    pub(crate) fn unregister_live(&self, id: GlobalId) {
        self.live_proxies.remove(&id);
    }

    /// Looks up a live proxy of this session by its global id.
    #[must_use]
    pub fn find_proxy(&self, id: GlobalId) -> Option<ProxyRc> {
        let weak = self.live_proxies.get(&id).map(|entry| entry.value().clone())?;
        weak.upgrade()
    }

    /// Number of proxies of this session that are still alive.
    #[must_use]
    pub fn live_proxy_count(&self) -> usize {
        self.live_proxies
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection_id", &self.connection_id)
            .field("config", &self.config)
            .field("live_proxies", &self.live_proxies.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{stream::Destination, test::factory};

    #[test]
    fn test_object_ids_are_unique() {
        let session = Session::builtin(ProxyFactory::new());
        let first = session.allocate_object_ids(2).unwrap();
        let second = session.allocate_object_ids(1).unwrap();

        assert_eq!(first, vec![ObjectId(1), ObjectId(2)]);
        assert_eq!(second, vec![ObjectId(3)]);
        assert!(session.allocate_object_ids(0).unwrap().is_empty());
    }

    #[test]
    fn test_object_id_exhaustion() {
        let session = Session::builtin(ProxyFactory::new());
        session.next_object_id.store(u32::MAX - 2, Ordering::Relaxed);

        assert!(matches!(
            session.allocate_object_ids(3),
            Err(Error::IdSpaceExhausted(3))
        ));
        assert_eq!(
            session.allocate_object_ids(2).unwrap(),
            vec![ObjectId(u32::MAX - 2), ObjectId(u32::MAX - 1)]
        );
        assert!(session.allocate_object_ids(1).is_err());
        assert!(session.allocate_object_ids(0).unwrap().is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let first = Session::builtin(ProxyFactory::new());
        let second = Session::builtin(ProxyFactory::new());

        assert_ne!(first.connection_id(), second.connection_id());
        assert_eq!(
            first.allocate_object_ids(1).unwrap(),
            second.allocate_object_ids(1).unwrap()
        );
    }

    #[test]
    fn test_unknown_proxy_type() {
        let session = Session::builtin(ProxyFactory::new());
        assert!(matches!(
            session.new_proxy("sources", "Nope"),
            Err(Error::UnknownProxyType { .. })
        ));
    }

    #[test]
    fn test_servers_traffic_folds_into_data_server() {
        let data = InProcessServer::new();
        let session = Session::builder(ProxyFactory::new())
            .data_server(data.clone())
            .build();

        let mut stream = Stream::new();
        stream.new_object("vtkSphere", ObjectId(1));
        session.send_stream(ServerRole::SERVERS, &stream).unwrap();

        assert_eq!(data.with_interpreter(|i| i.object_count()), 1);
        assert_eq!(
            session.connection.route(ServerRole::CLIENT_AND_SERVERS),
            vec![Destination::Client, Destination::DataServer]
        );
    }

    #[test]
    fn test_separate_render_server() {
        let data = InProcessServer::new();
        let render = InProcessServer::new();
        let session = Session::builder(ProxyFactory::new())
            .data_server(data.clone())
            .render_server(render.clone())
            .build();

        let mut stream = Stream::new();
        stream.new_object("vtkSphere", ObjectId(1));
        session.send_stream(ServerRole::SERVERS, &stream).unwrap();

        assert_eq!(data.with_interpreter(|i| i.object_count()), 1);
        assert_eq!(render.with_interpreter(|i| i.object_count()), 1);
    }

    #[test]
    fn test_remote_error_and_last_result() {
        let session = Session::builtin(ProxyFactory::new());

        let mut stream = Stream::new();
        stream
            .new_object("vtkSphere", ObjectId(1))
            .invoke(ObjectId(1), "SetRadius", [Argument::Double(3.0)])
            .invoke(ObjectId(1), "GetRadius", []);
        session.send_stream(ServerRole::DATA_SERVER, &stream).unwrap();
        assert_eq!(
            session.last_result(ServerRole::DATA_SERVER_ROOT),
            Some(vec![Argument::Double(3.0)])
        );

        let mut stream = Stream::new();
        stream.invoke(ObjectId(42), "Update", []);
        let err = session.send_stream(ServerRole::DATA_SERVER, &stream).unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteCallFailure { role, .. } if role.contains(ServerRole::DATA_SERVER)
        ));
    }

    #[test]
    fn test_closed_connection_is_remote_failure() {
        let data = InProcessServer::new();
        let session = Session::builder(ProxyFactory::new())
            .data_server(data.clone())
            .build();
        data.disconnect();

        let mut stream = Stream::new();
        stream.new_object("vtkSphere", ObjectId(1));
        assert!(matches!(
            session.send_stream(ServerRole::DATA_SERVER, &stream),
            Err(Error::RemoteCallFailure { .. })
        ));
    }

    #[test]
    fn test_live_registry() {
        let session = Session::builtin(factory());
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        let id = sphere.global_id();

        assert!(Arc::ptr_eq(&session.find_proxy(id).unwrap(), &sphere));
        assert_eq!(session.live_proxy_count(), 1);

        drop(sphere);
        assert!(session.find_proxy(id).is_none());
        assert_eq!(session.live_proxy_count(), 0);
    }
}
