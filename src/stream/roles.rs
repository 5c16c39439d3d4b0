//! Server roles and the physical destinations they map to.
//!
//! Proxies address their objects with a [`ServerRole`] bitmask. A session resolves the mask
//! into the set of [`Destination`]s that actually receive the stream: the client-side
//! interpreter, the data server and the render server.
//!
//! The `*_ROOT` roles address only the root process of a server group. A session talks to
//! each server group through a single transport, so a root role reaches the same
//! destination as its non-root counterpart.

use bitflags::bitflags;
use strum::{EnumCount, EnumIter, IntoEnumIterator};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Bitmask of the server roles hosting a proxy's objects
    pub struct ServerRole: u32 {
        /// Every process of the data server
        const DATA_SERVER = 0x01;
        /// Root process of the data server
        const DATA_SERVER_ROOT = 0x02;
        /// Every process of the render server
        const RENDER_SERVER = 0x04;
        /// Root process of the render server
        const RENDER_SERVER_ROOT = 0x08;
        /// Data server and render server
        const SERVERS = Self::DATA_SERVER.bits() | Self::RENDER_SERVER.bits();
        /// The client process itself
        const CLIENT = 0x10;
        /// Client, data server and render server
        const CLIENT_AND_SERVERS = Self::CLIENT.bits() | Self::SERVERS.bits();
    }
}

impl ServerRole {
    /// Returns the destinations this mask reaches, in [`Destination`] order.
    #[must_use]
    pub fn destinations(self) -> Vec<Destination> {
        Destination::iter()
            .filter(|destination| self.intersects(destination.roles()))
            .collect()
    }

    /// Picks the single destination used for requests that expect one reply, such as
    /// information queries. Data server wins over render server, which wins over client.
    #[must_use]
    pub fn primary_destination(self) -> Option<Destination> {
        [
            Destination::DataServer,
            Destination::RenderServer,
            Destination::Client,
        ]
        .into_iter()
        .find(|destination| self.intersects(destination.roles()))
    }
}

/// A physical endpoint a stream is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount)]
pub enum Destination {
    /// The client-side interpreter
    Client,
    /// The data server group
    DataServer,
    /// The render server group
    RenderServer,
}

impl Destination {
    /// Number of destinations
    pub const COUNT: usize = <Self as EnumCount>::COUNT;

    /// All roles that are delivered to this destination.
    #[must_use]
    pub fn roles(self) -> ServerRole {
        match self {
            Destination::Client => ServerRole::CLIENT,
            Destination::DataServer => ServerRole::DATA_SERVER | ServerRole::DATA_SERVER_ROOT,
            Destination::RenderServer => {
                ServerRole::RENDER_SERVER | ServerRole::RENDER_SERVER_ROOT
            }
        }
    }

    /// Dense index, used for per-destination tables.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Destination::Client => 0,
            Destination::DataServer => 1,
            Destination::RenderServer => 2,
        }
    }
}
