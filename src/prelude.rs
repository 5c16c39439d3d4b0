//! # smproxy Prelude
//!
//! This module provides a convenient prelude for the most commonly used types of the
//! smproxy library. Import it to build definitions, open a session and work with proxies.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all smproxy operations
pub use crate::Error;

/// The result type used throughout smproxy
pub use crate::Result;

/// Identifiers of server objects and proxies
pub use crate::{GlobalId, ObjectId};

// ================================================================================================
// Sessions and Servers
// ================================================================================================

/// Connections and their configuration
pub use crate::session::{Session, SessionBuilder, SessionConfig};

/// Server-side transports
pub use crate::server::{InProcessServer, Transport};

/// Command streams and server role masks
pub use crate::stream::{Argument, Destination, ServerRole, Stream};

// ================================================================================================
// Proxies and Properties
// ================================================================================================

/// Proxies, their definitions, registries and property traversal
pub use crate::proxy::{
    PropertyIterator, Proxy, ProxyDefinition, ProxyFactory, ProxyManager, ProxyRc, ProxyState,
    SubProxyDefinition,
};

/// Typed property values, definitions and domains
pub use crate::property::{
    Domain, DomainPolicy, Property, PropertyDefinition, PropertyKind, PropertyRc, PropertyValue,
};

// ================================================================================================
// State
// ================================================================================================

/// Saving and restoring proxies as XML
pub use crate::state::{
    Deserializer, LoadedState, ProxyLocator, StateLoader, StateSaver, XmlDeserializer, XmlElement,
};
