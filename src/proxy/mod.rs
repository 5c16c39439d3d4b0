//! Proxies: client-side stand-ins for server objects.
//!
//! A [`Proxy`] mirrors one or more objects living on the server roles of its mask. It owns
//! a table of named [`Property`](crate::property::Property) values, composes sub-proxies
//! whose selected properties it exposes, and pushes every modified property to the servers
//! in one stream per update.
//!
//! # Key Components
//!
//! - [`Proxy`] / [`ProxyRc`] - The proxy itself, always shared through `Arc`
//! - [`PropertyIterator`] - Own properties, then the exposed properties of sub-proxies
//! - [`ProxyDefinition`] / [`SubProxyDefinition`] - Schema a proxy is built from
//! - [`ProxyFactory`] - Registry of definitions by (group, name), readable from XML
//! - [`ProxyManager`] - User-visible registration of proxies by (group, name)
//!
//! # Pipelines
//!
//! Proxy-valued properties link proxies into a pipeline. The proxy holding the property is
//! a *consumer* of every proxy it references, and the referenced proxies keep weak
//! back-links to their consumers. Changing a producer flags every transitive consumer;
//! [`Proxy::update_self_and_all_inputs`] then updates the producer and its consumers in
//! dependency order, each exactly once.
//!
//! # Examples
//!
//! ```rust
//! use smproxy::prelude::*;
//!
//! let factory = ProxyFactory::new();
//! factory.register(
//!     ProxyDefinition::new("sources", "Cone", "vtkConeSource")
//!         .update_command("Update")
//!         .property(PropertyDefinition::new("Height", PropertyKind::Double).command("SetHeight")),
//! );
//! factory.register(
//!     ProxyDefinition::new("filters", "Shrink", "vtkShrinkFilter")
//!         .update_command("Update")
//!         .property(PropertyDefinition::new("Input", PropertyKind::Proxy).command("SetInputConnection")),
//! );
//!
//! let session = Session::builtin(factory);
//! let cone = session.new_proxy("sources", "Cone")?;
//! let shrink = session.new_proxy("filters", "Shrink")?;
//! shrink.property("Input").unwrap().set(&cone)?;
//!
//! cone.property("Height").unwrap().set(3.0)?;
//! cone.update_self_and_all_inputs()?;
//! assert_eq!(shrink.state(), ProxyState::Synced);
//! # Ok::<(), smproxy::Error>(())
//! ```

mod base;
mod definition;
mod factory;
mod graph;
mod internals;
mod iterator;
mod manager;
mod xmldef;

pub use base::{Proxy, ProxyRc, ProxyState};
pub use definition::{ProxyDefinition, SubProxyDefinition};
pub use factory::ProxyFactory;
pub use iterator::PropertyIterator;
pub use manager::ProxyManager;
pub(crate) use xmldef::parse_servers;
