//! Saving and restoring proxies as XML descriptors.
//!
//! A state document lists proxies by id together with their property values. Proxy-valued
//! properties refer to other proxies by id, so restoring a document is a graph walk: a
//! [`ProxyLocator`] resolves each id once, asking a [`Deserializer`] to build proxies it has
//! not seen yet, and hands out the same `Arc` for every later reference.
//!
//! ```xml
//! <ServerManagerState version="1.0">
//!   <Proxy group="sources" type="SphereSource" id="1" servers="1">
//!     <Property name="Radius" id="1.Radius" number_of_elements="1">
//!       <Element index="0" value="2.5"/>
//!     </Property>
//!   </Proxy>
//!   <Proxy group="filters" type="Shrink" id="2" servers="1">
//!     <Property name="Input" id="2.Input" number_of_elements="1">
//!       <Proxy value="1"/>
//!     </Property>
//!   </Proxy>
//!   <ProxyCollection name="sources">
//!     <Item id="2" name="Shrink1"/>
//!   </ProxyCollection>
//! </ServerManagerState>
//! ```
//!
//! # Key Components
//!
//! - [`XmlElement`] - Owned DOM used for both descriptors and definition documents
//! - [`StateSaver`] - Writes proxies, their references and registrations
//! - [`StateLoader`] / [`LoadedState`] - Rebuilds a document in a session
//! - [`ProxyLocator`] - Id to proxy cache, by descriptor or by live global id
//! - [`Deserializer`] / [`XmlDeserializer`] - Builds one proxy from its descriptor

mod deserializer;
mod loader;
mod locator;
mod proxy_state;
mod saver;
mod xml;

pub use deserializer::{Deserializer, XmlDeserializer};
pub use loader::{LoadedState, StateLoader};
pub use locator::ProxyLocator;
pub use saver::StateSaver;
pub use xml::XmlElement;
