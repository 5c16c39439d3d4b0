// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # smproxy
//!
//! A client-side proxy layer for remote visualization objects.
//!
//! Every object that lives on a server process (a data source, a filter, an implicit
//! function) is represented on the client by a [`Proxy`]. A proxy owns named, typed
//! [`Property`] values. Changing a property only marks it modified; an explicit update
//! then pushes all modified values to the servers in a single command [`stream`].
//! Proxies compose sub-proxies, link into pipelines through proxy-valued properties, and
//! can be saved to and restored from XML state documents.
//!
//! ## Features
//!
//! - **Deferred, batched updates** - Property changes are collected and sent once per update
//! - **Pipelines** - Consumers are tracked automatically and updated in dependency order
//! - **Composition** - Sub-proxies with selectively exposed properties
//! - **Definitions** - Proxy and property schemas registered in code or read from XML
//! - **State** - Save proxies to XML and rebuild them with shared references intact
//! - **Multi-server** - Each proxy targets a mask of client, data server and render server
//!
//! ## Quick Start
//!
//! ```rust
//! use smproxy::prelude::*;
//!
//! let factory = ProxyFactory::new();
//! factory.load_xml(
//!     r#"<ServerManagerConfiguration>
//!          <ProxyGroup name="sources">
//!            <SourceProxy name="SphereSource" class="vtkSphereSource" update_command="Update">
//!              <DoubleVectorProperty name="Radius" command="SetRadius"
//!                                    number_of_elements="1" default_values="0.5">
//!                <DoubleRangeDomain name="range" min="0"/>
//!              </DoubleVectorProperty>
//!            </SourceProxy>
//!          </ProxyGroup>
//!        </ServerManagerConfiguration>"#,
//! )?;
//!
//! let session = Session::builtin(factory);
//! let sphere = session.new_proxy("sources", "SphereSource")?;
//! sphere.property("Radius").unwrap().set(2.0)?;
//! sphere.update_vtk_objects()?;
//! assert_eq!(sphere.state(), ProxyState::Synced);
//! # Ok::<(), smproxy::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`stream`] - Command streams and their binary wire format
//! - [`server`] - Transports and the in-process interpreter
//! - [`session`] - Connections, id allocation and live proxy registry
//! - [`property`] - Typed values, definitions and domains
//! - [`proxy`] - Proxies, definitions, the factory and the manager
//! - [`state`] - XML state documents and proxy location
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade. Proxy creation and
//! updates are reported at `debug`, skipped descriptor entries at `warn`, and whole
//! document loads at `info`. Install any logger (for example `env_logger`) to see them.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
mod id;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use smproxy::prelude::*;
///
/// let session = Session::builtin(ProxyFactory::new());
/// assert!(session.new_proxy("sources", "Missing").is_err());
/// ```
pub mod prelude;

pub mod property;
pub mod proxy;
pub mod server;
pub mod session;
pub mod state;
pub mod stream;

/// `smproxy` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `smproxy` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use smproxy::{prelude::*, Error};
///
/// let session = Session::builtin(ProxyFactory::new());
/// match session.new_proxy("sources", "Teapot") {
///     Err(Error::UnknownProxyType { group, name }) => println!("no definition for {group}.{name}"),
///     Err(e) => println!("Error: {}", e),
///     Ok(_) => unreachable!(),
/// }
/// ```
pub use error::Error;

/// Identifiers of server objects and of proxies.
pub use id::{GlobalId, ObjectId};

pub use property::{Property, PropertyRc};
pub use proxy::{Proxy, ProxyFactory, ProxyManager, ProxyRc, ProxyState};
pub use session::{Session, SessionBuilder, SessionConfig};
