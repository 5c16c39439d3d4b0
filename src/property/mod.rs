//! Properties: typed, observable values of proxies.
//!
//! # Key Components
//!
//! - [`Property`] / [`PropertyRc`] - The shared value holder with change notification
//! - [`PropertyValue`] / [`PropertyKind`] - Vectors of ints, doubles, strings or proxies
//! - [`PropertyDefinition`] - Schema: command, element count, defaults, domains
//! - [`Domain`] / [`DomainPolicy`] - Value constraints and how violations are handled
//!
//! # Examples
//!
//! ```rust
//! use smproxy::property::{Domain, Property, PropertyDefinition, PropertyKind};
//!
//! let resolution = Property::new(
//!     PropertyDefinition::new("ThetaResolution", PropertyKind::Int)
//!         .command("SetThetaResolution")
//!         .elements(1)
//!         .domain(Domain::int_range(3, 1024)),
//! );
//!
//! resolution.set(1)?;
//! assert_eq!(resolution.int(0), Some(3));
//! # Ok::<(), smproxy::Error>(())
//! ```

mod base;
mod definition;
mod domain;
mod value;

pub use base::{Property, PropertyRc};
pub use definition::PropertyDefinition;
pub use domain::{Domain, DomainPolicy};
pub use value::{PropertyKind, PropertyValue};
