use thiserror::Error;

use crate::stream::ServerRole;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! schema_error {
    ($msg:expr) => {
        crate::Error::SchemaError {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::SchemaError {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Lookups that may legitimately miss (`Proxy::get_property`, `Proxy::get_sub_proxy`,
/// `ProxyLocator::locate_proxy`) return `Option` instead of an error. The variants below are
/// reserved for operations that cannot complete.
///
/// # Error Categories
///
/// ## Remote Errors
/// - [`Error::RemoteCallFailure`] - A stream could not be delivered, or the server replied with an error
/// - [`Error::ConnectionClosed`] - A transport lost its connection (reported inside
///   [`Error::RemoteCallFailure`] by sessions)
///
/// ## Local Errors
/// - [`Error::DomainViolation`] - A property value was rejected by its domain
/// - [`Error::UnresolvedName`] - A name that must exist could not be resolved
/// - [`Error::UnknownProxyType`] - The factory has no definition for a (group, type) pair
/// - [`Error::GraphError`] - The consumer graph could not be ordered
/// - [`Error::IdSpaceExhausted`] - The session ran out of object ids
///
/// ## Descriptor and Wire Errors
/// - [`Error::SchemaError`] - A descriptor or definition misses a required attribute
/// - [`Error::Xml`] - The XML text itself could not be read or written
/// - [`Error::Malformed`] - A wire stream is damaged
/// - [`Error::OutOfBounds`] - A wire stream ended early
///
/// # Examples
///
/// ```rust
/// use smproxy::Error;
///
/// fn describe(err: &Error) -> &'static str {
///     match err {
///         Error::RemoteCallFailure { .. } => "the server did not execute the request",
///         Error::DomainViolation { .. } => "value rejected locally",
///         _ => "other",
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A name that must exist could not be resolved.
    ///
    /// Plain lookups return `None` instead; this variant is only produced by operations
    /// that need the target to proceed, such as registering a property on a named sub-proxy.
    #[error("Unresolved name - {0}")]
    UnresolvedName(String),

    /// A descriptor or definition is missing a required attribute or is otherwise invalid.
    ///
    /// During state loading this error aborts only the construction of the affected proxy.
    #[error("Schema error - {file}:{line}: {message}")]
    SchemaError {
        /// The message to be printed for the schema error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A stream could not be delivered, or the remote side reported an error.
    ///
    /// The requested operation did not happen on the server.
    #[error("Remote call to {role:?} failed: {message}")]
    RemoteCallFailure {
        /// The destination role that failed
        role: ServerRole,
        /// Description reported by the transport or the remote interpreter
        message: String,
    },

    /// A transport has lost its connection to the server.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A property value was rejected by one of its domains.
    #[error("Domain violation on property '{property}': {message}")]
    DomainViolation {
        /// The property that rejected the value
        property: String,
        /// Why the value was rejected
        message: String,
    },

    /// The factory has no definition for the requested proxy type.
    #[error("Unknown proxy type {group}.{name}")]
    UnknownProxyType {
        /// Definition group
        group: String,
        /// Definition name
        name: String,
    },

    /// A wire stream is damaged and could not be decoded.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while decoding a stream.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// XML text could not be read or written.
    #[error("XML - {0}")]
    Xml(String),

    /// The session has no object ids left to hand out.
    #[error("Object id space exhausted, cannot allocate {0} more ids")]
    IdSpaceExhausted(usize),

    /// The consumer graph could not be ordered, usually because it contains a cycle.
    #[error("{0}")]
    GraphError(String),
}
