//! Session configuration
//!
//! Tunables that apply to every proxy created inside one session.

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Reject out-of-range values instead of clamping them.
    /// Enumeration, string list and proxy group domains always reject.
    pub strict_domains: bool,

    /// Log every message of every stream at `trace` level
    pub trace_streams: bool,

    /// Give the render server its own transport; otherwise render traffic goes to the
    /// data server once
    pub separate_render_server: bool,

    /// Number of remote objects created per proxy when creation happens implicitly
    pub default_num_objects: usize,

    /// Maximum number of levels in a consumer graph update (default: 1024)
    pub max_graph_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strict_domains: false,
            trace_streams: false,
            separate_render_server: false,
            default_num_objects: 1,
            max_graph_depth: 1024,
        }
    }
}

impl SessionConfig {
    /// Rejects every domain violation and traces streams
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict_domains: true,
            trace_streams: true,
            ..Self::default()
        }
    }

    /// Clamps ranged values and stays quiet
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Client plus separate data and render servers
    #[must_use]
    pub fn client_server_render() -> Self {
        Self {
            separate_render_server: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_presets() {
        let strict = SessionConfig::strict();
        assert!(strict.strict_domains);
        assert!(strict.trace_streams);
        assert!(!strict.separate_render_server);

        let permissive = SessionConfig::permissive();
        assert!(!permissive.strict_domains);
        assert_eq!(permissive.default_num_objects, 1);

        assert!(SessionConfig::client_server_render().separate_render_server);
    }

    #[test]
    fn test_default_config() {
        assert_eq!(SessionConfig::default(), SessionConfig::permissive());
        assert_eq!(SessionConfig::default().max_graph_depth, 1024);
    }
}
