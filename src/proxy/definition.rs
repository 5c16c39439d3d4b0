//! Proxy schemas registered with a [`ProxyFactory`](crate::proxy::ProxyFactory).

use std::sync::Arc;

use crate::{property::PropertyDefinition, stream::ServerRole};

/// A sub-proxy slot of a [`ProxyDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubProxyDefinition {
    /// Name of the slot inside the parent
    pub name: String,
    /// Group of the sub-proxy's definition
    pub group: String,
    /// Name of the sub-proxy's definition
    pub proxy_name: String,
    /// Properties of the sub-proxy surfaced through the parent
    pub exposed: Vec<String>,
}

impl SubProxyDefinition {
    /// A slot `name` filled with a proxy of definition (`group`, `proxy_name`).
    #[must_use]
    pub fn new(name: &str, group: &str, proxy_name: &str) -> Self {
        SubProxyDefinition {
            name: name.to_string(),
            group: group.to_string(),
            proxy_name: proxy_name.to_string(),
            exposed: Vec::new(),
        }
    }

    /// Surfaces `property` through the parent.
    #[must_use]
    pub fn expose(mut self, property: &str) -> Self {
        self.exposed.push(property.to_string());
        self
    }
}

/// Schema of one proxy type, identified by (group, name).
#[derive(Debug, Clone)]
pub struct ProxyDefinition {
    /// Definition group, such as `sources` or `filters`
    pub group: String,
    /// Definition name within the group
    pub name: String,
    /// Class instantiated on the servers; empty for client-only proxies
    pub class_name: String,
    /// Roles hosting the objects
    pub servers: ServerRole,
    /// Method invoked after property pushes when an upstream proxy changed
    pub update_command: Option<String>,
    /// Properties in registration order
    pub properties: Vec<Arc<PropertyDefinition>>,
    /// Sub-proxies in registration order
    pub sub_proxies: Vec<SubProxyDefinition>,
}

impl ProxyDefinition {
    /// A definition hosted on the data server, without properties.
    #[must_use]
    pub fn new(group: &str, name: &str, class_name: &str) -> Self {
        ProxyDefinition {
            group: group.to_string(),
            name: name.to_string(),
            class_name: class_name.to_string(),
            servers: ServerRole::DATA_SERVER,
            update_command: None,
            properties: Vec::new(),
            sub_proxies: Vec::new(),
        }
    }

    /// Sets the hosting roles.
    #[must_use]
    pub fn servers(mut self, servers: ServerRole) -> Self {
        self.servers = servers;
        self
    }

    /// Sets the pipeline update method.
    #[must_use]
    pub fn update_command(mut self, command: &str) -> Self {
        self.update_command = Some(command.to_string());
        self
    }

    /// Adds a property.
    #[must_use]
    pub fn property(mut self, property: PropertyDefinition) -> Self {
        self.properties.push(Arc::new(property));
        self
    }

    /// Adds a sub-proxy slot.
    #[must_use]
    pub fn sub_proxy(mut self, sub_proxy: SubProxyDefinition) -> Self {
        self.sub_proxies.push(sub_proxy);
        self
    }

    /// Looks up a property definition by name.
    #[must_use]
    pub fn property_definition(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .map(AsRef::as_ref)
    }
}
