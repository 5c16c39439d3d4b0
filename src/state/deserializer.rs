//! Materialization of proxies from descriptors.

use std::sync::Arc;

use log::{error, warn};

use crate::{
    proxy::{parse_servers, ProxyRc},
    session::Session,
    state::{ProxyLocator, XmlElement},
    Error, Result,
};

/// Creates the proxy a descriptor id stands for.
///
/// Implementations receive the locator that asked, so that proxy references inside the
/// descriptor resolve through the same cache.
pub trait Deserializer: Send + Sync {
    /// Creates and initializes the proxy for `id`, or returns `None` if it cannot be built.
    fn new_proxy(&self, id: u32, locator: &mut ProxyLocator) -> Option<ProxyRc>;
}

/// Builds proxies from a `<ServerManagerState>` document.
///
/// Every top-level `<Proxy group type id>` element describes one proxy. The proxy is
/// created through the session's factory, then its properties are loaded with
/// [`Proxy::load_state`](crate::proxy::Proxy::load_state). Ids that belong to a nested
/// sub-proxy resolve to the corresponding sub-proxy of the located parent.
pub struct XmlDeserializer {
    session: Arc<Session>,
    root: XmlElement,
}

impl XmlDeserializer {
    /// Deserializes proxies of `root` into `session`.
    #[must_use]
    pub fn new(session: Arc<Session>, root: XmlElement) -> Self {
        XmlDeserializer { session, root }
    }

    /// Parses `text` and deserializes its proxies into `session`.
    ///
    /// # Errors
    /// Returns [`Error::Xml`] if `text` is not well-formed.
    pub fn parse(session: Arc<Session>, text: &str) -> Result<Self> {
        Ok(Self::new(session, XmlElement::parse(text)?))
    }

    /// The document proxies are read from.
    #[must_use]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// The top-level `<Proxy>` element with `id`.
    #[must_use]
    pub fn proxy_element(&self, id: u32) -> Option<&XmlElement> {
        let id = id.to_string();
        self.root
            .children_named("Proxy")
            .find(|element| element.attribute("id") == Some(id.as_str()))
    }

    fn build(&self, id: u32, locator: &mut ProxyLocator) -> Result<ProxyRc> {
        let Some(element) = self.proxy_element(id) else {
            return self.locate_sub_proxy(id, locator);
        };

        let group = element.required_attribute("group")?;
        let name = element.required_attribute("type")?;
        let proxy = self.session.new_proxy(group, name)?;

        if let Some(servers) = element.attribute("servers") {
            proxy.set_servers(parse_servers(servers)?);
        }
        proxy.load_state(element, locator)?;
        Ok(proxy)
    }

    /// Resolves an id that names a nested `<SubProxy>` by locating its top-level owner.
    fn locate_sub_proxy(&self, id: u32, locator: &mut ProxyLocator) -> Result<ProxyRc> {
        let id_text = id.to_string();
        for top in self.root.children_named("Proxy") {
            let Some(path) = sub_proxy_path(top, &id_text) else {
                continue;
            };
            let Ok(Some(top_id)) = top.parse_attribute::<u32>("id") else {
                continue;
            };

            let mut proxy = locator.locate_proxy(top_id).ok_or_else(|| {
                Error::UnresolvedName(format!("owner {top_id} of sub-proxy {id}"))
            })?;
            for name in &path {
                proxy = proxy.get_sub_proxy(name).ok_or_else(|| {
                    Error::UnresolvedName(format!("sub-proxy '{name}' of proxy {top_id}"))
                })?;
            }
            return Ok(proxy);
        }

        Err(Error::UnresolvedName(format!("no descriptor for proxy {id}")))
    }
}

impl Deserializer for XmlDeserializer {
    fn new_proxy(&self, id: u32, locator: &mut ProxyLocator) -> Option<ProxyRc> {
        match self.build(id, locator) {
            Ok(proxy) => Some(proxy),
            Err(err @ Error::SchemaError { .. }) => {
                error!("Cannot build proxy {}: {}", id, err);
                None
            }
            Err(err) => {
                warn!("Cannot build proxy {}: {}", id, err);
                None
            }
        }
    }
}

/// Names of the nested sub-proxy slots leading from `element` to the sub-proxy `id`.
fn sub_proxy_path(element: &XmlElement, id: &str) -> Option<Vec<String>> {
    for sub_proxy in element.children_named("SubProxy") {
        let Some(name) = sub_proxy.attribute("name") else {
            continue;
        };
        if sub_proxy.attribute("id") == Some(id) {
            return Some(vec![name.to_string()]);
        }
        if let Some(mut path) = sub_proxy
            .find_child("Proxy")
            .and_then(|nested| sub_proxy_path(nested, id))
        {
            path.insert(0, name.to_string());
            return Some(path);
        }
    }
    None
}
