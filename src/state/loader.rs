//! Reading `<ServerManagerState>` documents back into a session.

use std::{collections::BTreeMap, sync::Arc};

use log::{info, warn};

use crate::{
    proxy::{ProxyManager, ProxyRc},
    session::Session,
    state::{ProxyLocator, XmlDeserializer, XmlElement},
    Result,
};

/// What a state document produced.
#[derive(Debug, Default)]
pub struct LoadedState {
    /// Every top-level proxy that could be built, keyed by its id in the document
    pub proxies: BTreeMap<u32, ProxyRc>,
    /// `ProxyCollection` entries as (group, name, proxy)
    pub registrations: Vec<(String, String, ProxyRc)>,
}

impl LoadedState {
    /// The proxy written under `id`.
    #[must_use]
    pub fn proxy(&self, id: u32) -> Option<&ProxyRc> {
        self.proxies.get(&id)
    }

    /// The proxy registered as `name` in `group`.
    #[must_use]
    pub fn registered(&self, group: &str, name: &str) -> Option<&ProxyRc> {
        self.registrations
            .iter()
            .find(|(registered_group, registered_name, _)| {
                registered_group == group && registered_name == name
            })
            .map(|(_, _, proxy)| proxy)
    }
}

/// Recreates the proxies of a state document in one session.
pub struct StateLoader {
    session: Arc<Session>,
}

impl StateLoader {
    /// A loader creating proxies in `session`.
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        StateLoader { session }
    }

    /// Parses `text` and loads it.
    ///
    /// # Errors
    /// Returns [`crate::Error::Xml`] if `text` is not well-formed, and the errors of
    /// [`StateLoader::load`].
    pub fn load_str(&self, text: &str) -> Result<LoadedState> {
        self.load(XmlElement::parse(text)?)
    }

    /// Builds every proxy of `root`.
    ///
    /// Proxies whose descriptor is broken are logged and left out; the rest of the
    /// document still loads.
    ///
    /// # Errors
    /// Returns [`crate::Error::SchemaError`] if `root` is not a `<ServerManagerState>`.
    pub fn load(&self, root: XmlElement) -> Result<LoadedState> {
        if root.name() != "ServerManagerState" {
            return Err(schema_error!(
                "Expected <ServerManagerState>, found <{}>",
                root.name()
            ));
        }

        let ids: Vec<u32> = root
            .children_named("Proxy")
            .filter_map(|element| match element.parse_attribute::<u32>("id") {
                Ok(Some(id)) => Some(id),
                _ => {
                    warn!("Skipping <Proxy> without a valid id");
                    None
                }
            })
            .collect();

        let collections: Vec<(String, String, u32)> = root
            .children_named("ProxyCollection")
            .flat_map(|collection| {
                let group = collection.attribute("name").unwrap_or_default().to_string();
                collection.children_named("Item").filter_map(move |item| {
                    let id = item.parse_attribute::<u32>("id").ok().flatten()?;
                    Some((group.clone(), item.attribute("name")?.to_string(), id))
                })
            })
            .collect();

        let mut locator = ProxyLocator::with_deserializer(Arc::new(XmlDeserializer::new(
            self.session.clone(),
            root,
        )));

        let mut loaded = LoadedState::default();
        for id in ids {
            if let Some(proxy) = locator.locate_proxy(id) {
                loaded.proxies.insert(id, proxy);
            }
        }
        for (group, name, id) in collections {
            match locator.locate_proxy(id) {
                Some(proxy) => loaded.registrations.push((group, name, proxy)),
                None => warn!("Registration {}/{} names unknown proxy {}", group, name, id),
            }
        }

        info!(
            "Loaded {} proxies and {} registrations",
            loaded.proxies.len(),
            loaded.registrations.len()
        );
        Ok(loaded)
    }

    /// Loads `text` and registers its collections with `manager`.
    ///
    /// # Errors
    /// See [`StateLoader::load_str`].
    pub fn load_into(&self, text: &str, manager: &ProxyManager) -> Result<LoadedState> {
        let loaded = self.load_str(text)?;
        for (group, name, proxy) in &loaded.registrations {
            manager.register_proxy(group, name, proxy.clone());
        }
        Ok(loaded)
    }
}
