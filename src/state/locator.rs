//! Resolution of descriptor ids to proxies.
//!
//! A [`ProxyLocator`] turns the ids written into a saved state back into live proxies.
//! Each id is resolved at most once per locator: the first successful resolution is
//! cached, and later lookups return the same `Arc`. Failed resolutions are not cached, so
//! a later lookup tries again.
//!
//! Two strategies are supported:
//!
//! - **Descriptor**: every id is materialized by the attached [`Deserializer`]
//! - **Id-based**: the session's live proxies are consulted first (by global id), and the
//!   deserializer only handles ids that are not alive

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::{debug, warn};

use crate::{proxy::ProxyRc, session::Session, state::Deserializer, GlobalId};

/// How ids are resolved before the deserializer is asked.
#[derive(Clone)]
enum Strategy {
    Descriptor,
    IdBased(Arc<Session>),
}

/// Cache of `id → proxy` backed by an optional [`Deserializer`].
///
/// The cache holds strong references. Call [`ProxyLocator::clear`] (or drop the locator)
/// to release them.
pub struct ProxyLocator {
    cache: HashMap<u32, ProxyRc>,
    in_flight: HashSet<u32>,
    deserializer: Option<Arc<dyn Deserializer>>,
    strategy: Strategy,
}

impl ProxyLocator {
    /// A locator without deserializer; it resolves nothing until one is attached.
    #[must_use]
    pub fn new() -> Self {
        ProxyLocator {
            cache: HashMap::new(),
            in_flight: HashSet::new(),
            deserializer: None,
            strategy: Strategy::Descriptor,
        }
    }

    /// A locator that materializes ids with `deserializer`.
    #[must_use]
    pub fn with_deserializer(deserializer: Arc<dyn Deserializer>) -> Self {
        let mut locator = Self::new();
        locator.deserializer = Some(deserializer);
        locator
    }

    /// A locator that resolves ids to the live proxies of `session` first.
    #[must_use]
    pub fn id_based(session: Arc<Session>) -> Self {
        let mut locator = Self::new();
        locator.strategy = Strategy::IdBased(session);
        locator
    }

    /// Attaches or replaces the deserializer.
    pub fn set_deserializer(&mut self, deserializer: Arc<dyn Deserializer>) {
        self.deserializer = Some(deserializer);
    }

    /// The attached deserializer.
    #[must_use]
    pub fn deserializer(&self) -> Option<&Arc<dyn Deserializer>> {
        self.deserializer.as_ref()
    }

    /// Returns the proxy for `id`, creating it on first use.
    ///
    /// Returns `None` if the id cannot be resolved, and also, with a warning, if `id` is
    /// requested again while it is still being resolved (a reference cycle in the
    /// descriptor).
    pub fn locate_proxy(&mut self, id: u32) -> Option<ProxyRc> {
        if let Some(proxy) = self.cache.get(&id) {
            return Some(proxy.clone());
        }

        if !self.in_flight.insert(id) {
            warn!("Proxy {} references itself while being located", id);
            return None;
        }
        let proxy = self.new_proxy(id);
        self.in_flight.remove(&id);

        match &proxy {
            Some(proxy) => {
                debug!("Located proxy {} as {}.{}", id, proxy.group(), proxy.xml_name());
                self.cache.insert(id, proxy.clone());
            }
            None => debug!("Could not locate proxy {}", id),
        }
        proxy
    }

    /// Resolves `id` without consulting or filling the cache.
    pub fn new_proxy(&mut self, id: u32) -> Option<ProxyRc> {
        if let Strategy::IdBased(session) = &self.strategy {
            if let Some(proxy) = session.find_proxy(GlobalId::new(id)) {
                return Some(proxy);
            }
        }

        let deserializer = self.deserializer.clone()?;
        deserializer.new_proxy(id, self)
    }

    /// Returns `true` if `id` was resolved and is cached.
    #[must_use]
    pub fn is_cached(&self, id: u32) -> bool {
        self.cache.contains_key(&id)
    }

    /// Number of cached proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cached (id, proxy) pairs, sorted by id.
    #[must_use]
    pub fn located(&self) -> Vec<(u32, ProxyRc)> {
        let mut located: Vec<(u32, ProxyRc)> = self
            .cache
            .iter()
            .map(|(id, proxy)| (*id, proxy.clone()))
            .collect();
        located.sort_by_key(|(id, _)| *id);
        located
    }

    /// Drops every cached proxy.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for ProxyLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProxyLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyLocator")
            .field("cached", &self.cache.len())
            .field("deserializer", &self.deserializer.is_some())
            .field(
                "id_based",
                &matches!(self.strategy, Strategy::IdBased(_)),
            )
            .finish()
    }
}
