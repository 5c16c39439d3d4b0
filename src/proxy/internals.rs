//! Mutable bookkeeping of one proxy, guarded by the proxy's lock.
//!
//! Nothing outside `Proxy` touches these tables; other components go through the
//! proxy's accessor methods.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Weak},
};

use crate::{
    property::{Property, PropertyRc},
    proxy::{Proxy, ProxyRc},
    stream::ServerRole,
    ObjectId,
};

/// A registered property and this proxy's modified flag for it.
pub(crate) struct PropertyEntry {
    pub property: PropertyRc,
    pub modified: bool,
}

/// A sub-proxy slot and the property names it exposes.
pub(crate) struct SubProxyEntry {
    pub name: String,
    pub proxy: ProxyRc,
    pub exposed: BTreeSet<String>,
}

/// A proxy that references this one through `property`.
pub(crate) struct ConsumerEntry {
    pub property: Weak<Property>,
    pub proxy: Weak<Proxy>,
}

impl ConsumerEntry {
    pub fn is_alive(&self) -> bool {
        self.property.strong_count() > 0 && self.proxy.strong_count() > 0
    }

    pub fn matches(&self, property: &PropertyRc, proxy: *const Proxy) -> bool {
        std::ptr::eq(self.property.as_ptr(), Arc::as_ptr(property))
            && std::ptr::eq(self.proxy.as_ptr(), proxy)
    }
}

pub(crate) struct ProxyInternals {
    pub properties: BTreeMap<String, PropertyEntry>,
    pub sub_proxies: Vec<SubProxyEntry>,
    pub consumers: Vec<ConsumerEntry>,
    pub object_ids: Vec<ObjectId>,
    pub servers: ServerRole,
    pub objects_created: bool,
    pub needs_update: bool,
    pub synced: bool,
    pub parent: Weak<Proxy>,
}

impl ProxyInternals {
    pub fn new(servers: ServerRole) -> Self {
        ProxyInternals {
            properties: BTreeMap::new(),
            sub_proxies: Vec::new(),
            consumers: Vec::new(),
            object_ids: Vec::new(),
            servers,
            objects_created: false,
            needs_update: false,
            synced: false,
            parent: Weak::new(),
        }
    }

    pub fn sub_proxy(&self, name: &str) -> Option<&SubProxyEntry> {
        self.sub_proxies.iter().find(|entry| entry.name == name)
    }

    pub fn sub_proxy_mut(&mut self, name: &str) -> Option<&mut SubProxyEntry> {
        self.sub_proxies.iter_mut().find(|entry| entry.name == name)
    }

    pub fn sub_proxy_list(&self) -> Vec<ProxyRc> {
        self.sub_proxies
            .iter()
            .map(|entry| entry.proxy.clone())
            .collect()
    }

    /// Live consumer proxies, each listed once.
    pub fn consumer_list(&self) -> Vec<ProxyRc> {
        let mut consumers: Vec<ProxyRc> = Vec::new();
        for entry in &self.consumers {
            if entry.property.strong_count() == 0 {
                continue;
            }
            if let Some(proxy) = entry.proxy.upgrade() {
                if !consumers.iter().any(|known| Arc::ptr_eq(known, &proxy)) {
                    consumers.push(proxy);
                }
            }
        }
        consumers
    }
}
