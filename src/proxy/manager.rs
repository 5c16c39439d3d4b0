//! Named registration of proxies.
//!
//! A [`ProxyManager`] gives proxies user-visible names inside registration groups
//! (`sources`, `lookup_tables`, ...). The registrations are what a saved state lists in its
//! `ProxyCollection` elements, and what a loaded state restores. The manager keeps the
//! registered proxies alive.
//!
//! The manager is held by the application next to the [`Session`]; the session does not
//! reference it, so dropping the manager releases every registered proxy.

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use log::debug;

use crate::{proxy::ProxyRc, session::Session};

/// Registry of (group, name) → proxy.
///
/// Removing a registration releases the manager's reference right away, so a proxy that
/// nobody else holds is dropped (and its server objects deleted) before the call returns.
pub struct ProxyManager {
    session: Arc<Session>,
    proxies: RwLock<BTreeMap<(String, String), ProxyRc>>,
}

impl ProxyManager {
    /// Creates an empty manager for the proxies of `session`.
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        ProxyManager {
            session,
            proxies: RwLock::new(BTreeMap::new()),
        }
    }

    /// The session whose proxies are registered here.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Registers `proxy` as `name` in `group`, replacing a previous registration.
    ///
    /// Returns the replaced proxy.
    pub fn register_proxy(&self, group: &str, name: &str, proxy: ProxyRc) -> Option<ProxyRc> {
        debug!(
            "Registered {}.{} ({}) as {}/{}",
            proxy.group(),
            proxy.xml_name(),
            proxy.global_id(),
            group,
            name
        );
        write_lock!(self.proxies).insert((group.to_string(), name.to_string()), proxy)
    }

    /// Removes the registration `name` in `group`.
    pub fn unregister_proxy(&self, group: &str, name: &str) -> Option<ProxyRc> {
        write_lock!(self.proxies).remove(&(group.to_string(), name.to_string()))
    }

    /// Drops every registration.
    pub fn unregister_all(&self) {
        let released = std::mem::take(&mut *write_lock!(self.proxies));
        debug!("Released {} registrations", released.len());
    }

    /// Proxy registered as `name` in `group`.
    #[must_use]
    pub fn get_proxy(&self, group: &str, name: &str) -> Option<ProxyRc> {
        read_lock!(self.proxies)
            .get(&(group.to_string(), name.to_string()))
            .cloned()
    }

    /// Registrations of `group` as (name, proxy), sorted by name.
    #[must_use]
    pub fn proxies_in_group(&self, group: &str) -> Vec<(String, ProxyRc)> {
        read_lock!(self.proxies)
            .iter()
            .filter(|((registered, _), _)| registered == group)
            .map(|((_, name), proxy)| (name.clone(), proxy.clone()))
            .collect()
    }

    /// Every registration as (group, name, proxy), sorted by group, then name.
    #[must_use]
    pub fn registrations(&self) -> Vec<(String, String, ProxyRc)> {
        read_lock!(self.proxies)
            .iter()
            .map(|((group, name), proxy)| (group.clone(), name.clone(), proxy.clone()))
            .collect()
    }

    /// Registration groups in use, sorted.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for (group, _) in read_lock!(self.proxies).keys() {
            if groups.last() != Some(group) {
                groups.push(group.clone());
            }
        }
        groups
    }

    /// The first (group, name) under which `proxy` is registered.
    #[must_use]
    pub fn registration_of(&self, proxy: &ProxyRc) -> Option<(String, String)> {
        read_lock!(self.proxies)
            .iter()
            .find(|(_, registered)| Arc::ptr_eq(registered, proxy))
            .map(|(key, _)| key.clone())
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        read_lock!(self.proxies).len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read_lock!(self.proxies).is_empty()
    }

    /// Pushes pending changes of every registered proxy.
    ///
    /// # Errors
    /// Returns the first error of [`crate::proxy::Proxy::update_vtk_objects`].
    pub fn update_registered_proxies(&self) -> crate::Result<()> {
        let proxies: Vec<ProxyRc> = read_lock!(self.proxies).values().cloned().collect();
        for proxy in proxies {
            proxy.update_vtk_objects()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProxyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyManager")
            .field("session", &self.session.connection_id())
            .field("registrations", &self.len())
            .finish()
    }
}
