use std::{
    collections::HashSet,
    sync::{Arc, PoisonError, RwLock, Weak},
};

use log::{debug, warn};

use crate::{
    property::{Property, PropertyRc, PropertyValue},
    proxy::{
        graph::ConsumerGraph,
        internals::{ConsumerEntry, PropertyEntry, ProxyInternals, SubProxyEntry},
        PropertyIterator, ProxyDefinition,
    },
    session::Session,
    stream::{ServerRole, Stream},
    Error, GlobalId, ObjectId, Result,
};

/// A reference to a `Proxy`
pub type ProxyRc = Arc<Proxy>;

/// Lifecycle of a proxy's server-side objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ProxyState {
    /// No server objects exist yet
    Uninitialized,
    /// Objects exist but nothing was pushed yet
    ObjectsCreated,
    /// A property or an upstream proxy changed since the last push
    Modified,
    /// The server objects match the client-side state
    Synced,
}

/// Client-side stand-in for one or more server-side objects.
///
/// A proxy owns its properties (by name) and its sub-proxies (by name), allocates object
/// ids on first use, and pushes modified property values to the servers in one stream per
/// update. Proxies that reference this one through a proxy-valued property are tracked as
/// consumers and are flagged whenever this proxy changes.
///
/// Proxies are always handled through [`ProxyRc`]. Dropping the last reference deletes
/// the server objects.
pub struct Proxy {
    session: Arc<Session>,
    definition: Arc<ProxyDefinition>,
    global_id: GlobalId,
    self_ref: Weak<Proxy>,
    internals: RwLock<ProxyInternals>,
}

impl Proxy {
    /// Builds a proxy from `definition`: one property per property definition, and one
    /// sub-proxy per slot, created through the session's factory.
    ///
    /// # Errors
    /// Returns [`Error::UnknownProxyType`] if a sub-proxy definition is missing, or
    /// [`Error::UnresolvedName`] if an exposed property does not exist on its sub-proxy.
    pub fn from_definition(
        session: &Arc<Session>,
        definition: Arc<ProxyDefinition>,
    ) -> Result<ProxyRc> {
        let servers = definition.servers;
        let global_id = session.allocate_global_id();
        let proxy = Arc::new_cyclic(|self_ref| Proxy {
            session: session.clone(),
            definition,
            global_id,
            self_ref: self_ref.clone(),
            internals: RwLock::new(ProxyInternals::new(servers)),
        });
        session.register_live(&proxy);

        for property in &proxy.definition.properties {
            proxy.add_property_to_self(&property.name, Property::from_shared(property.clone()));
        }

        for slot in &proxy.definition.sub_proxies {
            if slot.group == proxy.definition.group && slot.proxy_name == proxy.definition.name {
                return Err(schema_error!(
                    "Proxy {}.{} contains itself as sub-proxy '{}'",
                    slot.group,
                    slot.proxy_name,
                    slot.name
                ));
            }

            let sub_proxy = session.new_proxy(&slot.group, &slot.proxy_name)?;
            proxy.add_sub_proxy(&slot.name, sub_proxy);
            for name in &slot.exposed {
                proxy.expose_property(&slot.name, name)?;
            }
        }

        debug!(
            "Created proxy {}.{} ({})",
            proxy.group(),
            proxy.xml_name(),
            global_id
        );
        Ok(proxy)
    }

    /// Definition group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.definition.group
    }

    /// Definition name within the group.
    #[must_use]
    pub fn xml_name(&self) -> &str {
        &self.definition.name
    }

    /// Class instantiated on the servers.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.definition.class_name
    }

    /// The definition this proxy was built from.
    #[must_use]
    pub fn definition(&self) -> &ProxyDefinition {
        &self.definition
    }

    /// The session this proxy lives in.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Session-unique id, used in saved state.
    #[must_use]
    pub fn global_id(&self) -> GlobalId {
        self.global_id
    }

    /// Ids of the server objects; empty until [`Proxy::create_vtk_objects`].
    #[must_use]
    pub fn object_ids(&self) -> Vec<ObjectId> {
        read_lock!(self.internals).object_ids.clone()
    }

    /// Id of the server object at `index`.
    #[must_use]
    pub fn id(&self, index: usize) -> Option<ObjectId> {
        read_lock!(self.internals).object_ids.get(index).copied()
    }

    /// Returns `true` once [`Proxy::create_vtk_objects`] has run.
    #[must_use]
    pub fn objects_created(&self) -> bool {
        read_lock!(self.internals).objects_created
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProxyState {
        let (created, needs_update, synced, sub_proxies) = with_read!(
            self.internals,
            |internals: &ProxyInternals| (
                internals.objects_created,
                internals.needs_update,
                internals.synced,
                internals.sub_proxy_list()
            )
        );

        if !created {
            ProxyState::Uninitialized
        } else if needs_update
            || sub_proxies
                .iter()
                .any(|sub_proxy| sub_proxy.state() == ProxyState::Modified)
        {
            ProxyState::Modified
        } else if synced {
            ProxyState::Synced
        } else {
            ProxyState::ObjectsCreated
        }
    }

    /// The proxy this one is a sub-proxy of.
    #[must_use]
    pub fn parent(&self) -> Option<ProxyRc> {
        read_lock!(self.internals).parent.upgrade()
    }

    // Properties

    /// Registers `property` under `name`.
    ///
    /// If self or any sub-proxy (searched recursively) already has a property of that
    /// name, it is replaced in place there, so the name keeps resolving to the same slot.
    /// Otherwise the property is added to self.
    pub fn add_property(&self, name: &str, property: PropertyRc) {
        match self.find_property_holder(name) {
            Some(holder) => holder.add_property_to_self(name, property),
            None => self.add_property_to_self(name, property),
        }
    }

    /// Registers `property` under `name` on the sub-proxy `sub_proxy`.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedName`] if there is no such sub-proxy.
    pub fn add_property_to(&self, sub_proxy: &str, name: &str, property: PropertyRc) -> Result<()> {
        let Some(holder) = self.get_sub_proxy(sub_proxy) else {
            return Err(Error::UnresolvedName(format!(
                "{}.{} has no sub-proxy '{}'",
                self.group(),
                self.xml_name(),
                sub_proxy
            )));
        };

        holder.add_property_to_self(name, property);
        Ok(())
    }

    /// Registers `property` under `name` on this proxy only, replacing any previous one.
    ///
    /// The entry starts out modified if the property is pushed to the server.
    pub fn add_property_to_self(&self, name: &str, property: PropertyRc) {
        let Some(this) = self.self_ref.upgrade() else {
            return;
        };

        let modified = property.definition().is_pushed();
        let replaced = write_lock!(self.internals).properties.insert(
            name.to_string(),
            PropertyEntry {
                property: property.clone(),
                modified,
            },
        );

        if let Some(previous) = replaced {
            if !Arc::ptr_eq(&previous.property, &property) {
                previous.property.remove_observer(self, name);
            }
        }

        property.add_observer(&this, name);
        property.claim_owner(&this);
        if self.session.config().strict_domains {
            property.enforce_strict_domains();
        }
    }

    /// Removes the property registered under `name`, from self or the first sub-proxy
    /// holding it.
    pub fn remove_property(&self, name: &str) -> Option<PropertyRc> {
        let removed = write_lock!(self.internals).properties.remove(name);
        if let Some(entry) = removed {
            entry.property.remove_observer(self, name);
            return Some(entry.property);
        }

        self.sub_proxies()
            .into_iter()
            .find_map(|sub_proxy| sub_proxy.remove_property(name))
    }

    /// Resolves a property name: self first, then (unless `self_only`) each sub-proxy in
    /// registration order, recursively.
    #[must_use]
    pub fn get_property(&self, name: &str, self_only: bool) -> Option<PropertyRc> {
        let own = read_lock!(self.internals)
            .properties
            .get(name)
            .map(|entry| entry.property.clone());
        if own.is_some() || self_only {
            return own;
        }

        self.sub_proxies()
            .into_iter()
            .find_map(|sub_proxy| sub_proxy.get_property(name, false))
    }

    /// Shorthand for `get_property(name, false)`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<PropertyRc> {
        self.get_property(name, false)
    }

    /// Names of the properties registered on this proxy, in iteration order.
    #[must_use]
    pub fn own_property_names(&self) -> Vec<String> {
        read_lock!(self.internals).properties.keys().cloned().collect()
    }

    /// Names of every property the iterator visits: own ones, then exposed ones.
    #[must_use]
    pub fn property_names(self: &Arc<Self>) -> Vec<String> {
        self.iter_properties().map(|(name, _)| name).collect()
    }

    /// Iterates own properties followed by the exposed properties of sub-proxies.
    #[must_use]
    pub fn iter_properties(self: &Arc<Self>) -> PropertyIterator {
        PropertyIterator::new(self.clone())
    }

    /// Returns `true` if the property registered on self under `name` awaits a push.
    #[must_use]
    pub fn is_property_modified(&self, name: &str) -> bool {
        read_lock!(self.internals)
            .properties
            .get(name)
            .is_some_and(|entry| entry.modified)
    }

    /// Flags every pushed property of self and all sub-proxies for the next update.
    pub fn mark_all_modified(&self) {
        {
            let mut internals = write_lock!(self.internals);
            for entry in internals.properties.values_mut() {
                entry.modified = entry.property.definition().is_pushed();
            }
            internals.needs_update = true;
        }

        for sub_proxy in self.sub_proxies() {
            sub_proxy.mark_all_modified();
        }
        self.mark_modified();
    }

    /// Called by a property registered on this proxy under `key` when its value changes.
    pub(crate) fn property_modified(&self, key: &str) {
        let known = {
            let mut guard = write_lock!(self.internals);
            let internals = &mut *guard;
            match internals.properties.get_mut(key) {
                Some(entry) => {
                    entry.modified = true;
                    internals.needs_update = true;
                    true
                }
                None => false,
            }
        };

        if known {
            self.mark_modified();
        }
    }

    /// Flags the parent chain and every transitive consumer as needing an update.
    pub fn mark_modified(&self) {
        let mut visited = HashSet::new();
        visited.insert(self as *const Proxy);
        self.mark_downstream(&mut visited);
    }

    fn mark_downstream(&self, visited: &mut HashSet<*const Proxy>) {
        let (consumers, parent) = with_read!(self.internals, |internals: &ProxyInternals| (
            internals.consumer_list(),
            internals.parent.upgrade()
        ));

        for proxy in consumers.into_iter().chain(parent) {
            if visited.insert(Arc::as_ptr(&proxy)) {
                with_write!(proxy.internals, |internals: &mut ProxyInternals| internals
                    .needs_update = true);
                proxy.mark_downstream(visited);
            }
        }
    }

    fn find_property_holder(&self, name: &str) -> Option<ProxyRc> {
        if read_lock!(self.internals).properties.contains_key(name) {
            return self.self_ref.upgrade();
        }

        self.sub_proxies()
            .into_iter()
            .find_map(|sub_proxy| sub_proxy.find_property_holder(name))
    }

    // Sub-proxies

    /// Adds `proxy` as sub-proxy `name`, replacing a previous sub-proxy of that name.
    /// Exposed property names of the slot are kept.
    pub fn add_sub_proxy(&self, name: &str, proxy: ProxyRc) {
        let replaced = {
            let mut internals = write_lock!(self.internals);
            match internals.sub_proxy_mut(name) {
                Some(entry) => Some(std::mem::replace(&mut entry.proxy, proxy.clone())),
                None => {
                    internals.sub_proxies.push(SubProxyEntry {
                        name: name.to_string(),
                        proxy: proxy.clone(),
                        exposed: Default::default(),
                    });
                    None
                }
            }
        };

        proxy.set_parent(self.self_ref.clone());
        if let Some(previous) = replaced {
            if !Arc::ptr_eq(&previous, &proxy) {
                previous.set_parent(Weak::new());
            }
        }
    }

    /// Sub-proxy registered as `name`.
    #[must_use]
    pub fn get_sub_proxy(&self, name: &str) -> Option<ProxyRc> {
        read_lock!(self.internals)
            .sub_proxy(name)
            .map(|entry| entry.proxy.clone())
    }

    /// Removes sub-proxy `name` together with its exposed property names.
    pub fn remove_sub_proxy(&self, name: &str) -> Option<ProxyRc> {
        let removed = {
            let mut internals = write_lock!(self.internals);
            let index = internals
                .sub_proxies
                .iter()
                .position(|entry| entry.name == name)?;
            internals.sub_proxies.remove(index)
        };

        removed.proxy.set_parent(Weak::new());
        Some(removed.proxy)
    }

    /// All sub-proxies in registration order.
    #[must_use]
    pub fn sub_proxies(&self) -> Vec<ProxyRc> {
        read_lock!(self.internals).sub_proxy_list()
    }

    /// Sub-proxy names in registration order.
    #[must_use]
    pub fn sub_proxy_names(&self) -> Vec<String> {
        read_lock!(self.internals)
            .sub_proxies
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Number of sub-proxies.
    #[must_use]
    pub fn number_of_sub_proxies(&self) -> usize {
        read_lock!(self.internals).sub_proxies.len()
    }

    /// Surfaces `property` of sub-proxy `sub_proxy` through this proxy's iterator.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedName`] if the sub-proxy or its property does not exist.
    pub fn expose_property(&self, sub_proxy: &str, property: &str) -> Result<()> {
        let Some(holder) = self.get_sub_proxy(sub_proxy) else {
            return Err(Error::UnresolvedName(format!(
                "{}.{} has no sub-proxy '{}'",
                self.group(),
                self.xml_name(),
                sub_proxy
            )));
        };
        if holder.get_property(property, true).is_none() {
            return Err(Error::UnresolvedName(format!(
                "sub-proxy '{sub_proxy}' has no property '{property}'"
            )));
        }

        if let Some(entry) = write_lock!(self.internals).sub_proxy_mut(sub_proxy) {
            entry.exposed.insert(property.to_string());
        }
        Ok(())
    }

    /// Property names exposed by sub-proxy `sub_proxy`, sorted.
    #[must_use]
    pub fn exposed_property_names(&self, sub_proxy: &str) -> Vec<String> {
        read_lock!(self.internals)
            .sub_proxy(sub_proxy)
            .map(|entry| entry.exposed.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn set_parent(&self, parent: Weak<Proxy>) {
        write_lock!(self.internals).parent = parent;
    }

    // Consumers

    /// Records that `consumer` references this proxy through `property`.
    pub fn add_consumer(&self, property: &PropertyRc, consumer: &ProxyRc) {
        let mut internals = write_lock!(self.internals);
        internals.consumers.retain(ConsumerEntry::is_alive);
        if !internals
            .consumers
            .iter()
            .any(|entry| entry.matches(property, Arc::as_ptr(consumer)))
        {
            internals.consumers.push(ConsumerEntry {
                property: Arc::downgrade(property),
                proxy: Arc::downgrade(consumer),
            });
        }
    }

    /// Removes the (`property`, `consumer`) pair.
    pub fn remove_consumer(&self, property: &PropertyRc, consumer: &ProxyRc) {
        write_lock!(self.internals).consumers.retain(|entry| {
            entry.is_alive() && !entry.matches(property, Arc::as_ptr(consumer))
        });
    }

    /// Forgets every consumer.
    pub fn remove_all_consumers(&self) {
        write_lock!(self.internals).consumers.clear();
    }

    /// Live consumers, each listed once, in registration order.
    #[must_use]
    pub fn consumers(&self) -> Vec<ProxyRc> {
        read_lock!(self.internals).consumer_list()
    }

    /// Number of distinct live consumers.
    #[must_use]
    pub fn number_of_consumers(&self) -> usize {
        self.consumers().len()
    }

    /// Returns `true` if `proxy` is a live consumer.
    #[must_use]
    pub fn is_consumer(&self, proxy: &ProxyRc) -> bool {
        self.consumers()
            .iter()
            .any(|consumer| Arc::ptr_eq(consumer, proxy))
    }

    fn forget_consumer(&self, consumer: *const Proxy) {
        write_lock!(self.internals)
            .consumers
            .retain(|entry| entry.is_alive() && !std::ptr::eq(entry.proxy.as_ptr(), consumer));
    }

    // Servers

    /// Roles hosting the server objects.
    #[must_use]
    pub fn servers(&self) -> ServerRole {
        read_lock!(self.internals).servers
    }

    /// Sets the hosting roles of self and every sub-proxy, recursively.
    ///
    /// Returns `false` if any of them already created its objects and kept its roles.
    pub fn set_servers(&self, servers: ServerRole) -> bool {
        let mut applied = self.set_servers_self(servers);
        for sub_proxy in self.sub_proxies() {
            applied &= sub_proxy.set_servers(servers);
        }
        applied
    }

    /// Sets the hosting roles of this proxy only.
    ///
    /// Returns `false`, leaving the roles unchanged, once the objects exist.
    pub fn set_servers_self(&self, servers: ServerRole) -> bool {
        let mut internals = write_lock!(self.internals);
        if internals.objects_created {
            warn!(
                "Servers of {}.{} cannot change after its objects were created",
                self.group(),
                self.xml_name()
            );
            return false;
        }

        internals.servers = servers;
        true
    }

    // Server objects

    /// Creates `num_objects` server objects on every role of [`Proxy::servers`], then the
    /// objects of every sub-proxy. Does nothing once the objects exist.
    ///
    /// Proxies with an empty class name, or `num_objects == 0`, create no remote objects
    /// but still count as created.
    ///
    /// # Errors
    /// Returns [`Error::RemoteCallFailure`] if a server rejected the creation of these
    /// objects or of a sub-proxy's objects, and [`Error::IdSpaceExhausted`] if the session
    /// ran out of ids. Objects already created for this proxy are deleted again and the
    /// proxy stays uninitialized, so a later call starts over.
    pub fn create_vtk_objects(&self, num_objects: usize) -> Result<()> {
        let servers = {
            let internals = read_lock!(self.internals);
            if internals.objects_created {
                return Ok(());
            }
            internals.servers
        };

        let mut ids = Vec::new();
        if !self.class_name().is_empty() && num_objects > 0 && !servers.is_empty() {
            ids = self.session.allocate_object_ids(num_objects)?;
            let mut stream = Stream::new();
            for id in &ids {
                stream.new_object(self.class_name(), *id);
            }
            self.session
                .send_stream_or_roll_back(servers, &stream, &delete_stream(&ids))?;
        }

        for sub_proxy in self.sub_proxies() {
            if let Err(err) = sub_proxy.create_vtk_objects(num_objects) {
                if let Err(delete_err) = self.session.send_stream(servers, &delete_stream(&ids)) {
                    warn!(
                        "Cannot delete objects {:?} of {}.{}: {}",
                        ids,
                        self.group(),
                        self.xml_name(),
                        delete_err
                    );
                }
                return Err(err);
            }
        }

        {
            let mut internals = write_lock!(self.internals);
            internals.object_ids = ids;
            internals.objects_created = true;
        }
        debug!(
            "Created server objects of {}.{}: {:?}",
            self.group(),
            self.xml_name(),
            self.object_ids()
        );
        Ok(())
    }

    /// Pushes every modified property to the servers.
    ///
    /// Creates the objects first if needed, then updates each sub-proxy, then sends one
    /// stream with the invokes of every modified property of self (in name order),
    /// followed by the update command if an upstream change requested one. Modified flags
    /// are cleared only after the stream was delivered.
    ///
    /// # Errors
    /// Returns [`Error::RemoteCallFailure`] if the servers rejected the stream. The flags
    /// stay set, so a later update pushes the same properties again.
    pub fn update_vtk_objects(&self) -> Result<()> {
        self.create_vtk_objects(self.session.config().default_num_objects)?;

        for sub_proxy in self.sub_proxies() {
            sub_proxy.update_vtk_objects()?;
        }

        self.push_modified_properties()
    }

    fn push_modified_properties(&self) -> Result<()> {
        let (targets, servers, pending, needs_update) = {
            let internals = read_lock!(self.internals);
            let pending: Vec<(String, PropertyRc)> = internals
                .properties
                .iter()
                .filter(|(_, entry)| entry.modified)
                .map(|(name, entry)| (name.clone(), entry.property.clone()))
                .collect();
            (
                internals.object_ids.clone(),
                internals.servers,
                pending,
                internals.needs_update,
            )
        };

        let mut stream = Stream::new();
        for (_, property) in &pending {
            property.append_command_to_stream(&mut stream, &targets)?;
        }
        if needs_update {
            if let Some(command) = self.definition.update_command.as_deref() {
                for target in &targets {
                    stream.invoke(*target, command, []);
                }
            }
        }

        self.session.send_stream(servers, &stream)?;

        let mut internals = write_lock!(self.internals);
        for (name, property) in &pending {
            if let Some(entry) = internals.properties.get_mut(name) {
                if Arc::ptr_eq(&entry.property, property) {
                    entry.modified = false;
                }
            }
        }
        internals.needs_update = false;
        internals.synced = true;
        Ok(())
    }

    /// Updates this proxy and then every transitive consumer exactly once.
    ///
    /// Consumers are updated level by level: a proxy is updated only after every proxy it
    /// consumes inside the affected set. Within a level, proxies are ordered by global id.
    ///
    /// # Errors
    /// Returns [`Error::GraphError`] if the consumers form a cycle or the graph is deeper
    /// than [`SessionConfig::max_graph_depth`](crate::SessionConfig::max_graph_depth),
    /// and the first [`Error::RemoteCallFailure`] of any update.
    pub fn update_self_and_all_inputs(self: &Arc<Self>) -> Result<()> {
        let graph = ConsumerGraph::build(self, self.session.config().max_graph_depth)?;

        for level in graph.topological_levels()? {
            for proxy in level {
                proxy.update_vtk_objects()?;
            }
        }
        Ok(())
    }

    /// Refreshes every information-only property of self and all sub-proxies from the
    /// primary server, without marking anything modified.
    ///
    /// # Errors
    /// Returns [`Error::RemoteCallFailure`] if a query failed.
    pub fn update_property_information(&self) -> Result<()> {
        self.create_vtk_objects(self.session.config().default_num_objects)?;

        for sub_proxy in self.sub_proxies() {
            sub_proxy.update_property_information()?;
        }

        let (target, servers, information) = {
            let internals = read_lock!(self.internals);
            let information: Vec<PropertyRc> = internals
                .properties
                .values()
                .filter(|entry| {
                    let definition = entry.property.definition();
                    definition.information_only && definition.command.is_some()
                })
                .map(|entry| entry.property.clone())
                .collect();
            (internals.object_ids.first().copied(), internals.servers, information)
        };

        let Some(target) = target else {
            return Ok(());
        };

        for property in information {
            let Some(command) = property.definition().command.as_deref() else {
                continue;
            };

            let mut stream = Stream::new();
            stream.invoke(target, command, []);
            let result = self.session.query(servers, &stream)?;

            match PropertyValue::from_arguments(property.kind(), &result) {
                Some(value) => property.set_information(value),
                None => warn!(
                    "Reply to {} does not fit information property {}",
                    command,
                    property.name()
                ),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("group", &self.group())
            .field("name", &self.xml_name())
            .field("global_id", &self.global_id)
            .finish_non_exhaustive()
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        let this: *const Proxy = self;
        self.session.unregister_live(self.global_id);

        let internals = self
            .internals
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        for (name, entry) in &internals.properties {
            entry.property.remove_observer(this, name);
            if entry.property.is_owned_by(this) {
                for producer in entry.property.proxies() {
                    producer.forget_consumer(this);
                }
            }
        }

        if internals.object_ids.is_empty() {
            return;
        }

        let stream = delete_stream(&internals.object_ids);
        if let Err(err) = self.session.send_stream(internals.servers, &stream) {
            warn!(
                "Failed to delete server objects of {}.{}: {}",
                self.definition.group, self.definition.name, err
            );
        }
    }
}

/// One `Delete` per id.
fn delete_stream(ids: &[ObjectId]) -> Stream {
    let mut stream = Stream::new();
    for id in ids {
        stream.delete(*id);
    }
    stream
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        property::{PropertyDefinition, PropertyKind},
        server::InProcessServer,
        stream::Argument,
        test::{builtin_session, factory},
    };

    #[test]
    fn test_get_property_returns_same_instance() {
        let (session, _server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();

        let first = sphere.get_property("Radius", false).unwrap();
        let second = sphere.get_property("Radius", true).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(sphere.get_property("Missing", false).is_none());

        let replacement = Property::new(PropertyDefinition::new("Radius", PropertyKind::Double));
        sphere.add_property("Radius", replacement.clone());
        assert!(Arc::ptr_eq(&sphere.property("Radius").unwrap(), &replacement));
    }

    #[test]
    fn test_add_property_replaces_in_sub_proxy() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();
        let shape = glyph.get_sub_proxy("Shape").unwrap();

        assert!(glyph.get_property("Radius", true).is_none());
        assert!(Arc::ptr_eq(
            &glyph.property("Radius").unwrap(),
            &shape.get_property("Radius", true).unwrap()
        ));

        let replacement = Property::new(PropertyDefinition::new("Radius", PropertyKind::Double));
        glyph.add_property("Radius", replacement.clone());
        assert!(glyph.get_property("Radius", true).is_none());
        assert!(Arc::ptr_eq(
            &shape.get_property("Radius", true).unwrap(),
            &replacement
        ));

        let extra = Property::new(PropertyDefinition::new("Extra", PropertyKind::Int));
        glyph.add_property("Extra", extra.clone());
        assert!(Arc::ptr_eq(&glyph.get_property("Extra", true).unwrap(), &extra));
    }

    #[test]
    fn test_add_property_to_named_sub_proxy() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();
        let extra = Property::new(PropertyDefinition::new("Extra", PropertyKind::Int));

        glyph.add_property_to("Shape", "Extra", extra.clone()).unwrap();
        assert!(glyph.get_property("Extra", true).is_none());
        assert!(Arc::ptr_eq(&glyph.property("Extra").unwrap(), &extra));

        assert!(matches!(
            glyph.add_property_to("Nope", "Extra", extra),
            Err(Error::UnresolvedName(_))
        ));
        assert!(matches!(
            glyph.expose_property("Shape", "Nope"),
            Err(Error::UnresolvedName(_))
        ));
    }

    #[test]
    fn test_create_is_idempotent() {
        let (session, server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();
        assert_eq!(glyph.state(), ProxyState::Uninitialized);
        assert!(glyph.object_ids().is_empty());

        glyph.create_vtk_objects(1).unwrap();
        let ids = glyph.object_ids();
        glyph.create_vtk_objects(1).unwrap();

        assert_eq!(ids.len(), 1);
        assert_eq!(glyph.object_ids(), ids);
        assert_eq!(glyph.state(), ProxyState::ObjectsCreated);
        assert!(glyph.get_sub_proxy("Shape").unwrap().objects_created());
        assert_eq!(server.with_interpreter(|i| i.object_count()), 2);
        assert_eq!(
            server.with_interpreter(|i| i.object(ids[0]).unwrap().class_name().to_string()),
            "vtkGlyph3D"
        );
    }

    #[test]
    fn test_client_only_proxy_creates_nothing_remote() {
        let (session, server) = builtin_session();
        let settings = session.new_proxy("misc", "Settings").unwrap();

        settings.update_vtk_objects().unwrap();
        assert!(settings.objects_created());
        assert!(settings.object_ids().is_empty());
        assert_eq!(server.with_interpreter(|i| i.object_count()), 0);
    }

    #[test]
    fn test_update_pushes_modified_properties() {
        let (session, server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        assert!(sphere.is_property_modified("Radius"));
        assert!(!sphere.is_property_modified("NumberOfPoints"));

        sphere.update_vtk_objects().unwrap();
        let id = sphere.id(0).unwrap();
        assert_eq!(sphere.state(), ProxyState::Synced);
        assert!(!sphere.is_property_modified("Radius"));
        server.with_interpreter(|interpreter| {
            let object = interpreter.object(id).unwrap();
            assert_eq!(object.value("Radius"), Some(&[Argument::Double(0.5)][..]));
            assert_eq!(object.value("ThetaResolution"), Some(&[Argument::Int(8)][..]));
            assert_eq!(interpreter.invocation_count(id, "Update"), 0);
            interpreter.clear_log();
        });

        sphere.property("Radius").unwrap().set(2.0).unwrap();
        assert_eq!(sphere.state(), ProxyState::Modified);
        sphere.update_vtk_objects().unwrap();

        server.with_interpreter(|interpreter| {
            assert_eq!(interpreter.invocation_count(id, "SetRadius"), 1);
            assert_eq!(interpreter.invocation_count(id, "SetCenter"), 0);
            assert_eq!(interpreter.invocation_count(id, "Update"), 1);
        });
    }

    #[test]
    fn test_failed_push_keeps_flags() {
        let (session, server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        sphere.update_vtk_objects().unwrap();

        server.with_interpreter(|i| i.fail_method("SetRadius"));
        sphere.property("Radius").unwrap().set(3.0).unwrap();
        assert!(matches!(
            sphere.update_vtk_objects(),
            Err(Error::RemoteCallFailure { .. })
        ));
        assert!(sphere.is_property_modified("Radius"));
        assert_eq!(sphere.state(), ProxyState::Modified);

        server.with_interpreter(|i| i.restore_method("SetRadius"));
        sphere.update_vtk_objects().unwrap();
        assert!(!sphere.is_property_modified("Radius"));
        let id = sphere.id(0).unwrap();
        assert_eq!(
            server.with_interpreter(|i| i.object(id).unwrap().value("Radius").map(<[_]>::to_vec)),
            Some(vec![Argument::Double(3.0)])
        );
    }

    #[test]
    fn test_consumers_follow_property_values() {
        let (session, _server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        let shrink = session.new_proxy("filters", "Shrink").unwrap();
        let input = shrink.property("Input").unwrap();

        input.set(&sphere).unwrap();
        assert!(sphere.is_consumer(&shrink));
        assert_eq!(sphere.number_of_consumers(), 1);

        input.remove_all_proxies().unwrap();
        assert_eq!(sphere.number_of_consumers(), 0);

        input.set(&sphere).unwrap();
        drop(input);
        drop(shrink);
        assert_eq!(sphere.number_of_consumers(), 0);
    }

    #[test]
    fn test_modification_reaches_consumers_and_parent() {
        let (session, _server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        let shrink = session.new_proxy("filters", "Shrink").unwrap();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();
        shrink.property("Input").unwrap().set(&sphere).unwrap();

        for proxy in [&sphere, &shrink, &glyph] {
            proxy.update_vtk_objects().unwrap();
            assert_eq!(proxy.state(), ProxyState::Synced);
        }

        sphere.property("Radius").unwrap().set(1.5).unwrap();
        assert_eq!(shrink.state(), ProxyState::Modified);
        assert!(!shrink.is_property_modified("Input"));

        glyph.property("Radius").unwrap().set(1.5).unwrap();
        assert_eq!(glyph.state(), ProxyState::Modified);
        assert!(glyph
            .get_sub_proxy("Shape")
            .unwrap()
            .is_property_modified("Radius"));
    }

    #[test]
    fn test_servers_fixed_after_creation() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();

        assert!(glyph.set_servers(ServerRole::SERVERS));
        assert_eq!(
            glyph.get_sub_proxy("Shape").unwrap().servers(),
            ServerRole::SERVERS
        );

        glyph.create_vtk_objects(1).unwrap();
        assert!(!glyph.set_servers_self(ServerRole::DATA_SERVER));
        assert_eq!(glyph.servers(), ServerRole::SERVERS);
    }

    #[test]
    fn test_drop_deletes_server_objects() {
        let (session, server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        sphere.create_vtk_objects(2).unwrap();
        assert_eq!(sphere.object_ids().len(), 2);
        assert_eq!(server.with_interpreter(|i| i.object_count()), 2);

        drop(sphere);
        assert_eq!(server.with_interpreter(|i| i.object_count()), 0);
    }

    #[test]
    fn test_information_properties() {
        let (session, server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        sphere.update_vtk_objects().unwrap();

        let id = sphere.id(0).unwrap();
        server.with_interpreter(|interpreter| {
            interpreter
                .object_mut(id)
                .unwrap()
                .set_value("NumberOfPoints", vec![Argument::Int(42)]);
        });

        sphere.update_property_information().unwrap();
        assert_eq!(sphere.property("NumberOfPoints").unwrap().int(0), Some(42));
        assert_eq!(sphere.state(), ProxyState::Synced);
    }

    #[test]
    fn test_sub_proxy_management() {
        let (session, _server) = builtin_session();
        let holder = session.new_proxy("misc", "Holder").unwrap();
        let sphere = session.new_proxy("implicit_functions", "Sphere").unwrap();

        assert_eq!(holder.number_of_sub_proxies(), 1);
        holder.add_sub_proxy("Second", sphere.clone());
        assert_eq!(holder.sub_proxy_names(), vec!["Shape", "Second"]);
        assert!(Arc::ptr_eq(&sphere.parent().unwrap(), &holder));

        let removed = holder.remove_sub_proxy("Second").unwrap();
        assert!(Arc::ptr_eq(&removed, &sphere));
        assert!(sphere.parent().is_none());
        assert!(holder.remove_sub_proxy("Second").is_none());
    }

    #[test]
    fn test_remove_property() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();

        let radius = glyph.remove_property("Radius").unwrap();
        assert!(glyph.property("Radius").is_none());

        radius.set(9.0).unwrap();
        assert!(!glyph
            .get_sub_proxy("Shape")
            .unwrap()
            .is_property_modified("Radius"));
    }

    fn render_session() -> (Arc<Session>, InProcessServer, InProcessServer) {
        let data = InProcessServer::new();
        let render = InProcessServer::new();
        let session = Session::builder(factory())
            .data_server(data.clone())
            .render_server(render.clone())
            .build();
        (session, data, render)
    }

    #[test]
    fn test_failed_create_rolls_back_accepted_servers() {
        let (session, data, render) = render_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        assert!(sphere.set_servers(ServerRole::SERVERS));

        render.disconnect();
        assert!(matches!(
            sphere.create_vtk_objects(1),
            Err(Error::RemoteCallFailure { .. })
        ));
        assert_eq!(sphere.state(), ProxyState::Uninitialized);
        assert!(sphere.object_ids().is_empty());
        assert_eq!(data.with_interpreter(|i| i.object_count()), 0);

        render.reconnect();
        sphere.create_vtk_objects(1).unwrap();
        assert_eq!(sphere.object_ids().len(), 1);
        assert_eq!(data.with_interpreter(|i| i.object_count()), 1);
        assert_eq!(render.with_interpreter(|i| i.object_count()), 1);

        drop(sphere);
        assert_eq!(data.with_interpreter(|i| i.object_count()), 0);
        assert_eq!(render.with_interpreter(|i| i.object_count()), 0);
    }

    #[test]
    fn test_failed_sub_proxy_create_keeps_parent_uninitialized() {
        let (session, data, render) = render_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();
        let shape = glyph.get_sub_proxy("Shape").unwrap();
        assert!(shape.set_servers_self(ServerRole::SERVERS));

        render.disconnect();
        assert!(glyph.create_vtk_objects(1).is_err());
        assert_eq!(glyph.state(), ProxyState::Uninitialized);
        assert_eq!(shape.state(), ProxyState::Uninitialized);
        assert_eq!(data.with_interpreter(|i| i.object_count()), 0);

        render.reconnect();
        glyph.create_vtk_objects(1).unwrap();
        assert_eq!(glyph.state(), ProxyState::ObjectsCreated);
        assert_eq!(data.with_interpreter(|i| i.object_count()), 2);
        assert_eq!(render.with_interpreter(|i| i.object_count()), 1);
    }

    #[test]
    fn test_modified_flag_is_kept_per_proxy() {
        let (session, server) = builtin_session();
        let first = session.new_proxy("sources", "SphereSource").unwrap();
        let second = session.new_proxy("sources", "SphereSource").unwrap();
        let shared = Property::new(
            PropertyDefinition::new("Shared", PropertyKind::Double).command("SetShared"),
        );
        first.add_property("Shared", shared.clone());
        second.add_property("Shared", shared.clone());
        first.update_vtk_objects().unwrap();
        second.update_vtk_objects().unwrap();

        shared.set(7.0).unwrap();
        assert!(first.is_property_modified("Shared"));
        assert!(second.is_property_modified("Shared"));

        first.update_vtk_objects().unwrap();
        assert!(!first.is_property_modified("Shared"));
        assert!(second.is_property_modified("Shared"));
        assert_eq!(second.state(), ProxyState::Modified);

        let second_id = second.id(0).unwrap();
        assert_eq!(
            server.with_interpreter(|i| i.invocation_count(second_id, "SetShared")),
            0
        );
        second.update_vtk_objects().unwrap();
        assert!(!second.is_property_modified("Shared"));
        assert_eq!(
            server.with_interpreter(|i| i.invocation_count(second_id, "SetShared")),
            1
        );
    }
}
