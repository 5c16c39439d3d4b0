//! Writing `<ServerManagerState>` documents.

use std::collections::{BTreeMap, VecDeque};

use crate::{
    property::PropertyValue,
    proxy::{ProxyManager, ProxyRc},
    state::XmlElement,
    GlobalId, Result,
};

/// Collects proxies and registrations and writes them as one state document.
///
/// Every proxy added directly, every proxy they reference (transitively, including
/// references held by sub-proxies), and every proxy of an added [`ProxyManager`] is
/// written once as a top-level `<Proxy>` element, ordered by global id. Sub-proxies are
/// nested inside their parent instead of being written at the top level.
///
/// # Examples
///
/// ```rust,ignore
/// let text = StateSaver::new().add_manager(&manager).to_xml_string()?;
/// ```
#[derive(Default)]
pub struct StateSaver {
    roots: Vec<ProxyRc>,
    collections: Vec<(String, String, ProxyRc)>,
}

impl StateSaver {
    /// An empty saver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `proxy` and everything it references.
    pub fn add_proxy(&mut self, proxy: &ProxyRc) -> &mut Self {
        self.roots.push(proxy.clone());
        self
    }

    /// Adds every registration of `manager`, written as `<ProxyCollection>` elements.
    pub fn add_manager(&mut self, manager: &ProxyManager) -> &mut Self {
        for (group, name, proxy) in manager.registrations() {
            self.roots.push(proxy.clone());
            self.collections.push((group, name, proxy));
        }
        self
    }

    /// Every proxy that will be written, keyed by global id.
    #[must_use]
    pub fn collect(&self) -> BTreeMap<GlobalId, ProxyRc> {
        let mut collected = BTreeMap::new();
        let mut queue: VecDeque<ProxyRc> = self.roots.iter().cloned().collect();

        while let Some(proxy) = queue.pop_front() {
            let top = top_level(&proxy);
            if collected.contains_key(&top.global_id()) {
                continue;
            }
            collected.insert(top.global_id(), top.clone());
            queue.extend(referenced_proxies(&top));
        }

        collected
    }

    /// Builds the document.
    #[must_use]
    pub fn save(&self) -> XmlElement {
        let mut root = XmlElement::new("ServerManagerState").with_attribute("version", "1.0");

        for proxy in self.collect().values() {
            root.add_child(proxy.save_state());
        }

        let mut groups: BTreeMap<&str, XmlElement> = BTreeMap::new();
        for (group, name, proxy) in &self.collections {
            groups
                .entry(group.as_str())
                .or_insert_with(|| XmlElement::new("ProxyCollection").with_attribute("name", group.as_str()))
                .add_child(
                    XmlElement::new("Item")
                        .with_attribute("id", proxy.global_id().to_string())
                        .with_attribute("name", name.as_str()),
                );
        }
        for collection in groups.into_values() {
            root.add_child(collection);
        }

        root
    }

    /// Builds the document and serializes it.
    ///
    /// # Errors
    /// Returns [`crate::Error::Xml`] if serialization fails.
    pub fn to_xml_string(&self) -> Result<String> {
        self.save().to_xml_string()
    }
}

/// The outermost parent of `proxy`.
fn top_level(proxy: &ProxyRc) -> ProxyRc {
    let mut current = proxy.clone();
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}

/// Proxies referenced by the properties of `proxy` and of its sub-proxies.
fn referenced_proxies(proxy: &ProxyRc) -> Vec<ProxyRc> {
    let mut referenced = Vec::new();
    let mut pending = vec![proxy.clone()];

    while let Some(current) = pending.pop() {
        for name in current.own_property_names() {
            if let Some(property) = current.get_property(&name, true) {
                if let PropertyValue::Proxy(proxies) = property.value() {
                    referenced.extend(proxies);
                }
            }
        }
        pending.extend(current.sub_proxies());
    }

    referenced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::builtin_session;

    #[test]
    fn test_collects_references() {
        let (session, _server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        let shrink = session.new_proxy("filters", "Shrink").unwrap();
        let unrelated = session.new_proxy("sources", "SphereSource").unwrap();
        shrink.property("Input").unwrap().set(&sphere).unwrap();

        let mut saver = StateSaver::new();
        saver.add_proxy(&shrink);
        let collected = saver.collect();

        assert_eq!(collected.len(), 2);
        assert!(collected.contains_key(&sphere.global_id()));
        assert!(!collected.contains_key(&unrelated.global_id()));
    }

    #[test]
    fn test_sub_proxies_are_nested() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();
        let shape = glyph.get_sub_proxy("Shape").unwrap();

        let mut saver = StateSaver::new();
        saver.add_proxy(&shape);
        let state = saver.save();

        assert_eq!(state.children_named("Proxy").count(), 1);
        let glyph_id = glyph.global_id().to_string();
        assert_eq!(
            state.find_child("Proxy").unwrap().attribute("id"),
            Some(glyph_id.as_str())
        );
    }

    #[test]
    fn test_collections() {
        let (session, _server) = builtin_session();
        let manager = ProxyManager::new(session.clone());
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        manager.register_proxy("sources", "Sphere1", sphere.clone());

        let state = StateSaver::new().add_manager(&manager).save();
        let collection = state.find_child("ProxyCollection").unwrap();
        assert_eq!(collection.attribute("name"), Some("sources"));
        let item = collection.find_child("Item").unwrap();
        assert_eq!(item.attribute("name"), Some("Sphere1"));
        let sphere_id = sphere.global_id().to_string();
        assert_eq!(item.attribute("id"), Some(sphere_id.as_str()));
    }
}
