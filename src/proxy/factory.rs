//! Registry of proxy definitions, keyed by (group, name).
//!
//! A [`ProxyFactory`] is handed to a [`Session`](crate::Session) at construction and is the
//! only place the session looks up definitions when creating proxies. There is no global
//! registry; two sessions built from different factories know different proxy types.
//!
//! # Thread Safety
//!
//! - Lock-free primary storage (`SkipMap`), iterated in (group, name) order
//! - Concurrent group index (`DashMap`) for listing the names of one group
//!
//! # Examples
//!
//! ```rust
//! use smproxy::proxy::{ProxyDefinition, ProxyFactory};
//!
//! let factory = ProxyFactory::new();
//! factory.register(ProxyDefinition::new("sources", "SphereSource", "vtkSphereSource"));
//!
//! assert!(factory.contains("sources", "SphereSource"));
//! assert_eq!(factory.names_in_group("sources"), vec!["SphereSource".to_string()]);
//! ```

use std::sync::Arc;

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use log::debug;

use crate::{
    proxy::{xmldef, ProxyDefinition},
    Result,
};

/// Maps (group, name) pairs to [`ProxyDefinition`]s.
#[derive(Default)]
pub struct ProxyFactory {
    /// Definitions keyed by (group, name)
    definitions: SkipMap<(String, String), Arc<ProxyDefinition>>,
    /// Names registered per group
    groups: DashMap<String, Vec<String>>,
}

impl ProxyFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        ProxyFactory {
            definitions: SkipMap::new(),
            groups: DashMap::new(),
        }
    }

    /// Registers `definition`, replacing any definition of the same (group, name).
    ///
    /// Returns the replaced definition.
    pub fn register(&self, definition: ProxyDefinition) -> Option<Arc<ProxyDefinition>> {
        let key = (definition.group.clone(), definition.name.clone());
        let previous = self
            .definitions
            .get(&key)
            .map(|entry| entry.value().clone());

        if previous.is_none() {
            self.groups
                .entry(key.0.clone())
                .or_default()
                .push(key.1.clone());
        }

        debug!("Registered proxy definition {}.{}", key.0, key.1);
        self.definitions.insert(key, Arc::new(definition));
        previous
    }

    /// Definition registered for (`group`, `name`).
    #[must_use]
    pub fn definition(&self, group: &str, name: &str) -> Option<Arc<ProxyDefinition>> {
        self.definitions
            .get(&(group.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Returns `true` if (`group`, `name`) is registered.
    #[must_use]
    pub fn contains(&self, group: &str, name: &str) -> bool {
        self.definitions
            .contains_key(&(group.to_string(), name.to_string()))
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Names of the groups with at least one definition, sorted.
    #[must_use]
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.groups.iter().map(|entry| entry.key().clone()).collect();
        groups.sort();
        groups
    }

    /// Definition names registered in `group`, in registration order.
    #[must_use]
    pub fn names_in_group(&self, group: &str) -> Vec<String> {
        self.groups
            .get(group)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Every definition, in (group, name) order.
    #[must_use]
    pub fn definitions(&self) -> Vec<Arc<ProxyDefinition>> {
        self.definitions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Registers every proxy defined in a `ServerManagerConfiguration` document.
    ///
    /// Returns the number of definitions read.
    ///
    /// # Errors
    /// Returns [`crate::Error::Xml`] if the document is not well-formed, and
    /// [`crate::Error::SchemaError`] if a proxy or property lacks a required attribute.
    /// Nothing is registered in either case.
    pub fn load_xml(&self, text: &str) -> Result<usize> {
        let definitions = xmldef::parse_definitions(text)?;
        let count = definitions.len();
        for definition in definitions {
            self.register(definition);
        }
        Ok(count)
    }
}

impl std::fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("definitions", &self.definitions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let factory = ProxyFactory::new();
        assert!(factory.is_empty());

        assert!(factory
            .register(ProxyDefinition::new("sources", "SphereSource", "vtkSphereSource"))
            .is_none());
        factory.register(ProxyDefinition::new("filters", "Shrink", "vtkShrinkFilter"));

        assert_eq!(factory.len(), 2);
        assert_eq!(
            factory.definition("sources", "SphereSource").unwrap().class_name,
            "vtkSphereSource"
        );
        assert!(factory.definition("sources", "Shrink").is_none());
        assert_eq!(factory.groups(), vec!["filters", "sources"]);
    }

    #[test]
    fn test_register_replaces() {
        let factory = ProxyFactory::new();
        factory.register(ProxyDefinition::new("sources", "Cone", "vtkConeSource"));
        let previous = factory
            .register(ProxyDefinition::new("sources", "Cone", "vtkConeSource2"))
            .unwrap();

        assert_eq!(previous.class_name, "vtkConeSource");
        assert_eq!(factory.len(), 1);
        assert_eq!(factory.names_in_group("sources"), vec!["Cone"]);
        assert_eq!(
            factory.definition("sources", "Cone").unwrap().class_name,
            "vtkConeSource2"
        );
    }

    #[test]
    fn test_load_xml() {
        let factory = ProxyFactory::new();
        let count = factory
            .load_xml(
                r#"<ServerManagerConfiguration>
                     <ProxyGroup name="sources">
                       <SourceProxy name="Cone" class="vtkConeSource"/>
                       <SourceProxy name="Line" class="vtkLineSource"/>
                     </ProxyGroup>
                   </ServerManagerConfiguration>"#,
            )
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(factory.names_in_group("sources"), vec!["Cone", "Line"]);
    }

    #[test]
    fn test_load_xml_error_registers_nothing() {
        let factory = ProxyFactory::new();
        let result = factory.load_xml(
            r#"<ServerManagerConfiguration>
                 <ProxyGroup name="sources">
                   <SourceProxy name="Cone" class="vtkConeSource"/>
                   <SourceProxy class="vtkLineSource"/>
                 </ProxyGroup>
               </ServerManagerConfiguration>"#,
        );

        assert!(matches!(result, Err(crate::Error::SchemaError { .. })));
        assert!(factory.is_empty());
    }
}
