//! Descriptor form of a single proxy.

use log::warn;

use crate::{
    property::{PropertyKind, PropertyRc, PropertyValue},
    proxy::{parse_servers, Proxy},
    state::{ProxyLocator, XmlElement},
    Result,
};

impl Proxy {
    /// Writes this proxy as a `<Proxy>` descriptor.
    ///
    /// Every property registered on the proxy itself is written, except information-only
    /// ones. Proxy references are written as the referenced proxy's global id. Sub-proxies
    /// are nested as `<SubProxy name id>` elements holding their own descriptor.
    #[must_use]
    pub fn save_state(&self) -> XmlElement {
        let id = self.global_id();
        let mut element = XmlElement::new("Proxy")
            .with_attribute("group", self.group())
            .with_attribute("type", self.xml_name())
            .with_attribute("id", id.to_string())
            .with_attribute("servers", self.servers().bits().to_string());

        for name in self.own_property_names() {
            let Some(property) = self.get_property(&name, true) else {
                continue;
            };
            if property.definition().information_only {
                continue;
            }
            element.add_child(save_property(&name, &property, &id.to_string()));
        }

        for name in self.sub_proxy_names() {
            if let Some(sub_proxy) = self.get_sub_proxy(&name) {
                element.add_child(
                    XmlElement::new("SubProxy")
                        .with_attribute("name", name.as_str())
                        .with_attribute("id", sub_proxy.global_id().to_string())
                        .with_child(sub_proxy.save_state()),
                );
            }
        }

        element
    }

    /// Restores property values from a `<Proxy>` descriptor written by
    /// [`Proxy::save_state`].
    ///
    /// Proxy references are resolved through `locator`. Entries that name unknown
    /// properties, carry unparsable values, or are rejected by a domain are logged and
    /// skipped; the remaining entries are still applied. Every applied value marks its
    /// property modified.
    ///
    /// # Errors
    /// Returns [`crate::Error::SchemaError`] if `element` is not a `<Proxy>` element.
    pub fn load_state(&self, element: &XmlElement, locator: &mut ProxyLocator) -> Result<()> {
        if element.name() != "Proxy" {
            return Err(schema_error!(
                "Expected <Proxy> descriptor, found <{}>",
                element.name()
            ));
        }

        if let Some(servers) = element.attribute("servers") {
            match parse_servers(servers) {
                Ok(servers) => {
                    self.set_servers_self(servers);
                }
                Err(err) => warn!("Ignoring servers of {}: {}", self.xml_name(), err),
            }
        }

        for entry in element.children_named("Property") {
            let Some(name) = entry.attribute("name") else {
                warn!("Skipping <Property> without name in {}", self.xml_name());
                continue;
            };
            let Some(property) = self.get_property(name, true) else {
                warn!(
                    "{}.{} has no property '{}', skipping",
                    self.group(),
                    self.xml_name(),
                    name
                );
                continue;
            };
            if property.definition().information_only {
                continue;
            }

            let value = match property.kind() {
                PropertyKind::Proxy => load_references(entry, locator),
                kind => match load_elements(kind, entry) {
                    Ok(value) => value,
                    Err(err) => {
                        warn!("Skipping property {}: {}", name, err);
                        continue;
                    }
                },
            };

            if let Err(err) = property.set(value) {
                warn!("Skipping property {}: {}", name, err);
            }
        }

        for entry in element.children_named("SubProxy") {
            let (Some(name), Some(state)) = (entry.attribute("name"), entry.find_child("Proxy"))
            else {
                continue;
            };
            match self.get_sub_proxy(name) {
                Some(sub_proxy) => {
                    if let Err(err) = sub_proxy.load_state(state, locator) {
                        warn!("Skipping state of sub-proxy {}: {}", name, err);
                    }
                }
                None => warn!("{} has no sub-proxy '{}', skipping", self.xml_name(), name),
            }
        }

        Ok(())
    }
}

fn save_property(name: &str, property: &PropertyRc, owner_id: &str) -> XmlElement {
    let value = property.value();
    let mut element = XmlElement::new("Property")
        .with_attribute("name", name)
        .with_attribute("id", format!("{owner_id}.{name}"))
        .with_attribute("number_of_elements", value.len().to_string());

    match &value {
        PropertyValue::Proxy(proxies) => {
            for proxy in proxies {
                element.add_child(
                    XmlElement::new("Proxy").with_attribute("value", proxy.global_id().to_string()),
                );
            }
        }
        scalar => {
            for (index, text) in scalar.element_strings().into_iter().enumerate() {
                element.add_child(
                    XmlElement::new("Element")
                        .with_attribute("index", index.to_string())
                        .with_attribute("value", text),
                );
            }
        }
    }

    element
}

fn load_elements(kind: PropertyKind, entry: &XmlElement) -> Result<PropertyValue> {
    let mut elements: Vec<(usize, &str)> = Vec::new();
    for (position, element) in entry.children_named("Element").enumerate() {
        let index = element.parse_attribute("index")?.unwrap_or(position);
        elements.push((index, element.required_attribute("value")?));
    }
    elements.sort_by_key(|(index, _)| *index);

    let texts: Vec<&str> = elements.into_iter().map(|(_, text)| text).collect();
    PropertyValue::parse_elements(kind, &texts)
}

fn load_references(entry: &XmlElement, locator: &mut ProxyLocator) -> PropertyValue {
    let mut proxies = Vec::new();
    for reference in entry.children_named("Proxy") {
        let Ok(Some(id)) = reference.parse_attribute::<u32>("value") else {
            warn!("Skipping proxy reference without a valid value");
            continue;
        };
        match locator.locate_proxy(id) {
            Some(proxy) => proxies.push(proxy),
            None => warn!("Could not locate referenced proxy {}", id),
        }
    }
    PropertyValue::Proxy(proxies)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test::builtin_session;

    #[test]
    fn test_save_scalar_and_reference() {
        let (session, _server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        let shrink = session.new_proxy("filters", "Shrink").unwrap();
        sphere.property("Radius").unwrap().set(2.5).unwrap();
        shrink.property("Input").unwrap().set(&sphere).unwrap();

        let state = sphere.save_state();
        assert_eq!(state.attribute("type"), Some("SphereSource"));
        let radius = state
            .find_descendant("Property", "name", "Radius")
            .unwrap();
        assert_eq!(radius.find_child("Element").unwrap().attribute("value"), Some("2.5"));

        let input = shrink
            .save_state()
            .find_descendant("Property", "name", "Input")
            .cloned()
            .unwrap();
        let sphere_id = sphere.global_id().to_string();
        assert_eq!(
            input.find_child("Proxy").unwrap().attribute("value"),
            Some(sphere_id.as_str())
        );
    }

    #[test]
    fn test_load_applies_and_skips() {
        let (session, _server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();

        let state = XmlElement::parse(
            r#"<Proxy group="sources" type="SphereSource" id="1">
                 <Property name="Radius"><Element index="0" value="4"/></Property>
                 <Property name="Center">
                   <Element index="2" value="3"/>
                   <Element index="0" value="1"/>
                   <Element index="1" value="2"/>
                 </Property>
                 <Property name="ThetaResolution"><Element index="0" value="many"/></Property>
                 <Property name="Missing"><Element index="0" value="1"/></Property>
               </Proxy>"#,
        )
        .unwrap();

        let mut locator = ProxyLocator::new();
        sphere.load_state(&state, &mut locator).unwrap();

        assert_eq!(sphere.property("Radius").unwrap().double(0), Some(4.0));
        assert_eq!(
            sphere.property("Center").unwrap().value(),
            PropertyValue::Double(vec![1.0, 2.0, 3.0])
        );
        assert_eq!(sphere.property("ThetaResolution").unwrap().int(0), Some(8));
    }

    #[test]
    fn test_nested_sub_proxy_state() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();
        glyph.property("Radius").unwrap().set(7.0).unwrap();

        let state = glyph.save_state();
        assert!(state.find_child("SubProxy").is_some());

        let copy = session.new_proxy("sources", "Glyph").unwrap();
        copy.load_state(&state, &mut ProxyLocator::new()).unwrap();
        assert_eq!(copy.property("Radius").unwrap().double(0), Some(7.0));
        assert!(!Arc::ptr_eq(
            &copy.property("Radius").unwrap(),
            &glyph.property("Radius").unwrap()
        ));
    }

    #[test]
    fn test_load_rejects_wrong_element() {
        let (session, _server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();
        assert!(sphere
            .load_state(&XmlElement::new("Other"), &mut ProxyLocator::new())
            .is_err());
    }
}
