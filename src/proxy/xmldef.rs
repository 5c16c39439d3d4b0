//! Reader for proxy definition documents.
//!
//! The accepted layout follows the server manager configuration files:
//!
//! ```xml
//! <ServerManagerConfiguration>
//!   <ProxyGroup name="sources">
//!     <SourceProxy name="SphereSource" class="vtkSphereSource" update_command="Update">
//!       <DoubleVectorProperty name="Radius" command="SetRadius"
//!                             number_of_elements="1" default_values="0.5">
//!         <DoubleRangeDomain name="range" min="0"/>
//!       </DoubleVectorProperty>
//!       <SubProxy>
//!         <Proxy name="Shape" proxygroup="implicit_functions" proxyname="Sphere"/>
//!         <ExposedProperties>
//!           <Property name="Radius"/>
//!         </ExposedProperties>
//!       </SubProxy>
//!     </SourceProxy>
//!   </ProxyGroup>
//! </ServerManagerConfiguration>
//! ```
//!
//! Every child of a `ProxyGroup` defines one proxy, whatever its element name. Elements
//! the reader does not know (hints, documentation) are skipped.

use std::str::FromStr;

use log::debug;

use crate::{
    property::{Domain, DomainPolicy, PropertyDefinition, PropertyKind, PropertyValue},
    proxy::{ProxyDefinition, SubProxyDefinition},
    state::XmlElement,
    stream::ServerRole,
    Result,
};

/// Reads every proxy definition of a `ServerManagerConfiguration` document.
pub(crate) fn parse_definitions(text: &str) -> Result<Vec<ProxyDefinition>> {
    let root = XmlElement::parse(text)?;
    if root.name() != "ServerManagerConfiguration" {
        return Err(schema_error!(
            "Expected <ServerManagerConfiguration>, found <{}>",
            root.name()
        ));
    }

    let mut definitions = Vec::new();
    for group in root.children_named("ProxyGroup") {
        let group_name = group.required_attribute("name")?;
        for element in group.children() {
            definitions.push(parse_proxy(group_name, element)?);
        }
    }
    Ok(definitions)
}

fn parse_proxy(group: &str, element: &XmlElement) -> Result<ProxyDefinition> {
    let name = element.required_attribute("name")?;
    let mut definition = ProxyDefinition::new(group, name, element.attribute("class").unwrap_or(""));

    if let Some(servers) = element.attribute("servers") {
        definition.servers = parse_servers(servers)?;
    }
    if let Some(command) = element.attribute("update_command") {
        definition.update_command = Some(command.to_string());
    }

    for child in element.children() {
        if let Ok(kind) = PropertyKind::from_str(child.name()) {
            definition
                .properties
                .push(parse_property(kind, child)?.into());
        } else if child.name() == "SubProxy" {
            definition.sub_proxies.push(parse_sub_proxy(child)?);
        } else {
            debug!("Skipping <{}> in definition of {}.{}", child.name(), group, name);
        }
    }

    Ok(definition)
}

/// Parses a role list such as `"data_server|render_server"` or a numeric mask.
pub(crate) fn parse_servers(text: &str) -> Result<ServerRole> {
    if let Ok(bits) = text.trim().parse::<u32>() {
        return ServerRole::from_bits(bits)
            .ok_or_else(|| schema_error!("Invalid server mask {}", bits));
    }

    let mut servers = ServerRole::empty();
    for token in text
        .split(|c: char| c == '|' || c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        servers |= match token.to_ascii_lowercase().as_str() {
            "client" => ServerRole::CLIENT,
            "data_server" | "dataserver" => ServerRole::DATA_SERVER,
            "data_server_root" => ServerRole::DATA_SERVER_ROOT,
            "render_server" | "renderserver" => ServerRole::RENDER_SERVER,
            "render_server_root" => ServerRole::RENDER_SERVER_ROOT,
            "servers" => ServerRole::SERVERS,
            "client_and_servers" => ServerRole::CLIENT_AND_SERVERS,
            other => return Err(schema_error!("Unknown server role '{}'", other)),
        };
    }
    Ok(servers)
}

fn parse_property(kind: PropertyKind, element: &XmlElement) -> Result<PropertyDefinition> {
    let mut definition = PropertyDefinition::new(element.required_attribute("name")?, kind);

    definition.command = element.attribute("command").map(str::to_string);
    definition.clean_command = element.attribute("clean_command").map(str::to_string);
    definition.number_of_elements = element
        .parse_attribute("number_of_elements")?
        .unwrap_or(0);
    definition.repeat_command = element.flag_attribute("repeat_command")?;
    definition.number_of_elements_per_command = element
        .parse_attribute::<usize>("number_of_elements_per_command")?
        .unwrap_or(1)
        .max(1);
    definition.use_index = element.flag_attribute("use_index")?;
    definition.information_only = element.flag_attribute("information_only")?;

    if let Some(policy) = element.attribute("domain_policy") {
        definition.policy = Some(match policy {
            "clamp" => DomainPolicy::Clamp,
            "reject" => DomainPolicy::Reject,
            other => {
                return Err(schema_error!(
                    "Property {} has unknown domain policy '{}'",
                    definition.name,
                    other
                ))
            }
        });
    }

    if let Some(defaults) = element.attribute("default_values") {
        if kind != PropertyKind::Proxy && defaults.trim() != "none" {
            let elements: Vec<&str> = if kind == PropertyKind::String {
                vec![defaults]
            } else {
                defaults.split_whitespace().collect()
            };
            definition.default_value = Some(PropertyValue::parse_elements(kind, &elements)?);
        }
    }

    for child in element.children() {
        match parse_domain(child)? {
            Some(domain) => definition.domains.push(domain),
            None => debug!(
                "Skipping <{}> of property {}",
                child.name(),
                definition.name
            ),
        }
    }

    Ok(definition)
}

fn parse_domain(element: &XmlElement) -> Result<Option<Domain>> {
    let domain = match element.name() {
        "IntRangeDomain" => Domain::IntRange {
            min: element.parse_attribute("min")?,
            max: element.parse_attribute("max")?,
        },
        "DoubleRangeDomain" => Domain::DoubleRange {
            min: element.parse_attribute("min")?,
            max: element.parse_attribute("max")?,
        },
        "BooleanDomain" => Domain::Boolean,
        "EnumerationDomain" => {
            let mut entries = Vec::new();
            for entry in element.children_named("Entry") {
                let value = entry
                    .parse_attribute::<i64>("value")?
                    .ok_or_else(|| schema_error!("<Entry> is missing required attribute 'value'"))?;
                entries.push((entry.required_attribute("text")?.to_string(), value));
            }
            Domain::Enumeration(entries)
        }
        "StringListDomain" => Domain::StringList(
            element
                .children_named("String")
                .map(|string| string.required_attribute("value").map(str::to_string))
                .collect::<Result<Vec<_>>>()?,
        ),
        "ProxyGroupDomain" => Domain::ProxyGroup(
            element
                .children_named("Group")
                .map(|group| group.required_attribute("name").map(str::to_string))
                .collect::<Result<Vec<_>>>()?,
        ),
        _ => return Ok(None),
    };
    Ok(Some(domain))
}

fn parse_sub_proxy(element: &XmlElement) -> Result<SubProxyDefinition> {
    let Some(proxy) = element.find_child("Proxy") else {
        return Err(schema_error!("<SubProxy> has no <Proxy> child"));
    };

    let mut sub_proxy = SubProxyDefinition::new(
        proxy.required_attribute("name")?,
        proxy.required_attribute("proxygroup")?,
        proxy.required_attribute("proxyname")?,
    );

    if let Some(exposed) = element.find_child("ExposedProperties") {
        for property in exposed.children_named("Property") {
            sub_proxy
                .exposed
                .push(property.required_attribute("name")?.to_string());
        }
    }

    Ok(sub_proxy)
}
