//! Static description of a property, shared by every proxy built from one definition.

use crate::{
    property::{Domain, DomainPolicy, PropertyKind, PropertyValue},
    Error, Result,
};

/// Schema of one property.
///
/// Built with the consuming setters below, or read from definition XML by
/// [`ProxyFactory::load_xml`](crate::proxy::ProxyFactory::load_xml).
///
/// # Examples
///
/// ```rust
/// use smproxy::property::{Domain, PropertyDefinition, PropertyKind};
///
/// let radius = PropertyDefinition::new("Radius", PropertyKind::Double)
///     .command("SetRadius")
///     .elements(1)
///     .default_value(0.5)
///     .domain(Domain::DoubleRange { min: Some(0.0), max: None });
/// assert_eq!(radius.command.as_deref(), Some("SetRadius"));
/// ```
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    /// Property name, unique within one proxy
    pub name: String,
    /// Element type
    pub kind: PropertyKind,
    /// Method invoked on the server objects; properties without one are never pushed
    pub command: Option<String>,
    /// Required element count; 0 accepts any count
    pub number_of_elements: usize,
    /// Push elements in chunks, one invoke per chunk
    pub repeat_command: bool,
    /// Chunk size for repeated commands
    pub number_of_elements_per_command: usize,
    /// Prefix each repeated invoke with the chunk index
    pub use_index: bool,
    /// Invoked once before the repeated or proxy invokes, to reset the server side
    pub clean_command: Option<String>,
    /// Value is read from the server and never pushed
    pub information_only: bool,
    /// Initial value
    pub default_value: Option<PropertyValue>,
    /// Constraints checked on every set
    pub domains: Vec<Domain>,
    /// Overrides the per-domain default policy
    pub policy: Option<DomainPolicy>,
}

impl PropertyDefinition {
    /// A property of `kind` without command, domains or default.
    #[must_use]
    pub fn new(name: &str, kind: PropertyKind) -> Self {
        PropertyDefinition {
            name: name.to_string(),
            kind,
            command: None,
            number_of_elements: 0,
            repeat_command: false,
            number_of_elements_per_command: 1,
            use_index: false,
            clean_command: None,
            information_only: false,
            default_value: None,
            domains: Vec::new(),
            policy: None,
        }
    }

    /// Sets the server method.
    #[must_use]
    pub fn command(mut self, command: &str) -> Self {
        self.command = Some(command.to_string());
        self
    }

    /// Sets the required element count.
    #[must_use]
    pub fn elements(mut self, count: usize) -> Self {
        self.number_of_elements = count;
        self
    }

    /// Pushes the value in chunks of `per_command` elements.
    #[must_use]
    pub fn repeatable(mut self, per_command: usize) -> Self {
        self.repeat_command = true;
        self.number_of_elements_per_command = per_command.max(1);
        self
    }

    /// Prefixes repeated invokes with the chunk index.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.use_index = true;
        self
    }

    /// Sets the reset method.
    #[must_use]
    pub fn clean_command(mut self, command: &str) -> Self {
        self.clean_command = Some(command.to_string());
        self
    }

    /// Marks the property as read from the server.
    #[must_use]
    pub fn information_only(mut self) -> Self {
        self.information_only = true;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Adds a domain.
    #[must_use]
    pub fn domain(mut self, domain: Domain) -> Self {
        self.domains.push(domain);
        self
    }

    /// Forces one policy for every domain.
    #[must_use]
    pub fn policy(mut self, policy: DomainPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Returns `true` if setting values can have an effect on the server.
    #[must_use]
    pub fn is_pushed(&self) -> bool {
        self.command.is_some() && !self.information_only
    }

    /// Converts `value` to this property's kind and checks it against the element count and
    /// every domain. Ranged domains may clamp the value in place.
    ///
    /// # Errors
    /// Returns [`Error::DomainViolation`] if the kind does not match, the element count is
    /// wrong, or a domain rejects the value.
    pub fn validate(&self, value: PropertyValue, strict: bool) -> Result<PropertyValue> {
        let given = value.kind();
        let Some(mut value) = value.coerce(self.kind) else {
            return Err(Error::DomainViolation {
                property: self.name.clone(),
                message: format!("expected {:?} elements, got {:?}", self.kind, given),
            });
        };

        if self.number_of_elements > 0
            && !self.repeat_command
            && value.len() != self.number_of_elements
        {
            return Err(Error::DomainViolation {
                property: self.name.clone(),
                message: format!(
                    "expected {} elements, got {}",
                    self.number_of_elements,
                    value.len()
                ),
            });
        }

        for domain in &self.domains {
            let policy = if strict {
                DomainPolicy::Reject
            } else {
                self.policy.unwrap_or_else(|| domain.default_policy())
            };
            domain.apply(&self.name, &mut value, policy)?;
        }

        Ok(value)
    }
}
