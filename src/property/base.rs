use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock, Weak,
};

use log::warn;

use crate::{
    property::{PropertyDefinition, PropertyKind, PropertyValue},
    proxy::{Proxy, ProxyRc},
    stream::{Argument, Stream},
    ObjectId, Result,
};

/// A reference to a `Property`
pub type PropertyRc = Arc<Property>;

/// A proxy that registered the property, and the name it registered it under
struct Observer {
    proxy: Weak<Proxy>,
    key: String,
}

/// A named, typed value of a proxy.
///
/// Properties are shared (`Arc`) so that one instance can be registered on a sub-proxy and
/// surface through its parent. Each registration adds an observer; every successful
/// [`Property::set`] notifies all of them, even when the value did not change. The
/// per-proxy modified flag lives in each observing proxy, not here.
///
/// The first proxy that registers a property becomes its owner. For proxy-valued
/// properties the owner is recorded as a consumer of every referenced proxy, and the
/// links follow every later change of the value.
pub struct Property {
    definition: Arc<PropertyDefinition>,
    value: RwLock<PropertyValue>,
    strict: AtomicBool,
    owner: RwLock<Weak<Proxy>>,
    observers: RwLock<Vec<Observer>>,
    self_ref: Weak<Property>,
}

impl Property {
    /// Creates a property holding the definition's default value.
    #[must_use]
    pub fn new(definition: PropertyDefinition) -> PropertyRc {
        Self::from_shared(Arc::new(definition))
    }

    /// Creates a property from a definition shared with other proxies.
    #[must_use]
    pub fn from_shared(definition: Arc<PropertyDefinition>) -> PropertyRc {
        let value = definition
            .default_value
            .clone()
            .and_then(|value| value.coerce(definition.kind))
            .unwrap_or_else(|| PropertyValue::empty(definition.kind));

        Arc::new_cyclic(|self_ref| Property {
            definition,
            value: RwLock::new(value),
            strict: AtomicBool::new(false),
            owner: RwLock::new(Weak::new()),
            observers: RwLock::new(Vec::new()),
            self_ref: self_ref.clone(),
        })
    }

    /// Name from the definition.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Element type.
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        self.definition.kind
    }

    /// The definition this property was built from.
    #[must_use]
    pub fn definition(&self) -> &PropertyDefinition {
        &self.definition
    }

    /// A copy of the current value.
    #[must_use]
    pub fn value(&self) -> PropertyValue {
        read_lock!(self.value).clone()
    }

    /// Number of elements of the current value.
    #[must_use]
    pub fn len(&self) -> usize {
        read_lock!(self.value).len()
    }

    /// Returns `true` if the current value has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read_lock!(self.value).is_empty()
    }

    /// Integer element at `index`.
    #[must_use]
    pub fn int(&self, index: usize) -> Option<i64> {
        read_lock!(self.value).int(index)
    }

    /// Double element at `index`.
    #[must_use]
    pub fn double(&self, index: usize) -> Option<f64> {
        read_lock!(self.value).double(index)
    }

    /// String element at `index`.
    #[must_use]
    pub fn string(&self, index: usize) -> Option<String> {
        read_lock!(self.value).string(index).map(str::to_string)
    }

    /// Referenced proxy at `index`.
    #[must_use]
    pub fn proxy(&self, index: usize) -> Option<ProxyRc> {
        read_lock!(self.value).proxy(index).cloned()
    }

    /// All referenced proxies.
    #[must_use]
    pub fn proxies(&self) -> Vec<ProxyRc> {
        read_lock!(self.value).proxies().to_vec()
    }

    /// Stores a new value and notifies every proxy that registered this property.
    ///
    /// The notification fires even if the value equals the current one; use
    /// [`Property::set_if_changed`] to skip redundant sets. Ranged domains may clamp the
    /// value before it is stored.
    ///
    /// # Errors
    /// Returns [`crate::Error::DomainViolation`] if the value is rejected. The previous
    /// value is kept and nobody is notified.
    pub fn set(&self, value: impl Into<PropertyValue>) -> Result<()> {
        let value = self
            .definition
            .validate(value.into(), self.strict.load(Ordering::Relaxed))?;

        let previous = std::mem::replace(&mut *write_lock!(self.value), value.clone());
        self.relink_consumers(previous.proxies(), value.proxies());
        self.notify_modified();
        Ok(())
    }

    /// Sets the value only if it differs from the current one after validation.
    ///
    /// Returns whether the value was stored.
    ///
    /// # Errors
    /// Returns [`crate::Error::DomainViolation`] if the value is rejected.
    pub fn set_if_changed(&self, value: impl Into<PropertyValue>) -> Result<bool> {
        let value = self
            .definition
            .validate(value.into(), self.strict.load(Ordering::Relaxed))?;

        if *read_lock!(self.value) == value {
            return Ok(false);
        }

        self.set(value)?;
        Ok(true)
    }

    /// Appends one proxy reference.
    ///
    /// # Errors
    /// Returns [`crate::Error::DomainViolation`] if the property is not proxy-valued or the
    /// reference is rejected.
    pub fn add_proxy(&self, proxy: &ProxyRc) -> Result<()> {
        let mut proxies = self.proxies();
        proxies.push(proxy.clone());
        self.set(proxies)
    }

    /// Removes every reference to `proxy`. Returns whether a reference was removed.
    ///
    /// # Errors
    /// Returns [`crate::Error::DomainViolation`] if the property is not proxy-valued.
    pub fn remove_proxy(&self, proxy: &ProxyRc) -> Result<bool> {
        let mut proxies = self.proxies();
        let before = proxies.len();
        proxies.retain(|existing| !Arc::ptr_eq(existing, proxy));
        if proxies.len() == before {
            return Ok(false);
        }

        self.set(proxies)?;
        Ok(true)
    }

    /// Drops every proxy reference.
    ///
    /// # Errors
    /// Returns [`crate::Error::DomainViolation`] if the property is not proxy-valued.
    pub fn remove_all_proxies(&self) -> Result<()> {
        self.set(PropertyValue::empty(PropertyKind::Proxy))
    }

    /// Notifies every registered proxy as if the value had been set.
    pub fn notify_modified(&self) {
        let observers: Vec<(ProxyRc, String)> = read_lock!(self.observers)
            .iter()
            .filter_map(|observer| Some((observer.proxy.upgrade()?, observer.key.clone())))
            .collect();

        for (proxy, key) in observers {
            proxy.property_modified(&key);
        }
    }

    /// Turns every clamping domain of this property into a rejecting one.
    pub fn enforce_strict_domains(&self) {
        self.strict.store(true, Ordering::Relaxed);
    }

    /// The proxy that registered this property first, while it is alive.
    #[must_use]
    pub fn owner(&self) -> Option<ProxyRc> {
        read_lock!(self.owner).upgrade()
    }

    /// Stores a value reported by the server without validation or notification.
    pub(crate) fn set_information(&self, value: PropertyValue) {
        *write_lock!(self.value) = value;
    }

    pub(crate) fn add_observer(&self, proxy: &ProxyRc, key: &str) {
        let mut observers = write_lock!(self.observers);
        observers.retain(|observer| observer.proxy.strong_count() > 0);
        if !observers
            .iter()
            .any(|observer| std::ptr::eq(observer.proxy.as_ptr(), Arc::as_ptr(proxy)) && observer.key == key)
        {
            observers.push(Observer {
                proxy: Arc::downgrade(proxy),
                key: key.to_string(),
            });
        }
    }

    pub(crate) fn remove_observer(&self, proxy: *const Proxy, key: &str) {
        write_lock!(self.observers).retain(|observer| {
            observer.proxy.strong_count() > 0
                && !(std::ptr::eq(observer.proxy.as_ptr(), proxy) && observer.key == key)
        });
    }

    /// Makes `proxy` the owner if the property has no live owner yet.
    ///
    /// A new owner becomes a consumer of every proxy the value references.
    pub(crate) fn claim_owner(&self, proxy: &ProxyRc) -> bool {
        {
            let mut owner = write_lock!(self.owner);
            if owner.strong_count() > 0 {
                return false;
            }
            *owner = Arc::downgrade(proxy);
        }

        self.relink_consumers(&[], &self.proxies());
        true
    }

    /// Returns `true` if `proxy` owns this property.
    pub(crate) fn is_owned_by(&self, proxy: *const Proxy) -> bool {
        std::ptr::eq(read_lock!(self.owner).as_ptr(), proxy)
    }

    fn relink_consumers(&self, previous: &[ProxyRc], current: &[ProxyRc]) {
        if previous.is_empty() && current.is_empty() {
            return;
        }
        let (Some(owner), Some(this)) = (self.owner(), self.self_ref.upgrade()) else {
            return;
        };

        for proxy in previous {
            if !current.iter().any(|kept| Arc::ptr_eq(kept, proxy)) {
                proxy.remove_consumer(&this, &owner);
            }
        }
        for proxy in current {
            if !previous.iter().any(|known| Arc::ptr_eq(known, proxy)) {
                proxy.add_consumer(&this, &owner);
            }
        }
    }

    /// Appends the invokes that push the current value to every object in `targets`.
    ///
    /// - Scalar values become one `command` invoke carrying all elements, or one invoke
    ///   per chunk for repeatable properties (prefixed by `clean_command`, and by the chunk
    ///   index when indexed).
    /// - Proxy values become one `command` invoke per reference carrying the referenced
    ///   proxy's first object id, prefixed by `clean_command`. Referenced proxies create
    ///   their objects first if needed.
    ///
    /// Information-only properties and properties without a command append nothing.
    ///
    /// # Errors
    /// Returns [`crate::Error::RemoteCallFailure`] if a referenced proxy fails to create
    /// its objects.
    pub fn append_command_to_stream(&self, stream: &mut Stream, targets: &[ObjectId]) -> Result<()> {
        let definition = &self.definition;
        let Some(command) = definition.command.as_deref() else {
            return Ok(());
        };
        if definition.information_only {
            return Ok(());
        }

        let value = self.value();
        if let PropertyValue::Proxy(proxies) = &value {
            let mut references = Vec::with_capacity(proxies.len());
            for proxy in proxies {
                proxy.create_vtk_objects(proxy.session().config().default_num_objects)?;
                match proxy.object_ids().first() {
                    Some(id) => references.push(*id),
                    None => warn!(
                        "Property {} references {}.{} which has no server object",
                        self.name(),
                        proxy.group(),
                        proxy.xml_name()
                    ),
                }
            }

            for target in targets {
                if let Some(clean) = definition.clean_command.as_deref() {
                    stream.invoke(*target, clean, []);
                }
                for reference in &references {
                    stream.invoke(*target, command, [Argument::Id(*reference)]);
                }
            }
            return Ok(());
        }

        let arguments = value.to_arguments();
        for target in targets {
            if definition.repeat_command {
                if let Some(clean) = definition.clean_command.as_deref() {
                    stream.invoke(*target, clean, []);
                }
                let per_command = definition.number_of_elements_per_command.max(1);
                for (index, chunk) in arguments.chunks(per_command).enumerate() {
                    let mut call = Vec::with_capacity(chunk.len() + 1);
                    if definition.use_index {
                        call.push(Argument::Int(index as i64));
                    }
                    call.extend_from_slice(chunk);
                    stream.invoke(*target, command, call);
                }
            } else if !arguments.is_empty() {
                stream.invoke(*target, command, arguments.iter().cloned());
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.definition.name)
            .field("value", &*read_lock!(self.value))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        property::Domain,
        stream::Command,
        test::builtin_session,
        Error,
    };

    fn radius() -> PropertyRc {
        Property::new(
            PropertyDefinition::new("Radius", PropertyKind::Double)
                .command("SetRadius")
                .elements(1)
                .default_value(0.5)
                .domain(Domain::DoubleRange {
                    min: Some(0.0),
                    max: None,
                }),
        )
    }

    #[test]
    fn test_default_and_set() {
        let property = radius();
        assert_eq!(property.double(0), Some(0.5));

        property.set(2.0).unwrap();
        assert_eq!(property.value(), PropertyValue::Double(vec![2.0]));

        property.set(-1.0).unwrap();
        assert_eq!(property.double(0), Some(0.0));
    }

    #[test]
    fn test_rejected_set_keeps_value() {
        let property = radius();
        property.enforce_strict_domains();

        assert!(matches!(
            property.set(-1.0),
            Err(Error::DomainViolation { .. })
        ));
        assert_eq!(property.double(0), Some(0.5));
        assert!(property.set("text").is_err());
    }

    #[test]
    fn test_set_if_changed() {
        let property = radius();
        assert!(!property.set_if_changed(0.5).unwrap());
        assert!(property.set_if_changed(0.75).unwrap());
    }

    #[test]
    fn test_scalar_encoding() {
        let property = radius();
        let mut stream = Stream::new();
        property
            .append_command_to_stream(&mut stream, &[ObjectId(1), ObjectId(2)])
            .unwrap();

        assert_eq!(stream.len(), 2);
        assert_eq!(stream.messages()[1].target(), Some(ObjectId(2)));
        assert_eq!(stream.messages()[1].method(), Some("SetRadius"));
        assert_eq!(
            stream.messages()[1].call_arguments(),
            &[Argument::Double(0.5)]
        );
    }

    #[test]
    fn test_repeatable_encoding() {
        let property = Property::new(
            PropertyDefinition::new("Points", PropertyKind::Double)
                .command("SetPoint")
                .clean_command("RemoveAllPoints")
                .repeatable(3)
                .indexed()
                .default_value(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]),
        );

        let mut stream = Stream::new();
        property
            .append_command_to_stream(&mut stream, &[ObjectId(5)])
            .unwrap();

        let methods: Vec<_> = stream.iter().filter_map(|m| m.method()).collect();
        assert_eq!(methods, vec!["RemoveAllPoints", "SetPoint", "SetPoint"]);
        assert_eq!(stream.messages()[2].call_arguments()[0], Argument::Int(1));
        assert_eq!(stream.messages()[2].call_arguments().len(), 4);
    }

    #[test]
    fn test_information_only_not_encoded() {
        let property = Property::new(
            PropertyDefinition::new("RadiusInfo", PropertyKind::Double)
                .command("GetRadius")
                .information_only(),
        );
        let mut stream = Stream::new();
        property
            .append_command_to_stream(&mut stream, &[ObjectId(1)])
            .unwrap();
        assert!(stream.is_empty());
    }

    #[test]
    fn test_proxy_encoding_creates_referenced_objects() {
        let (session, _server) = builtin_session();
        let sphere = session.new_proxy("sources", "SphereSource").unwrap();

        let input = Property::new(
            PropertyDefinition::new("Input", PropertyKind::Proxy)
                .command("AddInputConnection")
                .clean_command("RemoveAllInputs"),
        );
        input.add_proxy(&sphere).unwrap();

        let mut stream = Stream::new();
        input
            .append_command_to_stream(&mut stream, &[ObjectId(99)])
            .unwrap();

        assert!(sphere.objects_created());
        let reference = sphere.object_ids()[0];
        assert_eq!(stream.messages()[0].method(), Some("RemoveAllInputs"));
        assert_eq!(stream.messages()[1].command, Command::Invoke);
        assert_eq!(
            stream.messages()[1].call_arguments(),
            &[Argument::Id(reference)]
        );
    }

    #[test]
    fn test_proxy_references() {
        let (session, _server) = builtin_session();
        let first = session.new_proxy("sources", "SphereSource").unwrap();
        let second = session.new_proxy("sources", "SphereSource").unwrap();

        let input = Property::new(PropertyDefinition::new("Input", PropertyKind::Proxy));
        input.add_proxy(&first).unwrap();
        input.add_proxy(&second).unwrap();
        assert_eq!(input.len(), 2);

        assert!(input.remove_proxy(&first).unwrap());
        assert!(!input.remove_proxy(&first).unwrap());
        assert!(Arc::ptr_eq(&input.proxy(0).unwrap(), &second));

        input.remove_all_proxies().unwrap();
        assert!(input.is_empty());
    }
}
