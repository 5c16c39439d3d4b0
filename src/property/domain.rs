//! Value constraints attached to properties.
//!
//! A [`Domain`] describes which values a property accepts. When a value falls outside, the
//! [`DomainPolicy`] decides whether it is clamped into the domain or rejected:
//!
//! | Domain        | Applies to | Default policy |
//! |---------------|------------|----------------|
//! | `IntRange`    | `Int`      | clamp          |
//! | `DoubleRange` | `Double`   | clamp          |
//! | `Boolean`     | `Int`      | reject         |
//! | `Enumeration` | `Int`      | reject         |
//! | `StringList`  | `String`   | reject         |
//! | `ProxyGroup`  | `Proxy`    | reject         |
//!
//! Domains that do not apply to a value's kind accept it unchanged. NaN never lies inside
//! a double range and is always rejected.

use crate::{property::PropertyValue, Error, Result};

/// What happens to a value outside a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainPolicy {
    /// Move the value to the nearest bound
    Clamp,
    /// Fail the set with [`Error::DomainViolation`]
    Reject,
}

/// A constraint on property values.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// Inclusive integer bounds; `None` leaves a side open
    IntRange {
        /// Lower bound
        min: Option<i64>,
        /// Upper bound
        max: Option<i64>,
    },
    /// Inclusive double bounds; `None` leaves a side open
    DoubleRange {
        /// Lower bound
        min: Option<f64>,
        /// Upper bound
        max: Option<f64>,
    },
    /// Integers restricted to 0 and 1
    Boolean,
    /// Named integer values as (text, value) pairs
    Enumeration(Vec<(String, i64)>),
    /// Allowed strings
    StringList(Vec<String>),
    /// Referenced proxies must belong to one of these groups
    ProxyGroup(Vec<String>),
}

impl Domain {
    /// Integer range with both bounds.
    #[must_use]
    pub fn int_range(min: i64, max: i64) -> Self {
        Domain::IntRange {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Double range with both bounds.
    #[must_use]
    pub fn double_range(min: f64, max: f64) -> Self {
        Domain::DoubleRange {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Enumeration from (text, value) pairs.
    #[must_use]
    pub fn enumeration(entries: &[(&str, i64)]) -> Self {
        Domain::Enumeration(
            entries
                .iter()
                .map(|(text, value)| ((*text).to_string(), *value))
                .collect(),
        )
    }

    /// Allowed string list.
    #[must_use]
    pub fn string_list(strings: &[&str]) -> Self {
        Domain::StringList(strings.iter().map(|text| (*text).to_string()).collect())
    }

    /// Proxy group restriction.
    #[must_use]
    pub fn proxy_group(groups: &[&str]) -> Self {
        Domain::ProxyGroup(groups.iter().map(|group| (*group).to_string()).collect())
    }

    /// Policy applied when no stricter one is requested.
    #[must_use]
    pub fn default_policy(&self) -> DomainPolicy {
        match self {
            Domain::IntRange { .. } | Domain::DoubleRange { .. } => DomainPolicy::Clamp,
            Domain::Boolean
            | Domain::Enumeration(_)
            | Domain::StringList(_)
            | Domain::ProxyGroup(_) => DomainPolicy::Reject,
        }
    }

    /// Value of an enumeration entry by its text.
    #[must_use]
    pub fn enumeration_value(&self, text: &str) -> Option<i64> {
        match self {
            Domain::Enumeration(entries) => entries
                .iter()
                .find(|(entry, _)| entry == text)
                .map(|(_, value)| *value),
            _ => None,
        }
    }

    /// Returns `true` if every element of `value` lies inside the domain.
    #[must_use]
    pub fn contains(&self, value: &PropertyValue) -> bool {
        let mut probe = value.clone();
        self.apply("", &mut probe, DomainPolicy::Reject).is_ok()
    }

    /// Checks `value` against the domain, clamping it in place under
    /// [`DomainPolicy::Clamp`].
    ///
    /// # Errors
    /// Returns [`Error::DomainViolation`] naming `property` if an element is outside the
    /// domain and cannot be clamped.
    pub fn apply(&self, property: &str, value: &mut PropertyValue, policy: DomainPolicy) -> Result<()> {
        let violation = |message: String| Error::DomainViolation {
            property: property.to_string(),
            message,
        };

        match (self, value) {
            (Domain::IntRange { min, max }, PropertyValue::Int(values)) => {
                for element in values.iter_mut() {
                    let bounded = bound(*element, *min, *max);
                    if bounded != *element {
                        if policy == DomainPolicy::Reject {
                            return Err(violation(format!(
                                "{element} is outside [{}, {}]",
                                describe(*min),
                                describe(*max)
                            )));
                        }
                        *element = bounded;
                    }
                }
            }
            (Domain::DoubleRange { min, max }, PropertyValue::Double(values)) => {
                for element in values.iter_mut() {
                    if element.is_nan() {
                        return Err(violation("NaN is outside every range".to_string()));
                    }

                    let bounded = bound(*element, *min, *max);
                    if bounded != *element {
                        if policy == DomainPolicy::Reject {
                            return Err(violation(format!(
                                "{element} is outside [{}, {}]",
                                describe(*min),
                                describe(*max)
                            )));
                        }
                        *element = bounded;
                    }
                }
            }
            (Domain::Boolean, PropertyValue::Int(values)) => {
                if let Some(element) = values.iter().find(|element| !matches!(element, 0 | 1)) {
                    return Err(violation(format!("{element} is not a boolean")));
                }
            }
            (Domain::Enumeration(entries), PropertyValue::Int(values)) => {
                if let Some(element) = values
                    .iter()
                    .find(|element| !entries.iter().any(|(_, value)| value == *element))
                {
                    return Err(violation(format!("{element} is not an enumeration value")));
                }
            }
            (Domain::StringList(strings), PropertyValue::String(values)) => {
                if let Some(element) = values.iter().find(|element| !strings.contains(element)) {
                    return Err(violation(format!("'{element}' is not in the string list")));
                }
            }
            (Domain::ProxyGroup(groups), PropertyValue::Proxy(proxies)) => {
                if let Some(proxy) = proxies
                    .iter()
                    .find(|proxy| !groups.iter().any(|group| group == proxy.group()))
                {
                    return Err(violation(format!(
                        "proxy {}.{} is not in groups {:?}",
                        proxy.group(),
                        proxy.xml_name(),
                        groups
                    )));
                }
            }
            _ => {}
        }

        Ok(())
    }
}

fn bound<T: PartialOrd + Copy>(value: T, min: Option<T>, max: Option<T>) -> T {
    match (min, max) {
        (Some(min), _) if value < min => min,
        (_, Some(max)) if value > max => max,
        _ => value,
    }
}

fn describe<T: ToString>(bound: Option<T>) -> String {
    bound.map_or_else(|| "-".to_string(), |value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clamp() {
        let domain = Domain::int_range(3, 10);
        let mut value = PropertyValue::from(vec![1i64, 5, 12]);
        domain
            .apply("Resolution", &mut value, domain.default_policy())
            .unwrap();
        assert_eq!(value, PropertyValue::Int(vec![3, 5, 10]));

        let domain = Domain::DoubleRange {
            min: Some(0.0),
            max: None,
        };
        let mut value = PropertyValue::from(-0.5);
        domain.apply("Radius", &mut value, DomainPolicy::Clamp).unwrap();
        assert_eq!(value, PropertyValue::Double(vec![0.0]));

        let mut value = PropertyValue::from(1e9);
        domain.apply("Radius", &mut value, DomainPolicy::Clamp).unwrap();
        assert_eq!(value, PropertyValue::Double(vec![1e9]));
    }

    #[test]
    fn test_range_reject() {
        let domain = Domain::double_range(0.0, 1.0);
        let mut value = PropertyValue::from(1.5);

        let err = domain
            .apply("ShrinkFactor", &mut value, DomainPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, Error::DomainViolation { ref property, .. } if property == "ShrinkFactor"));
        assert_eq!(value, PropertyValue::Double(vec![1.5]));
    }

    #[test]
    fn test_nan_always_rejected() {
        let domain = Domain::DoubleRange {
            min: None,
            max: None,
        };
        let mut value = PropertyValue::from(f64::NAN);
        assert!(domain.apply("x", &mut value, DomainPolicy::Clamp).is_err());
    }

    #[test]
    fn test_enumeration_and_boolean() {
        let domain = Domain::enumeration(&[("Points", 0), ("Wireframe", 1), ("Surface", 2)]);
        assert_eq!(domain.default_policy(), DomainPolicy::Reject);
        assert_eq!(domain.enumeration_value("Surface"), Some(2));
        assert!(domain.contains(&PropertyValue::from(1)));
        assert!(!domain.contains(&PropertyValue::from(7)));

        assert!(Domain::Boolean.contains(&PropertyValue::from(true)));
        assert!(!Domain::Boolean.contains(&PropertyValue::from(2)));
    }

    #[test]
    fn test_string_list() {
        let domain = Domain::string_list(&["Normals", "TCoords"]);
        assert!(domain.contains(&PropertyValue::from("Normals")));

        let mut value = PropertyValue::from(vec!["Normals", "Scalars"]);
        assert!(domain
            .apply("Arrays", &mut value, DomainPolicy::Clamp)
            .is_err());
    }

    #[test]
    fn test_kind_mismatch_is_ignored() {
        let domain = Domain::int_range(0, 1);
        assert!(domain.contains(&PropertyValue::from("text")));
    }
}
