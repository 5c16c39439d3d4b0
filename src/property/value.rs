//! Typed property values.

use std::{fmt, str::FromStr, sync::Arc};

use strum::{EnumIter, EnumString};

use crate::{proxy::ProxyRc, stream::Argument, Result};

/// Element type of a property.
///
/// Parses from the element names used in proxy definition XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString)]
pub enum PropertyKind {
    /// Vector of integers
    #[strum(serialize = "IntVectorProperty", serialize = "IdTypeVectorProperty")]
    Int,
    /// Vector of doubles
    #[strum(serialize = "DoubleVectorProperty")]
    Double,
    /// Vector of strings
    #[strum(serialize = "StringVectorProperty")]
    String,
    /// References to other proxies
    #[strum(serialize = "ProxyProperty", serialize = "InputProperty")]
    Proxy,
}

impl PropertyKind {
    /// Definition XML element name for this kind.
    #[must_use]
    pub fn element_name(self) -> &'static str {
        match self {
            PropertyKind::Int => "IntVectorProperty",
            PropertyKind::Double => "DoubleVectorProperty",
            PropertyKind::String => "StringVectorProperty",
            PropertyKind::Proxy => "ProxyProperty",
        }
    }
}

/// The value of a property: a vector of one element type.
#[derive(Clone)]
pub enum PropertyValue {
    /// Integers (also booleans and enumerations)
    Int(Vec<i64>),
    /// Doubles
    Double(Vec<f64>),
    /// Strings
    String(Vec<String>),
    /// Proxy references, in order
    Proxy(Vec<ProxyRc>),
}

impl PropertyValue {
    /// An empty value of `kind`.
    #[must_use]
    pub fn empty(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Int => PropertyValue::Int(Vec::new()),
            PropertyKind::Double => PropertyValue::Double(Vec::new()),
            PropertyKind::String => PropertyValue::String(Vec::new()),
            PropertyKind::Proxy => PropertyValue::Proxy(Vec::new()),
        }
    }

    /// Element type of this value.
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Int(_) => PropertyKind::Int,
            PropertyValue::Double(_) => PropertyKind::Double,
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Proxy(_) => PropertyKind::Proxy,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            PropertyValue::Int(values) => values.len(),
            PropertyValue::Double(values) => values.len(),
            PropertyValue::String(values) => values.len(),
            PropertyValue::Proxy(values) => values.len(),
        }
    }

    /// Returns `true` if the value has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts the value to `kind` where that is lossless: same kind, or integers widened
    /// to doubles.
    #[must_use]
    pub fn coerce(self, kind: PropertyKind) -> Option<Self> {
        match (self, kind) {
            (value, kind) if value.kind() == kind => Some(value),
            (PropertyValue::Int(values), PropertyKind::Double) => Some(PropertyValue::Double(
                values.into_iter().map(|value| value as f64).collect(),
            )),
            _ => None,
        }
    }

    /// Stream arguments for every element of a scalar value. Proxy values yield nothing;
    /// their encoding needs the referenced proxies' object ids.
    #[must_use]
    pub fn to_arguments(&self) -> Vec<Argument> {
        match self {
            PropertyValue::Int(values) => values.iter().copied().map(Argument::Int).collect(),
            PropertyValue::Double(values) => {
                values.iter().copied().map(Argument::Double).collect()
            }
            PropertyValue::String(values) => values.iter().cloned().map(Argument::String).collect(),
            PropertyValue::Proxy(_) => Vec::new(),
        }
    }

    /// Builds a scalar value of `kind` from reply arguments.
    ///
    /// Returns `None` for proxy kinds and for arguments that do not convert.
    #[must_use]
    pub fn from_arguments(kind: PropertyKind, arguments: &[Argument]) -> Option<Self> {
        match kind {
            PropertyKind::Int => arguments
                .iter()
                .map(Argument::as_int)
                .collect::<Option<Vec<_>>>()
                .map(PropertyValue::Int),
            PropertyKind::Double => arguments
                .iter()
                .map(Argument::as_double)
                .collect::<Option<Vec<_>>>()
                .map(PropertyValue::Double),
            PropertyKind::String => arguments
                .iter()
                .map(|argument| argument.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(PropertyValue::String),
            PropertyKind::Proxy => None,
        }
    }

    /// Text form of every element of a scalar value, as written into state descriptors.
    #[must_use]
    pub fn element_strings(&self) -> Vec<String> {
        match self {
            PropertyValue::Int(values) => values.iter().map(ToString::to_string).collect(),
            PropertyValue::Double(values) => values.iter().map(ToString::to_string).collect(),
            PropertyValue::String(values) => values.clone(),
            PropertyValue::Proxy(_) => Vec::new(),
        }
    }

    /// Parses a scalar value of `kind` from element texts.
    ///
    /// # Errors
    /// Returns [`crate::Error::SchemaError`] for proxy kinds or unparsable numbers.
    pub fn parse_elements(kind: PropertyKind, elements: &[&str]) -> Result<Self> {
        fn parse_all<T: FromStr>(elements: &[&str]) -> Result<Vec<T>> {
            elements
                .iter()
                .map(|text| {
                    text.trim()
                        .parse::<T>()
                        .map_err(|_| schema_error!("Invalid element value '{}'", text))
                })
                .collect()
        }

        match kind {
            PropertyKind::Int => Ok(PropertyValue::Int(parse_all(elements)?)),
            PropertyKind::Double => Ok(PropertyValue::Double(parse_all(elements)?)),
            PropertyKind::String => Ok(PropertyValue::String(
                elements.iter().map(|text| (*text).to_string()).collect(),
            )),
            PropertyKind::Proxy => Err(schema_error!(
                "Proxy values cannot be parsed from element text"
            )),
        }
    }

    /// Integer element at `index`.
    #[must_use]
    pub fn int(&self, index: usize) -> Option<i64> {
        match self {
            PropertyValue::Int(values) => values.get(index).copied(),
            _ => None,
        }
    }

    /// Double element at `index`; integers are widened.
    #[must_use]
    pub fn double(&self, index: usize) -> Option<f64> {
        match self {
            PropertyValue::Double(values) => values.get(index).copied(),
            PropertyValue::Int(values) => values.get(index).map(|value| *value as f64),
            _ => None,
        }
    }

    /// String element at `index`.
    #[must_use]
    pub fn string(&self, index: usize) -> Option<&str> {
        match self {
            PropertyValue::String(values) => values.get(index).map(String::as_str),
            _ => None,
        }
    }

    /// Referenced proxy at `index`.
    #[must_use]
    pub fn proxy(&self, index: usize) -> Option<&ProxyRc> {
        match self {
            PropertyValue::Proxy(values) => values.get(index),
            _ => None,
        }
    }

    /// All referenced proxies; empty for scalar values.
    #[must_use]
    pub fn proxies(&self) -> &[ProxyRc] {
        match self {
            PropertyValue::Proxy(values) => values,
            _ => &[],
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a == b,
            (PropertyValue::Double(a), PropertyValue::Double(b)) => a == b,
            (PropertyValue::String(a), PropertyValue::String(b)) => a == b,
            (PropertyValue::Proxy(a), PropertyValue::Proxy(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| Arc::ptr_eq(a, b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(values) => f.debug_tuple("Int").field(values).finish(),
            PropertyValue::Double(values) => f.debug_tuple("Double").field(values).finish(),
            PropertyValue::String(values) => f.debug_tuple("String").field(values).finish(),
            PropertyValue::Proxy(values) => f
                .debug_tuple("Proxy")
                .field(&values.iter().map(|proxy| proxy.global_id()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(vec![value])
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(vec![i64::from(value)])
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Int(vec![i64::from(value)])
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(vec![value])
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(vec![value.to_string()])
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(vec![value])
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(values: Vec<i64>) -> Self {
        PropertyValue::Int(values)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(values: Vec<f64>) -> Self {
        PropertyValue::Double(values)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(values: Vec<String>) -> Self {
        PropertyValue::String(values)
    }
}

impl From<Vec<&str>> for PropertyValue {
    fn from(values: Vec<&str>) -> Self {
        PropertyValue::String(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[i64; N]> for PropertyValue {
    fn from(values: [i64; N]) -> Self {
        PropertyValue::Int(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for PropertyValue {
    fn from(values: [f64; N]) -> Self {
        PropertyValue::Double(values.to_vec())
    }
}

impl From<ProxyRc> for PropertyValue {
    fn from(proxy: ProxyRc) -> Self {
        PropertyValue::Proxy(vec![proxy])
    }
}

impl From<&ProxyRc> for PropertyValue {
    fn from(proxy: &ProxyRc) -> Self {
        PropertyValue::Proxy(vec![proxy.clone()])
    }
}

impl From<Vec<ProxyRc>> for PropertyValue {
    fn from(proxies: Vec<ProxyRc>) -> Self {
        PropertyValue::Proxy(proxies)
    }
}
