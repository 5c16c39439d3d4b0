//! Identifiers shared between the client-side proxies and the server processes.
//!
//! - [`ObjectId`] names one server-side object. It is allocated on the client, sent inside
//!   `New` messages and used as the target of every later `Invoke`/`Delete`.
//! - [`GlobalId`] names one proxy within a session. It is the id written into saved state
//!   descriptors and the key of the session's live-proxy registry.
use std::fmt;

/// Opaque id of one server-side object.
///
/// Id `0` is reserved as the null id and is never handed out by a session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// The reserved null id
    pub const NULL: ObjectId = ObjectId(0);

    /// Creates a new id from a raw value
    #[must_use]
    pub fn new(value: u32) -> Self {
        ObjectId(value)
    }

    /// Returns the raw id value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns true if this is the null id (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for ObjectId {
    fn from(value: u32) -> Self {
        ObjectId(value)
    }
}

impl From<ObjectId> for u32 {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id{}", self.0)
    }
}

/// Session-unique id of a proxy (its "self id").
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalId(pub u32);

impl GlobalId {
    /// Creates a new id from a raw value
    #[must_use]
    pub fn new(value: u32) -> Self {
        GlobalId(value)
    }

    /// Returns the raw id value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for GlobalId {
    fn from(value: u32) -> Self {
        GlobalId(value)
    }
}

impl fmt::Debug for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalId({})", self.0)
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_object_id_null() {
        assert!(ObjectId::NULL.is_null());
        assert!(ObjectId::default().is_null());
        assert!(!ObjectId::new(7).is_null());
    }

    #[test]
    fn test_object_id_conversion() {
        let id: ObjectId = 42u32.into();
        assert_eq!(id.value(), 42);

        let raw: u32 = id.into();
        assert_eq!(raw, 42);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format!("{}", ObjectId(5)), "id5");
        assert_eq!(format!("{:?}", ObjectId(5)), "ObjectId(5)");
        assert_eq!(format!("{}", GlobalId(9)), "9");
        assert_eq!(format!("{:?}", GlobalId(9)), "GlobalId(9)");
    }

    #[test]
    fn test_ids_as_map_keys() {
        let mut map = HashMap::new();
        map.insert(GlobalId(1), "first");
        map.insert(GlobalId(2), "second");

        assert_eq!(map.get(&GlobalId(1)), Some(&"first"));
        assert_eq!(map.get(&GlobalId(3)), None);
        assert!(GlobalId(1) < GlobalId(2));
    }
}
