//! Two-level traversal of a proxy's properties.
//!
//! [`PropertyIterator`] visits every property registered on the proxy itself, in name
//! order, then walks the sub-proxies in registration order and visits those of their
//! properties that the parent exposes. Non-exposed sub-proxy properties are never
//! produced. The exposed set is consulted on every step, so exposing or hiding a property
//! mid-iteration takes effect for positions not yet reached.

use crate::{property::PropertyRc, proxy::ProxyRc};

enum Position {
    Root {
        keys: Vec<String>,
        index: usize,
    },
    SubProxy {
        slot: usize,
        name: String,
        proxy: ProxyRc,
        keys: Vec<String>,
        index: usize,
    },
    End,
}

enum Step {
    Stay,
    Skip,
    Enter(usize),
    Finish,
}

/// Cursor over the properties of one proxy.
///
/// Use it either as a cursor (`begin` / `advance` / `is_at_end` / `key` / `property`) or
/// as an [`Iterator`] of `(name, property)` pairs.
///
/// # Examples
///
/// ```rust,ignore
/// let mut cursor = PropertyIterator::new(proxy.clone());
/// while !cursor.is_at_end() {
///     println!("{}", cursor.key().unwrap());
///     cursor.advance();
/// }
/// ```
pub struct PropertyIterator {
    proxy: ProxyRc,
    traverse_sub_proxies: bool,
    position: Position,
}

impl PropertyIterator {
    /// Creates an iterator positioned on the first property of `proxy`.
    #[must_use]
    pub fn new(proxy: ProxyRc) -> Self {
        let mut iterator = PropertyIterator {
            proxy,
            traverse_sub_proxies: true,
            position: Position::End,
        };
        iterator.begin();
        iterator
    }

    /// Enables or disables visiting exposed sub-proxy properties. Takes effect at the
    /// next [`PropertyIterator::begin`].
    pub fn set_traverse_sub_proxies(&mut self, traverse: bool) {
        self.traverse_sub_proxies = traverse;
    }

    /// Returns `true` if exposed sub-proxy properties are visited.
    #[must_use]
    pub fn traverse_sub_proxies(&self) -> bool {
        self.traverse_sub_proxies
    }

    /// Rewinds to the first property.
    pub fn begin(&mut self) {
        self.position = Position::Root {
            keys: self.proxy.own_property_names(),
            index: 0,
        };
        self.settle();
    }

    /// Moves to the next visible property.
    pub fn advance(&mut self) {
        match &mut self.position {
            Position::Root { index, .. } | Position::SubProxy { index, .. } => *index += 1,
            Position::End => return,
        }
        self.settle();
    }

    /// Returns `true` once every property was visited.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        matches!(self.position, Position::End)
    }

    /// Name of the current property.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match &self.position {
            Position::Root { keys, index } | Position::SubProxy { keys, index, .. } => {
                keys.get(*index).map(String::as_str)
            }
            Position::End => None,
        }
    }

    /// The current property.
    #[must_use]
    pub fn property(&self) -> Option<PropertyRc> {
        let key = self.key()?;
        self.holder()?.get_property(key, true)
    }

    /// The proxy the current property is registered on: the root proxy or a sub-proxy.
    #[must_use]
    pub fn holder(&self) -> Option<ProxyRc> {
        match &self.position {
            Position::Root { .. } => Some(self.proxy.clone()),
            Position::SubProxy { proxy, .. } => Some(proxy.clone()),
            Position::End => None,
        }
    }

    fn settle(&mut self) {
        loop {
            let step = match &self.position {
                Position::End => Step::Stay,
                Position::Root { keys, index } => {
                    if *index < keys.len() {
                        Step::Stay
                    } else if self.traverse_sub_proxies {
                        Step::Enter(0)
                    } else {
                        Step::Finish
                    }
                }
                Position::SubProxy {
                    slot,
                    name,
                    keys,
                    index,
                    ..
                } => match keys.get(*index) {
                    Some(key) => {
                        if self
                            .proxy
                            .exposed_property_names(name)
                            .iter()
                            .any(|exposed| exposed == key)
                        {
                            Step::Stay
                        } else {
                            Step::Skip
                        }
                    }
                    None => Step::Enter(slot + 1),
                },
            };

            match step {
                Step::Stay => return,
                Step::Skip => {
                    if let Position::Root { index, .. } | Position::SubProxy { index, .. } =
                        &mut self.position
                    {
                        *index += 1;
                    }
                }
                Step::Enter(slot) => self.position = self.enter_sub_proxy(slot),
                Step::Finish => {
                    self.position = Position::End;
                    return;
                }
            }
        }
    }

    fn enter_sub_proxy(&self, first_slot: usize) -> Position {
        let names = self.proxy.sub_proxy_names();
        for (slot, name) in names.into_iter().enumerate().skip(first_slot) {
            if let Some(proxy) = self.proxy.get_sub_proxy(&name) {
                return Position::SubProxy {
                    slot,
                    keys: proxy.own_property_names(),
                    name,
                    proxy,
                    index: 0,
                };
            }
        }
        Position::End
    }
}

impl Iterator for PropertyIterator {
    type Item = (String, PropertyRc);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.key()?.to_string();
            let property = self.property();
            self.advance();

            if let Some(property) = property {
                return Some((key, property));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use super::*;
    use crate::test::builtin_session;

    #[test]
    fn test_visits_own_then_exposed() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();

        let names: Vec<String> = glyph.iter_properties().map(|(name, _)| name).collect();
        let own = glyph.own_property_names();
        let exposed = glyph.exposed_property_names("Shape");

        assert_eq!(names.len(), own.len() + exposed.len());
        assert_eq!(&names[..own.len()], &own[..]);
        assert_eq!(&names[own.len()..], &exposed[..]);

        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_non_exposed_properties_skipped() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();
        let shape = glyph.get_sub_proxy("Shape").unwrap();

        assert!(shape.get_property("Center", true).is_some());
        assert!(!glyph.property_names().contains(&"Center".to_string()));
        assert!(glyph.property_names().contains(&"Radius".to_string()));
    }

    #[test]
    fn test_without_sub_proxy_traversal() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();

        let mut cursor = PropertyIterator::new(glyph.clone());
        cursor.set_traverse_sub_proxies(false);
        cursor.begin();

        let mut visited = 0;
        while !cursor.is_at_end() {
            assert!(Arc::ptr_eq(&cursor.holder().unwrap(), &glyph));
            visited += 1;
            cursor.advance();
        }
        assert_eq!(visited, glyph.own_property_names().len());
        assert!(cursor.key().is_none());
        assert!(cursor.property().is_none());
    }

    #[test]
    fn test_empty_root_starts_in_sub_proxy() {
        let (session, _server) = builtin_session();
        let holder = session.new_proxy("misc", "Holder").unwrap();

        assert!(holder.own_property_names().is_empty());
        let cursor = PropertyIterator::new(holder.clone());
        assert_eq!(cursor.key(), Some("Radius"));
        assert!(!Arc::ptr_eq(&cursor.holder().unwrap(), &holder));
    }

    #[test]
    fn test_exposure_change_takes_effect() {
        let (session, _server) = builtin_session();
        let glyph = session.new_proxy("sources", "Glyph").unwrap();
        let before = glyph.property_names().len();

        glyph.expose_property("Shape", "Center").unwrap();
        assert_eq!(glyph.property_names().len(), before + 1);
    }
}
