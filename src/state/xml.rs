//! A small owned DOM over `quick-xml`.
//!
//! Descriptors and definition documents are small, so both are read into an
//! [`XmlElement`] tree in one pass and walked from there. Writing goes the other way:
//! build a tree, then serialize it with [`XmlElement::to_xml_string`].

use std::{borrow::Cow, str::FromStr};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};

use crate::{Error, Result};

/// One element: name, attributes in document order, child elements and text content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    /// An element without attributes or children.
    #[must_use]
    pub fn new(name: &str) -> Self {
        XmlElement {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Parses a document and returns its root element.
    ///
    /// # Errors
    /// Returns [`Error::Xml`] if the text is not well-formed or has no root element.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            let event = reader.read_event().map_err(|err| {
                Error::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    err
                ))
            })?;

            match event {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let Some(element) = stack.pop() else {
                        return Err(Error::Xml("Unbalanced closing tag".to_string()));
                    };
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let unescaped = text
                            .unescape()
                            .map_err(|err| Error::Xml(err.to_string()))?;
                        current.text.push_str(&unescaped);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::Xml(format!("Unclosed element <{}>", stack[0].name)));
        }
        root.ok_or_else(|| Error::Xml("Document has no root element".to_string()))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut element = XmlElement::new(&String::from_utf8_lossy(start.name().as_ref()));
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|err| Error::Xml(err.to_string()))?;
            let value = attribute
                .unescape_value()
                .map_err(|err| Error::Xml(err.to_string()))?;
            element.attributes.push((
                String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                value.into_owned(),
            ));
        }
        Ok(element)
    }

    fn attach(
        stack: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        element: XmlElement,
    ) -> Result<()> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_none() => *root = Some(element),
            None => {
                return Err(Error::Xml(format!(
                    "Second root element <{}>",
                    element.name
                )))
            }
        }
        Ok(())
    }

    /// Serializes the tree, with an XML declaration and two-space indentation.
    ///
    /// # Errors
    /// Returns [`Error::Xml`] if writing fails.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
            .map_err(|err| Error::Xml(err.to_string()))?;
        self.write(&mut writer)?;

        String::from_utf8(writer.into_inner()).map_err(|err| Error::Xml(err.to_string()))
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|err| Error::Xml(err.to_string()));
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|err| Error::Xml(err.to_string()))?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(|err| Error::Xml(err.to_string()))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|err| Error::Xml(err.to_string()))?;
        Ok(())
    }

    /// Element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text content, concatenated and trimmed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text content.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    /// Value of attribute `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of attribute `name`, or a schema error naming the element if it is missing.
    ///
    /// # Errors
    /// Returns [`Error::SchemaError`] if the attribute is absent.
    pub fn required_attribute(&self, name: &str) -> Result<&str> {
        self.attribute(name).ok_or_else(|| {
            schema_error!("<{}> is missing required attribute '{}'", self.name, name)
        })
    }

    /// Parses attribute `name`. Returns `Ok(None)` if it is absent.
    ///
    /// # Errors
    /// Returns [`Error::SchemaError`] if the attribute is present but does not parse.
    pub fn parse_attribute<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.attribute(name) {
            None => Ok(None),
            Some(text) => text.trim().parse::<T>().map(Some).map_err(|_| {
                schema_error!(
                    "<{}> attribute '{}' has invalid value '{}'",
                    self.name,
                    name,
                    text
                )
            }),
        }
    }

    /// Reads a boolean attribute written as `0`/`1` or `false`/`true`.
    ///
    /// # Errors
    /// Returns [`Error::SchemaError`] for any other value.
    pub fn flag_attribute(&self, name: &str) -> Result<bool> {
        match self.attribute(name).map(str::trim) {
            None | Some("0" | "false") => Ok(false),
            Some("1" | "true") => Ok(true),
            Some(other) => Err(schema_error!(
                "<{}> attribute '{}' is not a flag: '{}'",
                self.name,
                name,
                other
            )),
        }
    }

    /// Sets attribute `name`, replacing an existing value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Builder form of [`XmlElement::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Appends a child element.
    pub fn add_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Builder form of [`XmlElement::add_child`].
    #[must_use]
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Child elements in document order.
    #[must_use]
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Child elements named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First child element named `name`.
    #[must_use]
    pub fn find_child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// First descendant (depth first, self excluded) named `name` whose attribute `key`
    /// equals `value`.
    #[must_use]
    pub fn find_descendant(&self, name: &str, key: &str, value: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == name && child.attribute(key) == Some(value) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(name, key, value) {
                return Some(found);
            }
        }
        None
    }

    /// Text of the first child named `name`, or of its `value` attribute.
    #[must_use]
    pub fn child_value(&self, name: &str) -> Option<Cow<'_, str>> {
        let child = self.find_child(name)?;
        match child.attribute("value") {
            Some(value) => Some(Cow::Borrowed(value)),
            None => Some(Cow::Borrowed(child.text())),
        }
    }
}
