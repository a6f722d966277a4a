//! A small owned element tree over `quick-xml`.
//!
//! Stanzas are tiny, so each one is parsed into a tree and matched by local
//! name. Namespace prefixes are dropped on parse; `xmlns` attributes are kept
//! as plain attributes.

use std::fmt;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::error::XmppError;

/// An XML element with its attributes, child elements, and text content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Append a child element.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Local name of the element.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of an attribute.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Text content, unescaped.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All child elements.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }

    /// Child elements with the given name.
    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'n> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children_named(name).next()
    }

    /// Follow a path of child names, taking the first match at each step.
    #[must_use]
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter()
            .try_fold(self, |element, name| element.child(name))
    }

    /// Parse a single document or stanza.
    ///
    /// # Errors
    ///
    /// Returns [`XmppError::Xml`] for malformed input and
    /// [`XmppError::Protocol`] when the input ends before the root closes.
    pub fn parse(xml: &str) -> Result<Self, XmppError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut stack: Vec<Element> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmppError::Protocol("unbalanced end tag".to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(element) = stack.last_mut() {
                        element.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(element) = stack.last_mut() {
                        element.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => {
                    return Err(XmppError::Protocol("document ended early".to_string()));
                }
                Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
            }
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmppError> {
        let mut element = Self::new(String::from_utf8_lossy(start.local_name().as_ref()));
        for attr in start.attributes() {
            let attr = attr?;
            element.attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                attr.unescape_value()?.into_owned(),
            ));
        }
        Ok(element)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}=\"{}\"", escape(value.as_str()))?;
        }
        if self.children.is_empty() && self.text.is_empty() {
            return f.write_str("/>");
        }
        write!(f, ">{}", escape(self.text.as_str()))?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "</{}>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_nested_elements_and_attributes() {
        let iq = Element::parse(
            r#"<iq type="result" from="mrha@busch-jaeger.de/rpc" id="7"><query xmlns="jabber:iq:rpc"/></iq>"#,
        )
        .unwrap();
        assert_eq!(iq.name(), "iq");
        assert_eq!(iq.attr("type"), Some("result"));
        assert_eq!(iq.attr("id"), Some("7"));
        assert_eq!(
            iq.child("query").and_then(|q| q.attr("xmlns")),
            Some("jabber:iq:rpc")
        );
    }

    #[test]
    fn should_find_children_by_name_built_at_runtime() {
        let query = Element::parse(
            "<query><value>a</value><other/><value>b</value></query>",
        )
        .unwrap();
        let found = {
            let name = String::from("value");
            query.child(&name)
        };
        assert_eq!(found.map(Element::text), Some("a"));

        let texts: Vec<&str> = query
            .children_named(&"value".to_string())
            .map(Element::text)
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn should_unescape_text() {
        let data = Element::parse("<data>&lt;project&gt;&amp;&lt;/project&gt;</data>").unwrap();
        assert_eq!(data.text(), "<project>&</project>");
    }

    #[test]
    fn should_drop_namespace_prefixes() {
        let features = Element::parse(
            "<stream:features><mechanisms><mechanism>PLAIN</mechanism></mechanisms></stream:features>",
        )
        .unwrap();
        assert_eq!(features.name(), "features");
        assert_eq!(
            features.find(&["mechanisms", "mechanism"]).map(Element::text),
            Some("PLAIN")
        );
    }

    #[test]
    fn should_reject_truncated_input() {
        assert!(Element::parse("<iq><query>").is_err());
    }

    #[test]
    fn should_escape_when_rendering() {
        let element = Element::new("value")
            .with_attr("note", "a\"b")
            .with_child(Element::new("string").with_text("1 < 2"));
        assert_eq!(
            element.to_string(),
            "<value note=\"a&quot;b\"><string>1 &lt; 2</string></value>"
        );
    }

    #[test]
    fn should_render_empty_element_self_closed() {
        assert_eq!(
            Element::new("ping").with_attr("xmlns", "urn:xmpp:ping").to_string(),
            "<ping xmlns=\"urn:xmpp:ping\"/>"
        );
    }
}
