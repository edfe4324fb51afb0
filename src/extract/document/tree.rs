//! Minimal XML tree reader
//!
//! Builds an owned element tree from a `quick-xml` event stream. Text
//! content is not retained: structural inference only needs tags, attributes
//! and element children.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::plugin::ExtractionError;

/// One element of a parsed document, with attribute order preserved.
#[derive(Debug, Clone)]
pub(crate) struct XmlNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(key, _)| key == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Children with the given local tag name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children
            .iter()
            .filter(move |child| local_name(&child.tag) == name)
    }
}

/// Strip a namespace prefix: `xs:element` -> `element`.
pub(crate) fn local_name(tag: &str) -> &str {
    tag.rsplit(':').next().unwrap_or(tag)
}

fn read_node(start: &BytesStart<'_>) -> Result<XmlNode, ExtractionError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| ExtractionError::InputData(format!("bad XML attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| ExtractionError::InputData(format!("bad XML attribute value: {}", e)))?
            .to_string();
        attributes.push((key, value));
    }
    Ok(XmlNode {
        tag,
        attributes,
        children: Vec::new(),
    })
}

/// Parse a document into its root element tree.
pub(crate) fn parse_document(xml: &str) -> Result<XmlNode, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(read_node(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let node = read_node(e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None if root.is_none() => root = Some(node),
                    None => {
                        return Err(ExtractionError::InputData(
                            "document has more than one root element".to_string(),
                        ))
                    }
                }
            }
            Ok(Event::End(_)) => {
                let node = stack.pop().ok_or_else(|| {
                    ExtractionError::InputData("unbalanced closing tag".to_string())
                })?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None if root.is_none() => root = Some(node),
                    None => {
                        return Err(ExtractionError::InputData(
                            "document has more than one root element".to_string(),
                        ))
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractionError::InputData(format!(
                    "XML parsing error at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
        }
    }

    if !stack.is_empty() {
        return Err(ExtractionError::InputData(
            "unexpected end of document".to_string(),
        ));
    }
    root.ok_or_else(|| ExtractionError::InputData("document has no root element".to_string()))
}
