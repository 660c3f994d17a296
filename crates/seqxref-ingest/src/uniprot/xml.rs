//! Minimal element tree over quick-xml events
//!
//! UniProt documents are small per request, so each body is materialized as
//! a tree and walked with per-level tag dispatch. Namespace prefixes are
//! dropped; only local names are kept.

use super::error::{Result, UniProtError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Concatenated character data directly inside this element
    pub text: String,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value as an owned string, `None` when absent
    pub fn attr_string(&self, name: &str) -> Option<String> {
        self.attr(name).map(str::to_string)
    }

    /// Attribute parsed as an integer, `None` when absent or not numeric
    pub fn attr_i64(&self, name: &str) -> Option<i64> {
        self.attr(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All elements below this one with the given name, depth first
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        collect_named(self, name, &mut found);
        found
    }

    /// Trimmed text content, `None` when empty
    pub fn text_value(&self) -> Option<String> {
        let text = self.text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Text content with embedded line breaks removed
    pub fn joined_text(&self) -> Option<String> {
        let text: String = self.text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

fn collect_named<'a>(element: &'a XmlElement, name: &str, found: &mut Vec<&'a XmlElement>) {
    for child in &element.children {
        if child.name == name {
            found.push(child);
        }
        collect_named(child, name, found);
    }
}

/// Parse a complete document and return its root element.
///
/// Fails on any well-formedness problem, including character data outside
/// the root element and unclosed elements at end of input.
pub fn parse_document(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                ensure_single_root(root.as_ref())?;
                stack.push(open_element(&start)?);
            },
            Event::Empty(start) => {
                ensure_single_root(root.as_ref())?;
                let element = open_element(&start)?;
                attach(element, &mut stack, &mut root);
            },
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| UniProtError::malformed_document("unexpected closing tag"))?;
                attach(element, &mut stack, &mut root);
            },
            Event::Text(text) => {
                let text = text.unescape()?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None if text.trim().is_empty() => {},
                    None => {
                        return Err(UniProtError::malformed_document(
                            "character data outside the root element",
                        ))
                    },
                }
            },
            Event::CData(data) => {
                let bytes = data.into_inner();
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&bytes));
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if let Some(open) = stack.last() {
        return Err(UniProtError::malformed_document(format!(
            "element <{}> is not closed",
            open.name
        )));
    }
    root.ok_or_else(|| UniProtError::malformed_document("document has no root element"))
}

fn ensure_single_root(root: Option<&XmlElement>) -> Result<()> {
    if root.is_some() {
        return Err(UniProtError::malformed_document(
            "content after the root element",
        ));
    }
    Ok(())
}

fn open_element(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        ..Default::default()
    })
}

fn attach(element: XmlElement, stack: &mut [XmlElement], root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}
