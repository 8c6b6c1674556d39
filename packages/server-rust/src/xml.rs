//! Owned XML element tree read with `quick-xml`'s namespace-aware reader.
//!
//! Request documents are small, so they are read into a tree once and then
//! validated and walked without re-parsing. Comments, processing
//! instructions and the XML declaration are dropped.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// Why an input could not be read as a single well-formed element tree.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error(transparent)]
    Syntax(#[from] quick_xml::Error),
    #[error("{0}")]
    Malformed(String),
}

impl XmlError {
    fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Local name.
    pub name: String,
    /// `true` if the attribute carried a namespace prefix.
    pub qualified: bool,
    pub value: String,
}

/// Element or character content, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Unescaped text or CDATA content.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local name.
    pub name: String,
    /// Resolved namespace URI, `None` when unqualified.
    pub namespace: Option<String>,
    /// Attributes without namespace declarations.
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    /// Value of an unprefixed attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| !a.qualified && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Direct character content chunks.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|n| match n {
            Node::Text(t) => Some(t.as_str()),
            Node::Element(_) => None,
        })
    }

    /// Concatenated direct character content.
    #[must_use]
    pub fn text(&self) -> String {
        self.texts().collect()
    }

    /// Concatenated character content of the whole subtree.
    #[must_use]
    pub fn descendant_text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

/// Reads `input` as a document with exactly one root element.
///
/// # Errors
///
/// Returns `XmlError` if the input is not well-formed, uses an undeclared
/// prefix, or has no root or more than one.
pub fn parse(input: &str) -> Result<Element, XmlError> {
    let mut reader = NsReader::from_str(input);
    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (namespace, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(start) => {
                let element = element(namespace, &start)?;
                if open.is_empty() && root.is_some() {
                    return Err(XmlError::malformed("Document has more than one root element"));
                }
                open.push(element);
            }
            Event::Empty(start) => {
                let element = element(namespace, &start)?;
                attach(&mut open, &mut root, element)?;
            }
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| XmlError::malformed("Unexpected end tag"))?;
                attach(&mut open, &mut root, element)?;
            }
            Event::Text(text) => push_text(&mut open, text.unescape()?)?,
            Event::CData(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| XmlError::malformed(format!("CDATA is not valid UTF-8: {e}")))?;
                push_text(&mut open, Cow::Borrowed(text))?;
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(XmlError::malformed(format!(
            "Element '{}' is not closed",
            unclosed.name
        )));
    }
    root.ok_or_else(|| XmlError::malformed("Document has no root element"))
}

fn element(namespace: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let namespace = match namespace {
        ResolveResult::Bound(ns) => Some(utf8(ns.into_inner())?.to_string()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            return Err(XmlError::malformed(format!(
                "Undeclared namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            )))
        }
    };

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        attributes.push(Attribute {
            name: utf8(attr.key.local_name().into_inner())?.to_string(),
            qualified: attr.key.prefix().is_some(),
            value: attr.unescape_value()?.into_owned(),
        });
    }

    Ok(Element {
        name: utf8(start.local_name().into_inner())?.to_string(),
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    open: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(Node::Element(element));
    } else if root.is_some() {
        return Err(XmlError::malformed("Document has more than one root element"));
    } else {
        *root = Some(element);
    }
    Ok(())
}

fn push_text(open: &mut [Element], text: Cow<'_, str>) -> Result<(), XmlError> {
    match open.last_mut() {
        Some(parent) => parent.children.push(Node::Text(text.into_owned())),
        None if text.trim().is_empty() => {}
        None => return Err(XmlError::malformed("Text outside the root element")),
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str, XmlError> {
    std::str::from_utf8(bytes).map_err(|e| XmlError::malformed(format!("Name is not valid UTF-8: {e}")))
}
