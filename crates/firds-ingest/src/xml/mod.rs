//! Minimal in-memory XML element tree
//!
//! Documents are read with `quick_xml::NsReader`. Elements bound to a
//! namespace get their tag in `{uri}local` form, so the namespace can be
//! dropped later with [`strip_namespaces`] when a consumer wants bare local
//! names. Namespace declarations (`xmlns`, `xmlns:*`) are not kept as
//! attributes.

mod namespace;

pub use namespace::{local_name, strip_namespaces, NAMESPACE_SEPARATOR};

use crate::error::{IngestError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One XML element with its attributes, character data and children
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    /// Character data directly inside this element, `None` when there is none
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child with the given tag
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// All direct children with the given tag, in document order
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    /// Text of the first direct child with the given tag
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.find(tag).and_then(Element::text)
    }

    /// This element and all its descendants with the given tag, in document order
    pub fn iter<'a>(&'a self, tag: &'a str) -> Descendants<'a> {
        Descendants {
            stack: vec![self],
            tag,
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }
}

// Releases descendants from a worklist; dropping never recurses.
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut child) = pending.pop() {
            pending.append(&mut child.children);
        }
    }
}

/// Pre-order walk over an element subtree filtered by tag
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
    tag: &'a str,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(element) = self.stack.pop() {
            self.stack.extend(element.children.iter().rev());
            if element.tag == self.tag {
                return Some(element);
            }
        }
        None
    }
}

/// Parse a complete document from any buffered reader
pub fn parse_reader<R: BufRead>(source: R) -> Result<Element> {
    build_tree(NsReader::from_reader(source))
}

/// Parse a complete document held in memory
pub fn parse_bytes(bytes: &[u8]) -> Result<Element> {
    parse_reader(bytes)
}

pub fn parse_str(xml: &str) -> Result<Element> {
    parse_bytes(xml.as_bytes())
}

/// Parse a document from a file on disk
pub fn parse_file(path: impl AsRef<Path>) -> Result<Element> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file))
}

fn build_tree<R: BufRead>(mut reader: NsReader<R>) -> Result<Element> {
    let mut buf = Vec::new();
    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        match event {
            Event::Start(start) => {
                let element = open_element(&resolved, &start)?;
                if open.is_empty() && root.is_some() {
                    return Err(IngestError::document("multiple root elements"));
                }
                open.push(element);
            },
            Event::Empty(start) => {
                let element = open_element(&resolved, &start)?;
                close_element(&mut open, &mut root, element)?;
            },
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| IngestError::document("closing tag without an open element"))?;
                close_element(&mut open, &mut root, element)?;
            },
            Event::Text(text) => {
                let text = text.unescape()?;
                append_text(&mut open, &text)?;
            },
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data);
                append_text(&mut open, &text)?;
            },
            Event::Eof => break,
            _ => {},
        }
        buf.clear();
    }

    if let Some(unclosed) = open.last() {
        return Err(IngestError::document(format!(
            "unexpected end of document inside <{}>",
            unclosed.tag
        )));
    }

    root.ok_or_else(|| IngestError::document("document has no root element"))
}

fn open_element(resolved: &ResolveResult, start: &BytesStart) -> Result<Element> {
    let tag = match resolved {
        ResolveResult::Bound(Namespace(uri)) => format!(
            "{{{}}}{}",
            String::from_utf8_lossy(uri),
            String::from_utf8_lossy(start.local_name().as_ref())
        ),
        _ => String::from_utf8_lossy(start.name().as_ref()).into_owned(),
    };

    let mut element = Element::new(tag);
    for attr in start.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let value: Cow<str> = attr.unescape_value()?;
        element
            .attributes
            .push((String::from_utf8_lossy(key).into_owned(), value.into_owned()));
    }

    Ok(element)
}

fn close_element(open: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(IngestError::document("multiple root elements")),
    }
    Ok(())
}

fn append_text(open: &mut [Element], text: &str) -> Result<()> {
    match open.last_mut() {
        Some(current) => current.push_text(text),
        None if text.trim().is_empty() => {},
        None => {
            return Err(IngestError::document("character data outside the root element"));
        },
    }
    Ok(())
}
