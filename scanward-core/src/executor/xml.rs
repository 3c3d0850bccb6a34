//! XML to JSON translation for scanner reports.
//!
//! The mapping follows the common "attributes and text" convention:
//!
//! - an attribute `name` becomes the key `@name`;
//! - character data of an element with attributes or children becomes `#text`;
//! - an element holding only text becomes that string;
//! - an element with neither attributes, children nor text becomes `null`;
//! - repeated sibling elements collapse into an array in document order.
//!
//! The document root is wrapped in an object keyed by its tag name.

use quick_xml::{
    events::{BytesStart, Event, attributes::AttrError},
    Reader,
};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("character data outside the root element")]
    TextOutsideRoot,

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,
}

#[derive(Debug)]
struct Node {
    name: String,
    attrs: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Map::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref());
            let value = attr.unescape_value()?;
            attrs.insert(format!("@{key}"), Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            attrs,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn into_value(self) -> Value {
        let text = self.text.trim();
        if self.attrs.is_empty() && self.children.is_empty() {
            return if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_owned())
            };
        }

        let mut object = self.attrs;
        object.extend(self.children);
        if !text.is_empty() {
            object.insert("#text".to_owned(), Value::String(text.to_owned()));
        }
        Value::Object(object)
    }
}

/// Converts an XML document into its JSON form.
pub fn xml_to_json(document: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::MultipleRoots);
                }
                stack.push(Node::open(&start)?);
            }
            Event::Empty(start) => {
                let node = Node::open(&start)?;
                close(node, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // quick-xml already rejects mismatched end tags
                let node = stack.pop().ok_or(XmlError::NoRoot)?;
                close(node, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                match stack.last_mut() {
                    Some(node) => node.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(XmlError::TextOutsideRoot),
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                match stack.last_mut() {
                    Some(node) => node.text.push_str(&String::from_utf8_lossy(&data)),
                    None => return Err(XmlError::TextOutsideRoot),
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }

    let (name, value) = root.ok_or(XmlError::NoRoot)?;
    let mut wrapper = Map::new();
    wrapper.insert(name, value);
    Ok(Value::Object(wrapper))
}

fn close(
    node: Node,
    stack: &mut [Node],
    root: &mut Option<(String, Value)>,
) -> Result<(), XmlError> {
    let name = node.name.clone();
    let value = node.into_value();
    match stack.last_mut() {
        Some(parent) => parent.add_child(name, value),
        None if root.is_some() => return Err(XmlError::MultipleRoots),
        None => *root = Some((name, value)),
    }
    Ok(())
}
