//! Node definitions for the document tree

use itertools::Itertools;
use std::fmt::Display;

// Node
// ====================

#[derive(Clone, Debug, PartialEq)]
pub enum DomNode {
    /// Root node
    Document,
    Doctype(Doctype),
    Element(Element),
    Text(String),
    Comment(String),
    /// Rendered markup that is written out verbatim
    Markup(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Doctype {
    pub name: String,
    pub public_id: String,
    pub system_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    /// Local name
    pub name: String,
    pub attrs: Vec<(String, String)>,
    /// Whether a registered constructor already ran for this element
    pub(crate) constructed: bool,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            constructed: false,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Elements without content or end tag
    pub fn is_void(&self) -> bool {
        matches!(
            self.name.as_str(),
            "area"
                | "base"
                | "br"
                | "col"
                | "embed"
                | "hr"
                | "img"
                | "input"
                | "link"
                | "meta"
                | "param"
                | "source"
                | "track"
                | "wbr"
        )
    }

    /// Elements whose text is written without escaping. The parser runs
    /// with scripting enabled, so `noscript` content is raw text too.
    pub fn is_raw_text(&self) -> bool {
        matches!(
            self.name.as_str(),
            "script"
                | "style"
                | "noscript"
                | "xmp"
                | "iframe"
                | "noembed"
                | "noframes"
                | "plaintext"
        )
    }
}

impl DomNode {
    /// Convert a node parsed by `scraper`. Processing instructions and
    /// fragment roots have no counterpart and yield `None`.
    pub(crate) fn from_scraper(node: &scraper::Node) -> Option<Self> {
        match node {
            scraper::Node::Document => Some(DomNode::Document),
            scraper::Node::Doctype(doctype) => Some(DomNode::Doctype(Doctype {
                name: doctype.name().to_string(),
                public_id: doctype.public_id().to_string(),
                system_id: doctype.system_id().to_string(),
            })),
            scraper::Node::Element(el) => {
                // keep the parser's case for SVG names like `foreignObject`
                Some(DomNode::Element(Element {
                    name: el.name().to_string(),
                    attrs: el
                        .attrs
                        .iter()
                        .map(|(name, value)| {
                            // keep prefixes like `xlink:href`
                            let name = match &name.prefix {
                                Some(prefix) => format!("{}:{}", prefix, name.local),
                                None => name.local.to_string(),
                            };
                            (name, value.to_string())
                        })
                        .collect(),
                    constructed: false,
                }))
            }
            scraper::Node::Text(text) => {
                Some(DomNode::Text(String::from(&**text)))
            }
            scraper::Node::Comment(comment) => {
                Some(DomNode::Comment(String::from(&**comment)))
            }
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            DomNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            DomNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element_named(&self, name: &str) -> bool {
        self.as_element()
            .is_some_and(|el| el.name.eq_ignore_ascii_case(name))
    }
}

impl Display for Doctype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<!DOCTYPE {}", self.name)?;
        if !self.public_id.is_empty() {
            write!(f, " PUBLIC \"{}\"", self.public_id)?;
            if !self.system_id.is_empty() {
                write!(f, " \"{}\"", self.system_id)?;
            }
        } else if !self.system_id.is_empty() {
            write!(f, " SYSTEM \"{}\"", self.system_id)?;
        }
        write!(f, ">")
    }
}

impl Display for DomNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomNode::Document => write!(f, "#document"),
            DomNode::Doctype(doctype) => write!(f, "{}", doctype),
            DomNode::Element(el) => {
                let attrs = el
                    .attrs
                    .iter()
                    .map(|(k, v)| format!(" {}={:?}", k, v))
                    .join("");
                write!(f, "<{}{}>", el.name, attrs)?;
                if el.constructed {
                    write!(f, " (constructed)")?;
                }
                Ok(())
            }
            DomNode::Text(text) => write!(f, "{:?}", text),
            DomNode::Comment(text) => write!(f, "<!--{}-->", text),
            DomNode::Markup(markup) => write!(f, "markup {:?}", markup),
        }
    }
}
