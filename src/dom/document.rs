//! Document tree, parsing and element construction

use super::node::{DomNode, Element};
use super::registry::{
    CustomElementRegistry, DefineError, ElementConstructor, validate_name,
};
use super::writer::{write_html_fmt, write_html_io};
use ego_tree::iter::Edge;
use ego_tree::{NodeId, NodeRef, Tree};
use std::fmt::{self, Display};
use std::rc::Rc;
use tracing::debug;

/// An HTML document, optionally able to define custom element kinds.
#[derive(Debug)]
pub struct Document {
    tree: Tree<DomNode>,
    /// `None` when the document has no custom element support
    registry: Option<CustomElementRegistry>,
}

impl Document {
    /// Parse a complete HTML document. The parser adds the implied `html`,
    /// `head` and `body` elements.
    pub fn parse(html: &str) -> Self {
        let parsed = scraper::Html::parse_document(html);
        let mut tree = Tree::new(DomNode::Document);
        let root = tree.root().id();
        copy_children(parsed.tree.root(), &mut tree, root);
        Self {
            tree,
            registry: None,
        }
    }

    /// Parse an HTML fragment as the content of a `body` element
    pub fn parse_fragment(html: &str) -> Self {
        let parsed = scraper::Html::parse_fragment(html);
        let mut tree = Tree::new(DomNode::Document);
        let root = tree.root().id();
        copy_children(*parsed.root_element(), &mut tree, root);
        Self {
            tree,
            registry: None,
        }
    }

    /// Give the document an empty custom element registry
    pub fn with_custom_elements(mut self) -> Self {
        self.registry.get_or_insert_with(CustomElementRegistry::new);
        self
    }

    pub fn custom_elements(&self) -> Option<&CustomElementRegistry> {
        self.registry.as_ref()
    }

    pub fn has_custom_elements(&self) -> bool {
        self.registry.is_some()
    }

    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    /// The `body` element, or the root for fragments
    pub fn body(&self) -> NodeId {
        self.tree
            .root()
            .descendants()
            .find(|n| n.value().is_element_named("body"))
            .map_or_else(|| self.root(), |n| n.id())
    }

    pub fn get(&self, id: NodeId) -> Option<&DomNode> {
        self.tree.get(id).map(|n| n.value())
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)
            .and_then(DomNode::as_element)
            .map(|el| el.name.as_str())
    }

    /// Elements named `name` (ASCII case-insensitive), in document order
    pub fn query_by_tag(&self, name: &str) -> Vec<NodeId> {
        self.tree
            .root()
            .descendants()
            .filter(|n| n.value().is_element_named(name))
            .map(|n| n.id())
            .collect()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.tree.get(id).map(text_of).unwrap_or_default()
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<ElementMut<'_>> {
        self.get(id)?.as_element()?;
        Some(ElementMut {
            tree: &mut self.tree,
            id,
        })
    }

    /// Define a custom element kind and upgrade the existing elements of
    /// that name, in document order. Returns the number of upgraded
    /// elements.
    pub fn define_element(
        &mut self,
        name: &str,
        constructor: Rc<dyn ElementConstructor>,
    ) -> Result<usize, DefineError> {
        let upgraded = self.define_elements(&[(name, constructor)])?;
        Ok(upgraded.iter().sum())
    }

    /// Define several element kinds at once, then upgrade the existing
    /// elements kind by kind. An element nested inside an element of one of
    /// these kinds is not upgraded: it is part of the outer element's
    /// content. Nothing is defined when any name is rejected.
    ///
    /// Returns the number of upgraded elements per kind.
    pub fn define_elements(
        &mut self,
        kinds: &[(&str, Rc<dyn ElementConstructor>)],
    ) -> Result<Vec<usize>, DefineError> {
        let registry = self.registry.as_mut().ok_or(DefineError::Unsupported)?;
        for (i, (name, _)) in kinds.iter().enumerate() {
            validate_name(name)?;
            if registry.is_defined(name) || kinds[..i].iter().any(|(n, _)| n == name) {
                return Err(DefineError::AlreadyDefined(name.to_string()));
            }
        }
        for (name, constructor) in kinds {
            registry.insert(name, Rc::clone(constructor))?;
        }

        let names: Vec<&str> = kinds.iter().map(|(name, _)| *name).collect();
        let mut upgraded = Vec::with_capacity(kinds.len());
        for (name, constructor) in kinds {
            let count = self.construct_outermost(name, constructor.as_ref(), &names);
            debug!(name, upgraded = count, "defined custom element");
            upgraded.push(count);
        }
        Ok(upgraded)
    }

    /// Parse `html` as a fragment and attach it under `parent`. Elements of
    /// defined kinds in the new content are constructed in tree order.
    /// Returns the ids of the attached top-level nodes.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let fragment = scraper::Html::parse_fragment(html);
        let mut added = Vec::new();
        for child in fragment.root_element().children() {
            let Some(value) = DomNode::from_scraper(child.value()) else {
                continue;
            };
            let Some(mut parent_node) = self.tree.get_mut(parent) else {
                break;
            };
            let id = parent_node.append(value).id();
            copy_children(child, &mut self.tree, id);
            added.push(id);
        }
        for &id in &added {
            self.connect(id);
        }
        added
    }

    /// Create an element holding `text`, attach it under `parent` and
    /// construct it if its kind is defined.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        text: &str,
    ) -> Option<NodeId> {
        let mut parent_node = self.tree.get_mut(parent)?;
        let mut element = parent_node.append(DomNode::Element(Element::new(tag)));
        if !text.is_empty() {
            element.append(DomNode::Text(text.to_string()));
        }
        let id = element.id();
        self.connect(id);
        Some(id)
    }

    /// Serializable view of the document
    pub fn html(&self) -> HtmlView<'_> {
        HtmlView(&self.tree)
    }

    pub fn to_html(&self) -> String {
        self.html().to_string()
    }

    pub fn write_html<W: std::io::Write>(&self, writer: W) -> std::io::Result<()> {
        write_html_io(&self.tree, writer)
    }

    fn is_connected(&self, id: NodeId) -> bool {
        let root = self.root();
        self.tree
            .get(id)
            .is_some_and(|n| n.id() == root || n.ancestors().any(|a| a.id() == root))
    }

    /// Construct every connected element in the subtree at `id`
    fn connect(&mut self, id: NodeId) {
        if self.registry.is_none() {
            return;
        }
        let ids: Vec<NodeId> = match self.tree.get(id) {
            Some(node) => node.descendants().map(|n| n.id()).collect(),
            None => return,
        };
        for id in ids {
            // an earlier constructor may have replaced an ancestor's content
            if self.is_connected(id) {
                self.construct(id);
            }
        }
    }

    /// Run each constructor once on the connected elements of its name that
    /// have not been constructed yet, kind by kind and in document order,
    /// without defining the kinds. Elements nested inside an element of one
    /// of these kinds are skipped.
    ///
    /// Returns the number of constructed elements per kind.
    pub fn construct_all(
        &mut self,
        kinds: &[(&str, &dyn ElementConstructor)],
    ) -> Vec<usize> {
        let names: Vec<&str> = kinds.iter().map(|(name, _)| *name).collect();
        kinds
            .iter()
            .map(|(name, constructor)| self.construct_outermost(name, *constructor, &names))
            .collect()
    }

    fn construct_outermost(
        &mut self,
        name: &str,
        constructor: &dyn ElementConstructor,
        containers: &[&str],
    ) -> usize {
        let mut constructed = 0;
        for id in self.query_by_tag(name) {
            if self.is_connected(id)
                && !self.is_nested_in(id, containers)
                && self.construct_with(id, constructor)
            {
                constructed += 1;
            }
        }
        constructed
    }

    /// Whether an ancestor of `id` is an element named one of `names`
    fn is_nested_in(&self, id: NodeId, names: &[&str]) -> bool {
        self.tree.get(id).is_some_and(|node| {
            node.ancestors().any(|a| {
                names.iter().any(|name| a.value().is_element_named(name))
            })
        })
    }

    /// Run the registered constructor of the element at `id`, at most once
    fn construct(&mut self, id: NodeId) -> bool {
        let Some(registry) = &self.registry else {
            return false;
        };
        let Some(constructor) = self
            .tag_name(id)
            .and_then(|name| registry.constructor(name))
        else {
            return false;
        };
        self.construct_with(id, constructor.as_ref())
    }

    fn construct_with(
        &mut self,
        id: NodeId,
        constructor: &dyn ElementConstructor,
    ) -> bool {
        let Some(mut node) = self.tree.get_mut(id) else {
            return false;
        };
        match node.value().as_element_mut() {
            Some(el) if !el.constructed => el.constructed = true,
            _ => return false,
        }
        let mut element = ElementMut {
            tree: &mut self.tree,
            id,
        };
        constructor.construct(&mut element);
        true
    }
}

fn copy_children(
    src: NodeRef<'_, scraper::Node>,
    tree: &mut Tree<DomNode>,
    parent: NodeId,
) {
    for child in src.children() {
        let Some(value) = DomNode::from_scraper(child.value()) else {
            continue;
        };
        let Some(mut parent_node) = tree.get_mut(parent) else {
            return;
        };
        let id = parent_node.append(value).id();
        copy_children(child, tree, id);
    }
}

fn text_of(node: NodeRef<'_, DomNode>) -> String {
    node.descendants()
        .filter_map(|n| match n.value() {
            DomNode::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Outline of the tree, one node per line. Whitespace-only text is
/// omitted.
impl Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for edge in self.tree.root().traverse() {
            let Edge::Open(node) = edge else {
                continue;
            };
            if let DomNode::Text(text) = node.value() {
                if text.trim().is_empty() {
                    continue;
                }
            }
            let depth = node.ancestors().count();
            writeln!(f, "{}{}", "  ".repeat(depth), node.value())?;
        }
        Ok(())
    }
}

pub struct HtmlView<'a>(&'a Tree<DomNode>);

impl Display for HtmlView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_html_fmt(self.0, f)
    }
}

// Element handle
// ====================

/// Mutable handle on one element of a document: the target that rendered
/// output is written into.
pub struct ElementMut<'a> {
    tree: &'a mut Tree<DomNode>,
    id: NodeId,
}

impl ElementMut<'_> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn element(&self) -> Option<&Element> {
        self.tree.get(self.id).and_then(|n| n.value().as_element())
    }

    pub fn tag_name(&self) -> &str {
        self.element().map_or("", |el| el.name.as_str())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element().and_then(|el| el.attr(name))
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(mut node) = self.tree.get_mut(self.id) {
            if let Some(el) = node.value().as_element_mut() {
                el.set_attr(name, value);
            }
        }
    }

    /// Text content of the element
    pub fn text(&self) -> String {
        self.tree.get(self.id).map(text_of).unwrap_or_default()
    }

    /// Drop the element's children and put `markup` in their place
    pub fn replace_with_markup(&mut self, markup: impl Into<String>) {
        let Some(mut node) = self.tree.get_mut(self.id) else {
            return;
        };
        while let Some(mut child) = node.first_child() {
            child.detach();
        }
        node.append(DomNode::Markup(markup.into()));
    }
}
