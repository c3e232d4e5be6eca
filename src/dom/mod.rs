//! Host document: an HTML element tree with optional custom element support

mod document;
mod node;
pub mod registry;
mod writer;


// Re-export public types
pub use document::{Document, ElementMut, HtmlView};
pub use ego_tree::NodeId;
pub use node::{Doctype, DomNode, Element};
pub use registry::{
    CustomElementRegistry, DefineError, ElementConstructor, from_fn,
};
