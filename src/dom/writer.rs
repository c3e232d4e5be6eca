//! HTML serializer for the document tree

use super::node::DomNode;
use ego_tree::iter::Edge;
use ego_tree::{NodeRef, Tree};
use pulldown_cmark_escape::{
    FmtWriter, IoWriter, StrWrite, escape_html, escape_html_body_text,
};

struct HtmlWriter<'a, W> {
    /// Tree supplying nodes.
    tree: &'a Tree<DomNode>,

    /// Writer to write to.
    writer: W,
}

impl<'a, W> HtmlWriter<'a, W>
where
    W: StrWrite,
{
    fn new(tree: &'a Tree<DomNode>, writer: W) -> Self {
        Self { tree, writer }
    }

    #[inline]
    fn write(&mut self, s: &str) -> Result<(), W::Error> {
        self.writer.write_str(s)
    }

    fn run(mut self) -> Result<(), W::Error> {
        let tree = self.tree;
        for edge in tree.root().traverse() {
            match edge {
                Edge::Open(node) => self.open(node)?,
                Edge::Close(node) => self.close(node)?,
            }
        }
        Ok(())
    }

    fn open(&mut self, node: NodeRef<'a, DomNode>) -> Result<(), W::Error> {
        match node.value() {
            DomNode::Document => Ok(()),
            DomNode::Doctype(doctype) => self.write(&doctype.to_string()),
            DomNode::Element(el) => {
                self.write("<")?;
                self.write(&el.name)?;
                for (k, v) in &el.attrs {
                    self.write(" ")?;
                    self.write(k)?;
                    self.write("=\"")?;
                    escape_html(&mut self.writer, v)?;
                    self.write("\"")?;
                }
                self.write(">")
            }
            DomNode::Text(text) => {
                let raw = node
                    .parent()
                    .and_then(|p| p.value().as_element())
                    .is_some_and(|el| el.is_raw_text());
                if raw {
                    self.write(text)
                } else {
                    escape_html_body_text(&mut self.writer, text)
                }
            }
            DomNode::Comment(text) => {
                self.write("<!--")?;
                self.write(text)?;
                self.write("-->")
            }
            DomNode::Markup(markup) => self.write(markup),
        }
    }

    fn close(&mut self, node: NodeRef<'a, DomNode>) -> Result<(), W::Error> {
        match node.value() {
            DomNode::Element(el) if !el.is_void() => {
                self.write("</")?;
                self.write(&el.name)?;
                self.write(">")
            }
            _ => Ok(()),
        }
    }
}

/// Serialize the tree into a Unicode-accepting buffer or stream.
pub fn write_html_fmt<W>(tree: &Tree<DomNode>, writer: W) -> std::fmt::Result
where
    W: std::fmt::Write,
{
    HtmlWriter::new(tree, FmtWriter(writer)).run()
}

/// Serialize the tree to an I/O stream.
///
/// **Note**: wrap unbuffered writers like files in a
/// [`BufWriter`](std::io::BufWriter).
pub fn write_html_io<W>(tree: &Tree<DomNode>, writer: W) -> std::io::Result<()>
where
    W: std::io::Write,
{
    HtmlWriter::new(tree, IoWriter(writer)).run()
}
