//! Inline and block math tags
//!
//! [`MathTags::install`] makes every inline (`k-x`) and block (`k-b`) math
//! element of a document render its text content through a
//! [`MathRenderer`]. Which way this happens is decided once, by probing the
//! document:
//!
//! - [`Strategy::Register`]: the document supports custom elements. Both
//!   tags are defined as element kinds whose constructor renders the
//!   element. Existing elements are upgraded right away, elements attached
//!   later are rendered as they are attached.
//! - [`Strategy::Scan`]: no custom element support. The elements present at
//!   call time are rendered once, inline tags first, each group in document
//!   order. Elements attached later are left as they are.
//!
//! A math element nested inside another one is never rendered on its own:
//! its source is part of the outer element's text.
//!
//! All renders of one installation share one [`MacroTable`].

use crate::config::{RenderConfig, Settings, StrategyChoice, TagNames};
use crate::dom::{DefineError, Document, ElementConstructor, ElementMut};
use crate::macros::MacroTable;
use crate::render::{KatexRenderer, MathRenderer};
use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Define element kinds and render on construction
    Register,
    /// Render the elements present now, once
    Scan,
}

impl Strategy {
    /// `Register` when the document can define element kinds
    pub fn probe(document: &Document) -> Self {
        if document.has_custom_elements() {
            Strategy::Register
        } else {
            Strategy::Scan
        }
    }
}

/// Result of [`MathTags::install`]
#[derive(Debug, Clone)]
pub struct Installation {
    pub strategy: Strategy,
    /// Inline elements rendered during the call (scanned or upgraded)
    pub inline: usize,
    /// Block elements rendered during the call (scanned or upgraded)
    pub block: usize,
    /// The table shared by every render of this installation
    pub macros: MacroTable,
}

/// Constructor of one math element kind
struct MathElement {
    renderer: Rc<dyn MathRenderer>,
    config: RenderConfig,
}

impl ElementConstructor for MathElement {
    fn construct(&self, element: &mut ElementMut<'_>) {
        let text = element.text();
        self.renderer.render(&text, element, &self.config);
    }
}

pub struct MathTags {
    renderer: Rc<dyn MathRenderer>,
    tags: TagNames,
    macros: MacroTable,
    strategy: StrategyChoice,
}

impl MathTags {
    pub fn new(renderer: Rc<dyn MathRenderer>) -> Self {
        Self {
            renderer,
            tags: TagNames::default(),
            macros: MacroTable::new(),
            strategy: StrategyChoice::Auto,
        }
    }

    pub fn from_settings(
        renderer: Rc<dyn MathRenderer>,
        settings: &Settings,
    ) -> Self {
        Self::new(renderer)
            .with_tag_names(settings.tags.clone())
            .with_macros(settings.macro_table())
            .with_strategy(settings.strategy)
    }

    pub fn with_tag_names(mut self, tags: TagNames) -> Self {
        self.tags = tags;
        self
    }

    /// Macros each installation starts with. The installation works on its
    /// own copy.
    pub fn with_macros(mut self, macros: MacroTable) -> Self {
        self.macros = macros;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyChoice) -> Self {
        self.strategy = strategy;
        self
    }

    /// Render the math tags of `document`.
    ///
    /// Fails only when an element kind cannot be defined: the tag names
    /// are not valid custom element names, they are already defined (for
    /// example by an earlier installation), or registration was requested
    /// on a document without custom element support.
    pub fn install(
        &self,
        document: &mut Document,
    ) -> Result<Installation, DefineError> {
        let macros = self.macros.fork();
        let strategy = match self.strategy {
            StrategyChoice::Auto => Strategy::probe(document),
            StrategyChoice::Register => Strategy::Register,
            StrategyChoice::Scan => Strategy::Scan,
        };
        debug!(?strategy, inline = %self.tags.inline, block = %self.tags.block, "installing math tags");

        let inline = self.element(RenderConfig::inline(macros.clone()));
        let block = self.element(RenderConfig::block(macros.clone()));

        let counts = match strategy {
            Strategy::Register => {
                let inline: Rc<dyn ElementConstructor> = Rc::new(inline);
                let block: Rc<dyn ElementConstructor> = Rc::new(block);
                document.define_elements(&[
                    (self.tags.inline.as_str(), inline),
                    (self.tags.block.as_str(), block),
                ])?
            }
            Strategy::Scan => document.construct_all(&[
                (self.tags.inline.as_str(), &inline as &dyn ElementConstructor),
                (self.tags.block.as_str(), &block as &dyn ElementConstructor),
            ]),
        };
        let (inline, block) = match counts[..] {
            [inline, block] => (inline, block),
            _ => (0, 0),
        };
        info!(?strategy, inline, block, "rendered math tags");

        Ok(Installation {
            strategy,
            inline,
            block,
            macros,
        })
    }

    fn element(&self, config: RenderConfig) -> MathElement {
        MathElement {
            renderer: Rc::clone(&self.renderer),
            config,
        }
    }
}

/// Render the `k-x` and `k-b` tags of `document` with KaTeX
pub fn render_katex(
    document: &mut Document,
) -> Result<Installation, DefineError> {
    render_math_tags(document, Rc::new(KatexRenderer))
}

/// Render the `k-x` and `k-b` tags of `document` with `renderer`
pub fn render_math_tags(
    document: &mut Document,
    renderer: Rc<dyn MathRenderer>,
) -> Result<Installation, DefineError> {
    MathTags::new(renderer).install(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        tag: String,
        text: String,
        display_mode: bool,
    }

    /// Records each call and renders `text` inside `<m>` or `<M>`
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Call>>,
        tables: RefCell<Vec<MacroTable>>,
    }

    impl MathRenderer for Recorder {
        fn render(
            &self,
            text: &str,
            target: &mut ElementMut<'_>,
            config: &RenderConfig,
        ) {
            self.calls.borrow_mut().push(Call {
                tag: target.tag_name().to_string(),
                text: text.to_string(),
                display_mode: config.display_mode,
            });
            self.tables.borrow_mut().push(config.macros.clone());
            assert!(!config.throw_on_error);
            let name = if config.display_mode { "M" } else { "m" };
            target.replace_with_markup(format!("<{name}>{text}</{name}>"));
        }
    }

    impl Recorder {
        fn calls(&self) -> Vec<(String, String, bool)> {
            self.calls
                .borrow()
                .iter()
                .map(|c| (c.tag.clone(), c.text.clone(), c.display_mode))
                .collect()
        }
    }

    fn call(tag: &str, text: &str, display_mode: bool) -> (String, String, bool) {
        (tag.to_string(), text.to_string(), display_mode)
    }

    #[test]
    fn test_probe() {
        let plain = Document::parse_fragment("");
        let capable = Document::parse_fragment("").with_custom_elements();
        assert_eq!(Strategy::probe(&plain), Strategy::Scan);
        assert_eq!(Strategy::probe(&capable), Strategy::Register);
    }

    #[test]
    fn test_scan_renders_each_existing_tag_once() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment(
            "<k-b>1</k-b><p><k-x>a</k-x> and <k-x>b</k-x></p><k-b>2</k-b>",
        );

        let installation =
            render_math_tags(&mut doc, recorder.clone()).unwrap();

        assert_eq!(installation.strategy, Strategy::Scan);
        assert_eq!((installation.inline, installation.block), (2, 2));
        assert_eq!(
            recorder.calls(),
            vec![
                call("k-x", "a", false),
                call("k-x", "b", false),
                call("k-b", "1", true),
                call("k-b", "2", true),
            ]
        );
        assert_eq!(
            doc.to_html(),
            "<k-b><M>1</M></k-b><p><k-x><m>a</m></k-x> and <k-x><m>b</m></k-x></p><k-b><M>2</M></k-b>"
        );
    }

    #[test]
    fn test_scan_ignores_later_tags() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment("<k-x>a</k-x>");
        render_math_tags(&mut doc, recorder.clone()).unwrap();

        let body = doc.body();
        doc.append_html(body, "<k-x>b</k-x>");

        assert_eq!(recorder.calls(), vec![call("k-x", "a", false)]);
        assert!(doc.to_html().ends_with("<k-x>b</k-x>"));
    }

    #[test]
    fn test_scan_twice_does_not_render_again() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment("<k-x>a</k-x>");
        render_math_tags(&mut doc, recorder.clone()).unwrap();
        let again = render_math_tags(&mut doc, recorder.clone()).unwrap();

        assert_eq!((again.inline, again.block), (0, 0));
        assert_eq!(recorder.calls().len(), 1);
        assert_eq!(doc.to_html(), "<k-x><m>a</m></k-x>");
    }

    #[test]
    fn test_register_renders_tags_created_later() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment("").with_custom_elements();

        let installation =
            render_math_tags(&mut doc, recorder.clone()).unwrap();
        assert_eq!(installation.strategy, Strategy::Register);
        assert!(recorder.calls().is_empty());

        let body = doc.body();
        doc.append_html(body, "<k-x>y</k-x>");
        doc.append_element(body, "k-b", "z");

        assert_eq!(
            recorder.calls(),
            vec![call("k-x", "y", false), call("k-b", "z", true)]
        );
        assert_eq!(doc.to_html(), "<k-x><m>y</m></k-x><k-b><M>z</M></k-b>");
        let names: Vec<&str> =
            doc.custom_elements().unwrap().names().collect();
        assert_eq!(names, vec!["k-b", "k-x"]);
    }

    #[test]
    fn test_register_upgrades_existing_tags() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment("<k-b>1</k-b><k-x>a</k-x>")
            .with_custom_elements();

        let installation =
            render_math_tags(&mut doc, recorder.clone()).unwrap();

        assert_eq!((installation.inline, installation.block), (1, 1));
        assert_eq!(
            recorder.calls(),
            vec![call("k-x", "a", false), call("k-b", "1", true)]
        );
    }

    #[test]
    fn test_scan_keeps_nested_source_in_outer_tag() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment("<k-b>a+<k-x>b</k-x></k-b>");

        let installation =
            render_math_tags(&mut doc, recorder.clone()).unwrap();

        assert_eq!((installation.inline, installation.block), (0, 1));
        assert_eq!(recorder.calls(), vec![call("k-b", "a+b", true)]);
        assert_eq!(doc.to_html(), "<k-b><M>a+b</M></k-b>");
    }

    #[test]
    fn test_register_keeps_nested_source_in_outer_tag() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment("<k-b>a+<k-x>b</k-x></k-b>")
            .with_custom_elements();

        let installation =
            render_math_tags(&mut doc, recorder.clone()).unwrap();

        assert_eq!((installation.inline, installation.block), (0, 1));
        assert_eq!(recorder.calls(), vec![call("k-b", "a+b", true)]);
        assert_eq!(doc.to_html(), "<k-b><M>a+b</M></k-b>");
    }

    #[test]
    fn test_invalid_block_name_defines_nothing() {
        let recorder = Rc::new(Recorder::default());
        let mut doc =
            Document::parse_fragment("<k-x>a</k-x>").with_custom_elements();
        let err = MathTags::new(recorder.clone())
            .with_tag_names(TagNames {
                inline: "k-x".to_string(),
                block: "Block".to_string(),
            })
            .install(&mut doc)
            .unwrap_err();

        assert_eq!(err, DefineError::InvalidName("Block".to_string()));
        assert!(recorder.calls().is_empty());
        assert_eq!(doc.custom_elements().unwrap().names().count(), 0);
    }

    #[test]
    fn test_register_twice_fails() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment("").with_custom_elements();
        render_math_tags(&mut doc, recorder.clone()).unwrap();

        let err = render_math_tags(&mut doc, recorder.clone()).unwrap_err();
        assert_eq!(err, DefineError::AlreadyDefined("k-x".to_string()));
    }

    #[test]
    fn test_forced_register_without_support_fails() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment("<k-x>a</k-x>");
        let err = MathTags::new(recorder.clone())
            .with_strategy(StrategyChoice::Register)
            .install(&mut doc)
            .unwrap_err();

        assert_eq!(err, DefineError::Unsupported);
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_forced_scan_with_support() {
        let recorder = Rc::new(Recorder::default());
        let mut doc =
            Document::parse_fragment("<k-x>a</k-x>").with_custom_elements();
        let installation = MathTags::new(recorder.clone())
            .with_strategy(StrategyChoice::Scan)
            .install(&mut doc)
            .unwrap();

        assert_eq!(installation.strategy, Strategy::Scan);
        assert_eq!(installation.inline, 1);
        assert_eq!(doc.custom_elements().unwrap().names().count(), 0);
    }

    #[test]
    fn test_custom_tag_names() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment(
            "<math-inline>a</math-inline><k-x>b</k-x><math-block>c</math-block>",
        );
        MathTags::new(recorder.clone())
            .with_tag_names(TagNames {
                inline: "math-inline".to_string(),
                block: "math-block".to_string(),
            })
            .install(&mut doc)
            .unwrap();

        assert_eq!(
            recorder.calls(),
            vec![call("math-inline", "a", false), call("math-block", "c", true)]
        );
    }

    #[test]
    fn test_invalid_tag_name_fails_in_register_mode() {
        let recorder = Rc::new(Recorder::default());
        let mut doc = Document::parse_fragment("").with_custom_elements();
        let err = MathTags::new(recorder)
            .with_tag_names(TagNames {
                inline: "math".to_string(),
                block: "k-b".to_string(),
            })
            .install(&mut doc)
            .unwrap_err();

        assert_eq!(err, DefineError::InvalidName("math".to_string()));
    }

    #[test]
    fn test_one_macro_table_per_installation() {
        let recorder = Rc::new(Recorder::default());
        let seed = MacroTable::from_entries([(r"\RR", r"\mathbb{R}")]);
        let tags = MathTags::new(recorder.clone()).with_macros(seed.clone());

        let mut first = Document::parse_fragment("<k-x>a</k-x><k-b>b</k-b>");
        let mut second = Document::parse_fragment("<k-x>c</k-x>");
        let one = tags.install(&mut first).unwrap();
        let two = tags.install(&mut second).unwrap();

        let tables = recorder.tables.borrow();
        assert_eq!(tables.len(), 3);
        assert!(tables[0].shares_with(&tables[1]));
        assert!(tables[0].shares_with(&one.macros));
        assert!(tables[2].shares_with(&two.macros));
        assert!(!one.macros.shares_with(&two.macros));
        assert!(!one.macros.shares_with(&seed));
        assert_eq!(one.macros.get(r"\RR").as_deref(), Some(r"\mathbb{R}"));
    }

    #[test]
    fn test_from_settings() {
        let recorder = Rc::new(Recorder::default());
        let settings = Settings::from_yaml(
            "tags:\n  inline: i-m\nstrategy: scan\nmacros:\n  RR: x\n",
        )
        .unwrap();
        let mut doc =
            Document::parse_fragment("<i-m>a</i-m>").with_custom_elements();
        let installation = MathTags::from_settings(recorder.clone(), &settings)
            .install(&mut doc)
            .unwrap();

        assert_eq!(installation.strategy, Strategy::Scan);
        assert_eq!(installation.macros.get(r"\RR").as_deref(), Some("x"));
        assert_eq!(recorder.calls(), vec![call("i-m", "a", false)]);
    }
}
