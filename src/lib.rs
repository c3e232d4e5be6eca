//! Render inline and block math tags of HTML documents with KaTeX.
//!
//! ```no_run
//! use mathtag::dom::Document;
//!
//! let mut doc = Document::parse("<p>Area: <k-x>\\pi r^2</k-x></p>");
//! mathtag::render_katex(&mut doc).unwrap();
//! println!("{}", doc.to_html());
//! ```

pub mod config;
pub mod dom;
pub mod macros;
pub mod render;
pub mod tags;

pub use config::{RenderConfig, Settings};
pub use macros::MacroTable;
pub use render::{KatexRenderer, MathRenderer};
pub use tags::{
    Installation, MathTags, Strategy, render_katex, render_math_tags,
};
