//! Math rendering backed by KaTeX

use crate::config::{OutputFormat, RenderConfig};
use crate::dom::ElementMut;
use katex::OutputType;
use maud::html;
use tracing::{debug, warn};

/// Renders math source into a target element, in place.
///
/// Implementations never fail: malformed input is rendered as
/// error-indicating markup.
pub trait MathRenderer {
    fn render(&self, text: &str, target: &mut ElementMut<'_>, config: &RenderConfig);
}

/// Renderer using the KaTeX JavaScript bundle through the `katex` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct KatexRenderer;

impl MathRenderer for KatexRenderer {
    fn render(&self, text: &str, target: &mut ElementMut<'_>, config: &RenderConfig) {
        debug!(
            tag = target.tag_name(),
            display_mode = config.display_mode,
            "rendering math"
        );
        target.replace_with_markup(render_to_string(text, config));
    }
}

/// Render `text` to an HTML fragment.
///
/// Global macro definitions in `text` are recorded in the configuration's
/// macro table once the render succeeds.
pub fn render_to_string(text: &str, config: &RenderConfig) -> String {
    let mut builder = katex::Opts::builder();
    builder
        .display_mode(config.display_mode)
        .throw_on_error(config.throw_on_error)
        .output_type(output_type(config.output));
    for (name, expansion) in config.macros.entries() {
        builder = builder.add_macro(name, expansion);
    }

    let opts = match builder.build() {
        Ok(opts) => opts,
        Err(e) => return render_error(text, config.display_mode, &e.to_string()),
    };

    match katex::render_with_opts(text, &opts) {
        Ok(rendered) => {
            config.macros.absorb_definitions(text);
            rendered
        }
        Err(e) => render_error(text, config.display_mode, &e.to_string()),
    }
}

fn output_type(format: OutputFormat) -> OutputType {
    match format {
        OutputFormat::Html => OutputType::Html,
    }
}

/// Raw source wrapped in a span, with the error message as its title
fn render_error(text: &str, display_mode: bool, message: &str) -> String {
    warn!(display_mode, error = message, "math rendering failed");
    let class_name = if display_mode {
        "math-error math-display"
    } else {
        "math-error math-inline"
    };
    html! {
        span class=(class_name) title=(message) { (text) }
    }
    .into_string()
}
