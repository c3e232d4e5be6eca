//! Shared argument types for CLI commands.

use clap::Args;
use mathtag::Settings;
use std::path::PathBuf;

/// Arguments selecting the input document and how its math is rendered
#[derive(Args, Clone)]
pub struct RenderArgs {
    /// HTML file to render
    pub input: PathBuf,

    /// YAML settings file (tag names, macros, strategy)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Parse the input as a fragment instead of a full document
    #[arg(long)]
    pub fragment: bool,

    /// Treat the document as supporting custom elements
    #[arg(long)]
    pub custom_elements: bool,

    /// Tag name of inline math elements
    #[arg(long)]
    pub inline_tag: Option<String>,

    /// Tag name of block math elements
    #[arg(long)]
    pub block_tag: Option<String>,

    /// Macro definition as NAME=EXPANSION, e.g. '\RR=\mathbb{R}'
    #[arg(short = 'm', long = "macro", value_parser = parse_macro)]
    pub macros: Vec<(String, String)>,
}

impl RenderArgs {
    /// Settings from the config file, overridden by command line arguments
    pub fn settings(&self) -> Result<Settings, Box<dyn std::error::Error>> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(tag) = &self.inline_tag {
            settings.tags.inline = tag.clone();
        }
        if let Some(tag) = &self.block_tag {
            settings.tags.block = tag.clone();
        }
        for (name, expansion) in &self.macros {
            settings.set_macro(name, expansion);
        }
        Ok(settings)
    }
}

fn parse_macro(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, expansion)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), expansion.to_string()))
        }
        _ => Err(format!("expected NAME=EXPANSION, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_macro() {
        assert_eq!(
            parse_macro(r"\RR=\mathbb{R}"),
            Ok((r"\RR".to_string(), r"\mathbb{R}".to_string()))
        );
        assert_eq!(
            parse_macro(r"\eq=a=b"),
            Ok((r"\eq".to_string(), "a=b".to_string()))
        );
        assert!(parse_macro("novalue").is_err());
        assert!(parse_macro("=x").is_err());
    }
}
