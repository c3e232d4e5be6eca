//! Render configuration and user settings

use crate::macros::MacroTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Output produced by the renderer. Only HTML is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
}

/// Options passed with every render call
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Malformed input degrades to error markup instead of failing.
    /// Always `false`.
    pub throw_on_error: bool,
    pub display_mode: bool,
    pub macros: MacroTable,
    pub output: OutputFormat,
}

impl RenderConfig {
    pub fn inline(macros: MacroTable) -> Self {
        Self::new(false, macros)
    }

    pub fn block(macros: MacroTable) -> Self {
        Self::new(true, macros)
    }

    fn new(display_mode: bool, macros: MacroTable) -> Self {
        Self {
            throw_on_error: false,
            display_mode,
            macros,
            output: OutputFormat::Html,
        }
    }
}

/// Tag names of the two math element kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagNames {
    pub inline: String,
    pub block: String,
}

impl Default for TagNames {
    fn default() -> Self {
        Self {
            inline: "k-x".to_string(),
            block: "k-b".to_string(),
        }
    }
}

/// How to pick between element registration and a one-shot scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyChoice {
    /// Probe the document
    #[default]
    Auto,
    Register,
    Scan,
}

/// User settings, read from a YAML file
///
/// ```yaml
/// tags:
///   inline: k-x
///   block: k-b
/// macros:
///   \RR: \mathbb{R}
/// strategy: auto
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tags: TagNames,
    /// Macros every invocation starts with
    pub macros: BTreeMap<String, String>,
    pub strategy: StrategyChoice,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, SettingsError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Set a macro, replacing the entry of the same name whether or not it
    /// was written with its leading backslash
    pub fn set_macro(&mut self, name: &str, expansion: &str) {
        let bare = name.strip_prefix('\\').unwrap_or(name);
        self.macros.remove(bare);
        self.macros.insert(format!("\\{bare}"), expansion.to_string());
    }

    /// A fresh macro table seeded with the configured macros
    pub fn macro_table(&self) -> MacroTable {
        MacroTable::from_entries(self.macros.clone())
    }
}
