//! Macro table shared by every render call of one invocation

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Mapping of macro names (with their leading backslash, e.g. `\RR`) to
/// expansions, as KaTeX expects them.
///
/// Cloning the table clones the handle, not the entries: every clone sees
/// definitions made through any other clone. Use [`MacroTable::fork`] for an
/// independent copy.
#[derive(Clone, Debug, Default)]
pub struct MacroTable(Rc<RefCell<BTreeMap<String, String>>>);

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh table pre-populated with `entries`
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (normalize_name(k.into()), v.into()))
            .collect();
        Self(Rc::new(RefCell::new(map)))
    }

    /// An independent table holding a copy of the current entries
    pub fn fork(&self) -> Self {
        Self(Rc::new(RefCell::new(self.0.borrow().clone())))
    }

    pub fn define(&self, name: impl Into<String>, expansion: impl Into<String>) {
        self.0
            .borrow_mut()
            .insert(normalize_name(name.into()), expansion.into());
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.0.borrow().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Copy of the entries in name order
    pub fn entries(&self) -> Vec<(String, String)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Whether both handles point at the same table
    pub fn shares_with(&self, other: &MacroTable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Record every global definition found in `source`.
    ///
    /// Recognized forms: `\gdef`, `\xdef`, `\global\def` and `\global\edef`,
    /// each followed by a control sequence, an optional parameter text made
    /// of `#n` markers, and a braced body. Local `\def` does not outlive a
    /// single render and is ignored. Returns the number of definitions
    /// recorded.
    pub fn absorb_definitions(&self, source: &str) -> usize {
        let definitions = global_definitions(source);
        let count = definitions.len();
        let mut map = self.0.borrow_mut();
        for (name, body) in definitions {
            map.insert(name, body);
        }
        count
    }
}

fn normalize_name(name: String) -> String {
    if name.starts_with('\\') {
        name
    } else {
        format!("\\{name}")
    }
}

// Scanning
// ====================

fn global_definitions(source: &str) -> Vec<(String, String)> {
    let mut cursor = Cursor { src: source, pos: 0 };
    let mut found = Vec::new();

    while let Some(c) = cursor.bump() {
        if c != '\\' {
            continue;
        }
        let Some(word) = cursor.control_name() else {
            break;
        };
        let is_global = match word {
            "gdef" | "xdef" => true,
            "global" => {
                let mark = cursor.pos;
                cursor.skip_whitespace();
                if cursor.peek() == Some('\\') {
                    cursor.bump();
                    matches!(cursor.control_name(), Some("def" | "edef"))
                } else {
                    cursor.pos = mark;
                    false
                }
            }
            _ => false,
        };
        if is_global {
            if let Some(definition) = cursor.definition() {
                found.push(definition);
            }
        }
    }
    found
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Name of a control sequence whose backslash was just consumed: a run
    /// of letters, or a single other character.
    fn control_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        if self.peek()?.is_ascii_alphabetic() {
            while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
                self.bump();
            }
        } else {
            self.bump();
        }
        Some(&self.src[start..self.pos])
    }

    /// `\name #1#2 {body}` following a defining command
    fn definition(&mut self) -> Option<(String, String)> {
        self.skip_whitespace();
        if self.bump()? != '\\' {
            return None;
        }
        let name = self.control_name()?;
        loop {
            match self.peek()? {
                '{' => break,
                '#' => {
                    self.bump();
                }
                c if c.is_ascii_digit() || c.is_whitespace() => {
                    self.bump();
                }
                _ => return None,
            }
        }
        let body = self.braced_group()?;
        Some((format!("\\{name}"), body.to_string()))
    }

    fn braced_group(&mut self) -> Option<&'a str> {
        if self.bump()? != '{' {
            return None;
        }
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&self.src[start..self.pos - 1]);
                    }
                }
                _ => {}
            }
        }
        None
    }
}
