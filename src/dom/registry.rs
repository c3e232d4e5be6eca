//! Custom element registry
//!
//! A document that carries a registry can define named element kinds. Each
//! kind has a constructor that runs once per element: when an element of
//! that name is attached to the document, or, for elements that already
//! exist when the kind is defined, at definition time ("upgrade").

use super::document::ElementMut;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Hook run when an element of a defined kind is constructed
pub trait ElementConstructor {
    fn construct(&self, element: &mut ElementMut<'_>);
}

impl<F> ElementConstructor for F
where
    F: Fn(&mut ElementMut<'_>),
{
    fn construct(&self, element: &mut ElementMut<'_>) {
        self(element)
    }
}

/// Wrap a closure as a shareable constructor
pub fn from_fn<F>(f: F) -> Rc<dyn ElementConstructor>
where
    F: Fn(&mut ElementMut<'_>) + 'static,
{
    Rc::new(f)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefineError {
    #[error("'{0}' is not a valid custom element name")]
    InvalidName(String),
    #[error("an element named '{0}' has already been defined")]
    AlreadyDefined(String),
    #[error("the document does not support custom elements")]
    Unsupported,
}

/// Names the HTML standard keeps for SVG and MathML
const RESERVED_NAMES: [&str; 8] = [
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Check that `name` is a valid custom element name: it starts with a
/// lowercase ASCII letter, contains a hyphen, has no uppercase ASCII
/// letters or other ASCII punctuation besides `-`, `.` and `_`, and is not
/// reserved.
pub fn validate_name(name: &str) -> Result<(), DefineError> {
    let invalid = || DefineError::InvalidName(name.to_string());

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return Err(invalid()),
    }
    let valid_rest = chars.all(|c| {
        !c.is_ascii()
            || c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || matches!(c, '-' | '.' | '_')
    });
    if !valid_rest || !name.contains('-') || RESERVED_NAMES.contains(&name) {
        return Err(invalid());
    }
    Ok(())
}

#[derive(Default)]
pub struct CustomElementRegistry {
    definitions: BTreeMap<String, Rc<dyn ElementConstructor>>,
}

impl CustomElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Defined names in lexical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub(crate) fn constructor(
        &self,
        name: &str,
    ) -> Option<Rc<dyn ElementConstructor>> {
        self.definitions.get(name).cloned()
    }

    pub(crate) fn insert(
        &mut self,
        name: &str,
        constructor: Rc<dyn ElementConstructor>,
    ) -> Result<(), DefineError> {
        validate_name(name)?;
        if self.is_defined(name) {
            return Err(DefineError::AlreadyDefined(name.to_string()));
        }
        self.definitions.insert(name.to_string(), constructor);
        Ok(())
    }
}

impl fmt::Debug for CustomElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("k-x")]
    #[case("k-b")]
    #[case("math-block")]
    #[case("x-1.2_b")]
    #[case("emoji-😀")]
    fn test_valid_names(#[case] name: &str) {
        assert_eq!(validate_name(name), Ok(()));
    }

    #[rstest]
    #[case("")]
    #[case("kx")]
    #[case("K-x")]
    #[case("k-X")]
    #[case("1-x")]
    #[case("-kx")]
    #[case("k x-y")]
    #[case("font-face")]
    #[case("annotation-xml")]
    fn test_invalid_names(#[case] name: &str) {
        assert_eq!(
            validate_name(name),
            Err(DefineError::InvalidName(name.to_string()))
        );
    }

    fn noop(_: &mut ElementMut<'_>) {}

    #[test]
    fn test_define_twice_fails() {
        let mut registry = CustomElementRegistry::new();
        let noop: Rc<dyn ElementConstructor> = Rc::new(noop);

        assert_eq!(registry.insert("k-x", noop.clone()), Ok(()));
        assert_eq!(
            registry.insert("k-x", noop),
            Err(DefineError::AlreadyDefined("k-x".to_string()))
        );
        assert!(registry.is_defined("k-x"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["k-x"]);
        assert_eq!(format!("{:?}", registry), r#"{"k-x"}"#);
    }
}
