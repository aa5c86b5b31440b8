use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

pub mod scraper;

/// Intended to represent html, not just a string
#[derive(Debug, Clone)]
pub struct HtmlElement(String);

impl HtmlElement {
    pub fn new<T: Into<String>>(raw_str: T) -> Self {
        let s: String = raw_str.into();
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Owned snapshot of an element matched by a selector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueriedElement {
    attributes: HashMap<String, String>,
    text: String,
}

impl QueriedElement {
    pub fn new(attributes: HashMap<String, String>, text: String) -> Self {
        Self { attributes, text }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    selector: String,
    reason: String,
}

impl SelectorError {
    pub fn new(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            reason: reason.into(),
        }
    }
}

impl Display for SelectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid selector `{}`, reason: {}", self.selector, self.reason)
    }
}

impl Error for SelectorError {}

/// Runs css selectors against a document, the html engine doing the work is up to the implementor
pub trait HtmlParser {
    /// Elements matching `selector` in document order
    fn query(&self, document: &HtmlElement, selector: &str) -> Result<Vec<QueriedElement>, SelectorError>;
}
