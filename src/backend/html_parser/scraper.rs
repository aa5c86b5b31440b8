use scraper::{Html, Selector};

use super::{HtmlElement, HtmlParser, QueriedElement, SelectorError};

/// [`HtmlParser`] backed by the `scraper` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperParser;

pub trait AsSelector {
    fn as_selector(self) -> Result<Selector, SelectorError>;
}

impl AsSelector for &str {
    fn as_selector(self) -> Result<Selector, SelectorError> {
        Selector::parse(self).map_err(|e| SelectorError::new(self, e.to_string()))
    }
}

impl HtmlParser for ScraperParser {
    fn query(&self, document: &HtmlElement, selector: &str) -> Result<Vec<QueriedElement>, SelectorError> {
        let selector = selector.as_selector()?;
        let document = Html::parse_document(document.as_str());

        let elements = document
            .select(&selector)
            .map(|element| {
                let attributes = element.value().attrs().map(|(name, value)| (name.to_string(), value.to_string())).collect();
                let text: String = element.text().collect();

                QueriedElement::new(attributes, text.trim().to_string())
            })
            .collect();

        Ok(elements)
    }
}
