use serde::{Deserialize, Serialize};
use std::fmt;

/// How a selector string is interpreted when looking up elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ClassName,
    Xpath,
    Css,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ClassName => "class_name",
            Strategy::Xpath => "xpath",
            Strategy::Css => "css",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: Strategy,
    pub selector: String,
}

impl Locator {
    pub fn class_name(selector: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::ClassName,
            selector: selector.into(),
        }
    }

    pub fn xpath(selector: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Xpath,
            selector: selector.into(),
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Css,
            selector: selector.into(),
        }
    }

    pub fn is_xpath(&self) -> bool {
        self.strategy == Strategy::Xpath
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy.as_str(), self.selector)
    }
}

/// Container locator and the price locator searched inside each container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorPair {
    pub container: Locator,
    pub price: Locator,
}

pub const QUERY_PLACEHOLDER: &str = "{query}";

/// One external retailer: where to search and how to read its results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSite {
    /// Matched as a substring of the page host.
    pub domain: String,
    /// Search page URL. `{query}` is replaced by the encoded identifier,
    /// otherwise the identifier is appended.
    pub url_template: String,
    #[serde(flatten)]
    pub locators: LocatorPair,
}

impl TargetSite {
    pub fn new(
        domain: impl Into<String>,
        url_template: impl Into<String>,
        container: Locator,
        price: Locator,
    ) -> Self {
        Self {
            domain: domain.into(),
            url_template: url_template.into(),
            locators: LocatorPair { container, price },
        }
    }

    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        if self.url_template.contains(QUERY_PLACEHOLDER) {
            self.url_template.replace(QUERY_PLACEHOLDER, &encoded)
        } else {
            format!("{}{}", self.url_template, encoded)
        }
    }
}
