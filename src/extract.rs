//! Locator evaluation over a static HTML document.
//!
//! Only class-name and CSS locators can be evaluated here; XPath needs the
//! live page and is handled by the browser session.

use scraper::{ElementRef, Html, Selector};

use crate::models::{Locator, Strategy};
use crate::utils::error::{AppError, Result};

pub fn supports(locator: &Locator) -> bool {
    !locator.is_xpath()
}

/// Compiles a locator into a CSS selector.
pub fn to_selector(locator: &Locator) -> Result<Selector> {
    let css = match locator.strategy {
        // Compound class names select elements carrying every class.
        Strategy::ClassName => locator
            .selector
            .split_whitespace()
            .map(|class| format!(".{class}"))
            .collect::<String>(),
        Strategy::Css => locator.selector.clone(),
        Strategy::Xpath => {
            return Err(AppError::InvalidLocator {
                selector: locator.to_string(),
                message: "XPath cannot be evaluated against static HTML".to_string(),
            });
        }
    };

    Selector::parse(&css).map_err(|e| AppError::InvalidLocator {
        selector: locator.to_string(),
        message: format!("{e:?}"),
    })
}

/// Text content the way the browser's `innerText` reads it for inline markup.
pub fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub fn count_matches(html: &str, locator: &Locator) -> Result<usize> {
    let selector = to_selector(locator)?;
    let document = Html::parse_document(html);
    let count = document.select(&selector).count();
    Ok(count)
}

/// Reads the price text inside each of the first `limit` containers.
///
/// A container without a price element yields `ElementNotFound` in its slot.
pub fn scan_prices(
    html: &str,
    container: &Locator,
    price: &Locator,
    limit: usize,
) -> Result<Vec<Result<String>>> {
    let container_selector = to_selector(container)?;
    let price_selector = to_selector(price)?;
    let document = Html::parse_document(html);

    let texts = document
        .select(&container_selector)
        .take(limit)
        .map(|node| {
            node.select(&price_selector)
                .next()
                .map(|el| element_text(&el))
                .ok_or_else(|| AppError::ElementNotFound {
                    selector: price.to_string(),
                })
        })
        .collect();

    Ok(texts)
}
