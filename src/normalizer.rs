use regex::Regex;
use std::sync::LazyLock;

pub const PRICE_ON_REQUEST: &str = "price on request";

// One digit run with optional interior spaces, an optional `,`/`.` decimal
// separator and up to two fractional digits.
static PRICE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d\s]*[.,]?\d{0,2})").unwrap());

/// Turns scraped price text into the canonical `"<digits>[.<digits>] "` form.
#[derive(Debug, Clone)]
pub struct PriceNormalizer {
    on_request: String,
}

impl PriceNormalizer {
    pub fn new() -> Self {
        Self::with_sentinel(PRICE_ON_REQUEST)
    }

    pub fn with_sentinel(on_request: impl Into<String>) -> Self {
        Self {
            on_request: on_request.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.on_request
    }

    /// Never fails: text without a digit run maps to the sentinel.
    pub fn normalize(&self, raw: &str) -> String {
        let text = raw.replace('\u{a0}', " ");
        match PRICE_PATTERN.captures(&text).and_then(|c| c.get(1)) {
            Some(m) => {
                let digits: String = m
                    .as_str()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| if c == ',' { '.' } else { c })
                    .collect();
                format!("{digits} ")
            }
            None => self.on_request.clone(),
        }
    }

    pub fn is_sentinel(&self, value: &str) -> bool {
        value == self.on_request
    }
}

impl Default for PriceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
