use serde::{Deserialize, Serialize};

pub const MAX_PRICES: usize = 5;

/// Outcome of one (query, site) lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "prices", rename_all = "snake_case")]
pub enum PriceResult {
    /// Normalized prices in page order, never empty, at most `MAX_PRICES`.
    Found(Vec<String>),
    NotFound,
    Error,
}

impl PriceResult {
    /// Builds a result from scanned prices, mapping an empty scan to `NotFound`.
    pub fn from_prices(mut prices: Vec<String>) -> Self {
        if prices.is_empty() {
            return PriceResult::NotFound;
        }
        prices.truncate(MAX_PRICES);
        PriceResult::Found(prices)
    }

    pub fn prices(&self) -> &[String] {
        match self {
            PriceResult::Found(prices) => prices,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub query: String,
    /// One entry per configured site, in site order.
    pub results: Vec<PriceResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultGroup {
    pub name: String,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    pub identifier_column: String,
    /// Site domains in configuration order.
    pub sites: Vec<String>,
    pub groups: Vec<ResultGroup>,
}

impl ResultTable {
    pub fn new(identifier_column: impl Into<String>, sites: Vec<String>) -> Self {
        Self {
            identifier_column: identifier_column.into(),
            sites,
            groups: Vec::new(),
        }
    }

    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.identifier_column.clone())
            .chain(self.sites.iter().cloned())
            .collect()
    }

    pub fn group(&self, name: &str) -> Option<&ResultGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }
}

/// JSON form of a result: the price list itself, or the sentinel label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Prices(Vec<String>),
    Label(String),
}

/// One site's entry in an interactive lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteResult {
    pub site: String,
    pub url: String,
    pub result: CellValue,
    /// Same text the batch report would put in this cell.
    pub display: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SiteResult>,
}
