pub mod result;
pub mod site;

pub use result::{
    CellValue, MAX_PRICES, PriceResult, ResultGroup, ResultRow, ResultTable, SearchResponse, SiteResult,
};
pub use site::{Locator, LocatorPair, Strategy, TargetSite};
