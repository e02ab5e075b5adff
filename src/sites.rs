//! Ordered registry of supported retailer sites.
//!
//! Domains are matched as substrings of the page host, top to bottom, first
//! match wins. Order matters: `volt.kz` is a substring of `220volt.kz`, so the
//! longer domain has to be registered first.
//!
//! This table is the contract with the retailers' markup. When a site changes
//! its layout the symptom is a column of "not found" cells, not a crash.

use tracing::debug;
use url::Url;

use crate::models::{Locator, LocatorPair, TargetSite};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct SiteRegistry {
    sites: Vec<TargetSite>,
}

impl SiteRegistry {
    pub fn new(sites: Vec<TargetSite>) -> Self {
        Self { sites }
    }

    /// The built-in retailer table.
    pub fn builtin() -> Self {
        Self::new(vec![
            TargetSite::new(
                "nur-electro.kz",
                "https://nur-electro.kz/search?query={query}",
                Locator::class_name("products"),
                Locator::class_name("price"),
            ),
            TargetSite::new(
                "euroelectric.kz",
                "https://euroelectric.kz/search?query={query}",
                Locator::class_name("product-item"),
                Locator::class_name("product-price"),
            ),
            TargetSite::new(
                "220volt.kz",
                "https://220volt.kz/search?query={query}",
                Locator::class_name("cards__list"),
                Locator::class_name("product__buy-info-price-actual_value"),
            ),
            TargetSite::new(
                "ekt.kz",
                "https://ekt.kz/search?query={query}",
                Locator::class_name("left-block"),
                Locator::class_name("price"),
            ),
            TargetSite::new(
                "intant.kz",
                "https://intant.kz/search?query={query}",
                Locator::class_name("product_card__block_item_inner"),
                Locator::class_name("product-card-inner__new-price"),
            ),
            TargetSite::new(
                "elcentre.kz",
                "https://elcentre.kz/site_search?search_term={query}",
                Locator::class_name("b-product-gallery"),
                Locator::xpath(".//span[@class='b-product-gallery__current-price']"),
            ),
            TargetSite::new(
                "albion-group.kz",
                "https://albion-group.kz/search?query={query}",
                Locator::class_name("cs-product-gallery"),
                Locator::css("span.cs-goods-price__value.cs-goods-price__value_type_current"),
            ),
            TargetSite::new(
                "volt.kz",
                "https://volt.kz/search?query={query}",
                Locator::class_name("multi-snippet"),
                Locator::xpath(".//span[@class='multi-price']"),
            ),
        ])
    }

    /// Applies configured sites: an entry whose domain is already registered
    /// replaces it in place, anything else is appended.
    pub fn with_overrides(mut self, overrides: &[TargetSite]) -> Self {
        for site in overrides {
            match self.sites.iter_mut().find(|s| s.domain == site.domain) {
                Some(existing) => {
                    debug!("Overriding site {}", site.domain);
                    *existing = site.clone();
                }
                None => {
                    debug!("Registering site {}", site.domain);
                    self.sites.push(site.clone());
                }
            }
        }
        self
    }

    pub fn sites(&self) -> &[TargetSite] {
        &self.sites
    }

    pub fn get(&self, domain: &str) -> Option<&TargetSite> {
        self.sites.iter().find(|s| s.domain == domain)
    }

    /// Looks up the locators for a page URL.
    pub fn resolve(&self, url: &str) -> Result<&LocatorPair> {
        self.resolve_site(url).map(|site| &site.locators)
    }

    pub fn resolve_site(&self, url: &str) -> Result<&TargetSite> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| AppError::UnsupportedSite {
                domain: url.to_string(),
            })?;

        self.sites
            .iter()
            .find(|site| host.contains(&site.domain))
            .ok_or(AppError::UnsupportedSite { domain: host })
    }

    /// Picks the sites every query is fanned out to, in the given order.
    pub fn targets(&self, domains: &[String]) -> Result<Vec<TargetSite>> {
        domains
            .iter()
            .map(|domain| {
                self.get(domain)
                    .cloned()
                    .ok_or_else(|| AppError::UnsupportedSite {
                        domain: domain.clone(),
                    })
            })
            .collect()
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
