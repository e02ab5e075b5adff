use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::ScraperConfig;
use crate::models::{LocatorPair, PriceResult, TargetSite, MAX_PRICES};
use crate::normalizer::PriceNormalizer;
use crate::session::{PageSession, SessionFactory, SessionGuard};
use crate::utils::error::{AppError, Result};

/// One identifier looked up on one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTask {
    pub query: String,
    pub site: Arc<TargetSite>,
}

impl ScrapeTask {
    pub fn new(query: impl Into<String>, site: Arc<TargetSite>) -> Self {
        Self {
            query: query.into(),
            site,
        }
    }

    pub fn url(&self) -> String {
        self.site.search_url(&self.query)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScrapeSettings {
    pub wait_timeout: Duration,
    pub max_containers: usize,
}

impl ScrapeSettings {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            wait_timeout: Duration::from_secs(config.wait_timeout_secs),
            max_containers: config.max_containers.min(MAX_PRICES),
        }
    }
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self::from_config(&ScraperConfig::default())
    }
}

/// Runs a single task on the calling (blocking) thread.
#[derive(Clone)]
pub struct TaskExecutor {
    sessions: Arc<dyn SessionFactory>,
    normalizer: Arc<PriceNormalizer>,
    settings: ScrapeSettings,
}

impl TaskExecutor {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        normalizer: Arc<PriceNormalizer>,
        settings: ScrapeSettings,
    ) -> Self {
        Self {
            sessions,
            normalizer,
            settings,
        }
    }

    /// Never fails: timeouts become `NotFound`, everything else `Error`.
    pub fn execute(&self, task: &ScrapeTask, locators: &LocatorPair) -> PriceResult {
        let url = task.url();
        let result = match self.scrape(&url, locators) {
            Ok(prices) => PriceResult::from_prices(prices),
            Err(e) if e.is_timeout() => {
                info!("No results for '{}' on {}: {}", task.query, task.site.domain, e);
                PriceResult::NotFound
            }
            Err(e) => {
                error!("Error scraping {} for '{}': {}", task.site.domain, task.query, e);
                PriceResult::Error
            }
        };
        info!("Scraping for '{}' on {} completed", task.query, task.site.domain);
        result
    }

    fn scrape(&self, url: &str, locators: &LocatorPair) -> Result<Vec<String>> {
        let mut session = SessionGuard::acquire(&self.sessions)?;
        let result = self.scrape_page(&mut *session, url, locators);
        if matches!(&result, Err(e) if !e.is_timeout()) {
            session.mark_failed();
        }
        result
    }

    fn scrape_page(
        &self,
        session: &mut dyn PageSession,
        url: &str,
        locators: &LocatorPair,
    ) -> Result<Vec<String>> {
        debug!("Navigating to {}", url);
        session.navigate(url)?;

        let found = session.wait_for(&locators.container, self.settings.wait_timeout)?;
        debug!("{} containers matched {}", found, locators.container);

        let texts = session.price_texts(
            &locators.container,
            &locators.price,
            self.settings.max_containers,
        )?;

        let mut prices = Vec::new();
        for (index, text) in texts.into_iter().take(self.settings.max_containers).enumerate() {
            match text {
                Ok(text) => prices.push(self.normalizer.normalize(&text)),
                Err(AppError::ElementNotFound { selector }) => {
                    debug!("Container {} has no {}, skipping", index, selector);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(prices)
    }
}
