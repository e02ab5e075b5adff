// Integration tests for price-scout
// These tests drive the scheduler and pipeline against scripted pages instead
// of a real browser.

pub mod pipeline_tests;
pub mod scheduler_tests;

use price_scout::{
    AppConfig, Locator, PageSession, SessionFactory, TargetSite,
    extract,
    utils::error::{AppError, Result},
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted page does when a session navigates to it.
#[derive(Debug, Clone)]
pub enum FakePage {
    Html(String),
    /// Takes this long to render, then serves the HTML.
    Slow(Duration, String),
    /// Container never shows up.
    NeverLoads,
    /// Navigation itself fails.
    Unreachable,
    /// The worker thread panics mid-task.
    Panic,
}

#[derive(Default)]
pub struct FakeSessionFactory {
    pages: Arc<Vec<(String, FakePage)>>,
    fail_launch: AtomicBool,
    pub acquired: AtomicUsize,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    pub released: Mutex<Vec<bool>>,
}

impl FakeSessionFactory {
    /// Pages are matched by substring of the navigated URL, first match wins.
    pub fn new(pages: Vec<(&str, FakePage)>) -> Arc<Self> {
        Arc::new(Self {
            pages: Arc::new(pages.into_iter().map(|(k, p)| (k.to_string(), p)).collect()),
            ..Default::default()
        })
    }

    pub fn failing_launch() -> Arc<Self> {
        let factory = Self::new(Vec::new());
        factory.fail_launch.store(true, Ordering::SeqCst);
        factory
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> Vec<bool> {
        self.released.lock().unwrap().clone()
    }
}

impl SessionFactory for FakeSessionFactory {
    fn acquire(&self) -> Result<Box<dyn PageSession>> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(AppError::SessionLaunch("Failed to launch browser: no chrome".into()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            pages: Arc::clone(&self.pages),
            current: None,
        }))
    }

    fn release(&self, _session: Box<dyn PageSession>, healthy: bool) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.released.lock().unwrap().push(healthy);
    }
}

struct FakeSession {
    pages: Arc<Vec<(String, FakePage)>>,
    current: Option<String>,
}

impl PageSession for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self
            .pages
            .iter()
            .find(|(key, _)| url.contains(key.as_str()))
            .map(|(_, page)| page.clone())
            .unwrap_or(FakePage::NeverLoads);

        self.current = match page {
            FakePage::Html(html) => Some(html),
            FakePage::Slow(delay, html) => {
                std::thread::sleep(delay);
                Some(html)
            }
            FakePage::NeverLoads => None,
            FakePage::Unreachable => {
                return Err(AppError::Navigation(format!("{url}: net::ERR_CONNECTION_REFUSED")));
            }
            FakePage::Panic => panic!("renderer crashed on {url}"),
        };
        Ok(())
    }

    fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<usize> {
        let count = match &self.current {
            Some(html) => extract::count_matches(html, locator)?,
            None => 0,
        };
        if count == 0 {
            return Err(AppError::Timeout {
                selector: locator.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        Ok(count)
    }

    fn price_texts(
        &mut self,
        container: &Locator,
        price: &Locator,
        limit: usize,
    ) -> Result<Vec<Result<String>>> {
        match &self.current {
            Some(html) => extract::scan_prices(html, container, price, limit),
            None => Ok(Vec::new()),
        }
    }
}

/// A results page with one product card per price.
pub fn listing(prices: &[&str]) -> String {
    let cards: String = prices
        .iter()
        .map(|p| format!(r#"<div class="card"><span class="price">{p}</span></div>"#))
        .collect();
    format!("<html><body>{cards}</body></html>")
}

pub fn test_site(domain: &str) -> TargetSite {
    TargetSite::new(
        domain,
        format!("https://{domain}/search?q={{query}}"),
        Locator::class_name("card"),
        Locator::class_name("price"),
    )
}

/// Configuration with two scripted retailers, `alpha.kz` and `beta.kz`.
pub fn test_config(workers: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.sites = vec![test_site("alpha.kz"), test_site("beta.kz")];
    config.scraper.targets = vec!["alpha.kz".to_string(), "beta.kz".to_string()];
    config.scraper.workers = workers;
    config.scraper.wait_timeout_secs = 1;
    config.logging.directory = None;
    config
}
