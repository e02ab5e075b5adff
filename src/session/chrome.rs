use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{PageSession, SessionFactory, SessionPolicy};
use crate::config::ScraperConfig;
use crate::extract;
use crate::models::Locator;
use crate::utils::error::{AppError, Result};

// Element lookup shared by the in-page scripts. Mirrors the three locator
// strategies; XPath is evaluated relative to `root`.
const FIND_FN: &str = r#"
    function find(strategy, selector, root) {
        if (strategy === 'class_name') {
            return Array.from(root.getElementsByClassName(selector));
        }
        if (strategy === 'css') {
            return Array.from(root.querySelectorAll(selector));
        }
        const snapshot = document.evaluate(selector, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        const nodes = [];
        for (let i = 0; i < snapshot.snapshotLength; i++) {
            nodes.push(snapshot.snapshotItem(i));
        }
        return nodes;
    }
"#;

/// Launches headless Chrome sessions according to the configured policy.
pub struct ChromeSessionFactory {
    config: ScraperConfig,
    args: Vec<OsString>,
    idle: Mutex<Vec<Box<dyn PageSession>>>,
    capacity: usize,
}

impl ChromeSessionFactory {
    pub fn new(config: ScraperConfig) -> Self {
        let args = vec![
            OsString::from("--disable-gpu"),
            OsString::from("--no-sandbox"),
            OsString::from("--disable-dev-shm-usage"),
            // Only text is read from the page.
            OsString::from("--blink-settings=imagesEnabled=false"),
            OsString::from("--disable-extensions"),
        ];

        let capacity = match config.session_policy {
            SessionPolicy::PerTask => 0,
            SessionPolicy::Pooled => config.workers,
        };

        Self {
            config,
            args,
            idle: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.config.session_policy
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drops every idle browser.
    pub fn shutdown(&self) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        let count = idle.len();
        idle.clear();
        if count > 0 {
            info!("Closed {} pooled browser sessions", count);
        }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'_>> {
        let args: Vec<&OsStr> = self.args.iter().map(OsString::as_os_str).collect();

        let mut options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((self.config.window_width, self.config.window_height)))
            .idle_browser_timeout(Duration::from_secs(self.config.idle_browser_timeout_secs))
            .args(args)
            .build()
            .map_err(|e| AppError::SessionLaunch(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &self.config.chrome_path {
            options.path = Some(PathBuf::from(chrome_path));
        }

        Ok(options)
    }

    fn launch(&self) -> Result<ChromeSession> {
        let browser = Browser::new(self.launch_options()?)
            .map_err(|e| AppError::SessionLaunch(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| AppError::SessionLaunch(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&self.config.user_agent, None, None)
            .map_err(|e| AppError::SessionLaunch(format!("Failed to set user agent: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(self.config.page_load_timeout_secs));

        debug!("Launched headless browser session");
        Ok(ChromeSession {
            _browser: browser,
            tab,
            poll_interval: Duration::from_millis(self.config.poll_interval_ms),
        })
    }
}

impl SessionFactory for ChromeSessionFactory {
    fn acquire(&self) -> Result<Box<dyn PageSession>> {
        while self.capacity > 0 {
            let reused = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
            let Some(mut session) = reused else {
                break;
            };
            // The idle-browser timeout may have shut it down while pooled.
            if session.is_alive() {
                debug!("Reusing pooled browser session");
                return Ok(session);
            }
            debug!("Dropping dead pooled browser session");
        }
        Ok(Box::new(self.launch()?))
    }

    fn release(&self, session: Box<dyn PageSession>, healthy: bool) {
        if !healthy {
            warn!("Discarding browser session after failure");
            return;
        }
        if self.capacity == 0 {
            return;
        }
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.capacity {
            idle.push(session);
        }
    }
}

impl Drop for ChromeSessionFactory {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub struct ChromeSession {
    // Owns the browser process; dropping it shuts Chrome down.
    _browser: Browser,
    tab: Arc<Tab>,
    poll_interval: Duration,
}

impl ChromeSession {
    fn evaluate_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| AppError::Script(e.to_string()))?;

        let value = result
            .value
            .ok_or_else(|| AppError::Script("Query returned no value".to_string()))?;
        let text = value
            .as_str()
            .ok_or_else(|| AppError::Script(format!("Unexpected query result: {}", value)))?;

        Ok(serde_json::from_str(text)?)
    }

    fn count(&self, locator: &Locator) -> Result<usize> {
        self.evaluate_json(&count_script(locator)?)
    }
}

impl PageSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| AppError::Navigation(format!("{}: {}", url, e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| AppError::Navigation(format!("{}: {}", url, e)))?;
        Ok(())
    }

    fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<usize> {
        let poll_interval = self.poll_interval;
        poll_count(locator, timeout, poll_interval, || self.count(locator))
    }

    fn price_texts(
        &mut self,
        container: &Locator,
        price: &Locator,
        limit: usize,
    ) -> Result<Vec<Result<String>>> {
        if extract::supports(container) && extract::supports(price) {
            let html = self
                .tab
                .get_content()
                .map_err(|e| AppError::Script(format!("Failed to get page content: {}", e)))?;
            return extract::scan_prices(&html, container, price, limit);
        }

        let texts: Vec<Option<String>> = self.evaluate_json(&scan_script(container, price, limit)?)?;
        Ok(texts
            .into_iter()
            .map(|text| {
                text.ok_or_else(|| AppError::ElementNotFound {
                    selector: price.to_string(),
                })
            })
            .collect())
    }

    fn is_alive(&mut self) -> bool {
        self.tab.get_target_info().is_ok()
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        let _ = self.tab.close(true);
    }
}

/// Polls `count` until it reports a match or `timeout` passes.
///
/// Query errors are tolerated while the document loads. If not a single
/// query succeeded before the deadline the page is unusable, and the last
/// error is returned instead of `Timeout`.
fn poll_count(
    locator: &Locator,
    timeout: Duration,
    poll_interval: Duration,
    mut count: impl FnMut() -> Result<usize>,
) -> Result<usize> {
    let started = Instant::now();
    let mut answered = false;
    let mut last_error = None;
    loop {
        match count() {
            Ok(found) if found > 0 => return Ok(found),
            Ok(_) => answered = true,
            Err(e) => {
                debug!("Element query for {} failed: {}", locator, e);
                last_error = Some(e);
            }
        }

        if started.elapsed() >= timeout {
            return match last_error {
                Some(e) if !answered => Err(e),
                _ => Err(AppError::Timeout {
                    selector: locator.to_string(),
                    seconds: timeout.as_secs(),
                }),
            };
        }
        std::thread::sleep(poll_interval);
    }
}

fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn count_script(locator: &Locator) -> Result<String> {
    Ok(format!(
        "(function() {{ {} return JSON.stringify(find({}, {}, document).length); }})()",
        FIND_FN,
        js_string(locator.strategy.as_str())?,
        js_string(&locator.selector)?,
    ))
}

fn scan_script(container: &Locator, price: &Locator, limit: usize) -> Result<String> {
    Ok(format!(
        r#"(function() {{
            {}
            const containers = find({}, {}, document).slice(0, {});
            return JSON.stringify(containers.map(function(container) {{
                const found = find({}, {}, container);
                if (found.length === 0) {{
                    return null;
                }}
                return (found[0].innerText || found[0].textContent || '').trim();
            }}));
        }})()"#,
        FIND_FN,
        js_string(container.strategy.as_str())?,
        js_string(&container.selector)?,
        limit,
        js_string(price.strategy.as_str())?,
        js_string(&price.selector)?,
    ))
}
