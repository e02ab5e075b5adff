use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::extract;
use crate::models::TargetSite;
use crate::scheduler::DEFAULT_WORKERS;
use crate::session::SessionPolicy;
use crate::sites::SiteRegistry;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub workbook: WorkbookConfig,
    pub aggregate: AggregateConfig,
    pub labels: LabelsConfig,
    pub logging: LoggingConfig,
    /// Extra or replacement retailer entries, merged into the built-in table.
    #[serde(default)]
    pub sites: Vec<TargetSite>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub workers: usize,
    pub session_policy: SessionPolicy,
    pub wait_timeout_secs: u64,
    pub max_containers: usize,
    pub poll_interval_ms: u64,
    pub page_load_timeout_secs: u64,
    pub idle_browser_timeout_secs: u64,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    pub chrome_path: Option<String>,
    /// Domains every query is looked up on, in report column order.
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookConfig {
    pub identifier_column: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellMode {
    /// Every distinct price, in page order.
    Distinct,
    /// Only the first price found.
    First,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    pub mode: CellMode,
    pub separator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    pub not_found: String,
    pub error: String,
    pub price_on_request: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily log file; unset logs to stderr only.
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            session_policy: SessionPolicy::PerTask,
            wait_timeout_secs: 15,
            max_containers: 5,
            poll_interval_ms: 250,
            page_load_timeout_secs: 30,
            idle_browser_timeout_secs: 300,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_width: 1920,
            window_height: 1080,
            chrome_path: None,
            targets: vec!["220volt.kz".to_string(), "elcentre.kz".to_string()],
        }
    }
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            identifier_column: "SKU".to_string(),
            output_dir: "outputs".to_string(),
        }
    }
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            mode: CellMode::Distinct,
            separator: ", ".to_string(),
        }
    }
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            not_found: "not found".to_string(),
            error: "error".to_string(),
            price_on_request: crate::normalizer::PRICE_ON_REQUEST.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "price_scout=info".to_string(),
            directory: Some("logs".to_string()),
            file_prefix: "price-scout.log".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            workbook: WorkbookConfig::default(),
            aggregate: AggregateConfig::default(),
            labels: LabelsConfig::default(),
            logging: LoggingConfig::default(),
            sites: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Layers defaults, `config/*.toml`, an optional explicit file and
    /// `PRICE_SCOUT__*` environment variables, in that order.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        let s = builder
            .add_source(
                Environment::with_prefix("PRICE_SCOUT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("scraper.targets")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    /// Built-in retailer table with the configured `sites` applied.
    pub fn registry(&self) -> SiteRegistry {
        SiteRegistry::builtin().with_overrides(&self.sites)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.workers == 0 {
            return Err(ConfigError::Message("Scraper workers must be greater than 0".into()));
        }

        if self.scraper.wait_timeout_secs == 0 {
            return Err(ConfigError::Message("Scraper wait_timeout_secs must be greater than 0".into()));
        }

        if self.scraper.max_containers == 0 {
            return Err(ConfigError::Message("Scraper max_containers must be greater than 0".into()));
        }

        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must not be empty".into()));
        }

        if self.scraper.window_width == 0 || self.scraper.window_height == 0 {
            return Err(ConfigError::Message("Scraper window size must be non-zero".into()));
        }

        if self.scraper.targets.is_empty() {
            return Err(ConfigError::Message("At least one scraper target is required".into()));
        }

        if self.workbook.identifier_column.trim().is_empty() {
            return Err(ConfigError::Message("Workbook identifier_column must not be empty".into()));
        }

        for site in &self.sites {
            if site.domain.trim().is_empty() || site.url_template.trim().is_empty() {
                return Err(ConfigError::Message(
                    "Configured sites need a domain and a url_template".into(),
                ));
            }
        }

        let registry = self.registry();
        for target in &self.scraper.targets {
            let site = registry
                .get(target)
                .ok_or_else(|| ConfigError::Message(format!("Unknown scraper target: {}", target)))?;

            // Tasks look locators up by URL, so the site's own search page has
            // to resolve back to it.
            let resolved = registry
                .resolve_site(&site.search_url("SKU"))
                .map_err(|e| ConfigError::Message(format!("Target {}: {}", target, e)))?;
            if resolved.domain != site.domain {
                return Err(ConfigError::Message(format!(
                    "Target {} resolves to the locators of {}; register it before {}",
                    target, resolved.domain, resolved.domain
                )));
            }

            for locator in [&site.locators.container, &site.locators.price] {
                if extract::supports(locator) {
                    extract::to_selector(locator)
                        .map_err(|e| ConfigError::Message(format!("Target {}: {}", target, e)))?;
                }
            }
        }

        Ok(())
    }
}
