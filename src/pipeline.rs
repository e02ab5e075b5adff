use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregator::ResultAggregator;
use crate::config::AppConfig;
use crate::models::{ResultGroup, ResultTable, SearchResponse, SiteResult, TargetSite};
use crate::normalizer::PriceNormalizer;
use crate::scheduler::TaskScheduler;
use crate::session::{ChromeSessionFactory, SessionFactory};
use crate::task::{ScrapeSettings, ScrapeTask, TaskExecutor};
use crate::utils::error::{AppError, Result};
use crate::workbook::{self, QueryGroups};

/// Entry point for batch (workbook) and interactive (single query) lookups.
pub struct BatchPipeline {
    scheduler: TaskScheduler,
    targets: Vec<Arc<TargetSite>>,
    aggregator: ResultAggregator,
    identifier_column: String,
}

impl BatchPipeline {
    /// Builds a pipeline backed by headless Chrome.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let sessions = Arc::new(ChromeSessionFactory::new(config.scraper.clone()));
        Self::with_sessions(config, sessions)
    }

    pub fn with_sessions(config: &AppConfig, sessions: Arc<dyn SessionFactory>) -> Result<Self> {
        let registry = Arc::new(config.registry());
        let targets = registry
            .targets(&config.scraper.targets)?
            .into_iter()
            .map(Arc::new)
            .collect();

        let normalizer = Arc::new(PriceNormalizer::with_sentinel(&config.labels.price_on_request));
        let executor = TaskExecutor::new(
            sessions,
            normalizer,
            ScrapeSettings::from_config(&config.scraper),
        );

        Ok(Self {
            scheduler: TaskScheduler::new(registry, executor, config.scraper.workers),
            targets,
            aggregator: ResultAggregator::new(&config.aggregate, &config.labels),
            identifier_column: config.workbook.identifier_column.clone(),
        })
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    fn tasks_for(&self, query: &str) -> Vec<ScrapeTask> {
        self.targets
            .iter()
            .map(|site| ScrapeTask::new(query, Arc::clone(site)))
            .collect()
    }

    /// Looks up every identifier of every group on every target site.
    ///
    /// Each group is submitted as one batch made of the per-identifier task
    /// lists back to back, so results map onto rows by position.
    pub async fn run(&self, groups: &QueryGroups) -> Result<ResultTable> {
        let sites = self.targets.iter().map(|s| s.domain.clone()).collect();
        let mut table = ResultTable::new(self.identifier_column.clone(), sites);
        let site_count = self.targets.len();

        for (name, queries) in groups {
            let queries: Vec<&str> = queries
                .iter()
                .map(|q| q.trim())
                .filter(|q| !q.is_empty())
                .collect();
            info!("Processing sheet '{}' with {} identifiers", name, queries.len());

            let tasks: Vec<ScrapeTask> = queries.iter().flat_map(|q| self.tasks_for(q)).collect();
            let results = self.scheduler.run_all(&tasks).await?;

            let mut rows = Vec::with_capacity(queries.len());
            let mut results = results.into_iter();
            for query in &queries {
                let cells = results.by_ref().take(site_count).collect();
                rows.push(self.aggregator.row(*query, cells, site_count)?);
            }

            table.groups.push(ResultGroup {
                name: name.clone(),
                rows,
            });
        }

        Ok(table)
    }

    /// Interactive lookup of one identifier on every target site.
    pub async fn run_single(&self, query: &str) -> Result<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InputFormat("Search query must not be empty".to_string()));
        }

        let tasks = self.tasks_for(query);
        let results = self.scheduler.run_all(&tasks).await?;

        let results = tasks
            .iter()
            .zip(results)
            .map(|(task, result)| {
                let result = self.aggregator.combine(result);
                SiteResult {
                    site: task.site.domain.clone(),
                    url: task.url(),
                    result: self.aggregator.value(&result),
                    display: self.aggregator.render(&result),
                }
            })
            .collect();

        Ok(SearchResponse {
            query: query.to_string(),
            results,
        })
    }

    /// Reads `input`, runs the batch and writes the report into `output_dir`.
    pub async fn run_file(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        info!("Processing file: {}", input.display());

        let groups = {
            let input = input.to_path_buf();
            let column = self.identifier_column.clone();
            tokio::task::spawn_blocking(move || workbook::read_groups(&input, &column))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))??
        };
        if groups.is_empty() {
            warn!(
                "No sheet in {} has a '{}' column",
                input.display(),
                self.identifier_column
            );
        }

        let table = self.run(&groups).await?;

        tokio::fs::create_dir_all(output_dir).await?;
        let output = output_dir.join(format!(
            "result_{}_{}.xlsx",
            Utc::now().format("%Y%m%d_%H%M%S"),
            Uuid::new_v4().simple()
        ));

        let row_count = table.row_count();
        {
            let output = output.clone();
            let aggregator = self.aggregator.clone();
            tokio::task::spawn_blocking(move || workbook::write_table(&table, &aggregator, &output))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))??;
        }

        info!("Wrote {} rows to {}", row_count, output.display());
        Ok(output)
    }
}
