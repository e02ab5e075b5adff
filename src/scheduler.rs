//! Bounded worker pool for browser-driven tasks.
//!
//! Browser work is blocking, so every task runs on tokio's blocking pool. A
//! semaphore caps how many of them are in flight; extra tasks and extra
//! batches simply wait for a permit. Results are returned in submission order
//! regardless of completion order.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::models::{LocatorPair, PriceResult};
use crate::sites::SiteRegistry;
use crate::task::{ScrapeTask, TaskExecutor};
use crate::utils::error::Result;

pub const DEFAULT_WORKERS: usize = 4;

pub struct TaskScheduler {
    registry: Arc<SiteRegistry>,
    executor: TaskExecutor,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl TaskScheduler {
    pub fn new(registry: Arc<SiteRegistry>, executor: TaskExecutor, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            registry,
            executor,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs a batch and waits for all of it.
    ///
    /// Locators for every task are resolved up front, so an unsupported site
    /// fails the whole call before any worker or session is used.
    pub async fn run_all(&self, tasks: &[ScrapeTask]) -> Result<Vec<PriceResult>> {
        let resolved = tasks
            .iter()
            .map(|task| {
                let locators = self.registry.resolve(&task.url())?.clone();
                Ok((task.clone(), locators))
            })
            .collect::<Result<Vec<(ScrapeTask, LocatorPair)>>>()?;

        debug!("Submitting batch of {} tasks to {} workers", resolved.len(), self.workers);

        let pending = resolved
            .into_iter()
            .map(|(task, locators)| self.spawn(task, locators));

        Ok(join_all(pending).await)
    }

    async fn spawn(&self, task: ScrapeTask, locators: LocatorPair) -> PriceResult {
        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Worker pool closed: {}", e);
                return PriceResult::Error;
            }
        };

        let executor = self.executor.clone();
        let domain = task.site.domain.clone();
        let query = task.query.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            executor.execute(&task, &locators)
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("Worker for '{}' on {} failed: {}", query, domain, e);
                PriceResult::Error
            }
        }
    }
}
