pub mod aggregator;
pub mod config;
pub mod extract;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod scheduler;
pub mod session;
pub mod sites;
pub mod task;
pub mod utils;
pub mod workbook;

// Re-export commonly used types
pub use aggregator::ResultAggregator;
pub use config::AppConfig;
pub use models::{Locator, LocatorPair, PriceResult, ResultRow, ResultTable, Strategy, TargetSite};
pub use normalizer::PriceNormalizer;
pub use pipeline::BatchPipeline;
pub use scheduler::TaskScheduler;
pub use session::{PageSession, SessionFactory, SessionGuard, SessionPolicy};
pub use sites::SiteRegistry;
pub use task::{ScrapeSettings, ScrapeTask, TaskExecutor};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
