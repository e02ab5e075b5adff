// Scheduler tests: ordering, bounded concurrency and failure isolation

use super::{FakePage, FakeSessionFactory, listing, test_config, test_site};
use price_scout::{
    AppError, PriceNormalizer, PriceResult, ScrapeSettings, ScrapeTask, SessionFactory,
    TaskExecutor, TaskScheduler,
};
use std::sync::Arc;
use std::time::Duration;

fn scheduler(factory: Arc<FakeSessionFactory>, workers: usize) -> TaskScheduler {
    let config = test_config(workers);
    let sessions: Arc<dyn SessionFactory> = factory;
    let executor = TaskExecutor::new(
        sessions,
        Arc::new(PriceNormalizer::new()),
        ScrapeSettings::from_config(&config.scraper),
    );
    TaskScheduler::new(Arc::new(config.registry()), executor, workers)
}

fn alpha_task(query: &str) -> ScrapeTask {
    ScrapeTask::new(query, Arc::new(test_site("alpha.kz")))
}

fn found(prices: &[&str]) -> PriceResult {
    PriceResult::Found(prices.iter().map(|p| p.to_string()).collect())
}

#[tokio::test]
async fn test_results_follow_submission_order() {
    // Earlier tasks are slower, so completion order is the reverse of input.
    let factory = FakeSessionFactory::new(vec![
        ("q=FIRST", FakePage::Slow(Duration::from_millis(150), listing(&["100 ₸"]))),
        ("q=SECOND", FakePage::Slow(Duration::from_millis(80), listing(&["200 ₸"]))),
        ("q=THIRD", FakePage::Slow(Duration::from_millis(20), listing(&["300 ₸"]))),
        ("q=FOURTH", FakePage::Html(listing(&["400 ₸"]))),
    ]);
    let scheduler = scheduler(factory, 4);

    let tasks: Vec<ScrapeTask> = ["FIRST", "SECOND", "THIRD", "FOURTH"]
        .into_iter()
        .map(alpha_task)
        .collect();
    let results = scheduler.run_all(&tasks).await.unwrap();

    assert_eq!(
        results,
        vec![found(&["100 "]), found(&["200 "]), found(&["300 "]), found(&["400 "])]
    );
}

#[tokio::test]
async fn test_concurrency_is_bounded_by_workers() {
    let factory = FakeSessionFactory::new(vec![(
        "alpha.kz",
        FakePage::Slow(Duration::from_millis(40), listing(&["1 000 ₸"])),
    )]);
    let scheduler = scheduler(factory.clone(), 2);
    assert_eq!(scheduler.workers(), 2);

    let tasks: Vec<ScrapeTask> = (0..8).map(|i| alpha_task(&format!("CODE{i}"))).collect();
    let results = scheduler.run_all(&tasks).await.unwrap();

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|r| *r == found(&["1000 "])));
    assert_eq!(factory.acquired(), 8);
    assert!(factory.max_active() <= 2, "max active was {}", factory.max_active());
    assert!(factory.max_active() >= 1);
}

#[tokio::test]
async fn test_zero_workers_still_makes_progress() {
    let factory = FakeSessionFactory::new(vec![("alpha.kz", FakePage::Html(listing(&["5 ₸"])))]);
    let scheduler = scheduler(factory, 0);
    assert_eq!(scheduler.workers(), 1);

    let results = scheduler.run_all(&[alpha_task("X1")]).await.unwrap();
    assert_eq!(results, vec![found(&["5 "])]);
}

#[tokio::test]
async fn test_unsupported_site_fails_before_any_session() {
    let factory = FakeSessionFactory::new(vec![("alpha.kz", FakePage::Html(listing(&["5 ₸"])))]);
    let scheduler = scheduler(factory.clone(), 2);

    let tasks = vec![
        alpha_task("X1"),
        ScrapeTask::new("X1", Arc::new(test_site("unknown-shop.com"))),
    ];
    let err = scheduler.run_all(&tasks).await.unwrap_err();

    assert!(matches!(err, AppError::UnsupportedSite { .. }));
    assert_eq!(factory.acquired(), 0);
}

#[tokio::test]
async fn test_empty_batch_returns_empty() {
    let factory = FakeSessionFactory::new(Vec::new());
    let scheduler = scheduler(factory.clone(), 2);

    assert!(scheduler.run_all(&[]).await.unwrap().is_empty());
    assert_eq!(factory.acquired(), 0);
}

#[tokio::test]
async fn test_failures_stay_in_their_cell() {
    let factory = FakeSessionFactory::new(vec![
        ("q=GOOD", FakePage::Html(listing(&["7 990 ₸"]))),
        ("q=MISSING", FakePage::NeverLoads),
        ("q=DOWN", FakePage::Unreachable),
        ("q=CRASH", FakePage::Panic),
    ]);
    let scheduler = scheduler(factory.clone(), 2);

    let tasks: Vec<ScrapeTask> = ["GOOD", "MISSING", "DOWN", "CRASH", "GOOD"]
        .into_iter()
        .map(alpha_task)
        .collect();
    let results = scheduler.run_all(&tasks).await.unwrap();

    assert_eq!(
        results,
        vec![
            found(&["7990 "]),
            PriceResult::NotFound,
            PriceResult::Error,
            PriceResult::Error,
            found(&["7990 "]),
        ]
    );

    // Every session went back, failed ones flagged unhealthy.
    let releases = factory.releases();
    assert_eq!(releases.len(), 5);
    assert_eq!(releases.iter().filter(|healthy| !**healthy).count(), 2);
}

#[tokio::test]
async fn test_launch_failure_marks_every_cell_as_error() {
    let factory = FakeSessionFactory::failing_launch();
    let scheduler = scheduler(factory.clone(), 2);

    let tasks = vec![alpha_task("X1"), alpha_task("X2")];
    let results = scheduler.run_all(&tasks).await.unwrap();

    assert_eq!(results, vec![PriceResult::Error, PriceResult::Error]);
    assert!(factory.releases().is_empty());
}
