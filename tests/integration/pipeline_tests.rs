// Pipeline tests: row assembly, single lookups and cell rendering

use super::{FakePage, FakeSessionFactory, listing, test_config};
use indexmap::IndexMap;
use price_scout::config::CellMode;
use price_scout::models::CellValue;
use price_scout::workbook::QueryGroups;
use price_scout::{AppError, BatchPipeline, PriceResult};

fn groups(entries: &[(&str, &[&str])]) -> QueryGroups {
    entries
        .iter()
        .map(|(name, queries)| {
            (
                name.to_string(),
                queries.iter().map(|q| q.to_string()).collect(),
            )
        })
        .collect::<IndexMap<_, _>>()
}

#[tokio::test]
async fn test_timeout_only_affects_its_cell() {
    let factory = FakeSessionFactory::new(vec![
        ("alpha.kz/search?q=A9F74216", FakePage::Html(listing(&["4 250 ₸", "3 990 ₸", "4 250 ₸"]))),
        ("beta.kz/search?q=A9F74216", FakePage::NeverLoads),
        ("alpha.kz/search?q=EZ9F34216", FakePage::Html(listing(&["2 100,50 ₸"]))),
        ("beta.kz/search?q=EZ9F34216", FakePage::Html(listing(&["Цена по запросу"]))),
    ]);
    let pipeline = BatchPipeline::with_sessions(&test_config(2), factory).unwrap();

    let table = pipeline
        .run(&groups(&[("Breakers", &["A9F74216", "EZ9F34216"])]))
        .await
        .unwrap();

    assert_eq!(table.header(), vec!["SKU", "alpha.kz", "beta.kz"]);
    let group = table.group("Breakers").unwrap();
    assert_eq!(group.rows.len(), 2);

    let first = &group.rows[0];
    assert_eq!(first.query, "A9F74216");
    assert_eq!(
        first.results,
        vec![
            PriceResult::Found(vec!["4250 ".to_string(), "3990 ".to_string()]),
            PriceResult::NotFound,
        ]
    );

    let aggregator = pipeline.aggregator();
    assert_eq!(aggregator.render_row(first), vec!["A9F74216", "4250, 3990", "not found"]);
    assert_eq!(
        aggregator.render_row(&group.rows[1]),
        vec!["EZ9F34216", "2100.50", "price on request"]
    );
}

#[tokio::test]
async fn test_rows_match_non_blank_identifiers_per_group() {
    let factory = FakeSessionFactory::new(vec![("kz/search", FakePage::Html(listing(&["10 ₸"])))]);
    let pipeline = BatchPipeline::with_sessions(&test_config(3), factory.clone()).unwrap();

    let table = pipeline
        .run(&groups(&[
            ("Zeta", &["Z1", "  ", "Z2", "Z3"]),
            ("Alpha", &["", "A1"]),
            ("Empty", &[]),
        ]))
        .await
        .unwrap();

    let names: Vec<&str> = table.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Zeta", "Alpha", "Empty"]);
    assert_eq!(table.group("Zeta").unwrap().rows.len(), 3);
    assert_eq!(table.group("Alpha").unwrap().rows.len(), 1);
    assert!(table.group("Empty").unwrap().rows.is_empty());
    assert_eq!(table.row_count(), 4);

    for group in &table.groups {
        for row in &group.rows {
            assert_eq!(row.results.len(), table.sites.len());
        }
    }
    // Four rows on two sites.
    assert_eq!(factory.acquired(), 8);
}

#[tokio::test]
async fn test_first_cell_mode() {
    let mut config = test_config(2);
    config.aggregate.mode = CellMode::First;
    let factory = FakeSessionFactory::new(vec![(
        "kz/search",
        FakePage::Html(listing(&["1 500 ₸", "1 200 ₸"])),
    )]);
    let pipeline = BatchPipeline::with_sessions(&config, factory).unwrap();

    let table = pipeline.run(&groups(&[("Sheet1", &["X1"])])).await.unwrap();
    let row = &table.group("Sheet1").unwrap().rows[0];
    assert_eq!(pipeline.aggregator().render_row(row), vec!["X1", "1500", "1500"]);
}

#[tokio::test]
async fn test_run_single_reports_each_site() {
    let factory = FakeSessionFactory::new(vec![
        ("alpha.kz", FakePage::Html(listing(&["12 345 ₸"]))),
        ("beta.kz", FakePage::Unreachable),
    ]);
    let pipeline = BatchPipeline::with_sessions(&test_config(2), factory).unwrap();

    let response = pipeline.run_single("  A9F74216 ").await.unwrap();
    assert_eq!(response.query, "A9F74216");
    assert_eq!(response.results.len(), 2);

    let alpha = &response.results[0];
    assert_eq!(alpha.site, "alpha.kz");
    assert_eq!(alpha.url, "https://alpha.kz/search?q=A9F74216");
    assert_eq!(alpha.result, CellValue::Prices(vec!["12345 ".to_string()]));
    assert_eq!(alpha.display, "12345");

    let beta = &response.results[1];
    assert_eq!(beta.site, "beta.kz");
    assert_eq!(beta.result, CellValue::Label("error".to_string()));
    assert_eq!(beta.display, "error");

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["results"][0]["result"], serde_json::json!(["12345 "]));
    assert_eq!(json["results"][1]["result"], "error");
}

#[tokio::test]
async fn test_run_single_rejects_blank_query() {
    let factory = FakeSessionFactory::new(Vec::new());
    let pipeline = BatchPipeline::with_sessions(&test_config(2), factory.clone()).unwrap();

    let err = pipeline.run_single("   ").await.unwrap_err();
    assert!(matches!(err, AppError::InputFormat(_)));
    assert_eq!(factory.acquired(), 0);
}

#[test]
fn test_unknown_target_is_rejected_at_build_time() {
    let mut config = test_config(2);
    config.scraper.targets.push("unknown-shop.com".to_string());

    let result = BatchPipeline::with_sessions(&config, FakeSessionFactory::new(Vec::new()));
    assert!(matches!(result, Err(AppError::UnsupportedSite { .. })));
}
